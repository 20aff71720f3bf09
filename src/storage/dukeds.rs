//! A [`FileStore`] backed by the Duke Data Service REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderValue;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;
use url::Url;

use super::FileInfo;
use super::FileStore;
use super::split_storage_uri;
use crate::api::ApiError;
use crate::api::ApiResult;
use crate::api::send;
use crate::config::StorageConfig;

/// The kind reported for folders.
const FOLDER_KIND: &str = "dds-folder";

/// The kind reported for files.
const FILE_KIND: &str = "dds-file";

/// The number of items requested per page of a listing.
const PAGE_SIZE: u64 = 100;

/// The response header holding the number of pages of a listing.
const TOTAL_PAGES_HEADER: &str = "x-total-pages";

/// The project role that allows downloading files.
const DOWNLOAD_ROLE: &str = "file_downloader";

/// A paged listing response.
#[derive(Debug, Deserialize)]
struct Listing<T> {
    /// The items of the listing.
    results: Vec<T>,
}

/// A project.
#[derive(Debug, Deserialize)]
struct Project {
    /// The identifier of the project.
    id: String,
    /// The name of the project.
    name: String,
}

/// The upload backing a file version.
#[derive(Debug, Deserialize)]
struct Upload {
    /// The size of the upload in bytes.
    #[serde(default)]
    size: u64,
}

/// The current version of a file.
#[derive(Debug, Deserialize)]
struct FileVersion {
    /// The upload of the version.
    upload: Upload,
}

/// A child of a project or folder.
#[derive(Debug, Deserialize)]
struct Child {
    /// The identifier of the child.
    id: String,
    /// The name of the child.
    name: String,
    /// Either `dds-folder` or `dds-file`.
    kind: String,
    /// The current version, for files.
    #[serde(default)]
    current_version: Option<FileVersion>,
}

/// The container whose children are being listed.
#[derive(Debug, Clone, Copy)]
enum Parent<'a> {
    /// The root of a project.
    Project(&'a str),
    /// A folder.
    Folder(&'a str),
}

/// A client for the Duke Data Service storage API.
#[derive(Debug, Clone)]
pub struct DukeDsStore {
    /// The underlying HTTP client.
    client: reqwest::Client,
    /// The base URL of the storage API.
    base_url: Url,
}

impl DukeDsStore {
    /// Creates a new store from the storage configuration.
    pub fn new(config: &StorageConfig, user_agent: &str) -> ApiResult<Self> {
        let base_url = Url::parse(config.url.trim_end_matches('/'))
            .map_err(|e| ApiError::Config(format!("invalid storage URL `{}`: {e}", config.url)))?;

        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&config.token)
            .map_err(|_| ApiError::Config(String::from("the storage token is not valid")))?;
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ApiError::Config(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    /// Gets the URL of an endpoint.
    fn endpoint(&self, suffix: &str) -> ApiResult<Url> {
        let url = format!("{}{suffix}", self.base_url.as_str().trim_end_matches('/'));
        Url::parse(&url).map_err(|e| ApiError::Config(format!("invalid URL `{url}`: {e}")))
    }

    /// Performs `GET` requests for every page of a listing and decodes the
    /// items.
    ///
    /// The number of pages is read from the `x-total-pages` header of each
    /// response; a response without it is the only page.
    async fn list<T: DeserializeOwned>(&self, url: Url) -> ApiResult<Vec<T>> {
        let mut items = Vec::new();
        let mut page = 1;
        loop {
            let mut page_url = url.clone();
            page_url
                .query_pairs_mut()
                .append_pair("page", &page.to_string())
                .append_pair("per_page", &PAGE_SIZE.to_string());

            let request = self.client.get(page_url.clone());
            let response = send(page_url.clone(), request).await?;
            let total_pages = response
                .headers()
                .get(TOTAL_PAGES_HEADER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(1);

            let listing: Listing<T> = response.json().await.map_err(|source| ApiError::Decode {
                url: page_url.to_string(),
                source,
            })?;
            items.extend(listing.results);

            if page >= total_pages {
                return Ok(items);
            }

            page += 1;
        }
    }

    /// Finds the project with the given name.
    async fn find_project(&self, name: &str) -> ApiResult<Option<Project>> {
        let projects: Vec<Project> = self.list(self.endpoint("/projects")?).await?;
        Ok(projects.into_iter().find(|p| p.name == name))
    }

    /// Finds the child of a container with the given name and kind.
    async fn find_child(
        &self,
        parent: Parent<'_>,
        name: &str,
        kind: &str,
    ) -> ApiResult<Option<Child>> {
        let suffix = match parent {
            Parent::Project(id) => format!("/projects/{id}/children"),
            Parent::Folder(id) => format!("/folders/{id}/children"),
        };

        let mut url = self.endpoint(&suffix)?;
        url.query_pairs_mut().append_pair("name_contains", name);
        let children: Vec<Child> = self.list(url).await?;
        Ok(children
            .into_iter()
            .find(|c| c.name == name && c.kind == kind))
    }

    /// Walks a path within a project to the file it names.
    async fn find_file(&self, project: &Project, path: &str) -> ApiResult<Option<Child>> {
        let components: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
        let mut components = components.into_iter().peekable();
        let mut folder: Option<Child> = None;
        while let Some(name) = components.next() {
            let parent = match &folder {
                Some(folder) => Parent::Folder(&folder.id),
                None => Parent::Project(&project.id),
            };

            let kind = if components.peek().is_some() {
                FOLDER_KIND
            } else {
                FILE_KIND
            };

            match self.find_child(parent, name, kind).await? {
                Some(child) if kind == FILE_KIND => return Ok(Some(child)),
                Some(child) => folder = Some(child),
                None => return Ok(None),
            }
        }

        Ok(None)
    }
}

#[async_trait]
impl FileStore for DukeDsStore {
    async fn find_file_by_uri(&self, uri: &str) -> ApiResult<Option<FileInfo>> {
        let Some((project_name, path)) = split_storage_uri(uri) else {
            debug!("`{uri}` is not a storage URI");
            return Ok(None);
        };

        let Some(project) = self.find_project(project_name).await? else {
            debug!("no project named `{project_name}`");
            return Ok(None);
        };

        let file = match self.find_file(&project, path).await {
            Ok(file) => file,
            Err(ApiError::NotFound(_)) => None,
            Err(e) => return Err(e),
        };

        Ok(file.map(|file| FileInfo {
            id: file.id,
            project_id: project.id,
            size: file.current_version.map(|v| v.upload.size).unwrap_or(0),
        }))
    }

    async fn grant_download_permission(
        &self,
        project_id: &str,
        user_external_id: &str,
    ) -> ApiResult<()> {
        let url = self.endpoint(&format!(
            "/projects/{project_id}/permissions/{user_external_id}"
        ))?;
        let request = self
            .client
            .put(url.clone())
            .json(&json!({ "auth_role": DOWNLOAD_ROLE }));
        send(url, request).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_storage_url() {
        let config = StorageConfig {
            url: String::from("::"),
            token: String::from("secret"),
            ..Default::default()
        };
        assert!(matches!(
            DukeDsStore::new(&config, "bespin-test").unwrap_err(),
            ApiError::Config(_)
        ));
    }

    #[test]
    fn path_walk_is_send() {
        fn assert_send<T: Send>(_: &T) {}

        let config = StorageConfig {
            url: String::from("https://storage.example.org/api/v1"),
            token: String::from("secret"),
            ..Default::default()
        };
        let store = DukeDsStore::new(&config, "bespin-test").unwrap();
        let project = Project {
            id: String::from("p1"),
            name: String::from("project"),
        };

        let walk = store.find_file(&project, "reads/sample.fastq");
        assert_send(&walk);
    }
}
