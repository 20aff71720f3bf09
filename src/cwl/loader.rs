//! Loading of published CWL workflows.

use std::fmt;
use std::fs;
use std::io::Cursor;
use std::path::Path;
use std::path::PathBuf;

use clap::ValueEnum;
use tempfile::TempDir;
use tracing::debug;
use url::Url;
use zip::ZipArchive;

use super::CwlDocument;
use crate::Error;
use crate::Result;
use crate::api::ApiError;
use crate::api::send;
use crate::error::RemoteCallError;

/// How a workflow is packaged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum WorkflowType {
    /// A single packed CWL document whose main process is `#main`.
    Packed,
    /// A zip archive holding the workflow and the documents it refers to.
    Zipped,
}

impl fmt::Display for WorkflowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Packed => write!(f, "packed"),
            Self::Zipped => write!(f, "zipped"),
        }
    }
}

/// Where a workflow version is published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowSource {
    /// The URL (or local path) of the packed document or archive.
    pub url: String,
    /// How the workflow is packaged.
    pub workflow_type: WorkflowType,
    /// The path of the workflow document within an archive.
    ///
    /// Packed workflows use `#main`.
    pub workflow_path: String,
    /// A URL describing the version.
    pub version_info_url: Option<String>,
}

/// Downloads and reads published workflows.
#[derive(Debug, Clone)]
pub struct WorkflowLoader {
    /// The HTTP client used for downloads.
    client: reqwest::Client,
}

impl WorkflowLoader {
    /// Creates a new workflow loader.
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| {
                RemoteCallError::new("download workflow", None, ApiError::Config(e.to_string()))
            })?;
        Ok(Self { client })
    }

    /// Loads the workflow document of a source.
    ///
    /// The download is placed in a temporary directory that is removed once
    /// the document has been read.
    pub async fn load(&self, source: &WorkflowSource) -> Result<CwlDocument> {
        let dir = TempDir::new()?;
        let bytes = self.fetch(&source.url).await?;

        match source.workflow_type {
            WorkflowType::Packed => {
                let path = dir.path().join(file_name(&source.url));
                fs::write(&path, bytes)?;
                CwlDocument::read(&path)
            }
            WorkflowType::Zipped => {
                extract(&bytes, dir.path())?;
                let path = dir.path().join(&source.workflow_path);
                if !path.starts_with(dir.path()) || !path.is_file() {
                    return Err(Error::InvalidWorkflow(format!(
                        "archive `{url}` does not contain `{path}`",
                        url = source.url,
                        path = source.workflow_path
                    )));
                }

                CwlDocument::read(&path)
            }
        }
    }

    /// Gets the contents of a URL or local path.
    async fn fetch(&self, location: &str) -> Result<Vec<u8>> {
        let url = match Url::parse(location) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => url,
            Ok(url) if url.scheme() == "file" => {
                let path = url.to_file_path().map_err(|_| {
                    Error::InvalidWorkflow(format!("invalid file URL `{location}`"))
                })?;
                return Ok(fs::read(path)?);
            }
            _ => return Ok(fs::read(location)?),
        };

        debug!("downloading workflow from `{url}`");
        let target = Some(location.to_string());
        let response = send(url.clone(), self.client.get(url.clone()))
            .await
            .map_err(|e| RemoteCallError::new("download workflow", target.clone(), e))?;

        let bytes = response.bytes().await.map_err(|source| {
            RemoteCallError::new(
                "download workflow",
                target,
                ApiError::Decode {
                    url: url.to_string(),
                    source,
                },
            )
        })?;

        Ok(bytes.to_vec())
    }
}

/// Gets the file name of the last segment of a URL or path.
fn file_name(location: &str) -> PathBuf {
    let name = location
        .rsplit(['/', '\\'])
        .find(|s| !s.is_empty())
        .unwrap_or("workflow.cwl");
    PathBuf::from(name.split(['?', '#']).next().unwrap_or(name))
}

/// Extracts a zip archive into a directory.
fn extract(bytes: &[u8], dir: &Path) -> Result<()> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| Error::InvalidWorkflow(format!("invalid workflow archive: {e}")))?;
    archive
        .extract(dir)
        .map_err(|e| Error::InvalidWorkflow(format!("failed to extract workflow archive: {e}")))
}
