//! Remote file storage.
//!
//! Job parameters refer to input files by `dds://<project>/<path>` URIs. A
//! [`FileStore`] resolves those URIs to stored files and grants the workflow
//! service's user access to the projects that hold them.

use async_trait::async_trait;

use crate::api::ApiResult;

pub mod dukeds;

pub use dukeds::DukeDsStore;

/// The URI scheme of files held by the storage service.
pub const STORAGE_SCHEME: &str = "dds";

/// A file held by the storage service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// The storage identifier of the file.
    pub id: String,
    /// The identifier of the project that owns the file.
    pub project_id: String,
    /// The size of the file in bytes.
    pub size: u64,
}

/// The operations of the file storage service used when submitting jobs.
#[async_trait]
pub trait FileStore: Send + Sync + std::fmt::Debug {
    /// Finds the file a URI refers to.
    ///
    /// Returns `Ok(None)` if the URI does not name a visible file.
    async fn find_file_by_uri(&self, uri: &str) -> ApiResult<Option<FileInfo>>;

    /// Grants a user permission to download the files of a project.
    async fn grant_download_permission(
        &self,
        project_id: &str,
        user_external_id: &str,
    ) -> ApiResult<()>;
}

/// Splits a storage URI into its project name and the path within the
/// project.
///
/// Returns `None` if the URI is not a storage URI or either part is empty.
pub fn split_storage_uri(uri: &str) -> Option<(&str, &str)> {
    let rest = uri.strip_prefix(STORAGE_SCHEME)?.strip_prefix("://")?;
    let (project, path) = rest.split_once('/')?;
    let path = path.trim_matches('/');
    if project.is_empty() || path.is_empty() {
        return None;
    }

    Some((project, path))
}
