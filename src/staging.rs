//! Staging of remote input files for a job.
//!
//! Every `File` parameter of a job refers to a remote file by URI. Before a
//! job runs, the workflow service downloads each file into the job's working
//! directory under a flat "staging name" derived from the URI, and the job's
//! parameters are rewritten to refer to those local names.

use tracing::debug;

use crate::Error;
use crate::Result;
use crate::error::RemoteCallError;
use crate::storage::FileStore;
use crate::template::JobTemplate;
use crate::template::ParameterValue;
use crate::template::Parameters;
use crate::template::Traversal;

/// The prefix of storage URIs.
const STORAGE_PREFIX: &str = "dds://";

/// What the storage URI prefix becomes in staging names.
const STAGED_PREFIX: &str = "dds_";

/// Computes the local file name a remote URI is staged as.
///
/// Every `dds://` becomes `dds_`, then every `/` and `:` is replaced with
/// `_`. Any string is accepted.
///
/// ```
/// use bespin::staging::staging_name;
///
/// assert_eq!(staging_name("dds://project/some/path.txt"), "dds_project_some_path.txt");
/// assert_eq!(staging_name("/tmp/data"), "_tmp_data");
/// ```
pub fn staging_name(uri: &str) -> String {
    uri.replace(STORAGE_PREFIX, STAGED_PREFIX).replace(['/', ':'], "_")
}

/// A file reference found in a job template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingEntry {
    /// The remote URI as written in the template.
    pub uri: String,
    /// The local name the file is staged as.
    pub staging_name: String,
}

impl StagingEntry {
    /// Creates a staging entry for a URI.
    pub fn new(uri: impl Into<String>) -> Self {
        let uri = uri.into();
        let staging_name = staging_name(&uri);
        Self { uri, staging_name }
    }
}

/// Collects the file references of a template's parameters in document
/// order.
///
/// With [`Traversal::Shallow`] only top-level `File` values are collected;
/// with [`Traversal::Deep`] files nested in sequences and records are too.
pub fn collect_file_references(template: &JobTemplate, traversal: Traversal) -> Vec<StagingEntry> {
    let mut entries = Vec::new();
    for value in template.parameters().values() {
        if let ParameterValue::File(file) = value {
            entries.push(StagingEntry::new(&file.path));
        } else if traversal == Traversal::Deep {
            value.visit_files(&mut |file| entries.push(StagingEntry::new(&file.path)));
        }
    }

    entries
}

/// Rewrites the `File` paths of the parameters to their staging names.
///
/// The given parameters are left untouched; a rewritten copy is returned.
pub fn materialize_parameters(parameters: &Parameters, traversal: Traversal) -> Parameters {
    let mut parameters = parameters.clone();
    for value in parameters.values_mut() {
        if let ParameterValue::File(file) = value {
            file.path = staging_name(&file.path);
        } else if traversal == Traversal::Deep {
            value.visit_files_mut(&mut |file| file.path = staging_name(&file.path));
        }
    }

    parameters
}

/// A file reference resolved against the storage service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReference {
    /// The remote URI as written in the template.
    pub uri: String,
    /// The storage identifier of the file.
    pub file_id: String,
    /// The project that owns the file.
    pub project_id: String,
    /// The size of the file in bytes.
    pub size: u64,
    /// The local name the file is staged as.
    pub staging_name: String,
}

/// Resolves file references to stored files.
#[derive(Debug, Clone, Copy)]
pub struct FileReferenceResolver<'a> {
    /// The store the files are held in.
    store: &'a dyn FileStore,
}

impl<'a> FileReferenceResolver<'a> {
    /// Creates a new resolver.
    pub fn new(store: &'a dyn FileStore) -> Self {
        Self { store }
    }

    /// Resolves a staging entry to the stored file it refers to.
    pub async fn resolve(&self, entry: &StagingEntry) -> Result<FileReference> {
        debug!("resolving file `{uri}`", uri = entry.uri);
        let info = self
            .store
            .find_file_by_uri(&entry.uri)
            .await
            .map_err(|e| RemoteCallError::new("find file", Some(entry.uri.clone()), e))?
            .ok_or_else(|| Error::FileNotFound(entry.uri.clone()))?;

        Ok(FileReference {
            uri: entry.uri.clone(),
            file_id: info.id,
            project_id: info.project_id,
            size: info.size,
            staging_name: entry.staging_name.clone(),
        })
    }
}
