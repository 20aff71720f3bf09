//! Error types for job template handling and submission.

use thiserror::Error;

use crate::api::ApiError;
use crate::submit::Step;

/// A download permission grant that failed after a job was created.
#[derive(Debug)]
pub struct PermissionFailure {
    /// The storage project the permission was requested for.
    pub project_id: String,
    /// The error reported by the storage service.
    pub error: ApiError,
}

/// A failed call to the workflow service or the file storage service.
#[derive(Debug, Error)]
#[error("remote call `{operation}` failed{}", .target.as_ref().map(|t| format!(" for `{t}`")).unwrap_or_default())]
pub struct RemoteCallError {
    /// The name of the operation that was attempted.
    pub operation: &'static str,
    /// The identifier the operation targeted, if any.
    pub target: Option<String>,
    /// The underlying transport or service error.
    #[source]
    pub source: ApiError,
}

impl RemoteCallError {
    /// Creates a new remote call error.
    pub fn new(operation: &'static str, target: Option<String>, source: ApiError) -> Self {
        Self {
            operation,
            target,
            source,
        }
    }
}

/// Represents an error from the `bespin` library.
#[derive(Debug, Error)]
pub enum Error {
    /// One or more template fields still hold placeholder values.
    #[error("please fill in placeholder field(s): {}", .fields.join(", "))]
    IncompleteTemplate {
        /// The offending field paths, in the order they were checked.
        fields: Vec<String>,
    },

    /// A template value has a shape that cannot be interpreted.
    #[error("invalid template data: {0}")]
    InvalidTemplateData(String),

    /// A workflow's parameter schema could not be interpreted.
    #[error("invalid parameter schema: {0}")]
    InvalidSchema(String),

    /// A referenced remote file does not exist or is not visible.
    #[error("no file found for `{0}`")]
    FileNotFound(String),

    /// The caller has no stored file storage credential.
    #[error("no file storage credential is configured for this user")]
    NoCredential,

    /// A remote call failed.
    #[error(transparent)]
    RemoteCall(#[from] RemoteCallError),

    /// A job submission stopped before the job was created.
    #[error(
        "job submission failed during {step} (last completed step: {})",
        .completed.map(|s| s.to_string()).unwrap_or_else(|| String::from("none"))
    )]
    SubmissionFailed {
        /// The step that failed.
        step: Step,
        /// The last step that completed successfully.
        completed: Option<Step>,
        /// The reason the step failed.
        #[source]
        source: Box<Error>,
    },

    /// A job was created but granting download permissions failed.
    #[error(
        "job {job_id} was created but download permission could not be granted for project(s): {}",
        .failures.iter().map(|f| format!("{id} ({e})", id = f.project_id, e = f.error)).collect::<Vec<_>>().join(", ")
    )]
    PartialSubmission {
        /// The identifier of the job that was created.
        job_id: u64,
        /// The grants that failed.
        failures: Vec<PermissionFailure>,
    },

    /// A CWL workflow document failed validation or could not be read.
    #[error("invalid workflow: {0}")]
    InvalidWorkflow(String),

    /// An I/O error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for library operations.
pub type Result<T> = std::result::Result<T, Error>;
