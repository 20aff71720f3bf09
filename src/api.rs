//! The workflow service API.

use async_trait::async_trait;
use reqwest::RequestBuilder;
use reqwest::Response;
use reqwest::StatusCode;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::debug;
use url::Url;

pub mod client;
pub mod models;

pub use client::BespinApi;
pub use models::Credential;
pub use models::Job;
pub use models::JobRequest;
pub use models::Questionnaire;
pub use models::StageGroup;
pub use models::StagedFileRequest;
pub use models::Workflow;
pub use models::WorkflowVersion;
pub use models::WorkflowVersionRequest;

/// Errors from talking to a remote service.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The service could not be reached.
    #[error("failed to connect to `{url}`")]
    Connect {
        /// The URL that was requested.
        url: String,
        /// The transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The job does not exist.
    #[error("no job found for id: {0}")]
    JobNotFound(u64),

    /// The service responded with an error status.
    #[error("service responded with status {status}: {message}")]
    Status {
        /// The HTTP status code.
        status: u16,
        /// The error message from the response.
        message: String,
    },

    /// The response body could not be decoded.
    #[error("unexpected response from `{url}`")]
    Decode {
        /// The URL that was requested.
        url: String,
        /// The decoding error.
        #[source]
        source: reqwest::Error,
    },

    /// The client was misconfigured.
    #[error("invalid client configuration: {0}")]
    Config(String),
}

/// Result type for API operations.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// The operations of the workflow service used to create and manage jobs.
#[async_trait]
pub trait ServiceApi: Send + Sync + std::fmt::Debug {
    /// Lists the file storage credentials of the caller.
    async fn list_credentials(&self) -> ApiResult<Vec<Credential>>;

    /// Resolves a workflow tag to the questionnaire jobs are created from.
    async fn resolve_workflow_template(&self, tag: &str) -> ApiResult<Questionnaire>;

    /// Creates an empty stage group.
    async fn create_stage_group(&self) -> ApiResult<StageGroup>;

    /// Registers a file to be staged for a job.
    async fn register_staged_file(&self, request: &StagedFileRequest) -> ApiResult<()>;

    /// Creates a job.
    async fn create_job(&self, request: &JobRequest) -> ApiResult<Job>;

    /// Sets the token authorizing a job to run.
    async fn authorize_job(&self, job_id: u64, token: &str) -> ApiResult<()>;

    /// Starts a job.
    async fn start_job(&self, job_id: u64) -> ApiResult<()>;

    /// Cancels a running job.
    async fn cancel_job(&self, job_id: u64) -> ApiResult<()>;

    /// Restarts a job that is not running.
    async fn restart_job(&self, job_id: u64) -> ApiResult<()>;

    /// Deletes a job.
    async fn delete_job(&self, job_id: u64) -> ApiResult<()>;
}

/// Extracts the most useful message from an error response body.
///
/// Both services report errors as `{"detail": "..."}`; any other body is
/// returned as-is.
fn error_message(body: &str) -> String {
    serde_json::from_str::<JsonValue>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(JsonValue::as_str).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

/// Sends a request and checks its status.
///
/// A `404` response is reported as [`ApiError::NotFound`] and any other
/// unsuccessful status as [`ApiError::Status`].
pub(crate) async fn send(url: Url, request: RequestBuilder) -> ApiResult<Response> {
    debug!("sending request to `{url}`");
    let response = request.send().await.map_err(|source| ApiError::Connect {
        url: url.to_string(),
        source,
    })?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = error_message(&response.text().await.unwrap_or_default());
    if status == StatusCode::NOT_FOUND {
        Err(ApiError::NotFound(message))
    } else {
        Err(ApiError::Status {
            status: status.as_u16(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn error_message_prefers_detail() {
        assert_eq!(error_message(r#"{"detail": "Not found."}"#), "Not found.");
        assert_eq!(error_message(r#"{"other": 1}"#), r#"{"other": 1}"#);
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
    }
}
