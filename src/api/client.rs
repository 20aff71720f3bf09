//! An HTTP client for the workflow service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use reqwest::RequestBuilder;
use reqwest::header::AUTHORIZATION;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderValue;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use url::Url;

use super::ApiError;
use super::ApiResult;
use super::ServiceApi;
use super::send;
use super::models::Created;
use super::models::Credential;
use super::models::Job;
use super::models::JobAnswerSet;
use super::models::JobRequest;
use super::models::Questionnaire;
use super::models::StageGroup;
use super::models::StagedFileRequest;
use super::models::Workflow;
use super::models::WorkflowVersion;
use super::models::WorkflowVersionRequest;
use crate::config::ServiceConfig;
use crate::cwl::ToolDetail;

/// Maps a not found error for a job endpoint to [`ApiError::JobNotFound`].
fn job_not_found(job_id: u64) -> impl FnOnce(ApiError) -> ApiError {
    move |e| match e {
        ApiError::NotFound(_) => ApiError::JobNotFound(job_id),
        e => e,
    }
}

/// A client for the Bespin workflow service.
#[derive(Debug, Clone)]
pub struct BespinApi {
    /// The underlying HTTP client.
    client: reqwest::Client,
    /// The base URL of the service API.
    base_url: Url,
}

impl BespinApi {
    /// Creates a new client from the service configuration.
    pub fn new(config: &ServiceConfig, user_agent: &str) -> ApiResult<Self> {
        let base_url = Url::parse(config.url.trim_end_matches('/'))
            .map_err(|e| ApiError::Config(format!("invalid service URL `{}`: {e}", config.url)))?;

        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Token {}", config.token))
            .map_err(|_| ApiError::Config(String::from("the service token is not valid")))?;
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

    /// Sends a request and decodes its JSON response.
    async fn decode<T: DeserializeOwned>(&self, url: Url, request: RequestBuilder) -> ApiResult<T> {
        send(url.clone(), request)
            .await?
            .json()
            .await
            .map_err(|source| ApiError::Decode {
                url: url.to_string(),
                source,
            })
    }

    /// Performs a `GET` request.
    async fn get<T: DeserializeOwned>(&self, url: Url) -> ApiResult<T> {
        let request = self.client.request(Method::GET, url.clone());
        self.decode(url, request).await
    }

    /// Performs a `POST` request.
    async fn post<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        url: Url,
        body: &B,
    ) -> ApiResult<T> {
        let request = self.client.request(Method::POST, url.clone()).json(body);
        self.decode(url, request).await
    }

    /// Performs a `POST` request, ignoring the response body.
    async fn post_ignored<B: Serialize + Sync>(&self, url: Url, body: &B) -> ApiResult<()> {
        let builder = self.client.post(url.clone()).json(body);
        send(url, builder).await.map(|_| ())
    }

    /// Gets the first item of a filtered listing, or a not found error.
    async fn first<T: DeserializeOwned>(&self, url: Url, what: String) -> ApiResult<T> {
        self.get::<Vec<T>>(url)
            .await?
            .into_iter()
            .next()
            .ok_or(ApiError::NotFound(what))
    }

    /// Lists the caller's jobs.
    pub async fn list_jobs(&self) -> ApiResult<Vec<Job>> {
        self.get(self.endpoint("/jobs/")?).await
    }

    /// Lists the workflows.
    pub async fn list_workflows(&self) -> ApiResult<Vec<Workflow>> {
        self.get(self.endpoint("/workflows/")?).await
    }

    /// Gets the workflow with the given tag.
    pub async fn workflow_for_tag(&self, tag: &str) -> ApiResult<Workflow> {
        let mut url = self.endpoint("/workflows/")?;
        url.query_pairs_mut().append_pair("tag", tag);
        self.first(url, format!("no workflow found for tag `{tag}`"))
            .await
    }

    /// Creates a workflow.
    pub async fn create_workflow(&self, name: &str, tag: &str) -> ApiResult<Workflow> {
        self.post(
            self.endpoint("/admin/workflows/")?,
            &json!({ "name": name, "tag": tag }),
        )
        .await
    }

    /// Lists the questionnaires of a workflow version.
    pub async fn list_questionnaires(&self, workflow_version: u64) -> ApiResult<Vec<Questionnaire>> {
        let mut url = self.endpoint("/job-questionnaires/")?;
        url.query_pairs_mut()
            .append_pair("workflow_version", &workflow_version.to_string());
        self.get(url).await
    }

    /// Registers a new workflow version.
    pub async fn create_workflow_version(
        &self,
        request: &WorkflowVersionRequest,
    ) -> ApiResult<WorkflowVersion> {
        self.post(self.endpoint("/admin/workflow-versions/")?, request)
            .await
    }

    /// Finds a workflow version by its workflow tag and version string.
    pub async fn find_workflow_version(
        &self,
        tag: &str,
        version: &str,
    ) -> ApiResult<WorkflowVersion> {
        let mut url = self.endpoint("/workflow-versions/")?;
        url.query_pairs_mut()
            .append_pair("workflow__tag", tag)
            .append_pair("version", version);
        self.first(
            url,
            format!("no workflow version `{version}` found for tag `{tag}`"),
        )
        .await
    }

    /// Records the tool details of a workflow version.
    pub async fn create_tool_details(
        &self,
        workflow_version: u64,
        details: &[ToolDetail],
    ) -> ApiResult<()> {
        self.post_ignored(
            self.endpoint("/admin/workflow-version-tool-details/")?,
            &json!({ "workflow_version": workflow_version, "details": details }),
        )
        .await
    }
}

#[async_trait]
impl ServiceApi for BespinApi {
    async fn list_credentials(&self) -> ApiResult<Vec<Credential>> {
        self.get(self.endpoint("/dds-user-credentials/")?).await
    }

    async fn resolve_workflow_template(&self, tag: &str) -> ApiResult<Questionnaire> {
        let mut url = self.endpoint("/job-questionnaires/")?;
        url.query_pairs_mut().append_pair("slug", tag);
        self.first(url, format!("no workflow found for tag `{tag}`"))
            .await
    }

    async fn create_stage_group(&self) -> ApiResult<StageGroup> {
        self.post(self.endpoint("/job-file-stage-groups/")?, &json!({}))
            .await
    }

    async fn register_staged_file(&self, request: &StagedFileRequest) -> ApiResult<()> {
        self.post_ignored(self.endpoint("/dds-job-input-files/")?, request)
            .await
    }

    async fn create_job(&self, request: &JobRequest) -> ApiResult<Job> {
        let answer_set: Created = self
            .post(
                self.endpoint("/job-answer-sets/")?,
                &JobAnswerSet::from(request),
            )
            .await?;

        self.post(
            self.endpoint(&format!("/job-answer-sets/{id}/create-job/", id = answer_set.id))?,
            &json!({}),
        )
        .await
    }

    async fn authorize_job(&self, job_id: u64, token: &str) -> ApiResult<()> {
        self.post_ignored(
            self.endpoint(&format!("/jobs/{job_id}/authorize/"))?,
            &json!({ "token": token }),
        )
        .await
        .map_err(job_not_found(job_id))
    }

    async fn start_job(&self, job_id: u64) -> ApiResult<()> {
        self.post_ignored(self.endpoint(&format!("/jobs/{job_id}/start/"))?, &json!({}))
            .await
            .map_err(job_not_found(job_id))
    }

    async fn cancel_job(&self, job_id: u64) -> ApiResult<()> {
        self.post_ignored(self.endpoint(&format!("/jobs/{job_id}/cancel/"))?, &json!({}))
            .await
            .map_err(job_not_found(job_id))
    }

    async fn restart_job(&self, job_id: u64) -> ApiResult<()> {
        self.post_ignored(
            self.endpoint(&format!("/jobs/{job_id}/restart/"))?,
            &json!({}),
        )
        .await
        .map_err(job_not_found(job_id))
    }

    async fn delete_job(&self, job_id: u64) -> ApiResult<()> {
        let url = self.endpoint(&format!("/jobs/{job_id}/"))?;
        let builder = self.client.delete(url.clone());
        send(url, builder)
            .await
            .map(|_| ())
            .map_err(job_not_found(job_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_base_url() {
        let config = ServiceConfig {
            url: String::from("not a url"),
            token: String::from("secret"),
            ..Default::default()
        };
        let err = BespinApi::new(&config, "bespin-test").unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
    }
}
