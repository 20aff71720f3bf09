//! Request and response models of the workflow service.

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value as JsonValue;

/// A file storage credential of the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// The service's identifier for the credential.
    pub id: u64,
    /// The identity of the credential's user within the storage service.
    #[serde(rename = "dds_id")]
    pub external_id: String,
}

/// A questionnaire: the parameter schema for a workflow version and
/// configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Questionnaire {
    /// The identifier of the questionnaire.
    pub id: u64,
    /// The name of the questionnaire.
    #[serde(default)]
    pub name: String,
    /// The tag that selects the questionnaire.
    #[serde(default)]
    pub slug: String,
    /// The parameter schema as JSON text.
    #[serde(default)]
    pub user_fields_json: String,
}

/// A group of file staging operations for a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageGroup {
    /// The identifier of the stage group.
    pub id: u64,
}

/// A request to stage a storage file for a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedFileRequest {
    /// The storage project that owns the file.
    pub project_id: String,
    /// The storage identifier of the file.
    pub file_id: String,
    /// The file name the file is staged as.
    pub destination_path: String,
    /// The group the sequence number belongs to.
    pub sequence_group: u32,
    /// The position of the file within its group.
    pub sequence: u32,
    /// The credential used to download the file.
    #[serde(rename = "dds_user_credentials")]
    pub credential_id: u64,
    /// The stage group the file belongs to.
    #[serde(rename = "stage_group")]
    pub stage_group_id: u64,
    /// The size of the file in bytes.
    pub size: u64,
}

/// A request to create a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    /// The name of the job.
    pub name: String,
    /// The fund code of the job.
    pub fund_code: String,
    /// The job parameters serialized as JSON text.
    pub parameters: String,
    /// The questionnaire the job answers.
    pub template_id: u64,
    /// The stage group holding the job's input files.
    pub stage_group_id: u64,
}

/// The answer set posted to the service when creating a job.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct JobAnswerSet<'a> {
    /// The name of the job.
    pub job_name: &'a str,
    /// The fund code of the job.
    pub fund_code: &'a str,
    /// The job parameters as JSON text.
    pub user_job_order_json: &'a str,
    /// The questionnaire identifier.
    pub questionnaire: u64,
    /// The stage group identifier.
    pub stage_group: u64,
}

impl<'a> From<&'a JobRequest> for JobAnswerSet<'a> {
    fn from(request: &'a JobRequest) -> Self {
        Self {
            job_name: &request.name,
            fund_code: &request.fund_code,
            user_job_order_json: &request.parameters,
            questionnaire: request.template_id,
            stage_group: request.stage_group_id,
        }
    }
}

/// The identifier of a created resource.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Created {
    /// The identifier.
    pub id: u64,
}

/// A job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// The identifier of the job.
    pub id: u64,
    /// The name of the job.
    #[serde(default)]
    pub name: String,
    /// The state of the job.
    #[serde(default)]
    pub state: Option<String>,
    /// The step the job is running.
    #[serde(default)]
    pub step: Option<String>,
    /// The fund code of the job.
    #[serde(default)]
    pub fund_code: Option<String>,
    /// When the job was created.
    #[serde(default)]
    pub created: Option<String>,
    /// When the job was last updated.
    #[serde(default)]
    pub last_updated: Option<String>,
}

/// A workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
    /// The identifier of the workflow.
    pub id: u64,
    /// The name of the workflow.
    pub name: String,
    /// The unique tag of the workflow.
    #[serde(default)]
    pub tag: String,
    /// The identifiers of the workflow's versions, oldest first.
    #[serde(default)]
    pub versions: Vec<u64>,
}

/// A version of a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowVersion {
    /// The identifier of the workflow version.
    pub id: u64,
    /// The version string.
    #[serde(default)]
    pub version: String,
}

/// A request to register a new workflow version.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowVersionRequest {
    /// The workflow the version belongs to.
    pub workflow: u64,
    /// The version string.
    pub version: String,
    /// How the workflow is packaged (`packed` or `zipped`).
    pub workflow_type: String,
    /// The description of the version.
    pub description: String,
    /// The path of the workflow within its package.
    pub workflow_path: String,
    /// The URL of the package.
    pub url: String,
    /// A URL describing the version.
    pub version_info_url: Option<String>,
    /// The declared inputs of the workflow.
    pub fields: JsonValue,
}
