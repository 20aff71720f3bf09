//! Submission of job templates to the workflow service.
//!
//! Submitting a job is an ordered sequence of remote calls (see [`Step`]).
//! The sequence is not transactional: a failure part way through leaves
//! whatever the service already created behind, so failures report both the
//! step that failed and the last step that completed.

use std::fmt;
use std::future::Future;

use indexmap::IndexSet;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::Error;
use crate::Result;
use crate::api::JobRequest;
use crate::api::ServiceApi;
use crate::api::StagedFileRequest;
use crate::error::PermissionFailure;
use crate::error::RemoteCallError;
use crate::staging::FileReference;
use crate::staging::FileReferenceResolver;
use crate::staging::StagingEntry;
use crate::staging::collect_file_references;
use crate::staging::materialize_parameters;
use crate::storage::FileStore;
use crate::template::JobTemplate;
use crate::template::PlaceholderCatalog;
use crate::template::TemplateValidator;
use crate::template::Traversal;

/// The sequence group every staged file is registered in.
const SEQUENCE_GROUP: u32 = 0;

/// A step of a job submission, in the order the steps are performed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Step {
    /// The caller's storage credential is looked up.
    CredentialLookup,
    /// The workflow tag is resolved to a questionnaire.
    TemplateResolution,
    /// A stage group is created for the job's files.
    StageGroupCreation,
    /// Each input file is resolved and registered with the stage group.
    FileRegistration,
    /// The parameters are rewritten to refer to staged files.
    ParameterMaterialization,
    /// The job is created.
    JobCreation,
    /// The service is granted permission to download the input files.
    PermissionGrant,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CredentialLookup => write!(f, "credential lookup"),
            Self::TemplateResolution => write!(f, "template resolution"),
            Self::StageGroupCreation => write!(f, "stage group creation"),
            Self::FileRegistration => write!(f, "file registration"),
            Self::ParameterMaterialization => write!(f, "parameter materialization"),
            Self::JobCreation => write!(f, "job creation"),
            Self::PermissionGrant => write!(f, "permission grant"),
        }
    }
}

/// Tracks the last step of a submission that completed.
#[derive(Debug, Default)]
struct Progress {
    /// The last completed step.
    completed: Option<Step>,
}

impl Progress {
    /// Runs a step, recording its completion or wrapping its failure.
    async fn step<T>(&mut self, step: Step, work: impl Future<Output = Result<T>>) -> Result<T> {
        debug!("starting {step}");
        match work.await {
            Ok(value) => {
                info!("completed {step}");
                self.completed = Some(step);
                Ok(value)
            }
            Err(e) => Err(Error::SubmissionFailed {
                step,
                completed: self.completed,
                source: Box::new(e),
            }),
        }
    }
}

/// A job that was created on the workflow service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedJob {
    /// The identifier of the job.
    pub job_id: u64,
    /// The stage group holding the job's input files.
    pub stage_group_id: u64,
    /// The input files staged for the job, in registration order.
    pub staged_files: Vec<FileReference>,
    /// The distinct storage projects the input files belong to.
    pub projects: Vec<String>,
}

/// The outcome of a dry run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DryRun {
    /// The input files that would be staged, in registration order.
    pub files: Vec<StagingEntry>,
}

/// Validates a template and determines the files it would stage.
///
/// No remote calls are made, so no service clients are needed.
pub fn dry_run(
    template: &JobTemplate,
    catalog: &PlaceholderCatalog,
    traversal: Traversal,
) -> Result<DryRun> {
    TemplateValidator::new(catalog, traversal).validate(template)?;
    Ok(DryRun {
        files: collect_file_references(template, traversal),
    })
}

/// Submits job templates to the workflow service.
#[derive(Debug, Clone, Copy)]
pub struct JobSubmission<'a> {
    /// The workflow service.
    service: &'a dyn ServiceApi,
    /// The file storage service.
    store: &'a dyn FileStore,
    /// The catalog defining the placeholders a template must not contain.
    catalog: &'a PlaceholderCatalog,
    /// How far into parameter values validation and staging look.
    traversal: Traversal,
}

impl<'a> JobSubmission<'a> {
    /// Creates a new job submission.
    pub fn new(
        service: &'a dyn ServiceApi,
        store: &'a dyn FileStore,
        catalog: &'a PlaceholderCatalog,
        traversal: Traversal,
    ) -> Self {
        Self {
            service,
            store,
            catalog,
            traversal,
        }
    }

    /// Validates a template and determines the files it would stage without
    /// making any remote calls.
    pub fn dry_run(&self, template: &JobTemplate) -> Result<DryRun> {
        dry_run(template, self.catalog, self.traversal)
    }

    /// Submits a template, creating a job.
    ///
    /// The template is validated before any remote call is made.
    pub async fn submit(&self, template: &JobTemplate) -> Result<SubmittedJob> {
        let DryRun { files } = self.dry_run(template)?;
        let mut progress = Progress::default();

        let credential = progress
            .step(Step::CredentialLookup, async {
                self.service
                    .list_credentials()
                    .await
                    .map_err(|e| RemoteCallError::new("list credentials", None, e))?
                    .into_iter()
                    .next()
                    .ok_or(Error::NoCredential)
            })
            .await?;

        let questionnaire = progress
            .step(Step::TemplateResolution, async {
                self.service
                    .resolve_workflow_template(template.workflow_tag())
                    .await
                    .map_err(|e| {
                        Error::from(RemoteCallError::new(
                            "resolve workflow template",
                            Some(template.workflow_tag().to_string()),
                            e,
                        ))
                    })
            })
            .await?;

        let stage_group = progress
            .step(Step::StageGroupCreation, async {
                self.service
                    .create_stage_group()
                    .await
                    .map_err(|e| Error::from(RemoteCallError::new("create stage group", None, e)))
            })
            .await?;

        let (staged_files, projects) = progress
            .step(Step::FileRegistration, async {
                let resolver = FileReferenceResolver::new(self.store);
                let mut staged = Vec::with_capacity(files.len());
                let mut projects = IndexSet::new();
                for (sequence, entry) in files.iter().enumerate() {
                    let reference = resolver.resolve(entry).await?;
                    let request = StagedFileRequest {
                        project_id: reference.project_id.clone(),
                        file_id: reference.file_id.clone(),
                        destination_path: reference.staging_name.clone(),
                        sequence_group: SEQUENCE_GROUP,
                        sequence: u32::try_from(sequence).map_err(|_| {
                            Error::InvalidTemplateData(String::from("too many input files"))
                        })?,
                        credential_id: credential.id,
                        stage_group_id: stage_group.id,
                        size: reference.size,
                    };

                    self.service
                        .register_staged_file(&request)
                        .await
                        .map_err(|e| {
                            RemoteCallError::new("register staged file", Some(entry.uri.clone()), e)
                        })?;

                    projects.insert(reference.project_id.clone());
                    staged.push(reference);
                }

                Ok::<_, Error>((staged, projects))
            })
            .await?;

        let parameters = progress
            .step(Step::ParameterMaterialization, async {
                let parameters = materialize_parameters(template.parameters(), self.traversal);
                serde_json::to_string(&parameters).map_err(|e| {
                    Error::InvalidTemplateData(format!("failed to serialize parameters: {e}"))
                })
            })
            .await?;

        let job = progress
            .step(Step::JobCreation, async {
                let request = JobRequest {
                    name: template.name().to_string(),
                    fund_code: template.fund_code().to_string(),
                    parameters,
                    template_id: questionnaire.id,
                    stage_group_id: stage_group.id,
                };

                self.service
                    .create_job(&request)
                    .await
                    .map_err(|e| Error::from(RemoteCallError::new("create job", None, e)))
            })
            .await?;

        info!("created job {id}", id = job.id);

        let mut failures = Vec::new();
        for project_id in &projects {
            debug!("granting download permission for project `{project_id}`");
            if let Err(error) = self
                .store
                .grant_download_permission(project_id, &credential.external_id)
                .await
            {
                warn!("failed to grant download permission for project `{project_id}`: {error}");
                failures.push(PermissionFailure {
                    project_id: project_id.clone(),
                    error,
                });
            }
        }

        if !failures.is_empty() {
            return Err(Error::PartialSubmission {
                job_id: job.id,
                failures,
            });
        }

        Ok(SubmittedJob {
            job_id: job.id,
            stage_group_id: stage_group.id,
            staged_files,
            projects: projects.into_iter().collect(),
        })
    }
}
