//! Implementation of the `workflow-version` command.

use anyhow::Context;
use anyhow::bail;
use clap::Parser;
use clap::Subcommand;
use tracing::info;

use super::service_client;
use crate::api::WorkflowVersionRequest;
use crate::config::Config;
use crate::cwl::CwlDocument;
use crate::cwl::ParsedWorkflow;
use crate::cwl::ToolDetailsBuilder;
use crate::cwl::WorkflowLoader;
use crate::cwl::WorkflowSource;
use crate::cwl::WorkflowType;
use crate::cwl::WorkflowValidator;
use crate::user_agent;

/// The workflow path of packed workflows.
const PACKED_WORKFLOW_PATH: &str = "#main";

/// The location of a published CWL workflow.
#[derive(Parser, Debug)]
pub struct SourceArgs {
    /// The URL (or local path) of the packed workflow or zip archive.
    #[arg(long)]
    url: String,

    /// How the workflow is packaged.
    #[arg(long = "type", value_enum, default_value_t = WorkflowType::Packed)]
    workflow_type: WorkflowType,

    /// The path of the workflow document within a zip archive.
    #[arg(long, required_if_eq("workflow_type", "zipped"))]
    path: Option<String>,
}

impl SourceArgs {
    /// Converts the arguments into a workflow source.
    fn into_source(self, version_info_url: Option<String>) -> WorkflowSource {
        let workflow_path = match self.workflow_type {
            WorkflowType::Packed => PACKED_WORKFLOW_PATH.to_string(),
            WorkflowType::Zipped => self.path.unwrap_or_default(),
        };

        WorkflowSource {
            url: self.url,
            workflow_type: self.workflow_type,
            workflow_path,
            version_info_url,
        }
    }
}

/// Arguments for the `workflow-version` command.
#[derive(Parser, Debug)]
pub struct Args {
    /// The `workflow-version` subcommand.
    #[command(subcommand)]
    command: WorkflowVersionCommand,
}

/// Subcommands of the `workflow-version` command.
#[derive(Subcommand, Debug)]
enum WorkflowVersionCommand {
    /// Registers a new version of a workflow from a CWL document.
    ///
    /// The workflow is identified by the tag in the document's `label`, which
    /// must have the form `<tag>/<version>`.
    Create {
        /// Where the workflow is published.
        #[command(flatten)]
        source: SourceArgs,

        /// A URL describing the version.
        #[arg(long)]
        info_url: Option<String>,

        /// Skip validation of the CWL document.
        #[arg(long)]
        no_validate: bool,
    },

    /// Validates a CWL document without registering it.
    Validate {
        /// Where the workflow is published.
        #[command(flatten)]
        source: SourceArgs,

        /// The expected version; defaults to the version in the label.
        #[arg(long)]
        expected_version: Option<String>,
    },

    /// Records the tools used by a registered workflow version.
    ToolDetails {
        /// Where the workflow is published.
        #[command(flatten)]
        source: SourceArgs,
    },
}

/// Loads a workflow document from its source.
async fn load(source: &WorkflowSource) -> anyhow::Result<CwlDocument> {
    WorkflowLoader::new(&user_agent())?
        .load(source)
        .await
        .with_context(|| format!("failed to load workflow `{url}`", url = source.url))
}

/// Validates a document, logging the outcome of every check.
fn validate(document: &CwlDocument, expected_version: Option<&str>) -> anyhow::Result<()> {
    let mut validator = WorkflowValidator::new();
    validator.validate(document, expected_version);
    Ok(validator.report()?)
}

/// Gets the tag and version of a parsed workflow.
fn tag_and_version(parsed: &ParsedWorkflow) -> anyhow::Result<(&str, &str)> {
    match (&parsed.tag, &parsed.version) {
        (Some(tag), Some(version)) => Ok((tag.as_str(), version.as_str())),
        _ => bail!("the workflow `label` must have the form `<tag>/<version>`"),
    }
}

/// Runs the `workflow-version` command.
pub async fn workflow_version(args: Args, config: Config) -> anyhow::Result<()> {
    match args.command {
        WorkflowVersionCommand::Create {
            source,
            info_url,
            no_validate,
        } => {
            let api = service_client(&config)?;
            let source = source.into_source(info_url);
            let document = load(&source).await?;
            let parsed = ParsedWorkflow::parse(&document);
            if !no_validate {
                validate(&document, parsed.version.as_deref())?;
            }

            let (tag, version) = tag_and_version(&parsed)?;
            let workflow = api
                .workflow_for_tag(tag)
                .await
                .with_context(|| format!("failed to find workflow `{tag}`"))?;

            let request = WorkflowVersionRequest {
                workflow: workflow.id,
                version: version.to_string(),
                workflow_type: source.workflow_type.to_string(),
                description: parsed.description.clone(),
                workflow_path: source.workflow_path.clone(),
                url: source.url.clone(),
                version_info_url: source.version_info_url.clone(),
                fields: parsed.input_fields.clone(),
            };

            let created = api
                .create_workflow_version(&request)
                .await
                .with_context(|| format!("failed to create version `{version}` of `{tag}`"))?;
            println!("Created workflow version {id}.", id = created.id);
        }
        WorkflowVersionCommand::Validate {
            source,
            expected_version,
        } => {
            let document = load(&source.into_source(None)).await?;
            let parsed = ParsedWorkflow::parse(&document);
            validate(
                &document,
                expected_version.as_deref().or(parsed.version.as_deref()),
            )?;
            println!("Workflow is valid.");
        }
        WorkflowVersionCommand::ToolDetails { source } => {
            let api = service_client(&config)?;
            let document = load(&source.into_source(None)).await?;
            let parsed = ParsedWorkflow::parse(&document);
            let (tag, version) = tag_and_version(&parsed)?;
            let details = ToolDetailsBuilder::new().build(&document);
            info!("found {count} tool(s) with details", count = details.len());

            let workflow_version = api
                .find_workflow_version(tag, version)
                .await
                .with_context(|| format!("failed to find version `{version}` of `{tag}`"))?;
            api.create_tool_details(workflow_version.id, &details)
                .await
                .context("failed to record tool details")?;
            println!(
                "Recorded details of {count} tool(s) for workflow version {id}.",
                count = details.len(),
                id = workflow_version.id
            );
        }
    }

    Ok(())
}
