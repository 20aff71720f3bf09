//! Implementation of the `job-template` command.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use clap::Subcommand;

use super::service_client;
use crate::api::ServiceApi;
use crate::config::Config;
use crate::template::ParameterSchema;
use crate::template::PlaceholderCatalog;
use crate::template::TemplateBuilder;

/// Arguments for the `job-template` command.
#[derive(Parser, Debug)]
pub struct Args {
    /// The `job-template` subcommand.
    #[command(subcommand)]
    command: JobTemplateCommand,
}

/// Subcommands of the `job-template` command.
#[derive(Subcommand, Debug)]
enum JobTemplateCommand {
    /// Creates a job file full of placeholders for a workflow.
    ///
    /// Replace every `TODO` in the file before creating a job from it.
    #[clap(alias = "init")]
    Create {
        /// The tag of the workflow, its version and configuration
        /// (e.g. `exomeseq/v1/human`).
        tag: String,

        /// The file to write the job template to; defaults to stdout.
        #[arg(short, long, value_name = "PATH")]
        outfile: Option<PathBuf>,
    },
}

/// Runs the `job-template` command.
pub async fn job_template(args: Args, config: Config) -> anyhow::Result<()> {
    let JobTemplateCommand::Create { tag, outfile } = args.command;

    let api = service_client(&config)?;
    let questionnaire = api
        .resolve_workflow_template(&tag)
        .await
        .with_context(|| format!("failed to find the workflow for tag `{tag}`"))?;
    let schema = ParameterSchema::from_json_str(&questionnaire.user_fields_json)
        .with_context(|| format!("the workflow for tag `{tag}` has an invalid schema"))?;

    let catalog = PlaceholderCatalog::new();
    let template = TemplateBuilder::new(&catalog).build(&tag, &schema);

    match outfile {
        Some(path) => {
            template
                .write(&path)
                .with_context(|| format!("failed to write `{path}`", path = path.display()))?;
            println!("Wrote job file {path}.", path = path.display());
            println!("Edit this file filling in TODO fields then run `bespin job create`.");
        }
        None => print!("{}", template.to_yaml()?),
    }

    Ok(())
}
