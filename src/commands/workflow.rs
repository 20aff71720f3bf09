//! Implementation of the `workflow` command.

use anyhow::Context;
use clap::Parser;
use clap::Subcommand;

use super::service_client;
use crate::api::Workflow;
use crate::config::Config;
use crate::table::Table;

/// Arguments for the `workflow` command.
#[derive(Parser, Debug)]
pub struct Args {
    /// The `workflow` subcommand.
    #[command(subcommand)]
    command: WorkflowCommand,
}

/// Subcommands of the `workflow` command.
#[derive(Subcommand, Debug)]
enum WorkflowCommand {
    /// Lists the workflows.
    #[clap(alias = "ls")]
    List {
        /// Show every version of each workflow instead of only the latest.
        #[arg(long)]
        all: bool,
    },

    /// Creates a workflow.
    Create {
        /// The name of the workflow.
        #[arg(long)]
        name: String,

        /// The unique tag of the workflow.
        #[arg(long)]
        tag: String,
    },
}

/// Builds the table of workflows.
///
/// A workflow without versions is listed with an empty version column.
fn workflow_table(workflows: &[Workflow], all: bool) -> Table {
    let mut table = Table::new(&["id", "name", "tag", "version_id"]);
    for workflow in workflows {
        let versions = match (all, workflow.versions.last()) {
            (true, _) => workflow.versions.iter().map(u64::to_string).collect(),
            (false, Some(latest)) => vec![latest.to_string()],
            (false, None) => Vec::new(),
        };

        let versions = if versions.is_empty() {
            vec![String::new()]
        } else {
            versions
        };

        for version in versions {
            table.push_row(vec![
                workflow.id.to_string(),
                workflow.name.clone(),
                workflow.tag.clone(),
                version,
            ]);
        }
    }

    table
}

/// Runs the `workflow` command.
pub async fn workflow(args: Args, config: Config) -> anyhow::Result<()> {
    let api = service_client(&config)?;
    match args.command {
        WorkflowCommand::List { all } => {
            let workflows = api
                .list_workflows()
                .await
                .context("failed to list workflows")?;
            print!("{}", workflow_table(&workflows, all));
        }
        WorkflowCommand::Create { name, tag } => {
            let workflow = api
                .create_workflow(&name, &tag)
                .await
                .with_context(|| format!("failed to create workflow `{tag}`"))?;
            println!("Created workflow {id}.", id = workflow.id);
        }
    }

    Ok(())
}
