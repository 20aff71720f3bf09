//! Implementation of the `job` command.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use clap::Subcommand;

use super::read_template;
use super::service_client;
use super::storage_client;
use crate::api::BespinApi;
use crate::api::Job;
use crate::api::ServiceApi;
use crate::config::Config;
use crate::submit::JobSubmission;
use crate::submit::dry_run;
use crate::table::Table;
use crate::template::JobTemplate;
use crate::template::PlaceholderCatalog;
use crate::template::Traversal;

/// Options for reading a job file.
#[derive(Parser, Debug)]
pub struct JobFileArgs {
    /// The job file to read.
    #[arg(value_name = "PATH")]
    file: PathBuf,

    /// Look for placeholders and input files inside arrays and records.
    #[arg(long)]
    deep: bool,
}

impl JobFileArgs {
    /// Gets the traversal mode for the arguments and configuration.
    fn traversal(&self, config: &Config) -> Traversal {
        Traversal::from_deep(self.deep || config.template.deep_traversal)
    }

    /// Reads the job file and checks it is complete.
    ///
    /// This happens before any client is created so an incomplete file is
    /// reported as such even when the services are not configured.
    fn read_complete(&self, config: &Config) -> anyhow::Result<(JobTemplate, Traversal)> {
        let template = read_template(&self.file)?;
        let traversal = self.traversal(config);
        dry_run(&template, &PlaceholderCatalog::new(), traversal)?;
        Ok((template, traversal))
    }
}

/// Arguments for the `job` command.
#[derive(Parser, Debug)]
pub struct Args {
    /// The `job` subcommand.
    #[command(subcommand)]
    command: JobCommand,
}

/// Subcommands of the `job` command.
#[derive(Subcommand, Debug)]
enum JobCommand {
    /// Lists the jobs.
    #[clap(alias = "ls")]
    List,

    /// Creates a job from a job file.
    Create {
        /// The job file.
        #[command(flatten)]
        job_file: JobFileArgs,

        /// Validate the job file without creating the job.
        #[arg(long)]
        dry_run: bool,
    },

    /// Validates a job file without creating the job.
    Validate {
        /// The job file.
        #[command(flatten)]
        job_file: JobFileArgs,
    },

    /// Creates a job from a job file and starts it.
    Run {
        /// The job file.
        #[command(flatten)]
        job_file: JobFileArgs,

        /// The token that authorizes the job to run.
        #[arg(long)]
        token: Option<String>,
    },

    /// Starts a job.
    Start {
        /// The identifier of the job.
        job_id: u64,

        /// The token that authorizes the job to run.
        #[arg(long)]
        token: Option<String>,
    },

    /// Cancels a running job.
    Cancel {
        /// The identifier of the job.
        job_id: u64,
    },

    /// Restarts a job that is not running.
    Restart {
        /// The identifier of the job.
        job_id: u64,
    },

    /// Deletes a job.
    Delete {
        /// The identifier of the job.
        job_id: u64,
    },
}

/// Builds the table of jobs.
fn job_table(jobs: &[Job]) -> Table {
    let mut table = Table::new(&[
        "id",
        "name",
        "state",
        "step",
        "fund_code",
        "created",
        "last_updated",
    ]);
    for job in jobs {
        table.push_row(vec![
            job.id.to_string(),
            job.name.clone(),
            job.state.clone().unwrap_or_default(),
            job.step.clone().unwrap_or_default(),
            job.fund_code.clone().unwrap_or_default(),
            job.created.clone().unwrap_or_default(),
            job.last_updated.clone().unwrap_or_default(),
        ]);
    }

    table
}

/// Validates a job file, printing the files it would stage.
fn validate(template: &JobTemplate, traversal: Traversal) -> anyhow::Result<()> {
    let catalog = PlaceholderCatalog::new();
    let plan = dry_run(template, &catalog, traversal)?;
    for file in &plan.files {
        println!("{uri} -> {name}", uri = file.uri, name = file.staging_name);
    }

    println!("Job file is valid.");
    Ok(())
}

/// Creates a job from a job file, returning its identifier.
async fn create(
    api: &BespinApi,
    template: &JobTemplate,
    config: &Config,
    traversal: Traversal,
) -> anyhow::Result<u64> {
    let store = storage_client(config)?;
    let catalog = PlaceholderCatalog::new();
    let job = JobSubmission::new(api, &store, &catalog, traversal)
        .submit(template)
        .await?;
    println!("Created job {id}.", id = job.job_id);
    Ok(job.job_id)
}

/// Authorizes a job if a token is given, then starts it.
async fn start(api: &BespinApi, job_id: u64, token: Option<&str>) -> anyhow::Result<()> {
    if let Some(token) = token {
        api.authorize_job(job_id, token)
            .await
            .context("failed to set the run token")?;
        println!("Set run token for job {job_id}.");
    }

    api.start_job(job_id)
        .await
        .context("failed to start the job")?;
    println!("Started job {job_id}.");
    Ok(())
}

/// Runs the `job` command.
pub async fn job(args: Args, config: Config) -> anyhow::Result<()> {
    match args.command {
        JobCommand::Validate { job_file } => {
            let template = read_template(&job_file.file)?;
            validate(&template, job_file.traversal(&config))
        }
        JobCommand::Create {
            job_file,
            dry_run: true,
        } => {
            let template = read_template(&job_file.file)?;
            validate(&template, job_file.traversal(&config))
        }
        JobCommand::Create {
            job_file,
            dry_run: false,
        } => {
            let (template, traversal) = job_file.read_complete(&config)?;
            let api = service_client(&config)?;
            create(&api, &template, &config, traversal).await?;
            Ok(())
        }
        JobCommand::Run { job_file, token } => {
            let (template, traversal) = job_file.read_complete(&config)?;
            let api = service_client(&config)?;
            let job_id = create(&api, &template, &config, traversal).await?;
            start(&api, job_id, token.as_deref()).await
        }
        JobCommand::List => {
            let api = service_client(&config)?;
            let jobs = api.list_jobs().await.context("failed to list jobs")?;
            print!("{}", job_table(&jobs));
            Ok(())
        }
        JobCommand::Start { job_id, token } => {
            let api = service_client(&config)?;
            start(&api, job_id, token.as_deref()).await
        }
        JobCommand::Cancel { job_id } => {
            let api = service_client(&config)?;
            api.cancel_job(job_id).await?;
            println!("Canceled job {job_id}.");
            Ok(())
        }
        JobCommand::Restart { job_id } => {
            let api = service_client(&config)?;
            api.restart_job(job_id).await?;
            println!("Restarted job {job_id}.");
            Ok(())
        }
        JobCommand::Delete { job_id } => {
            let api = service_client(&config)?;
            api.delete_job(job_id).await?;
            println!("Deleted job {job_id}.");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn lists_jobs() {
        let jobs = [Job {
            id: 3,
            name: String::from("exome"),
            state: Some(String::from("R")),
            step: None,
            fund_code: Some(String::from("001")),
            created: None,
            last_updated: None,
        }];

        assert_eq!(
            job_table(&jobs).to_string(),
            "Id  Name   State  Step  Fund Code  Created  Last Updated\n\
             --  -----  -----  ----  ---------  -------  ------------\n\
             3   exome  R            001\n"
        );
    }
}
