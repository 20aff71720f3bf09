//! The bespin command line tool.

use std::io::IsTerminal;
use std::io::stderr;
use std::path::Path;
use std::path::PathBuf;

use bespin::commands;
use bespin::config::Config;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use clap_verbosity_flag::Verbosity;
use colored::Colorize;
use git_testament::git_testament;
use git_testament::render_testament;
use tracing_log::AsTrace;

git_testament!(TESTAMENT);

#[derive(Subcommand)]
enum Commands {
    /// Lists and creates workflows.
    #[clap(alias = "wf")]
    Workflow(commands::workflow::Args),

    /// Registers workflow versions from CWL documents.
    #[clap(alias = "wfv")]
    WorkflowVersion(commands::workflow_version::Args),

    /// Creates job files for workflows.
    #[clap(alias = "jt")]
    JobTemplate(commands::job_template::Args),

    /// Creates, starts and manages jobs.
    #[clap(alias = "j")]
    Job(commands::job::Args),

    /// Displays or initializes the configuration.
    Config(commands::config::Args),

    /// Generates shell completions.
    Completions(commands::completions::Args),
}

#[derive(Parser)]
#[command(author, version = render_testament!(TESTAMENT), propagate_version = true, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// The configuration file to use instead of `~/.bespin.toml`.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(flatten)]
    verbose: Verbosity,
}

/// Loads and validates the configuration.
fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config = Config::load(path)?;
    config.validate()?;
    Ok(config)
}

pub async fn inner() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_log::LogTracer::init()?;

    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_max_level(cli.verbose.log_level_filter().as_trace())
        .with_writer(std::io::stderr)
        .with_ansi(stderr().is_terminal())
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Workflow(args) => commands::workflow::workflow(args, load_config(config)?).await,
        Commands::WorkflowVersion(args) => {
            commands::workflow_version::workflow_version(args, load_config(config)?).await
        }
        Commands::JobTemplate(args) => {
            commands::job_template::job_template(args, load_config(config)?).await
        }
        Commands::Job(args) => commands::job::job(args, load_config(config)?).await,
        Commands::Config(args) => commands::config::config(args, load_config(config)?),
        Commands::Completions(args) => {
            commands::completions::completions(args, &mut Cli::command())
        }
    }
}

#[tokio::main]
pub async fn main() {
    if let Err(e) = inner().await {
        eprintln!(
            "{error}: {e:?}",
            error = if std::io::stderr().is_terminal() {
                "error".red().bold()
            } else {
                "error".normal()
            }
        );
        std::process::exit(1);
    }
}
