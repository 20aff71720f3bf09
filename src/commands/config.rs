//! Implementation of the `config` command.

use anyhow::Context;
use clap::Parser;
use clap::Subcommand;

use crate::config::Config;

/// The text shown in place of a configured token.
const REDACTED: &str = "<redacted>";

/// Arguments for the `config` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct Args {
    /// The `config` subcommand.
    #[command(subcommand)]
    command: ConfigSubcommand,
}

/// Subcommands for the `config` command.
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigSubcommand {
    /// Generates a default configuration file.
    Init,

    /// Displays the current configuration with tokens redacted.
    Resolve,
}

/// Runs the `config` command.
pub fn config(args: Args, mut config: Config) -> anyhow::Result<()> {
    let config = match args.command {
        ConfigSubcommand::Init => Config::default(),
        ConfigSubcommand::Resolve => {
            for token in [&mut config.service.token, &mut config.storage.token] {
                if !token.is_empty() {
                    *token = REDACTED.to_string();
                }
            }

            config
        }
    };

    print!(
        "{}",
        toml::to_string_pretty(&config).context("failed to serialize configuration")?
    );
    Ok(())
}
