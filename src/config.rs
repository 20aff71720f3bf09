//! Implementation of the configuration module.

use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use serde::Deserialize;
use serde::Serialize;

use crate::template::Traversal;

/// The name of the configuration file in the user's home directory.
pub const CONFIG_FILE_NAME: &str = ".bespin.toml";

/// The prefix of environment variables that override configuration values.
pub const ENV_PREFIX: &str = "BESPIN";

/// The default request timeout, in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Represents the configuration for the `bespin` CLI tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct Config {
    /// Configuration for the workflow service.
    #[serde(default)]
    pub service: ServiceConfig,
    /// Configuration for the file storage service.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Configuration for job template handling.
    #[serde(default)]
    pub template: TemplateConfig,
}

/// Represents the configuration of the workflow service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct ServiceConfig {
    /// The base URL of the service API.
    #[serde(default)]
    pub url: String,
    /// The API token of the user.
    #[serde(default)]
    pub token: String,
    /// The request timeout, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            token: String::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Represents the configuration of the file storage service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct StorageConfig {
    /// The base URL of the storage API.
    #[serde(default)]
    pub url: String,
    /// The API token of the user.
    #[serde(default)]
    pub token: String,
    /// The request timeout, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            token: String::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Represents the configuration of job template handling.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct TemplateConfig {
    /// Look for placeholders and files inside arrays and records.
    #[serde(default)]
    pub deep_traversal: bool,
}

impl TemplateConfig {
    /// Gets the traversal mode selected by the configuration.
    pub fn traversal(&self) -> Traversal {
        Traversal::from_deep(self.deep_traversal)
    }
}

/// Gets the default request timeout.
fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Config {
    /// Gets the default location of the configuration file.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(CONFIG_FILE_NAME))
    }

    /// Loads the configuration.
    ///
    /// Values are layered: the defaults, then the configuration file, then
    /// `BESPIN_*` environment variables (e.g. `BESPIN_SERVICE__URL`). An
    /// explicitly given file must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = ::config::Config::builder();

        match path {
            Some(path) => {
                if !path.is_file() {
                    bail!("configuration file `{path}` does not exist", path = path.display());
                }

                builder = builder.add_source(::config::File::from(path).required(true));
            }
            None => {
                if let Some(path) = Self::default_path() {
                    builder = builder.add_source(::config::File::from(path).required(false));
                }
            }
        }

        builder
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("failed to read configuration")?
            .try_deserialize()
            .context("failed to parse configuration")
    }

    /// Validate a configuration
    pub fn validate(&self) -> Result<()> {
        if self.service.timeout_secs == 0 || self.storage.timeout_secs == 0 {
            bail!("request timeouts must be greater than zero");
        }

        Ok(())
    }

    /// Validates the settings needed to talk to the workflow service.
    pub fn validate_service(&self) -> Result<()> {
        if self.service.url.is_empty() {
            bail!(
                "the workflow service URL is not configured: set `service.url` in \
                 `~/{CONFIG_FILE_NAME}` or `{ENV_PREFIX}_SERVICE__URL`"
            );
        }

        if self.service.token.is_empty() {
            bail!(
                "the workflow service token is not configured: set `service.token` in \
                 `~/{CONFIG_FILE_NAME}` or `{ENV_PREFIX}_SERVICE__TOKEN`"
            );
        }

        Ok(())
    }

    /// Validates the settings needed to talk to the file storage service.
    pub fn validate_storage(&self) -> Result<()> {
        if self.storage.url.is_empty() {
            bail!(
                "the storage service URL is not configured: set `storage.url` in \
                 `~/{CONFIG_FILE_NAME}` or `{ENV_PREFIX}_STORAGE__URL`"
            );
        }

        if self.storage.token.is_empty() {
            bail!(
                "the storage service token is not configured: set `storage.token` in \
                 `~/{CONFIG_FILE_NAME}` or `{ENV_PREFIX}_STORAGE__TOKEN`"
            );
        }

        Ok(())
    }
}
