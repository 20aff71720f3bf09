//! Implementation of bespin CLI commands.

use std::path::Path;

use anyhow::Context;

use crate::api::BespinApi;
use crate::config::Config;
use crate::storage::DukeDsStore;
use crate::template::JobTemplate;
use crate::user_agent;

pub mod completions;
pub mod config;
pub mod job;
pub mod job_template;
pub mod workflow;
pub mod workflow_version;

/// Creates a client for the workflow service.
pub fn service_client(config: &Config) -> anyhow::Result<BespinApi> {
    config.validate_service()?;
    BespinApi::new(&config.service, &user_agent()).context("failed to create the service client")
}

/// Creates a client for the file storage service.
pub fn storage_client(config: &Config) -> anyhow::Result<DukeDsStore> {
    config.validate_storage()?;
    DukeDsStore::new(&config.storage, &user_agent()).context("failed to create the storage client")
}

/// Reads a job template file.
pub fn read_template(path: &Path) -> anyhow::Result<JobTemplate> {
    JobTemplate::read(path)
        .with_context(|| format!("failed to read job file `{path}`", path = path.display()))
}
