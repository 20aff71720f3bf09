//! A command line client for the Bespin workflow service.
//!
//! Jobs are described by YAML job templates. A template is created full of
//! placeholders for a workflow, filled in by hand, and then validated and
//! submitted. Submission stages the template's input files from the file
//! storage service and creates the job on the workflow service.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![warn(rust_2021_compatibility)]
#![warn(missing_debug_implementations)]
#![warn(clippy::missing_docs_in_private_items)]
#![warn(rustdoc::broken_intra_doc_links)]

pub mod api;
pub mod commands;
pub mod config;
pub mod cwl;
pub mod error;
pub mod staging;
pub mod storage;
pub mod submit;
pub mod table;
pub mod template;

pub use error::Error;
pub use error::Result;

/// Gets the user agent sent with every request.
pub fn user_agent() -> String {
    format!("bespin/{version}", version = env!("CARGO_PKG_VERSION"))
}
