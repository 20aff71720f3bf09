//! Validation of CWL documents published as workflow versions.

use regex::Regex;
use serde_json::Value as JsonValue;
use tracing::error;
use tracing::info;

use super::CwlDocument;
use crate::Error;
use crate::Result;

/// The required class of the main process.
const REQUIRED_CLASS: &str = "Workflow";

/// The required CWL version.
const REQUIRED_CWL_VERSION: &str = "v1.0";

/// Checks that a CWL document is suitable to publish as a workflow version.
///
/// Every check is performed; the outcome of each is recorded as either a
/// message or an error.
#[derive(Debug, Default)]
pub struct WorkflowValidator {
    /// The checks that passed.
    messages: Vec<String>,
    /// The checks that failed.
    errors: Vec<String>,
}

impl WorkflowValidator {
    /// Creates a new validator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the messages of the checks that passed.
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// Gets the errors of the checks that failed.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Validates a document against the expected version.
    ///
    /// A missing version means the label did not have the form
    /// `<tag>/<version>`.
    pub fn validate(&mut self, document: &CwlDocument, expected_version: Option<&str>) {
        self.check_value(document, "class", REQUIRED_CLASS);
        self.check_value(document, "cwlVersion", REQUIRED_CWL_VERSION);

        let Some(version) = expected_version else {
            self.check_exists(document, "label");
            self.errors
                .push(String::from("Field 'label' must have the form '<tag>/<version>'"));
            return;
        };

        let version = regex::escape(version);
        self.check_pattern(document, "label", &format!(r"\S.*/{version}$"));
        self.check_pattern(document, "doc", &version);
    }

    /// Logs the outcome of every check, failing if any check failed.
    pub fn report(&self) -> Result<()> {
        for message in &self.messages {
            info!("{message}");
        }

        for e in &self.errors {
            error!("{e}");
        }

        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(Error::InvalidWorkflow(self.errors.join("\n")))
        }
    }

    /// Checks that a field exists.
    fn check_exists(&mut self, document: &CwlDocument, name: &str) {
        if document.field(name).is_some() {
            self.messages.push(format!("Field '{name}' exists"));
        } else {
            self.errors
                .push(format!("Field '{name}' was not found in your CWL file"));
        }
    }

    /// Checks that a field has a value.
    fn check_value(&mut self, document: &CwlDocument, name: &str, value: &str) {
        self.check_exists(document, name);
        if document.field(name) == Some(&JsonValue::String(value.to_string())) {
            self.messages
                .push(format!("Field '{name}' has required value '{value}'"));
        } else {
            self.errors
                .push(format!("Field '{name}' must have a value of '{value}'"));
        }
    }

    /// Checks that a text field matches a pattern.
    fn check_pattern(&mut self, document: &CwlDocument, name: &str, pattern: &str) {
        self.check_exists(document, name);
        let matched = match (Regex::new(pattern), document.text(name)) {
            (Ok(regex), Some(text)) => regex.is_match(text),
            _ => false,
        };

        if matched {
            self.messages
                .push(format!("Field '{name}' has required pattern '{pattern}'"));
        } else {
            self.errors
                .push(format!("Field '{name}' must have a pattern '{pattern}'"));
        }
    }
}
