//! Validation of filled-in job templates.

use serde_json::Value as JsonValue;

use super::JobTemplate;
use super::ParameterValue;
use super::PlaceholderCatalog;
use super::Traversal;
use crate::Error;
use crate::Result;

/// Checks that a job template no longer contains placeholders.
#[derive(Debug, Clone, Copy)]
pub struct TemplateValidator<'a> {
    /// The catalog that defines the placeholders.
    catalog: &'a PlaceholderCatalog,
    /// How far into parameter values to look.
    traversal: Traversal,
}

impl<'a> TemplateValidator<'a> {
    /// Creates a new validator.
    pub fn new(catalog: &'a PlaceholderCatalog, traversal: Traversal) -> Self {
        Self { catalog, traversal }
    }

    /// Gets the paths of every field that still holds a placeholder.
    ///
    /// The paths are reported as `name`, `fund_code` and then
    /// `parameters.<name>` in document order.
    pub fn incomplete_fields(&self, template: &JobTemplate) -> Vec<String> {
        let mut fields = Vec::new();
        if self.catalog.is_placeholder_text(template.name()) {
            fields.push(String::from("name"));
        }

        if self.catalog.is_placeholder_text(template.fund_code()) {
            fields.push(String::from("fund_code"));
        }

        fields.extend(
            template
                .parameters()
                .iter()
                .filter(|(_, value)| self.contains_placeholder(value))
                .map(|(name, _)| format!("parameters.{name}")),
        );
        fields
    }

    /// Validates the template, reporting every incomplete field at once.
    pub fn validate(&self, template: &JobTemplate) -> Result<()> {
        let fields = self.incomplete_fields(template);
        if fields.is_empty() {
            Ok(())
        } else {
            Err(Error::IncompleteTemplate { fields })
        }
    }

    /// Determines if a value contains a placeholder.
    fn contains_placeholder(&self, value: &ParameterValue) -> bool {
        match value {
            ParameterValue::Scalar(JsonValue::String(s)) => self.catalog.is_placeholder_text(s),
            ParameterValue::Scalar(_) => false,
            ParameterValue::File(file) => self.catalog.is_placeholder_text(&file.path),
            ParameterValue::Sequence(items) => {
                self.traversal == Traversal::Deep
                    && items.iter().any(|v| self.contains_placeholder(v))
            }
            ParameterValue::Record(fields) => {
                self.traversal == Traversal::Deep
                    && fields.values().any(|v| self.contains_placeholder(v))
            }
        }
    }
}
