//! Creation of job templates filled with placeholders.

use super::JobTemplate;
use super::ParameterSchema;
use super::ParameterValue;
use super::Parameters;
use super::PlaceholderCatalog;
use super::TypeDescriptor;
use super::catalog::SCALAR_PLACEHOLDER;

/// Builds placeholder job templates from parameter schemas.
#[derive(Debug, Clone, Copy)]
pub struct TemplateBuilder<'a> {
    /// The catalog the placeholders are drawn from.
    catalog: &'a PlaceholderCatalog,
}

impl<'a> TemplateBuilder<'a> {
    /// Creates a new template builder.
    pub fn new(catalog: &'a PlaceholderCatalog) -> Self {
        Self { catalog }
    }

    /// Builds a job template for the given workflow tag in which every field
    /// is a placeholder.
    pub fn build(&self, workflow_tag: &str, schema: &ParameterSchema) -> JobTemplate {
        let parameters = schema
            .fields()
            .iter()
            .map(|field| (field.name.clone(), self.placeholder(&field.ty)))
            .collect::<Parameters>();

        JobTemplate::new(
            workflow_tag,
            SCALAR_PLACEHOLDER,
            SCALAR_PLACEHOLDER,
            parameters,
        )
    }

    /// Computes the placeholder for a type.
    ///
    /// Arrays hold a single example element rather than being empty.
    fn placeholder(&self, ty: &TypeDescriptor) -> ParameterValue {
        match ty {
            TypeDescriptor::Named(name) => self.catalog.placeholder_for_type(name),
            TypeDescriptor::Array(items) => ParameterValue::Sequence(vec![self.placeholder(items)]),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn builds_placeholders_in_schema_order() {
        let catalog = PlaceholderCatalog::new();
        let schema = ParameterSchema::from_json(&json!([
            {"name": "threads", "type": "int"},
            {"name": "reads", "type": {"type": "array", "items": "File"}},
            {"name": "genome", "type": "File"},
            {"name": "samples", "type": {"type": "array", "items": "NamedFASTQFilePairType"}},
            {"name": "nested", "type": {"type": "array", "items": {"type": "array", "items": "string"}}},
        ]))
        .unwrap();

        let template = TemplateBuilder::new(&catalog).build("rnaseq/v1/human", &schema);
        assert_eq!(template.workflow_tag(), "rnaseq/v1/human");
        assert_eq!(template.name(), "TODO");
        assert_eq!(template.fund_code(), "TODO");
        assert_eq!(
            serde_json::to_value(template.parameters()).unwrap(),
            json!({
                "threads": "TODO",
                "reads": [{"class": "File", "path": "dds://TODO_PROJECT_NAME/TODO_FILE_PATH"}],
                "genome": {"class": "File", "path": "dds://TODO_PROJECT_NAME/TODO_FILE_PATH"},
                "samples": [{
                    "name": "TODO",
                    "file1": {"class": "File", "path": "dds://TODO_PROJECT_NAME/TODO_FILE_PATH"},
                    "file2": {"class": "File", "path": "dds://TODO_PROJECT_NAME/TODO_FILE_PATH"},
                }],
                "nested": [["TODO"]],
            })
        );
        assert_eq!(
            template.parameters().keys().collect::<Vec<_>>(),
            ["threads", "reads", "genome", "samples", "nested"]
        );
    }

    #[test]
    fn renders_yaml() {
        let catalog = PlaceholderCatalog::new();
        let schema =
            ParameterSchema::from_json_str(r#"[{"name": "count", "type": "int"}]"#).unwrap();
        let yaml = TemplateBuilder::new(&catalog)
            .build("wf/v1", &schema)
            .to_yaml()
            .unwrap();
        assert_eq!(
            yaml,
            "workflow_tag: wf/v1\nname: TODO\nfund_code: TODO\nparameters:\n  count: TODO\n"
        );
    }
}
