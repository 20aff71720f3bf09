//! Job template documents.
//!
//! A job template is the user-editable file that instantiates a workflow's
//! questionnaire. It is created full of placeholders by [`TemplateBuilder`],
//! edited by hand, and then loaded, validated and submitted.

use std::ffi::OsStr;
use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value as JsonValue;
use serde_yaml_ng::Value as YamlValue;

use crate::Error;
use crate::Result;

pub mod builder;
pub mod catalog;
pub mod schema;
pub mod validator;
pub mod value;

pub use builder::TemplateBuilder;
pub use catalog::PlaceholderCatalog;
pub use schema::FieldDeclaration;
pub use schema::ParameterSchema;
pub use schema::TypeDescriptor;
pub use validator::TemplateValidator;
pub use value::FileRef;
pub use value::ParameterValue;

/// The parameters of a job template, in document order.
pub type Parameters = IndexMap<String, ParameterValue>;

/// How far validation and file collection look into parameter values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Traversal {
    /// Only top-level parameter values are inspected.
    ///
    /// Placeholders and `File` values inside sequences or records are not
    /// seen.
    #[default]
    Shallow,
    /// Sequences and records are inspected recursively.
    Deep,
}

impl Traversal {
    /// Gets the traversal mode for a "deep" flag.
    pub fn from_deep(deep: bool) -> Self {
        if deep { Self::Deep } else { Self::Shallow }
    }
}

/// The supported on-disk formats of a job template.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    /// The template is a JSON document.
    Json,
    /// The template is a YAML document.
    Yaml,
}

impl Format {
    /// Determines the format from a file's extension, defaulting to YAML.
    fn from_path(path: &Path) -> Self {
        match path.extension().and_then(OsStr::to_str) {
            Some("json") => Self::Json,
            _ => Self::Yaml,
        }
    }
}

/// The raw shape of a template document before its values are decoded.
#[derive(Debug, Deserialize)]
struct RawJobTemplate {
    /// The workflow tag.
    workflow_tag: JsonValue,
    /// The job name.
    name: JsonValue,
    /// The fund code.
    fund_code: JsonValue,
    /// The job parameters.
    #[serde(alias = "job_order")]
    parameters: serde_json::Map<String, JsonValue>,
}

/// A job template document.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct JobTemplate {
    /// Identifies the workflow, version and configuration to run.
    workflow_tag: String,
    /// The human readable label for the job.
    name: String,
    /// The billing code for the job.
    fund_code: String,
    /// The values for the workflow's declared parameters.
    parameters: Parameters,
}

impl JobTemplate {
    /// Creates a new job template.
    pub fn new(
        workflow_tag: impl Into<String>,
        name: impl Into<String>,
        fund_code: impl Into<String>,
        parameters: Parameters,
    ) -> Self {
        Self {
            workflow_tag: workflow_tag.into(),
            name: name.into(),
            fund_code: fund_code.into(),
            parameters,
        }
    }

    /// Gets the workflow tag.
    pub fn workflow_tag(&self) -> &str {
        &self.workflow_tag
    }

    /// Gets the job name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the fund code.
    pub fn fund_code(&self) -> &str {
        &self.fund_code
    }

    /// Gets the job parameters in document order.
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Decodes a job template from a generic JSON document tree.
    ///
    /// Every parameter value is decoded into a [`ParameterValue`]; an object
    /// with an unrecognized `class` anywhere in the parameters is rejected
    /// here, before any validation takes place.
    pub fn from_json(value: JsonValue) -> Result<Self> {
        let raw: RawJobTemplate = serde_json::from_value(value)
            .map_err(|e| Error::InvalidTemplateData(e.to_string()))?;

        let parameters = raw
            .parameters
            .into_iter()
            .map(|(key, value)| {
                let value = ParameterValue::decode(value).map_err(|e| match e {
                    Error::InvalidTemplateData(msg) => {
                        Error::InvalidTemplateData(format!("{msg} in parameter `{key}`"))
                    }
                    e => e,
                })?;
                Ok((key, value))
            })
            .collect::<Result<Parameters>>()?;

        Ok(Self {
            workflow_tag: text_field("workflow_tag", raw.workflow_tag)?,
            name: text_field("name", raw.name)?,
            fund_code: text_field("fund_code", raw.fund_code)?,
            parameters,
        })
    }

    /// Parses a job template from YAML text.
    ///
    /// As JSON is a subset of YAML, this also accepts JSON text.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let yaml: YamlValue = serde_yaml_ng::from_str(text)
            .map_err(|e| Error::InvalidTemplateData(format!("failed to parse YAML: {e}")))?;
        if !matches!(yaml, YamlValue::Mapping(_)) {
            return Err(Error::InvalidTemplateData(String::from(
                "the job template did not contain a map at the root",
            )));
        }

        let value = serde_json::to_value(yaml)
            .map_err(|e| Error::InvalidTemplateData(e.to_string()))?;
        Self::from_json(value)
    }

    /// Reads a job template from a file.
    ///
    /// Files ending in `.json` are read as JSON; everything else as YAML.
    pub fn read(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        match Format::from_path(path) {
            Format::Json => {
                let value: JsonValue = serde_json::from_str(&contents).map_err(|e| {
                    Error::InvalidTemplateData(format!("failed to parse JSON: {e}"))
                })?;
                Self::from_json(value)
            }
            Format::Yaml => Self::from_yaml_str(&contents),
        }
    }

    /// Renders the job template as YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml_ng::to_string(self).map_err(|e| Error::InvalidTemplateData(e.to_string()))
    }

    /// Writes the job template to a file in the format implied by its
    /// extension.
    pub fn write(&self, path: &Path) -> Result<()> {
        let contents = match Format::from_path(path) {
            Format::Json => serde_json::to_string_pretty(self)
                .map_err(|e| Error::InvalidTemplateData(e.to_string()))?,
            Format::Yaml => self.to_yaml()?,
        };
        std::fs::write(path, contents)?;
        Ok(())
    }
}

/// Converts a top-level scalar field to text.
///
/// YAML readily turns values such as `001` into numbers, so numbers and
/// booleans are accepted and rendered as text.
fn text_field(field: &str, value: JsonValue) -> Result<String> {
    match value {
        JsonValue::String(s) => Ok(s),
        JsonValue::Number(n) => Ok(n.to_string()),
        JsonValue::Bool(b) => Ok(b.to_string()),
        _ => Err(Error::InvalidTemplateData(format!(
            "field `{field}` must be a string"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_yaml_document() {
        let template = JobTemplate::from_yaml_str(
            r#"
workflow_tag: rnaseq/v1/human
name: myjob
fund_code: '001'
parameters:
  threads: 4
  reads:
    class: File
    path: dds://project/reads.fastq
"#,
        )
        .unwrap();

        assert_eq!(template.workflow_tag(), "rnaseq/v1/human");
        assert_eq!(template.name(), "myjob");
        assert_eq!(template.fund_code(), "001");
        assert_eq!(
            template.parameters().keys().collect::<Vec<_>>(),
            ["threads", "reads"]
        );
        assert_eq!(
            template.parameters()["reads"],
            ParameterValue::File(FileRef::new("dds://project/reads.fastq"))
        );
    }

    #[test]
    fn accepts_job_order_alias() {
        let template = JobTemplate::from_json(json!({
            "workflow_tag": "exome/v1",
            "name": "job",
            "fund_code": 123,
            "job_order": { "count": 1 }
        }))
        .unwrap();

        assert_eq!(template.fund_code(), "123");
        assert_eq!(template.parameters().len(), 1);
    }

    #[test]
    fn unknown_class_is_rejected_at_load() {
        let err = JobTemplate::from_json(json!({
            "workflow_tag": "exome/v1",
            "name": "TODO",
            "fund_code": "TODO",
            "parameters": {
                "strange": { "class": "StrangeData", "path": "x" }
            }
        }))
        .unwrap_err();

        assert_eq!(
            err.to_string(),
            "invalid template data: unknown class `StrangeData` in parameter `strange`"
        );
    }

    #[test]
    fn rejects_missing_fields_and_non_map_roots() {
        let err = JobTemplate::from_json(json!({ "name": "job" })).unwrap_err();
        assert!(matches!(err, Error::InvalidTemplateData(_)));

        let err = JobTemplate::from_yaml_str("- a\n- b\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid template data: the job template did not contain a map at the root"
        );
    }

    #[test]
    fn write_then_read_preserves_document() {
        let mut parameters = Parameters::new();
        parameters.insert(String::from("count"), ParameterValue::Scalar(json!(3)));
        parameters.insert(
            String::from("reads"),
            ParameterValue::Sequence(vec![ParameterValue::File(FileRef::new(
                "dds://project/a.fastq",
            ))]),
        );
        let template = JobTemplate::new("wf/v1", "job", "fund", parameters);

        let dir = tempfile::tempdir().unwrap();
        for file in ["job.yml", "job.json"] {
            let path = dir.path().join(file);
            template.write(&path).unwrap();
            assert_eq!(JobTemplate::read(&path).unwrap(), template);
        }
    }
}
