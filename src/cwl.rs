//! Common Workflow Language (CWL) workflow documents.
//!
//! Workflow versions are registered with the workflow service from a CWL
//! document. The document's `label` carries the workflow tag and version as
//! `<tag>/<version>`, its `doc` describes the version, and its `inputs`
//! become the version's parameter schema.

use std::path::Path;

use serde_json::Map as JsonMap;
use serde_json::Value as JsonValue;
use serde_yaml_ng::Value as YamlValue;

use crate::Error;
use crate::Result;

pub mod loader;
pub mod tools;
pub mod validator;

pub use loader::WorkflowLoader;
pub use loader::WorkflowSource;
pub use loader::WorkflowType;
pub use tools::SoftwarePackage;
pub use tools::ToolDetail;
pub use tools::ToolDetailsBuilder;
pub use validator::WorkflowValidator;

/// The identifier of the main process of a packed document.
const MAIN_ID: &str = "#main";

/// The field holding the CWL version of a document.
const CWL_VERSION_KEY: &str = "cwlVersion";

/// The maximum depth of `run` references that are inlined.
const MAX_RUN_DEPTH: usize = 16;

/// Parses CWL text (YAML or JSON) into a JSON value.
fn parse_text(text: &str, origin: &Path) -> Result<JsonValue> {
    let yaml: YamlValue = serde_yaml_ng::from_str(text).map_err(|e| {
        Error::InvalidWorkflow(format!("failed to parse `{path}`: {e}", path = origin.display()))
    })?;

    let value = serde_json::to_value(yaml).map_err(|e| {
        Error::InvalidWorkflow(format!("failed to parse `{path}`: {e}", path = origin.display()))
    })?;

    if !value.is_object() {
        return Err(Error::InvalidWorkflow(format!(
            "`{path}` is not a CWL document",
            path = origin.display()
        )));
    }

    Ok(value)
}

/// Inlines the `run` references of a process's steps.
///
/// String references are resolved relative to `dir`; fragment references
/// (`#tool.cwl`) refer to other processes of a packed document and are left
/// as-is.
fn inline_runs(process: &mut JsonValue, dir: &Path, depth: usize) -> Result<()> {
    if depth > MAX_RUN_DEPTH {
        return Err(Error::InvalidWorkflow(String::from(
            "`run` references are nested too deeply",
        )));
    }

    let steps = match process.get_mut("steps") {
        Some(JsonValue::Array(steps)) => steps.iter_mut().collect::<Vec<_>>(),
        Some(JsonValue::Object(steps)) => steps.values_mut().collect(),
        _ => return Ok(()),
    };

    for step in steps {
        let Some(run) = step.get_mut("run") else {
            continue;
        };

        let inlined = match run {
            JsonValue::String(reference) if !reference.starts_with('#') => {
                Some(read_run(reference, dir, depth)?)
            }
            JsonValue::Object(_) => {
                inline_runs(run, dir, depth + 1)?;
                None
            }
            _ => None,
        };

        if let Some(inlined) = inlined {
            *run = inlined;
        }
    }

    Ok(())
}

/// Reads the document a `run` reference refers to.
fn read_run(reference: &str, dir: &Path, depth: usize) -> Result<JsonValue> {
    let path = dir.join(reference);
    let text = std::fs::read_to_string(&path).map_err(|e| {
        Error::InvalidWorkflow(format!("failed to read `{path}`: {e}", path = path.display()))
    })?;

    let mut process = parse_text(&text, &path)?;
    if let JsonValue::Object(object) = &mut process {
        object
            .entry("id")
            .or_insert_with(|| JsonValue::String(reference.to_string()));
    }

    inline_runs(&mut process, path.parent().unwrap_or(dir), depth + 1)?;
    Ok(process)
}

/// A loaded CWL document.
#[derive(Debug, Clone, PartialEq)]
pub struct CwlDocument {
    /// The main process of the document.
    main: JsonMap<String, JsonValue>,
    /// Every process of the document, including the main process.
    processes: Vec<JsonValue>,
}

impl CwlDocument {
    /// Parses a CWL document from text.
    ///
    /// Packed documents (with a `$graph`) use the process identified as
    /// `#main`; other documents are the main process themselves.
    pub fn parse_str(text: &str) -> Result<Self> {
        Self::from_value(parse_text(text, Path::new("<text>"))?)
    }

    /// Reads a CWL document from a file, inlining the documents its steps
    /// refer to.
    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidWorkflow(format!("failed to read `{path}`: {e}", path = path.display()))
        })?;

        let mut value = parse_text(&text, path)?;
        let dir = path.parent().unwrap_or(Path::new("."));
        match value.get_mut("$graph") {
            Some(JsonValue::Array(graph)) => {
                for process in graph {
                    inline_runs(process, dir, 0)?;
                }
            }
            _ => inline_runs(&mut value, dir, 0)?,
        }

        Self::from_value(value)
    }

    /// Creates a document from its JSON value.
    fn from_value(value: JsonValue) -> Result<Self> {
        let JsonValue::Object(mut root) = value else {
            return Err(Error::InvalidWorkflow(String::from(
                "the document is not a CWL object",
            )));
        };

        let Some(graph) = root.remove("$graph") else {
            return Ok(Self {
                main: root.clone(),
                processes: vec![JsonValue::Object(root)],
            });
        };

        let JsonValue::Array(processes) = graph else {
            return Err(Error::InvalidWorkflow(String::from(
                "`$graph` must be an array of processes",
            )));
        };

        let mut main = processes
            .iter()
            .filter_map(JsonValue::as_object)
            .find(|p| {
                p.get("id")
                    .and_then(JsonValue::as_str)
                    .is_some_and(|id| id == MAIN_ID || id == &MAIN_ID[1..])
            })
            .cloned()
            .ok_or_else(|| {
                Error::InvalidWorkflow(format!("packed document has no `{MAIN_ID}` process"))
            })?;

        // Packed documents declare the CWL version once, at the root.
        if let Some(version) = root.remove(CWL_VERSION_KEY) {
            main.entry(CWL_VERSION_KEY).or_insert(version);
        }

        Ok(Self { main, processes })
    }

    /// Gets a field of the main process.
    pub fn field(&self, name: &str) -> Option<&JsonValue> {
        self.main.get(name)
    }

    /// Gets a text field of the main process.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(JsonValue::as_str)
    }

    /// Gets every process of the document.
    pub fn processes(&self) -> &[JsonValue] {
        &self.processes
    }
}

/// The metadata of a workflow version extracted from its CWL document.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedWorkflow {
    /// The workflow tag, if the label has the form `<tag>/<version>`.
    pub tag: Option<String>,
    /// The version, if the label has the form `<tag>/<version>`.
    pub version: Option<String>,
    /// The description of the version.
    pub description: String,
    /// The declared inputs as a list of fields.
    pub input_fields: JsonValue,
}

impl ParsedWorkflow {
    /// Extracts the metadata from a document.
    pub fn parse(document: &CwlDocument) -> Self {
        let label = document.text("label").unwrap_or_default();
        let (tag, version) = match label.split('/').collect::<Vec<_>>()[..] {
            [tag, version] => (Some(tag.to_string()), Some(version.to_string())),
            _ => (None, None),
        };

        Self {
            tag,
            version,
            description: document.text("doc").unwrap_or_default().to_string(),
            input_fields: input_fields(document.field("inputs")),
        }
    }
}

/// Normalizes the `inputs` of a process into a list of fields.
///
/// The map form (`name: type` or `name: {type: ...}`) is converted to the
/// list form with an `id` on every field.
fn input_fields(inputs: Option<&JsonValue>) -> JsonValue {
    match inputs {
        Some(JsonValue::Array(fields)) => JsonValue::Array(fields.clone()),
        Some(JsonValue::Object(fields)) => JsonValue::Array(
            fields
                .iter()
                .map(|(id, field)| {
                    let mut object = match field {
                        JsonValue::Object(object) => object.clone(),
                        ty => {
                            let mut object = JsonMap::new();
                            object.insert(String::from("type"), ty.clone());
                            object
                        }
                    };
                    object.insert(String::from("id"), JsonValue::String(id.clone()));
                    JsonValue::Object(object)
                })
                .collect(),
        ),
        _ => JsonValue::Array(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn parses_a_plain_workflow() {
        let document = CwlDocument::parse_str(
            r#"
cwlVersion: v1.0
class: Workflow
label: exomeseq/v2
doc: Exome sequencing, version v2
inputs:
  threads: int
  reads:
    type: File
    doc: The reads
"#,
        )
        .unwrap();

        let parsed = ParsedWorkflow::parse(&document);
        assert_eq!(parsed.tag.as_deref(), Some("exomeseq"));
        assert_eq!(parsed.version.as_deref(), Some("v2"));
        assert_eq!(parsed.description, "Exome sequencing, version v2");
        assert_eq!(
            parsed.input_fields,
            json!([
                {"id": "threads", "type": "int"},
                {"type": "File", "doc": "The reads", "id": "reads"},
            ])
        );
    }

    #[test]
    fn uses_the_main_process_of_a_packed_document() {
        let document = CwlDocument::parse_str(
            r##"{
                "cwlVersion": "v1.0",
                "$graph": [
                    {"class": "CommandLineTool", "id": "#tool.cwl"},
                    {"class": "Workflow", "id": "#main", "label": "wf/v1", "inputs": []}
                ]
            }"##,
        )
        .unwrap();

        assert_eq!(document.text("class"), Some("Workflow"));
        assert_eq!(document.text("label"), Some("wf/v1"));
        assert_eq!(document.text("cwlVersion"), Some("v1.0"));
        assert_eq!(document.processes().len(), 2);
    }

    #[test]
    fn rejects_packed_document_without_main() {
        let err = CwlDocument::parse_str(r##"{"$graph": [{"id": "#other"}]}"##).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid workflow: packed document has no `#main` process"
        );
    }

    #[test]
    fn label_without_version() {
        let document = CwlDocument::parse_str("class: Workflow\nlabel: a/b/c\n").unwrap();
        let parsed = ParsedWorkflow::parse(&document);
        assert_eq!(parsed.tag, None);
        assert_eq!(parsed.version, None);
        assert_eq!(parsed.input_fields, json!([]));
    }

    #[test]
    fn inlines_step_runs() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("tools")).unwrap();
        fs::write(
            dir.path().join("workflow.cwl"),
            r#"
cwlVersion: v1.0
class: Workflow
label: wf/v1
steps:
  align:
    run: tools/align.cwl
"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("tools/align.cwl"),
            "class: CommandLineTool\nbaseCommand: bwa\n",
        )
        .unwrap();

        let document = CwlDocument::read(&dir.path().join("workflow.cwl")).unwrap();
        assert_eq!(
            document.field("steps").unwrap()["align"]["run"],
            json!({"class": "CommandLineTool", "baseCommand": "bwa", "id": "tools/align.cwl"})
        );
    }
}
