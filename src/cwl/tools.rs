//! Extraction of the tools a workflow runs.

use serde::Serialize;
use serde_json::Value as JsonValue;

use super::CwlDocument;

/// The class of tool processes.
const TOOL_CLASS: &str = "CommandLineTool";

/// The key of a software package's citation.
const CITATION_KEY: &str = "https://schema.org/citation";

/// A software package a tool uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SoftwarePackage {
    /// The name of the package.
    pub package: Option<String>,
    /// The versions of the package.
    pub versions: Vec<String>,
    /// A citation for the package.
    pub citation: Option<String>,
}

/// The details of a tool used by a workflow version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolDetail {
    /// The name of the tool.
    pub tool_name: String,
    /// The Docker images the tool runs in.
    pub docker_images: Vec<String>,
    /// The software packages the tool uses.
    pub packages: Vec<SoftwarePackage>,
}

/// Gets the requirements of a `requirements` or `hints` field.
///
/// Both the list form (`[{class: ..., ...}]`) and the map form
/// (`{<class>: {...}}`) are supported.
fn requirements(value: Option<&JsonValue>) -> Vec<(&str, &JsonValue)> {
    match value {
        Some(JsonValue::Array(items)) => items
            .iter()
            .filter_map(|r| Some((r.get("class")?.as_str()?, r)))
            .collect(),
        Some(JsonValue::Object(map)) => map.iter().map(|(k, v)| (k.as_str(), v)).collect(),
        _ => Vec::new(),
    }
}

/// Gets a list of strings from a string or list of strings.
fn strings(value: Option<&JsonValue>) -> Vec<String> {
    match value {
        Some(JsonValue::String(s)) => vec![s.clone()],
        Some(JsonValue::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

/// Builds the tool details of a workflow.
///
/// Tools are identified by their `id` with the document prefix removed; a
/// tool used by several steps is reported once.
#[derive(Debug, Clone, Default)]
pub struct ToolDetailsBuilder {
    /// The details collected so far.
    details: Vec<ToolDetail>,
}

impl ToolDetailsBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the tool details of every tool in a document.
    pub fn build(mut self, document: &CwlDocument) -> Vec<ToolDetail> {
        for process in document.processes() {
            self.visit(process);
        }

        self.details
    }

    /// Visits a value, collecting the details of every tool within it.
    fn visit(&mut self, value: &JsonValue) {
        match value {
            JsonValue::Object(object) => {
                if object.get("class").and_then(JsonValue::as_str) == Some(TOOL_CLASS) {
                    self.add_tool(value);
                }

                object.values().for_each(|v| self.visit(v));
            }
            JsonValue::Array(items) => items.iter().for_each(|v| self.visit(v)),
            _ => {}
        }
    }

    /// Adds the details of a tool if it has any and has not been seen.
    fn add_tool(&mut self, tool: &JsonValue) {
        let tool_name = tool_name(tool);
        if self.details.iter().any(|d| d.tool_name == tool_name) {
            return;
        }

        let mut docker_images = Vec::new();
        let mut packages = Vec::new();
        let all = requirements(tool.get("requirements"))
            .into_iter()
            .chain(requirements(tool.get("hints")));
        for (class, requirement) in all {
            match class {
                "DockerRequirement" => {
                    if let Some(image) = requirement.get("dockerPull").and_then(JsonValue::as_str)
                    {
                        docker_images.push(image.to_string());
                    }
                }
                "SoftwareRequirement" => {
                    let Some(JsonValue::Array(list)) = requirement.get("packages") else {
                        continue;
                    };

                    packages.extend(list.iter().map(|p| SoftwarePackage {
                        package: p.get("package").and_then(JsonValue::as_str).map(str::to_string),
                        versions: strings(p.get("version")),
                        citation: p
                            .get(CITATION_KEY)
                            .and_then(JsonValue::as_str)
                            .map(str::to_string),
                    }));
                }
                _ => {}
            }
        }

        if docker_images.is_empty() && packages.is_empty() {
            return;
        }

        self.details.push(ToolDetail {
            tool_name,
            docker_images,
            packages,
        });
    }
}

/// Gets the name of a tool from its identifier.
///
/// The `#` of a packed identifier and a leading `main/` are removed.
fn tool_name(tool: &JsonValue) -> String {
    let id = tool.get("id").and_then(JsonValue::as_str).unwrap_or_default();
    let id = id.strip_prefix('#').unwrap_or(id);
    id.strip_prefix("main/").unwrap_or(id).to_string()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn collects_tool_details() {
        let document = CwlDocument::parse_str(
            r##"{
                "cwlVersion": "v1.0",
                "$graph": [
                    {
                        "class": "CommandLineTool",
                        "id": "#bwa.cwl",
                        "requirements": [
                            {"class": "DockerRequirement", "dockerPull": "biocontainers/bwa:0.7"}
                        ],
                        "hints": [
                            {
                                "class": "SoftwareRequirement",
                                "packages": [{
                                    "package": "bwa",
                                    "version": ["0.7.17"],
                                    "https://schema.org/citation": "https://doi.org/10.1093/bioinformatics/btp324"
                                }]
                            }
                        ]
                    },
                    {
                        "class": "CommandLineTool",
                        "id": "#echo.cwl",
                        "requirements": [{"class": "InlineJavascriptRequirement"}]
                    },
                    {
                        "class": "Workflow",
                        "id": "#main",
                        "steps": [
                            {"id": "#main/align", "run": "#bwa.cwl"},
                            {"id": "#main/sort", "run": {
                                "class": "CommandLineTool",
                                "id": "#main/sort/samtools",
                                "hints": {"DockerRequirement": {"dockerPull": "samtools:1.9"}}
                            }}
                        ]
                    }
                ]
            }"##,
        )
        .unwrap();

        let details = ToolDetailsBuilder::new().build(&document);
        assert_eq!(
            details,
            [
                ToolDetail {
                    tool_name: String::from("bwa.cwl"),
                    docker_images: vec![String::from("biocontainers/bwa:0.7")],
                    packages: vec![SoftwarePackage {
                        package: Some(String::from("bwa")),
                        versions: vec![String::from("0.7.17")],
                        citation: Some(String::from(
                            "https://doi.org/10.1093/bioinformatics/btp324"
                        )),
                    }],
                },
                ToolDetail {
                    tool_name: String::from("sort/samtools"),
                    docker_images: vec![String::from("samtools:1.9")],
                    packages: Vec::new(),
                },
            ]
        );
    }

    #[test]
    fn reports_each_tool_once() {
        let document = CwlDocument::parse_str(
            r#"
class: Workflow
steps:
  first:
    run:
      class: CommandLineTool
      id: tool
      requirements:
        DockerRequirement:
          dockerPull: alpine
  second:
    run:
      class: CommandLineTool
      id: tool
      requirements:
        DockerRequirement:
          dockerPull: alpine
"#,
        )
        .unwrap();

        let details = ToolDetailsBuilder::new().build(&document);
        assert_eq!(details.len(), 1);
        assert_eq!(details[0].tool_name, "tool");
    }
}
