//! Workflow parameter schemas.
//!
//! The service describes the parameters of a workflow as a JSON array of
//! `{name, type}` objects, where `type` is a type name or a nested type
//! object such as `{"type": "array", "items": "File"}`.

use std::collections::HashSet;

use serde_json::Value as JsonValue;

use crate::Error;
use crate::Result;

/// A declared parameter type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeDescriptor {
    /// A primitive or named type, such as `int` or `File`.
    Named(String),
    /// An array of another type.
    Array(Box<TypeDescriptor>),
}

impl TypeDescriptor {
    /// Decodes a type descriptor.
    ///
    /// Anything that is not a type name, an array object with `items`, or an
    /// object carrying a nested `type` is rejected.
    pub fn decode(value: &JsonValue) -> Result<Self> {
        match value {
            JsonValue::String(name) => Ok(Self::Named(name.clone())),
            JsonValue::Object(object) => match object.get("type") {
                Some(JsonValue::String(kind)) if kind == "array" => {
                    let items = object.get("items").ok_or_else(|| {
                        Error::InvalidSchema(String::from("array type is missing `items`"))
                    })?;
                    Ok(Self::Array(Box::new(Self::decode(items)?)))
                }
                Some(inner) => Self::decode(inner),
                None => Err(Error::InvalidSchema(format!(
                    "type object `{value}` is missing `type`"
                ))),
            },
            other => Err(Error::InvalidSchema(format!(
                "cannot interpret `{other}` as a type"
            ))),
        }
    }
}

/// A declared parameter of a workflow.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDeclaration {
    /// The name of the parameter.
    pub name: String,
    /// The type of the parameter.
    pub ty: TypeDescriptor,
}

/// The ordered parameter declarations of a workflow.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParameterSchema {
    /// The declarations in the order the workflow declares them.
    fields: Vec<FieldDeclaration>,
}

impl ParameterSchema {
    /// Creates a schema from declarations.
    ///
    /// Returns an error if two declarations share a name.
    pub fn new(fields: Vec<FieldDeclaration>) -> Result<Self> {
        let mut seen = HashSet::new();
        for field in &fields {
            if !seen.insert(field.name.as_str()) {
                return Err(Error::InvalidSchema(format!(
                    "duplicate parameter `{name}`",
                    name = field.name
                )));
            }
        }

        Ok(Self { fields })
    }

    /// Decodes a schema from a JSON array of declarations.
    pub fn from_json(value: &JsonValue) -> Result<Self> {
        let JsonValue::Array(items) = value else {
            return Err(Error::InvalidSchema(String::from(
                "expected an array of parameter declarations",
            )));
        };

        let fields = items
            .iter()
            .map(|item| {
                let name = item
                    .get("name")
                    .and_then(JsonValue::as_str)
                    .ok_or_else(|| {
                        Error::InvalidSchema(format!("declaration `{item}` has no name"))
                    })?;
                let ty = item.get("type").ok_or_else(|| {
                    Error::InvalidSchema(format!("parameter `{name}` has no type"))
                })?;

                Ok(FieldDeclaration {
                    name: name.to_string(),
                    ty: TypeDescriptor::decode(ty)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(fields)
    }

    /// Decodes a schema from JSON text, as found in a questionnaire's
    /// `user_fields_json`.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: JsonValue = serde_json::from_str(text)
            .map_err(|e| Error::InvalidSchema(format!("failed to parse JSON: {e}")))?;
        Self::from_json(&value)
    }

    /// Gets the declarations in order.
    pub fn fields(&self) -> &[FieldDeclaration] {
        &self.fields
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_declarations() {
        let schema = ParameterSchema::from_json(&json!([
            {"name": "threads", "type": "int"},
            {"name": "reads", "type": {"type": "array", "items": "File"}},
            {"name": "pairs", "type": {"type": "array", "items": {"type": "array", "items": "NamedFASTQFilePairType"}}},
            {"name": "genome", "type": {"type": "File"}},
        ]))
        .unwrap();

        let types = schema.fields().iter().map(|f| f.ty.clone()).collect::<Vec<_>>();
        assert_eq!(
            types,
            [
                TypeDescriptor::Named(String::from("int")),
                TypeDescriptor::Array(Box::new(TypeDescriptor::Named(String::from("File")))),
                TypeDescriptor::Array(Box::new(TypeDescriptor::Array(Box::new(
                    TypeDescriptor::Named(String::from("NamedFASTQFilePairType"))
                )))),
                TypeDescriptor::Named(String::from("File")),
            ]
        );
    }

    #[test]
    fn rejects_malformed_descriptors() {
        let err = ParameterSchema::from_json(&json!([{"name": "x", "type": ["null", "File"]}]))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"invalid parameter schema: cannot interpret `["null","File"]` as a type"#
        );

        let err = ParameterSchema::from_json(&json!([{"name": "x", "type": {"type": "array"}}]))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid parameter schema: array type is missing `items`"
        );

        let err = ParameterSchema::from_json(&json!([{"name": "x", "type": {"items": "int"}}]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSchema(_)));
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = ParameterSchema::from_json_str(
            r#"[{"name": "x", "type": "int"}, {"name": "x", "type": "string"}]"#,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "invalid parameter schema: duplicate parameter `x`");
    }
}
