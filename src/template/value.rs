//! Decoded job template parameter values.

use indexmap::IndexMap;
use serde::Serialize;
use serde::Serializer;
use serde::ser::SerializeMap;
use serde_json::Value as JsonValue;

use crate::Error;
use crate::Result;

/// The `class` key that marks a typed object.
const CLASS_KEY: &str = "class";

/// The `path` key of a `File` object.
const PATH_KEY: &str = "path";

/// The `class` value of a file reference.
pub const FILE_CLASS: &str = "File";

/// A reference to a file, written as `{class: File, path: <uri>}`.
#[derive(Clone, Debug, PartialEq)]
pub struct FileRef {
    /// The location of the file.
    pub path: String,
    /// Any additional keys of the object, kept verbatim.
    pub extra: IndexMap<String, JsonValue>,
}

impl FileRef {
    /// Creates a file reference with the given path.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            extra: IndexMap::new(),
        }
    }

    /// Builds a file reference from the fields of a `File` object.
    fn from_object(object: serde_json::Map<String, JsonValue>) -> Result<Self> {
        let mut path = None;
        let mut extra = IndexMap::new();
        for (key, value) in object {
            match key.as_str() {
                CLASS_KEY => {}
                PATH_KEY => match value {
                    JsonValue::String(s) => path = Some(s),
                    _ => {
                        return Err(Error::InvalidTemplateData(String::from(
                            "`File` path must be a string",
                        )));
                    }
                },
                _ => {
                    extra.insert(key, value);
                }
            }
        }

        let path = path.ok_or_else(|| {
            Error::InvalidTemplateData(String::from("`File` object is missing a path"))
        })?;
        Ok(Self { path, extra })
    }
}

impl Serialize for FileRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.extra.len() + 2))?;
        map.serialize_entry(CLASS_KEY, FILE_CLASS)?;
        map.serialize_entry(PATH_KEY, &self.path)?;
        for (key, value) in &self.extra {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// A parameter value of a job template.
#[derive(Clone, Debug, PartialEq)]
pub enum ParameterValue {
    /// A string, number, boolean or null.
    Scalar(JsonValue),
    /// A file reference.
    File(FileRef),
    /// A sequence of values.
    Sequence(Vec<ParameterValue>),
    /// An object without a `class`, such as a pair of files.
    Record(IndexMap<String, ParameterValue>),
}

impl ParameterValue {
    /// Creates a scalar string value.
    pub fn text(s: impl Into<String>) -> Self {
        Self::Scalar(JsonValue::String(s.into()))
    }

    /// Decodes a value from a generic document tree.
    ///
    /// Objects whose `class` is `File` become [`ParameterValue::File`]; an
    /// object with any other `class` is an error.
    pub fn decode(value: JsonValue) -> Result<Self> {
        match value {
            JsonValue::Array(items) => Ok(Self::Sequence(
                items
                    .into_iter()
                    .map(Self::decode)
                    .collect::<Result<Vec<_>>>()?,
            )),
            JsonValue::Object(object) => match object.get(CLASS_KEY).cloned() {
                Some(JsonValue::String(class)) if class == FILE_CLASS => {
                    Ok(Self::File(FileRef::from_object(object)?))
                }
                Some(JsonValue::String(class)) => Err(Error::InvalidTemplateData(format!(
                    "unknown class `{class}`"
                ))),
                Some(other) => Err(Error::InvalidTemplateData(format!(
                    "unknown class `{other}`"
                ))),
                None => Ok(Self::Record(
                    object
                        .into_iter()
                        .map(|(k, v)| Ok((k, Self::decode(v)?)))
                        .collect::<Result<IndexMap<_, _>>>()?,
                )),
            },
            scalar => Ok(Self::Scalar(scalar)),
        }
    }

    /// Gets the text of a string scalar.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Scalar(JsonValue::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Visits every file reference within this value in document order.
    pub fn visit_files<'a>(&'a self, visitor: &mut impl FnMut(&'a FileRef)) {
        match self {
            Self::Scalar(_) => {}
            Self::File(file) => visitor(file),
            Self::Sequence(items) => items.iter().for_each(|v| v.visit_files(visitor)),
            Self::Record(fields) => fields.values().for_each(|v| v.visit_files(visitor)),
        }
    }

    /// Visits every file reference within this value mutably.
    pub fn visit_files_mut(&mut self, visitor: &mut impl FnMut(&mut FileRef)) {
        match self {
            Self::Scalar(_) => {}
            Self::File(file) => visitor(file),
            Self::Sequence(items) => items.iter_mut().for_each(|v| v.visit_files_mut(visitor)),
            Self::Record(fields) => fields.values_mut().for_each(|v| v.visit_files_mut(visitor)),
        }
    }
}

impl Serialize for ParameterValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Scalar(value) => value.serialize(serializer),
            Self::File(file) => file.serialize(serializer),
            Self::Sequence(items) => items.serialize(serializer),
            Self::Record(fields) => fields.serialize(serializer),
        }
    }
}
