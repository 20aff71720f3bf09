//! The catalog of placeholder values.

use indexmap::IndexMap;

use super::FileRef;
use super::ParameterValue;

/// The placeholder for a scalar value the user must fill in.
pub const SCALAR_PLACEHOLDER: &str = "TODO";

/// The placeholder path for a file the user must fill in.
pub const FILE_PLACEHOLDER: &str = "dds://TODO_PROJECT_NAME/TODO_FILE_PATH";

/// The named type of a pair of FASTQ files with a sample name.
const NAMED_FASTQ_FILE_PAIR_TYPE: &str = "NamedFASTQFilePairType";

/// Describes what an unfilled field looks like for each known type.
///
/// The catalog is a closed table: type names it does not know are given the
/// scalar placeholder.
#[derive(Clone, Debug)]
pub struct PlaceholderCatalog {
    /// Placeholders keyed by type name.
    table: IndexMap<&'static str, ParameterValue>,
}

impl PlaceholderCatalog {
    /// Creates the catalog of placeholders.
    pub fn new() -> Self {
        let file = || ParameterValue::File(FileRef::new(FILE_PLACEHOLDER));
        let scalar = || ParameterValue::text(SCALAR_PLACEHOLDER);

        let mut pair = IndexMap::new();
        pair.insert(String::from("name"), scalar());
        pair.insert(String::from("file1"), file());
        pair.insert(String::from("file2"), file());

        let mut table = IndexMap::new();
        table.insert("File", file());
        table.insert("int", scalar());
        table.insert("string", scalar());
        table.insert(NAMED_FASTQ_FILE_PAIR_TYPE, ParameterValue::Record(pair));

        Self { table }
    }

    /// Gets the scalar placeholder.
    pub fn scalar_placeholder(&self) -> ParameterValue {
        ParameterValue::text(SCALAR_PLACEHOLDER)
    }

    /// Gets the file placeholder.
    pub fn file_placeholder(&self) -> ParameterValue {
        ParameterValue::File(FileRef::new(FILE_PLACEHOLDER))
    }

    /// Gets the placeholder for a named type.
    pub fn placeholder_for_type(&self, type_name: &str) -> ParameterValue {
        self.table
            .get(type_name)
            .cloned()
            .unwrap_or_else(|| self.scalar_placeholder())
    }

    /// Determines if the given text is one of the placeholder strings.
    pub fn is_placeholder_text(&self, text: &str) -> bool {
        text == SCALAR_PLACEHOLDER || text == FILE_PLACEHOLDER
    }
}
