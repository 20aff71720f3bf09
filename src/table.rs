//! Plain text tables for listing commands.

use std::fmt;

/// Converts a column name such as `fund_code` to a header (`Fund Code`).
fn header(column: &str) -> String {
    column
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            chars
                .next()
                .map(|c| c.to_uppercase().chain(chars).collect::<String>())
                .unwrap_or_default()
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// A table of text cells with a header row.
#[derive(Debug, Clone, Default)]
pub struct Table {
    /// The column headers.
    headers: Vec<String>,
    /// The rows of the table.
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Creates an empty table with the given column names.
    pub fn new(columns: &[&str]) -> Self {
        Self {
            headers: columns.iter().map(|c| header(c)).collect(),
            rows: Vec::new(),
        }
    }

    /// Adds a row to the table.
    ///
    /// Missing cells are rendered empty and extra cells are ignored.
    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    /// Gets the number of rows in the table.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Determines if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Gets the cell of a row, or an empty string.
    fn cell(row: &[String], column: usize) -> &str {
        row.get(column).map(String::as_str).unwrap_or_default()
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let widths = self
            .headers
            .iter()
            .enumerate()
            .map(|(i, h)| {
                self.rows
                    .iter()
                    .map(|r| Self::cell(r, i).chars().count())
                    .chain([h.chars().count()])
                    .max()
                    .unwrap_or_default()
            })
            .collect::<Vec<_>>();

        let write_row = |f: &mut fmt::Formatter<'_>, cells: Vec<&str>| -> fmt::Result {
            let line = cells
                .iter()
                .zip(&widths)
                .map(|(cell, &width)| format!("{cell:<width$}"))
                .collect::<Vec<_>>()
                .join("  ");
            writeln!(f, "{}", line.trim_end())
        };

        write_row(f, self.headers.iter().map(String::as_str).collect())?;
        let dashes = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
        write_row(f, dashes.iter().map(String::as_str).collect())?;
        for row in &self.rows {
            write_row(f, (0..self.headers.len()).map(|i| Self::cell(row, i)).collect())?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn headers_are_title_cased() {
        assert_eq!(header("id"), "Id");
        assert_eq!(header("fund_code"), "Fund Code");
        assert_eq!(header("last_updated"), "Last Updated");
    }

    #[test]
    fn renders_aligned_columns() {
        let mut table = Table::new(&["id", "name", "state"]);
        table.push_row(vec![String::from("1"), String::from("first job"), String::from("N")]);
        table.push_row(vec![String::from("12"), String::from("x")]);
        assert_eq!(table.len(), 2);

        assert_eq!(
            table.to_string(),
            "Id  Name       State\n\
             --  ---------  -----\n\
             1   first job  N\n\
             12  x\n"
        );
    }
}
