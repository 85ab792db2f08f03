//! Tab-separated table parsing
//!
//! All tabular pipeline outputs (component metrics, status table, mixing
//! matrix) share the same shape: one header row, tab-delimited records.
//! This module provides the common header + records representation that
//! the schema-aware decoders build on.

/// A parsed tab-separated table: header columns plus raw string records.
#[derive(Debug, Clone, Default)]
pub struct TsvTable {
    pub columns: Vec<String>,
    pub records: Vec<Vec<String>>,
}

impl TsvTable {
    /// Parse TSV text into a table.
    ///
    /// The first non-empty line is the header. Trailing blank lines are
    /// ignored; short records read as empty cells via [`TsvTable::cell`].
    pub fn parse(text: &str) -> TsvTable {
        let mut lines = text.lines().filter(|l| !l.trim().is_empty());

        let columns = match lines.next() {
            Some(header) => split_record(header),
            None => return TsvTable::default(),
        };

        let records = lines.map(split_record).collect();

        TsvTable { columns, records }
    }

    /// Index of a named column, if present.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell value at (record, column index); empty string when the record
    /// is shorter than the header.
    pub fn cell<'a>(&self, record: &'a [String], col: usize) -> &'a str {
        record.get(col).map(|s| s.as_str()).unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn split_record(line: &str) -> Vec<String> {
    line.trim_end_matches('\r')
        .split('\t')
        .map(|cell| cell.trim().to_string())
        .collect()
}
