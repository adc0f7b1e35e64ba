//! In-memory tabular dataset with canonical column names.

use csv::StringRecord;

use crate::error::{PipelineError, Result};

/// A fully materialized delimited-text table.
///
/// Header names are trimmed and upper-cased on construction so every stage
/// addresses columns with one casing convention.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    headers: StringRecord,
    records: Vec<StringRecord>,
}

/// Canonical form of a column name.
pub fn canonical_column(name: &str) -> String {
    name.trim().to_uppercase()
}

impl Table {
    pub fn new(name: &str, headers: &StringRecord, records: Vec<StringRecord>) -> Self {
        let headers: StringRecord = headers.iter().map(canonical_column).collect();
        Self {
            name: name.to_string(),
            headers,
            records,
        }
    }

    /// Builds a table from string slices. Mostly useful for fixtures.
    pub fn from_rows(name: &str, headers: &[&str], rows: &[&[&str]]) -> Self {
        let headers = StringRecord::from(headers.to_vec());
        let records = rows.iter().map(|r| StringRecord::from(r.to_vec())).collect();
        Self::new(name, &headers, records)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn headers(&self) -> &StringRecord {
        &self.headers
    }

    pub fn records(&self) -> &[StringRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        let wanted = canonical_column(column);
        self.headers.iter().position(|h| h == wanted)
    }

    /// Like [`Table::column_index`] but fails with a schema error.
    pub fn require_column(&self, column: &str) -> Result<usize> {
        self.column_index(column)
            .ok_or_else(|| PipelineError::missing_column(&self.name, column))
    }

    /// Raw cell values of one column, in row order.
    pub fn column_values(&self, idx: usize) -> impl Iterator<Item = &str> {
        self.records.iter().map(move |r| r.get(idx).unwrap_or(""))
    }

    /// A new table with the same name and headers but different rows.
    pub fn with_records(&self, records: Vec<StringRecord>) -> Self {
        Self {
            name: self.name.clone(),
            headers: self.headers.clone(),
            records,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_are_canonicalized() {
        let table = Table::from_rows("t", &[" iso_country", "Type "], &[&["US", "large_airport"]]);
        assert_eq!(table.headers(), &StringRecord::from(vec!["ISO_COUNTRY", "TYPE"]));
        assert_eq!(table.column_index("iso_country"), Some(0));
        assert_eq!(table.column_index("TYPE"), Some(1));
    }

    #[test]
    fn test_require_column_reports_table_and_column() {
        let table = Table::from_rows("airports", &["A"], &[]);
        let err = table.require_column("IATA_CODE").unwrap_err();
        assert_eq!(
            err.to_string(),
            "airports: required column 'IATA_CODE' not found"
        );
    }

    #[test]
    fn test_column_values_in_row_order() {
        let table = Table::from_rows("t", &["A", "B"], &[&["1", "2"], &["3", "4"]]);
        let values: Vec<&str> = table.column_values(1).collect();
        assert_eq!(values, vec!["2", "4"]);
        assert_eq!(table.len(), 2);
        assert!(!table.is_empty());
    }
}
