//! Tabular file loading.
//!
//! Uploaded files are parsed into Arrow record batches with inferred column
//! types, ready to be registered with a query engine.
//!
//! ## Supported Inputs
//!
//! - CSV (`.csv`) - header row, comma delimiter, optional UTF-8 BOM
//! - Excel workbooks (`.xlsx`, `.xlsm`, `.xls`, `.xlsb`, `.ods`) - first sheet only
//!
//! Both readers apply the same header clean-up: blank names become
//! `Unnamed: <index>` and repeated names get a `.1`, `.2`, ... suffix.

mod csv;
mod excel;
mod source;

pub use self::csv::read_csv;
pub use self::excel::read_excel;
pub use source::{default_table_name, FileFormat};

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use arrow::array::RecordBatch;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::util::display::FormatOptions;

use crate::error::{Error, LoadError};

/// Rows per record batch when reading files.
pub const DEFAULT_BATCH_SIZE: usize = 8192;

/// Text form of date-times, as spreadsheets and uploaded CSVs write them.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Display options that render date-times with [`DATETIME_FORMAT`].
pub fn text_format_options() -> FormatOptions<'static> {
    FormatOptions::new()
        .with_datetime_format(Some(DATETIME_FORMAT))
        .with_timestamp_format(Some(DATETIME_FORMAT))
}

/// Parsed contents of one file: a schema and its record batches.
#[derive(Debug, Clone)]
pub struct TableData {
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
}

impl TableData {
    /// Wrap batches that all share `schema`.
    pub fn new(schema: SchemaRef, batches: Vec<RecordBatch>) -> Self {
        Self { schema, batches }
    }

    pub fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    pub fn batches(&self) -> &[RecordBatch] {
        &self.batches
    }

    /// Total row count across batches.
    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(|b| b.num_rows()).sum()
    }

    pub fn num_columns(&self) -> usize {
        self.schema.fields().len()
    }
}

/// Parse in-memory file contents, choosing the reader from the file name.
pub fn read_bytes(file_name: &str, bytes: &[u8]) -> Result<TableData, LoadError> {
    match FileFormat::from_file_name(file_name)? {
        FileFormat::Csv => read_csv(file_name, bytes, DEFAULT_BATCH_SIZE),
        FileFormat::Excel => read_excel(file_name, bytes),
    }
}

/// Read and parse a file from disk.
pub fn read_path<P: AsRef<Path>>(path: P) -> Result<TableData, Error> {
    let path = path.as_ref();
    FileFormat::from_path(path)?;
    let bytes = std::fs::read(path)?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    Ok(read_bytes(file_name, &bytes)?)
}

/// Make header names usable as SQL column names.
///
/// Blank names become `Unnamed: <index>`; a name seen before gets the
/// lowest free `.N` suffix.
pub(crate) fn normalize_headers<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let raw: Vec<String> = names
        .into_iter()
        .enumerate()
        .map(|(idx, name)| {
            let name = name.as_ref().trim();
            if name.is_empty() {
                format!("Unnamed: {idx}")
            } else {
                name.to_string()
            }
        })
        .collect();

    let mut seen: HashSet<String> = HashSet::with_capacity(raw.len());
    let mut out = Vec::with_capacity(raw.len());
    for name in raw {
        let mut candidate = name.clone();
        let mut suffix = 1;
        while seen.contains(&candidate) {
            candidate = format!("{name}.{suffix}");
            suffix += 1;
        }
        seen.insert(candidate.clone());
        out.push(candidate);
    }
    out
}

/// Rebuild an inferred schema with normalized names; all-null columns become Utf8.
pub(crate) fn normalize_schema(schema: &Schema) -> Schema {
    let names = normalize_headers(schema.fields().iter().map(|f| f.name().as_str()));
    let fields: Vec<Field> = schema
        .fields()
        .iter()
        .zip(names)
        .map(|(field, name)| {
            let data_type = match field.data_type() {
                DataType::Null => DataType::Utf8,
                other => other.clone(),
            };
            Field::new(name, data_type, true)
        })
        .collect();
    Schema::new(fields)
}

/// Schema for a header-only file: every column is a nullable string.
pub(crate) fn utf8_schema(names: &[String]) -> SchemaRef {
    Arc::new(Schema::new(
        names
            .iter()
            .map(|n| Field::new(n, DataType::Utf8, true))
            .collect::<Vec<_>>(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_headers_blank_and_duplicates() {
        let names = normalize_headers(["id", "", "id", "name", "id"]);
        assert_eq!(names, vec!["id", "Unnamed: 1", "id.1", "name", "id.2"]);
    }

    #[test]
    fn test_normalize_headers_suffix_collision() {
        // "a.1" is taken by a real column, so the second "a" skips to "a.2"
        let names = normalize_headers(["a", "a.1", "a"]);
        assert_eq!(names, vec!["a", "a.1", "a.2"]);
    }

    #[test]
    fn test_normalize_schema_null_to_utf8() {
        let schema = Schema::new(vec![
            Field::new("x", DataType::Int64, true),
            Field::new("empty", DataType::Null, true),
        ]);
        let normalized = normalize_schema(&schema);
        assert_eq!(normalized.field(0).data_type(), &DataType::Int64);
        assert_eq!(normalized.field(1).data_type(), &DataType::Utf8);
    }

    #[test]
    fn test_read_bytes_unsupported() {
        let err = read_bytes("data.txt", b"a,b\n1,2\n").unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedFormat { .. }));
    }
}
