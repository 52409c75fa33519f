//! Export functionality for query results.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use arrow::array::RecordBatch;
use arrow::csv::WriterBuilder;
use arrow::datatypes::SchemaRef;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use rusqlite::Connection;
use tracing::info;

use super::output::json_value;
use super::ExportFormat;
use crate::error::Error;
use crate::io::DATETIME_FORMAT;
use crate::query::{sqlite, QueryResult};

/// UTF-8 byte-order mark, so spreadsheet tools detect the encoding.
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Table name used inside exported SQLite files.
pub const SQLITE_EXPORT_TABLE: &str = "query_result";

/// Exports query results to various file formats.
pub struct Exporter;

impl Exporter {
    /// Export a query result to a file, returning the number of rows written.
    ///
    /// The header (or schema) is written even when the result has no rows.
    pub fn export<P: AsRef<Path>>(
        path: P,
        format: ExportFormat,
        result: &QueryResult,
    ) -> Result<usize, Error> {
        let path = path.as_ref();

        match format {
            ExportFormat::Csv => Self::export_csv(path, result)?,
            ExportFormat::Json => Self::export_json(path, result)?,
            ExportFormat::Parquet => Self::export_parquet(path, result)?,
            ExportFormat::Sqlite => Self::export_sqlite(path, result)?,
        }

        let rows = result.num_rows();
        info!(path = %path.display(), ?format, rows, "Exported query result");
        Ok(rows)
    }

    /// CSV download payload: UTF-8 with BOM, header row, nulls as empty fields.
    pub fn csv_bytes(result: &QueryResult) -> std::io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        write_csv(&mut buf, &result.schema(), result.batches(), true)?;
        Ok(buf)
    }

    fn export_csv(path: &Path, result: &QueryResult) -> std::io::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        write_csv(&mut writer, &result.schema(), result.batches(), true)?;
        writer.flush()
    }

    /// Export to JSON Lines format.
    fn export_json(path: &Path, result: &QueryResult) -> std::io::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);

        for batch in result.batches() {
            let schema = batch.schema();
            for row_idx in 0..batch.num_rows() {
                let mut obj = serde_json::Map::new();
                for (col_idx, field) in schema.fields().iter().enumerate() {
                    obj.insert(field.name().clone(), json_value(batch.column(col_idx), row_idx));
                }
                writeln!(writer, "{}", serde_json::Value::Object(obj))?;
            }
        }

        writer.flush()
    }

    /// Export to Parquet format.
    fn export_parquet(path: &Path, result: &QueryResult) -> std::io::Result<()> {
        let file = File::create(path)?;

        // Configure Parquet writer with Snappy compression
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();

        let mut writer = ArrowWriter::try_new(file, result.schema(), Some(props))
            .map_err(|e| std::io::Error::other(e.to_string()))?;

        for batch in result.batches() {
            writer
                .write(batch)
                .map_err(|e| std::io::Error::other(e.to_string()))?;
        }

        writer
            .close()
            .map_err(|e| std::io::Error::other(e.to_string()))?;

        Ok(())
    }

    /// Export to a SQLite database file, replacing any existing result table.
    fn export_sqlite(path: &Path, result: &QueryResult) -> Result<(), Error> {
        let conn = Connection::open(path)?;
        sqlite::write_table(
            &conn,
            SQLITE_EXPORT_TABLE,
            &result.schema(),
            result.batches(),
        )?;
        Ok(())
    }
}

/// Write batches as RFC 4180 CSV with a header row.
///
/// The header is written even when there are no batches.
pub(crate) fn write_csv<W: Write>(
    writer: &mut W,
    schema: &SchemaRef,
    batches: &[RecordBatch],
    with_bom: bool,
) -> std::io::Result<()> {
    if with_bom {
        writer.write_all(UTF8_BOM)?;
    }

    let mut csv = WriterBuilder::new()
        .with_header(true)
        .with_datetime_format(DATETIME_FORMAT.to_string())
        .with_timestamp_format(DATETIME_FORMAT.to_string())
        .build(&mut *writer);
    let empty;
    let batches = if batches.is_empty() {
        empty = [RecordBatch::new_empty(schema.clone())];
        &empty[..]
    } else {
        batches
    };

    for batch in batches {
        csv.write(batch)
            .map_err(|e| std::io::Error::other(e.to_string()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use arrow::array::{Int32Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use tempfile::tempdir;

    fn create_test_result() -> QueryResult {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int32, false),
            Field::new("name", DataType::Utf8, true),
        ]));

        let id_array = Int32Array::from(vec![1, 2, 3]);
        let name_array = StringArray::from(vec![Some("Alice"), Some("Bob"), None]);

        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![Arc::new(id_array), Arc::new(name_array)],
        )
        .unwrap();
        QueryResult::new(schema, vec![batch])
    }

    #[test]
    fn test_export_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.csv");

        let rows = Exporter::export(&path, ExportFormat::Csv, &create_test_result()).unwrap();
        assert_eq!(rows, 3);

        let content = std::fs::read(&path).unwrap();
        assert!(content.starts_with(UTF8_BOM));
        let text = std::str::from_utf8(&content[UTF8_BOM.len()..]).unwrap();
        assert_eq!(text, "id,name\n1,Alice\n2,Bob\n3,\n");
    }

    #[test]
    fn test_csv_bytes_matches_file_export() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.csv");
        let result = create_test_result();

        Exporter::export(&path, ExportFormat::Csv, &result).unwrap();
        assert_eq!(Exporter::csv_bytes(&result).unwrap(), std::fs::read(&path).unwrap());
    }

    #[test]
    fn test_export_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.jsonl");

        let rows = Exporter::export(&path, ExportFormat::Json, &create_test_result()).unwrap();
        assert_eq!(rows, 3);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 3);
        assert!(content.contains("\"id\":1"));
        assert!(content.contains("\"name\":\"Alice\""));
        assert!(content.contains("\"name\":null"));
    }

    #[test]
    fn test_export_parquet() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.parquet");

        let rows = Exporter::export(&path, ExportFormat::Parquet, &create_test_result()).unwrap();
        assert_eq!(rows, 3);

        let file = File::open(&path).unwrap();
        let reader = parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder::try_new(file)
            .unwrap()
            .build()
            .unwrap();
        let total: usize = reader.map(|b| b.unwrap().num_rows()).sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn test_export_sqlite() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        let result = create_test_result();

        Exporter::export(&path, ExportFormat::Sqlite, &result).unwrap();
        // Exporting twice replaces the table rather than appending
        Exporter::export(&path, ExportFormat::Sqlite, &result).unwrap();

        let conn = Connection::open(&path).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM query_result", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 3);
        let nulls: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM query_result WHERE name IS NULL",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(nulls, 1);
    }

    #[test]
    fn test_export_empty_result_writes_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        let empty = QueryResult::new(create_test_result().schema(), vec![]);

        let rows = Exporter::export(&path, ExportFormat::Csv, &empty).unwrap();
        assert_eq!(rows, 0);

        let content = std::fs::read(&path).unwrap();
        assert_eq!(&content[UTF8_BOM.len()..], b"id,name\n");
    }

    #[test]
    fn test_csv_timestamps_use_upload_format() {
        use arrow::array::TimestampSecondArray;
        use arrow::datatypes::TimeUnit;

        let schema = Arc::new(Schema::new(vec![Field::new(
            "ts",
            DataType::Timestamp(TimeUnit::Second, None),
            true,
        )]));
        // 2024-01-15 10:00:00 UTC
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![Arc::new(TimestampSecondArray::from(vec![Some(1_705_312_800), None]))],
        )
        .unwrap();

        let bytes = Exporter::csv_bytes(&QueryResult::new(schema, vec![batch])).unwrap();
        assert_eq!(&bytes[UTF8_BOM.len()..], b"ts\n2024-01-15 10:00:00\n\n");
    }

    #[test]
    fn test_csv_escaping() {
        let schema = Arc::new(Schema::new(vec![Field::new("text", DataType::Utf8, true)]));

        let text_array = StringArray::from(vec![
            Some("hello, world"),
            Some("quote \"test\""),
            Some("normal"),
        ]);

        let batch = RecordBatch::try_new(schema.clone(), vec![Arc::new(text_array)]).unwrap();
        let bytes = Exporter::csv_bytes(&QueryResult::new(schema, vec![batch])).unwrap();
        let content = String::from_utf8(bytes).unwrap();

        // Commas should be quoted
        assert!(content.contains("\"hello, world\""));
        // Quotes should be escaped
        assert!(content.contains("\"quote \"\"test\"\"\""));
    }
}
