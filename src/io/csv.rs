//! CSV reading with schema inference.

use std::io::Cursor;
use std::sync::Arc;

use arrow::csv::reader::Format;
use arrow::csv::ReaderBuilder;
use tracing::debug;

use super::{normalize_schema, TableData};
use crate::error::LoadError;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Parse CSV bytes (header row required) into record batches.
///
/// Column types are inferred by Arrow over every record, so a late value that
/// does not fit widens the column instead of failing the read. Integers,
/// floats, booleans, dates and timestamps are recognized, everything else is
/// text. Empty fields are read as nulls.
pub fn read_csv(file_name: &str, bytes: &[u8], batch_size: usize) -> Result<TableData, LoadError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(LoadError::Empty {
            file: file_name.to_string(),
        });
    }

    let csv_error = |e: arrow::error::ArrowError| LoadError::Csv {
        file: file_name.to_string(),
        reason: e.to_string(),
    };

    let format = Format::default().with_header(true);
    let (inferred, records) = format
        .infer_schema(Cursor::new(bytes), None)
        .map_err(csv_error)?;

    if inferred.fields().is_empty() {
        return Err(LoadError::Empty {
            file: file_name.to_string(),
        });
    }

    let schema = Arc::new(normalize_schema(&inferred));
    debug!(
        file = file_name,
        columns = schema.fields().len(),
        records,
        "Inferred CSV schema"
    );

    let reader = ReaderBuilder::new(schema.clone())
        .with_format(format)
        .with_batch_size(batch_size)
        .build(Cursor::new(bytes))
        .map_err(csv_error)?;

    let batches = reader
        .collect::<Result<Vec<_>, _>>()
        .map_err(csv_error)?;

    Ok(TableData::new(schema, batches))
}
