//! Output formatting for query results and table previews.
//!
//! Results are written as a pretty table, CSV or JSON Lines. CSV goes through
//! the same Arrow writer the exporter uses, so what is printed matches what is
//! downloaded.

use std::io::Write;

use arrow::array::{
    Array, ArrayRef, BooleanArray, Float32Array, Float64Array, Int16Array, Int32Array, Int64Array,
    Int8Array, LargeStringArray, RecordBatch, StringArray, UInt16Array, UInt32Array, UInt64Array,
    UInt8Array,
};
use arrow::datatypes::{DataType, SchemaRef};
use arrow::util::display::ArrayFormatter;
use clap::ValueEnum;
use comfy_table::{Cell, Table};

use crate::io::text_format_options;
use crate::query::QueryResult;
use crate::session::ColumnInfo;

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed table (default)
    Table,
    /// Comma-separated values
    Csv,
    /// JSON Lines (one JSON object per row)
    Json,
}

/// Formats query results for output.
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    /// Create a new formatter with the specified format.
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Format a query result and write it to the given writer.
    pub fn write<W: Write>(&self, result: &QueryResult, writer: &mut W) -> std::io::Result<()> {
        self.write_batches(&result.schema(), result.batches(), writer)
    }

    /// Format batches sharing `schema` and write them to the given writer.
    pub fn write_batches<W: Write>(
        &self,
        schema: &SchemaRef,
        batches: &[RecordBatch],
        writer: &mut W,
    ) -> std::io::Result<()> {
        match self.format {
            OutputFormat::Table => self.write_table(schema, batches, writer),
            OutputFormat::Csv => super::export::write_csv(writer, schema, batches, false),
            OutputFormat::Json => self.write_json(batches, writer),
        }
    }

    fn write_table<W: Write>(
        &self,
        schema: &SchemaRef,
        batches: &[RecordBatch],
        writer: &mut W,
    ) -> std::io::Result<()> {
        let mut table = Table::new();

        let headers: Vec<Cell> = schema.fields().iter().map(|f| Cell::new(f.name())).collect();
        table.set_header(headers);

        for batch in batches {
            for row_idx in 0..batch.num_rows() {
                let row: Vec<Cell> = batch
                    .columns()
                    .iter()
                    .map(|col| Cell::new(format_value(col, row_idx)))
                    .collect();
                table.add_row(row);
            }
        }

        writeln!(writer, "{table}")
    }

    fn write_json<W: Write>(&self, batches: &[RecordBatch], writer: &mut W) -> std::io::Result<()> {
        for batch in batches {
            let schema = batch.schema();
            for row_idx in 0..batch.num_rows() {
                let mut obj = serde_json::Map::new();
                for (col_idx, field) in schema.fields().iter().enumerate() {
                    obj.insert(field.name().clone(), json_value(batch.column(col_idx), row_idx));
                }
                writeln!(writer, "{}", serde_json::Value::Object(obj))?;
            }
        }
        Ok(())
    }
}

/// Render one cell as display text; nulls are empty.
pub(crate) fn format_value(col: &ArrayRef, row_idx: usize) -> String {
    if col.is_null(row_idx) {
        return String::new();
    }
    let options = text_format_options();
    ArrayFormatter::try_new(col.as_ref(), &options)
        .map(|f| f.value(row_idx).to_string())
        .unwrap_or_else(|_| "?".to_string())
}

macro_rules! json_number {
    ($col:expr, $row:expr, $array:ty) => {
        $col.as_any()
            .downcast_ref::<$array>()
            .map(|a| serde_json::json!(a.value($row)))
    };
}

/// Convert one cell to JSON, keeping numbers and booleans typed.
pub(crate) fn json_value(col: &ArrayRef, row_idx: usize) -> serde_json::Value {
    if col.is_null(row_idx) {
        return serde_json::Value::Null;
    }

    let typed = match col.data_type() {
        DataType::Boolean => col
            .as_any()
            .downcast_ref::<BooleanArray>()
            .map(|a| serde_json::Value::Bool(a.value(row_idx))),
        DataType::Int8 => json_number!(col, row_idx, Int8Array),
        DataType::Int16 => json_number!(col, row_idx, Int16Array),
        DataType::Int32 => json_number!(col, row_idx, Int32Array),
        DataType::Int64 => json_number!(col, row_idx, Int64Array),
        DataType::UInt8 => json_number!(col, row_idx, UInt8Array),
        DataType::UInt16 => json_number!(col, row_idx, UInt16Array),
        DataType::UInt32 => json_number!(col, row_idx, UInt32Array),
        DataType::UInt64 => json_number!(col, row_idx, UInt64Array),
        DataType::Float32 => json_number!(col, row_idx, Float32Array),
        DataType::Float64 => json_number!(col, row_idx, Float64Array),
        DataType::Utf8 => col
            .as_any()
            .downcast_ref::<StringArray>()
            .map(|a| serde_json::Value::String(a.value(row_idx).to_string())),
        DataType::LargeUtf8 => col
            .as_any()
            .downcast_ref::<LargeStringArray>()
            .map(|a| serde_json::Value::String(a.value(row_idx).to_string())),
        _ => None,
    };

    typed.unwrap_or_else(|| serde_json::Value::String(format_value(col, row_idx)))
}

/// Write a column summary (name, type, null count) as a table.
pub fn write_column_info<W: Write>(columns: &[ColumnInfo], writer: &mut W) -> std::io::Result<()> {
    let mut table = Table::new();
    table.set_header(vec!["Column", "Type", "Nulls"]);
    for column in columns {
        table.add_row(vec![
            Cell::new(&column.name),
            Cell::new(column.data_type.to_string()),
            Cell::new(column.null_count),
        ]);
    }
    writeln!(writer, "{table}")
}

/// Human-readable byte size, e.g. `1.50 KB`.
pub fn format_size(bytes: usize) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.2} {}", UNITS[unit])
    }
}
