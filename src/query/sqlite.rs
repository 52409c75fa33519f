//! SQLite engine: Arrow tables in, Arrow results out.
//!
//! Bindings are copied into an in-memory `rusqlite` connection with column
//! affinities derived from the Arrow types. Query results are read back as
//! dynamically typed SQLite values and turned into Arrow columns by looking at
//! what each column actually contains.

use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, BinaryArray, Float64Array, Int64Array, RecordBatch, StringArray,
};
use arrow::compute::kernels::cast::{cast_with_options, CastOptions};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use tracing::debug;

use super::QueryResult;
use crate::error::QueryError;
use crate::io::text_format_options;
use crate::session::TableBinding;

/// SQLite column type derived from Arrow type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqliteType {
    Integer,
    Real,
    Text,
    Blob,
}

impl SqliteType {
    /// Returns the SQLite type keyword for CREATE TABLE statements.
    pub fn as_sql_keyword(&self) -> &'static str {
        match self {
            SqliteType::Integer => "INTEGER",
            SqliteType::Real => "REAL",
            SqliteType::Text => "TEXT",
            SqliteType::Blob => "BLOB",
        }
    }

    /// Arrow type a column is cast to before its values are bound.
    fn staging_type(&self) -> DataType {
        match self {
            SqliteType::Integer => DataType::Int64,
            SqliteType::Real => DataType::Float64,
            SqliteType::Text => DataType::Utf8,
            SqliteType::Blob => DataType::Binary,
        }
    }
}

/// Convert Arrow DataType to SQLite type.
///
/// Mapping rules:
/// - Int8/16/32/64, UInt8/16/32/64, Boolean -> INTEGER
/// - Float16/32/64, Decimal -> REAL
/// - Binary, LargeBinary, FixedSizeBinary -> BLOB
/// - Everything else (text, dates, timestamps) -> TEXT
pub fn arrow_to_sqlite_type(arrow_type: &DataType) -> SqliteType {
    match arrow_type {
        DataType::Boolean
        | DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64 => SqliteType::Integer,

        DataType::Float16
        | DataType::Float32
        | DataType::Float64
        | DataType::Decimal128(_, _)
        | DataType::Decimal256(_, _) => SqliteType::Real,

        DataType::Binary | DataType::LargeBinary | DataType::FixedSizeBinary(_) => SqliteType::Blob,

        _ => SqliteType::Text,
    }
}

/// Escape a SQL identifier (table/column name) by doubling quotes.
fn escape_identifier(name: &str) -> String {
    name.replace('"', "\"\"")
}

/// A column cast to the Arrow type matching its SQLite affinity.
enum StagedColumn {
    Integer(Int64Array),
    Real(Float64Array),
    Text(StringArray),
    Blob(BinaryArray),
}

impl StagedColumn {
    fn stage(array: &ArrayRef, sqlite_type: SqliteType) -> Result<Self, QueryError> {
        // Date-times become `YYYY-MM-DD HH:MM:SS` text, matching what was uploaded
        let options = CastOptions {
            safe: true,
            format_options: text_format_options(),
        };
        let staged = match cast_with_options(array, &sqlite_type.staging_type(), &options) {
            Ok(staged) => staged,
            // Nested types have no direct string cast; fall back to display text
            Err(_) if sqlite_type == SqliteType::Text => Arc::new(
                (0..array.len())
                    .map(|i| {
                        (!array.is_null(i)).then(|| {
                            arrow::util::display::array_value_to_string(array, i)
                                .unwrap_or_default()
                        })
                    })
                    .collect::<StringArray>(),
            ),
            Err(e) => return Err(e.into()),
        };

        let mismatch = || QueryError::Arrow(format!("cast to {sqlite_type:?} produced wrong array type"));
        Ok(match sqlite_type {
            SqliteType::Integer => StagedColumn::Integer(
                staged.as_any().downcast_ref::<Int64Array>().ok_or_else(mismatch)?.clone(),
            ),
            SqliteType::Real => StagedColumn::Real(
                staged.as_any().downcast_ref::<Float64Array>().ok_or_else(mismatch)?.clone(),
            ),
            SqliteType::Text => StagedColumn::Text(
                staged.as_any().downcast_ref::<StringArray>().ok_or_else(mismatch)?.clone(),
            ),
            SqliteType::Blob => StagedColumn::Blob(
                staged.as_any().downcast_ref::<BinaryArray>().ok_or_else(mismatch)?.clone(),
            ),
        })
    }

    fn value(&self, row: usize) -> Value {
        match self {
            StagedColumn::Integer(a) if !a.is_null(row) => Value::Integer(a.value(row)),
            StagedColumn::Real(a) if !a.is_null(row) => Value::Real(a.value(row)),
            StagedColumn::Text(a) if !a.is_null(row) => Value::Text(a.value(row).to_string()),
            StagedColumn::Blob(a) if !a.is_null(row) => Value::Blob(a.value(row).to_vec()),
            _ => Value::Null,
        }
    }
}

/// Create (or replace) `table_name` and copy the batches into it.
///
/// Returns the number of rows written.
pub fn write_table(
    conn: &Connection,
    table_name: &str,
    schema: &Schema,
    batches: &[RecordBatch],
) -> Result<usize, QueryError> {
    let sqlite_types: Vec<SqliteType> = schema
        .fields()
        .iter()
        .map(|f| arrow_to_sqlite_type(f.data_type()))
        .collect();

    let columns: Vec<String> = schema
        .fields()
        .iter()
        .zip(&sqlite_types)
        .map(|(field, sqlite_type)| {
            format!(
                "\"{}\" {}",
                escape_identifier(field.name()),
                sqlite_type.as_sql_keyword()
            )
        })
        .collect();

    let escaped_table = escape_identifier(table_name);
    conn.execute_batch(&format!(
        "DROP TABLE IF EXISTS \"{escaped_table}\"; CREATE TABLE \"{escaped_table}\" ({})",
        columns.join(", ")
    ))?;

    let placeholders = vec!["?"; sqlite_types.len()].join(", ");
    let insert_sql = format!("INSERT INTO \"{escaped_table}\" VALUES ({placeholders})");

    conn.execute_batch("BEGIN TRANSACTION")?;
    let mut total_rows = 0usize;
    {
        let mut stmt = conn.prepare_cached(&insert_sql)?;
        for batch in batches {
            let staged = batch
                .columns()
                .iter()
                .zip(&sqlite_types)
                .map(|(col, ty)| StagedColumn::stage(col, *ty))
                .collect::<Result<Vec<_>, _>>()?;

            for row in 0..batch.num_rows() {
                stmt.execute(params_from_iter(staged.iter().map(|c| c.value(row))))?;
            }
            total_rows += batch.num_rows();
        }
    }
    conn.execute_batch("COMMIT")?;

    debug!(table = table_name, rows = total_rows, "Loaded table into SQLite");
    Ok(total_rows)
}

/// Run `sql` in a throwaway in-memory database holding `tables`.
pub fn execute(sql: &str, tables: &[TableBinding]) -> Result<QueryResult, QueryError> {
    let conn = Connection::open_in_memory()?;
    for binding in tables {
        write_table(&conn, binding.table_name(), &binding.schema(), binding.batches())?;
    }

    let mut stmt = conn.prepare(sql)?;
    let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    let mut columns: Vec<Vec<Value>> = vec![Vec::new(); names.len()];
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        for (idx, column) in columns.iter_mut().enumerate() {
            column.push(row.get::<_, Value>(idx)?);
        }
    }

    let (fields, arrays): (Vec<Field>, Vec<ArrayRef>) = names
        .iter()
        .zip(columns)
        .map(|(name, values)| {
            let array = values_to_array(values);
            (Field::new(name, array.data_type().clone(), true), array)
        })
        .unzip();

    let schema: SchemaRef = Arc::new(Schema::new(fields));
    let batches = if arrays.first().map_or(true, |a| a.is_empty()) {
        Vec::new()
    } else {
        vec![RecordBatch::try_new(schema.clone(), arrays)?]
    };

    Ok(QueryResult::new(schema, batches))
}

/// Build one Arrow column from SQLite values.
///
/// Integers only -> Int64, any real -> Float64, any text -> Utf8 (numbers are
/// rendered as text), blobs only -> Binary. A column of nulls is Utf8.
fn values_to_array(values: Vec<Value>) -> ArrayRef {
    let (mut ints, mut reals, mut texts, mut blobs) = (false, false, false, false);
    for value in &values {
        match value {
            Value::Null => {}
            Value::Integer(_) => ints = true,
            Value::Real(_) => reals = true,
            Value::Text(_) => texts = true,
            Value::Blob(_) => blobs = true,
        }
    }

    if texts || (blobs && (ints || reals)) || !(ints || reals || blobs) {
        return Arc::new(
            values
                .into_iter()
                .map(|v| match v {
                    Value::Null => None,
                    Value::Integer(i) => Some(i.to_string()),
                    Value::Real(f) => Some(f.to_string()),
                    Value::Text(s) => Some(s),
                    Value::Blob(b) => Some(String::from_utf8_lossy(&b).into_owned()),
                })
                .collect::<StringArray>(),
        );
    }

    if blobs {
        let blobs: Vec<Option<Vec<u8>>> = values
            .into_iter()
            .map(|v| match v {
                Value::Blob(b) => Some(b),
                _ => None,
            })
            .collect();
        return Arc::new(BinaryArray::from_iter(blobs));
    }

    if reals {
        return Arc::new(
            values
                .into_iter()
                .map(|v| match v {
                    Value::Integer(i) => Some(i as f64),
                    Value::Real(f) => Some(f),
                    _ => None,
                })
                .collect::<Float64Array>(),
        );
    }

    Arc::new(
        values
            .into_iter()
            .map(|v| match v {
                Value::Integer(i) => Some(i),
                _ => None,
            })
            .collect::<Int64Array>(),
    )
}

/// Map a SQLite error onto a query error category.
pub(crate) fn classify_error(err: rusqlite::Error) -> QueryError {
    if let rusqlite::Error::MultipleStatement = err {
        return QueryError::Syntax("only one SQL statement can be run at a time".to_string());
    }

    // Prepare errors may carry " in <sql> at offset <n>" after the name
    let message = err.to_string();
    let name_after = |prefix: &str| {
        message
            .strip_prefix(prefix)
            .and_then(|rest| rest.split_whitespace().next())
            .map(str::to_string)
    };

    if let Some(table) = name_after("no such table: ") {
        QueryError::UnknownTable { table }
    } else if let Some(column) = name_after("no such column: ") {
        QueryError::UnknownColumn { column }
    } else if message.contains("syntax error")
        || message.contains("incomplete input")
        || message.contains("unrecognized token")
    {
        QueryError::Syntax(message)
    } else {
        QueryError::Execution(message)
    }
}
