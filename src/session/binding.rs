//! A single uploaded file bound to an SQL table name.

use arrow::array::{Array, RecordBatch};
use arrow::compute::concat_batches;
use arrow::datatypes::{DataType, SchemaRef};

use crate::error::Error;
use crate::io::TableData;

/// Number of rows shown by default when previewing a table.
pub const DEFAULT_PREVIEW_ROWS: usize = 5;

/// Column summary shown in the table details view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: DataType,
    pub null_count: usize,
}

/// Association between an uploaded file's parsed data and its SQL table name.
#[derive(Debug, Clone)]
pub struct TableBinding {
    file_name: String,
    table_name: String,
    data: TableData,
}

impl TableBinding {
    pub fn new(file_name: impl Into<String>, table_name: impl Into<String>, data: TableData) -> Self {
        Self {
            file_name: file_name.into(),
            table_name: table_name.into(),
            data,
        }
    }

    /// Name of the uploaded file this binding came from.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Identifier the data is registered under when running queries.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub(crate) fn set_table_name(&mut self, name: String) {
        self.table_name = name;
    }

    pub fn schema(&self) -> SchemaRef {
        self.data.schema()
    }

    pub fn batches(&self) -> &[RecordBatch] {
        self.data.batches()
    }

    pub fn num_rows(&self) -> usize {
        self.data.num_rows()
    }

    pub fn num_columns(&self) -> usize {
        self.data.num_columns()
    }

    /// Approximate in-memory size of the data in bytes.
    pub fn memory_size(&self) -> usize {
        self.batches().iter().map(|b| b.get_array_memory_size()).sum()
    }

    /// First `limit` rows as one batch.
    pub fn preview(&self, limit: usize) -> Result<RecordBatch, Error> {
        let mut remaining = limit;
        let mut slices = Vec::new();
        for batch in self.batches() {
            if remaining == 0 {
                break;
            }
            let take = remaining.min(batch.num_rows());
            slices.push(batch.slice(0, take));
            remaining -= take;
        }
        Ok(concat_batches(&self.schema(), &slices)?)
    }

    /// Name, type and null count for every column.
    pub fn column_info(&self) -> Vec<ColumnInfo> {
        let schema = self.schema();
        schema
            .fields()
            .iter()
            .enumerate()
            .map(|(idx, field)| ColumnInfo {
                name: field.name().clone(),
                data_type: field.data_type().clone(),
                null_count: self
                    .batches()
                    .iter()
                    .map(|b| b.column(idx).null_count())
                    .sum(),
            })
            .collect()
    }
}
