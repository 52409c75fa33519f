//! Excel workbook reading.
//!
//! Only the first worksheet is read. Its first row is the header; the rest
//! are data rows. Column types are inferred from the cell values:
//!
//! | cells in column               | Arrow type              |
//! |-------------------------------|-------------------------|
//! | integral numbers only         | `Int64`                 |
//! | numbers                       | `Float64`               |
//! | booleans only                 | `Boolean`               |
//! | date-times only               | `Timestamp(Millisecond)`|
//! | anything else / mixed / empty | `Utf8`                  |
//!
//! Empty and error cells (`#DIV/0!`, `#N/A`, ...) are nulls.

use std::io::Cursor;
use std::sync::Arc;

use arrow::array::{
    ArrayRef, BooleanArray, Float64Array, Int64Array, RecordBatch, StringArray,
    TimestampMillisecondArray,
};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use calamine::{open_workbook_auto_from_rs, Data, DataType as _, Range, Reader};
use tracing::debug;

use super::{normalize_headers, utf8_schema, TableData};
use crate::error::LoadError;

/// Inferred kind of a worksheet column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Int,
    Float,
    Bool,
    DateTime,
    Text,
}

impl ColumnKind {
    fn data_type(self) -> DataType {
        match self {
            ColumnKind::Int => DataType::Int64,
            ColumnKind::Float => DataType::Float64,
            ColumnKind::Bool => DataType::Boolean,
            ColumnKind::DateTime => DataType::Timestamp(TimeUnit::Millisecond, None),
            ColumnKind::Text => DataType::Utf8,
        }
    }
}

/// Parse workbook bytes into record batches using the first sheet.
pub fn read_excel(file_name: &str, bytes: &[u8]) -> Result<TableData, LoadError> {
    let excel_error = |reason: String| LoadError::Excel {
        file: file_name.to_string(),
        reason,
    };

    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| excel_error(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| LoadError::NoSheets {
            file: file_name.to_string(),
        })?
        .map_err(|e| excel_error(e.to_string()))?;

    range_to_table(file_name, &range)
}

/// Convert a worksheet range (header row first) into a table.
pub(crate) fn range_to_table(file_name: &str, range: &Range<Data>) -> Result<TableData, LoadError> {
    let mut rows = range.rows();
    let header = rows.next().ok_or_else(|| LoadError::Empty {
        file: file_name.to_string(),
    })?;
    let names = normalize_headers(header.iter().map(cell_to_string));
    let body: Vec<&[Data]> = rows.collect();

    if body.is_empty() {
        return Ok(TableData::new(utf8_schema(&names), Vec::new()));
    }

    let mut fields = Vec::with_capacity(names.len());
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(names.len());

    for (col_idx, name) in names.iter().enumerate() {
        let cells: Vec<&Data> = body.iter().map(|row| &row[col_idx]).collect();
        let kind = infer_kind(&cells);
        debug!(file = file_name, column = %name, ?kind, "Inferred worksheet column");

        fields.push(Field::new(name, kind.data_type(), true));
        columns.push(build_column(kind, &cells));
    }

    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), columns).map_err(|e| LoadError::Excel {
        file: file_name.to_string(),
        reason: e.to_string(),
    })?;

    Ok(TableData::new(schema, vec![batch]))
}

fn is_blank(cell: &Data) -> bool {
    matches!(cell, Data::Empty | Data::Error(_))
}

fn is_integral(f: f64) -> bool {
    f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64
}

fn infer_kind(cells: &[&Data]) -> ColumnKind {
    let mut has_int = false;
    let mut has_float = false;
    let mut has_bool = false;
    let mut has_datetime = false;

    for cell in cells {
        match cell {
            Data::Empty | Data::Error(_) => {}
            Data::Int(_) => has_int = true,
            Data::Float(f) if is_integral(*f) => has_int = true,
            Data::Float(_) => has_float = true,
            Data::Bool(_) => has_bool = true,
            Data::DateTime(_) => has_datetime = true,
            _ => return ColumnKind::Text,
        }
    }

    match (has_int || has_float, has_bool, has_datetime) {
        (true, false, false) if has_float => ColumnKind::Float,
        (true, false, false) => ColumnKind::Int,
        (false, true, false) => ColumnKind::Bool,
        (false, false, true) => ColumnKind::DateTime,
        _ => ColumnKind::Text,
    }
}

fn build_column(kind: ColumnKind, cells: &[&Data]) -> ArrayRef {
    match kind {
        ColumnKind::Int => Arc::new(Int64Array::from(
            cells
                .iter()
                .map(|cell| match cell {
                    Data::Int(i) => Some(*i),
                    Data::Float(f) => Some(*f as i64),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        ColumnKind::Float => Arc::new(Float64Array::from(
            cells
                .iter()
                .map(|cell| match cell {
                    Data::Int(i) => Some(*i as f64),
                    Data::Float(f) => Some(*f),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        ColumnKind::Bool => Arc::new(BooleanArray::from(
            cells
                .iter()
                .map(|cell| match cell {
                    Data::Bool(b) => Some(*b),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        ColumnKind::DateTime => Arc::new(TimestampMillisecondArray::from(
            cells
                .iter()
                .map(|cell| {
                    cell.as_datetime()
                        .map(|dt| dt.and_utc().timestamp_millis())
                })
                .collect::<Vec<_>>(),
        )),
        ColumnKind::Text => Arc::new(StringArray::from(
            cells
                .iter()
                .map(|cell| (!is_blank(cell)).then(|| cell_to_string(cell)))
                .collect::<Vec<_>>(),
        )),
    }
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::DateTime(_) => cell
            .as_datetime()
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| cell.to_string()),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Array;

    fn sheet(rows: &[Vec<Data>]) -> Range<Data> {
        let height = rows.len() as u32;
        let width = rows[0].len() as u32;
        let mut range = Range::new((0, 0), (height - 1, width - 1));
        for (r, row) in rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                range.set_value((r as u32, c as u32), cell.clone());
            }
        }
        range
    }

    fn s(v: &str) -> Data {
        Data::String(v.to_string())
    }

    #[test]
    fn test_range_to_table_types() {
        let range = sheet(&[
            vec![s("id"), s("price"), s("active"), s("label")],
            vec![Data::Float(1.0), Data::Float(2.5), Data::Bool(true), s("a")],
            vec![Data::Float(2.0), Data::Int(3), Data::Bool(false), Data::Int(7)],
            vec![Data::Int(3), Data::Empty, Data::Empty, Data::Empty],
        ]);

        let table = range_to_table("book.xlsx", &range).unwrap();
        assert_eq!(table.num_rows(), 3);
        assert_eq!(table.num_columns(), 4);

        let schema = table.schema();
        assert_eq!(schema.field(0).data_type(), &DataType::Int64);
        assert_eq!(schema.field(1).data_type(), &DataType::Float64);
        assert_eq!(schema.field(2).data_type(), &DataType::Boolean);
        assert_eq!(schema.field(3).data_type(), &DataType::Utf8);

        let batch = &table.batches()[0];
        let ids = batch.column(0).as_any().downcast_ref::<Int64Array>().unwrap();
        assert_eq!(ids.values().to_vec(), vec![1, 2, 3]);
        assert!(batch.column(1).is_null(2));

        let labels = batch.column(3).as_any().downcast_ref::<StringArray>().unwrap();
        assert_eq!(labels.value(1), "7");
        assert!(labels.is_null(2));
    }

    #[test]
    fn test_range_to_table_header_cleanup() {
        let range = sheet(&[
            vec![s("x"), Data::Empty, s("x")],
            vec![Data::Int(1), Data::Int(2), Data::Int(3)],
        ]);

        let table = range_to_table("book.xlsx", &range).unwrap();
        let schema = table.schema();
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
        assert_eq!(names, vec!["x", "Unnamed: 1", "x.1"]);
    }

    #[test]
    fn test_range_to_table_header_only() {
        let range = sheet(&[vec![s("a"), s("b")]]);
        let table = range_to_table("book.xlsx", &range).unwrap();
        assert_eq!(table.num_rows(), 0);
        assert_eq!(table.num_columns(), 2);
    }

    #[test]
    fn test_range_to_table_empty_sheet() {
        let range: Range<Data> = Range::empty();
        assert!(matches!(
            range_to_table("book.xlsx", &range),
            Err(LoadError::Empty { .. })
        ));
    }

    #[test]
    fn test_error_cells_are_null() {
        let range = sheet(&[
            vec![s("ratio")],
            vec![Data::Float(0.5)],
            vec![Data::Error(calamine::CellErrorType::Div0)],
        ]);
        let table = range_to_table("book.xlsx", &range).unwrap();
        assert_eq!(table.schema().field(0).data_type(), &DataType::Float64);
        assert!(table.batches()[0].column(0).is_null(1));
    }

    /// Two-sheet workbook: a typed inventory first, then a sheet that must be ignored.
    fn inventory_workbook() -> Vec<u8> {
        use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

        let mut workbook = Workbook::new();
        let stamp = Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");

        let sheet = workbook.add_worksheet();
        for (col, name) in ["sku", "item", "price", "in_stock", "restocked"]
            .into_iter()
            .enumerate()
        {
            sheet.write_string(0, col as u16, name).unwrap();
        }
        let rows = [
            (101, "Widget", Some(2.5), true, 10u16),
            (102, "Gadget", Some(4.75), false, 11),
            (103, "Gizmo", None, true, 12),
        ];
        for (i, (sku, item, price, in_stock, hour)) in rows.into_iter().enumerate() {
            let row = i as u32 + 1;
            sheet.write_number(row, 0, sku).unwrap();
            sheet.write_string(row, 1, item).unwrap();
            if let Some(price) = price {
                sheet.write_number(row, 2, price).unwrap();
            }
            sheet.write_boolean(row, 3, in_stock).unwrap();
            let when = ExcelDateTime::from_ymd(2024, 1, 15)
                .unwrap()
                .and_hms(hour, 0, 0)
                .unwrap();
            sheet.write_datetime_with_format(row, 4, &when, &stamp).unwrap();
        }

        let notes = workbook.add_worksheet();
        notes.set_name("Notes").unwrap();
        notes.write_string(0, 0, "ignored").unwrap();

        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn test_read_excel_first_sheet_types() {
        let table = read_excel("inventory.xlsx", &inventory_workbook()).unwrap();
        assert_eq!(table.num_rows(), 3);
        assert_eq!(table.num_columns(), 5);

        let schema = table.schema();
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
        assert_eq!(names, vec!["sku", "item", "price", "in_stock", "restocked"]);
        assert_eq!(schema.field(0).data_type(), &DataType::Int64);
        assert_eq!(schema.field(1).data_type(), &DataType::Utf8);
        assert_eq!(schema.field(2).data_type(), &DataType::Float64);
        assert_eq!(schema.field(3).data_type(), &DataType::Boolean);
        assert_eq!(
            schema.field(4).data_type(),
            &DataType::Timestamp(TimeUnit::Millisecond, None)
        );

        let batch = &table.batches()[0];
        let skus = batch.column(0).as_any().downcast_ref::<Int64Array>().unwrap();
        assert_eq!(skus.values().to_vec(), vec![101, 102, 103]);
        assert!(batch.column(2).is_null(2));

        let restocked = batch
            .column(4)
            .as_any()
            .downcast_ref::<TimestampMillisecondArray>()
            .unwrap();
        // 2024-01-15 10:00:00
        assert_eq!(restocked.value(0), 1_705_312_800_000);
        assert_eq!(restocked.value(2) - restocked.value(0), 2 * 3_600_000);
    }

    #[test]
    fn test_read_excel_rejects_garbage() {
        assert!(matches!(
            read_excel("broken.xlsx", b"not a workbook"),
            Err(LoadError::Excel { .. })
        ));
    }
}
