//! Command-line interface module.
//!
//! This module handles:
//! - Argument parsing via clap
//! - Interactive REPL via rustyline
//! - Output formatting (table, CSV, JSON)
//! - Export functionality (CSV, JSON, Parquet, SQLite files)

mod args;
mod export;
mod output;
mod repl;

pub use args::{parse_table_mapping, Args, ExportFormat};
pub use export::{Exporter, SQLITE_EXPORT_TABLE};
pub use output::{format_size, write_column_info, OutputFormat, OutputFormatter};
pub use repl::{Repl, ReplCommand, ReplInput};
