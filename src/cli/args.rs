//! Command-line argument definitions.

use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};

use super::OutputFormat;
use crate::query::EngineKind;

/// Export file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    /// Comma-separated values, UTF-8 with byte-order mark
    Csv,
    /// JSON Lines (one JSON object per row)
    Json,
    /// Apache Parquet columnar format
    Parquet,
    /// SQLite database file (table `query_result`)
    Sqlite,
}

impl ExportFormat {
    /// Infer export format from file extension.
    pub fn from_extension(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .and_then(|ext| match ext.as_str() {
                "csv" => Some(ExportFormat::Csv),
                "json" | "jsonl" | "ndjson" => Some(ExportFormat::Json),
                "parquet" | "pq" => Some(ExportFormat::Parquet),
                "sqlite" | "sqlite3" | "db" => Some(ExportFormat::Sqlite),
                _ => None,
            })
    }
}

/// Parse a `FILE=TABLE` pair for `--table`.
///
/// Bindings are keyed by file name, so a path is reduced to its last component.
pub fn parse_table_mapping(s: &str) -> Result<(String, String), String> {
    let (file, table) = s
        .split_once('=')
        .ok_or_else(|| format!("Expected FILE=TABLE, got '{s}'"))?;
    let (file, table) = (file.trim(), table.trim());
    if file.is_empty() || table.is_empty() {
        return Err(format!("Expected FILE=TABLE, got '{s}'"));
    }
    let file = Path::new(file)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(file);
    Ok((file.to_string(), table.to_string()))
}

/// Query CSV and Excel files using SQL syntax.
#[derive(Parser, Debug)]
#[command(name = "tabsql")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// CSV or Excel files to load (each becomes a table named after the file)
    #[arg(value_name = "FILES")]
    pub files: Vec<PathBuf>,

    /// Bind a loaded file under a different table name
    #[arg(short = 't', long = "table", value_name = "FILE=TABLE", value_parser = parse_table_mapping)]
    pub tables: Vec<(String, String)>,

    /// Execute a single SQL query and exit
    #[arg(short = 'e', long = "execute", value_name = "SQL")]
    pub query: Option<String>,

    /// Read SQL query from file
    #[arg(short = 'f', long = "file", value_name = "QUERY_FILE")]
    pub query_file: Option<PathBuf>,

    /// SQL engine used to run queries
    #[arg(long = "engine", value_enum, default_value = "sqlite")]
    pub engine: EngineKind,

    /// Output format for stdout
    #[arg(long = "format", value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Export query results to file
    #[arg(short = 'o', long = "output", value_name = "OUTPUT_FILE")]
    pub output: Option<PathBuf>,

    /// Export format (inferred from extension if not specified)
    #[arg(long = "export-format", value_enum, value_name = "FORMAT")]
    pub export_format: Option<ExportFormat>,

    /// Print the first N rows of every loaded table
    #[arg(long = "preview", value_name = "N")]
    pub preview: Option<usize>,

    /// Show column names, types and null counts of loaded tables
    #[arg(long = "schema")]
    pub show_schema: bool,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Check if we should enter interactive REPL mode.
    pub fn is_interactive(&self) -> bool {
        self.query.is_none() && self.query_file.is_none() && !self.is_info_only()
    }

    /// Check if this is an info-only command (print table details and exit).
    pub fn is_info_only(&self) -> bool {
        self.show_schema || self.preview.is_some()
    }
}
