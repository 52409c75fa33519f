//! tabsql CLI entry point.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use comfy_table::Table;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use tabsql::cli::{
    format_size, write_column_info, Args, ExportFormat, Exporter, OutputFormatter, Repl,
    ReplCommand, ReplInput,
};
use tabsql::query::{
    example_queries, placeholder_query, EngineKind, QueryEngine, QueryResult, SQL_REFERENCE,
};
use tabsql::session::{Session, TableBinding, DEFAULT_PREVIEW_ROWS};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Set up logging
    let filter = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with_writer(io::stderr)
        .init();

    let mut session = Session::new();
    for path in &args.files {
        let binding = session
            .load_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))?;
        eprintln!("{}", describe_binding(binding));
    }

    for (file, table) in &args.tables {
        session
            .rename(file, table)
            .with_context(|| format!("Failed to bind {file} as {table}"))?;
    }

    let formatter = OutputFormatter::new(args.format);
    let engine = QueryEngine::new(args.engine);

    if args.is_info_only() {
        if session.is_empty() {
            bail!("No input files. Use --help for usage.");
        }
        let mut stdout = io::stdout();
        for binding in session.bindings() {
            if args.show_schema {
                print_schema(binding, &mut stdout)?;
            }
            if let Some(rows) = args.preview {
                print_preview(binding, rows, &formatter, &mut stdout)?;
            }
        }
        return Ok(());
    }

    // Query from -e or -f
    let query = match (&args.query, &args.query_file) {
        (Some(query), _) => Some(query.clone()),
        (None, Some(query_file)) => Some(
            std::fs::read_to_string(query_file)
                .with_context(|| format!("Failed to read query file: {}", query_file.display()))?,
        ),
        (None, None) => None,
    };

    if let Some(query) = query {
        let result = session.run_query(&query, &engine).await?;
        report_result(&result);

        // Export if output file specified
        if let Some(output_path) = &args.output {
            let export_format = args
                .export_format
                .or_else(|| ExportFormat::from_extension(output_path))
                .unwrap_or(ExportFormat::Csv);

            let rows = Exporter::export(output_path, export_format, &result)?;
            eprintln!("Exported {} rows to {}", rows, output_path.display());
        } else {
            formatter.write(&result, &mut io::stdout())?;
        }
        return Ok(());
    }

    // Interactive REPL
    run_repl(session, engine, &formatter).await
}

fn describe_binding(binding: &TableBinding) -> String {
    format!(
        "Loaded {} as table '{}' ({} rows, {} columns)",
        binding.file_name(),
        binding.table_name(),
        binding.num_rows(),
        binding.num_columns()
    )
}

/// Row and column counts plus data size, on stderr so stdout stays clean.
fn report_result(result: &QueryResult) {
    if result.is_empty() {
        warn!("Query returned no rows");
        eprintln!("Query returned no results");
    }
    eprintln!(
        "{} rows, {} columns ({})",
        result.num_rows(),
        result.num_columns(),
        format_size(result.memory_size())
    );
}

fn print_schema<W: Write>(binding: &TableBinding, out: &mut W) -> io::Result<()> {
    writeln!(
        out,
        "Table: {} ({}, {} rows)",
        binding.table_name(),
        binding.file_name(),
        binding.num_rows()
    )?;
    write_column_info(&binding.column_info(), out)
}

fn print_preview<W: Write>(
    binding: &TableBinding,
    rows: usize,
    formatter: &OutputFormatter,
    out: &mut W,
) -> Result<()> {
    let batch = binding.preview(rows)?;
    writeln!(out, "Preview of {} (first {} rows):", binding.table_name(), batch.num_rows())?;
    formatter.write_batches(&batch.schema(), &[batch], out)?;
    Ok(())
}

async fn run_repl(
    mut session: Session,
    mut engine: QueryEngine,
    formatter: &OutputFormatter,
) -> Result<()> {
    let history_path = dirs::data_local_dir()
        .map(|d| d.join("tabsql").join("history.txt"))
        .unwrap_or_else(|| PathBuf::from(".tabsql_history"));

    // Create parent directory if needed
    if let Some(parent) = history_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let mut repl = Repl::new()?.with_history(history_path.to_str().unwrap_or(".tabsql_history"));

    // Last query result, for .export without a query
    let mut last_result: Option<QueryResult> = None;

    println!("tabsql - Query CSV and Excel files with SQL");
    if session.is_empty() {
        println!("No tables loaded. Use .load <file> to add one.");
    } else {
        println!("Tables: {}", session.table_names().join(", "));
        println!("Try: {}", placeholder_query(session.table_names().as_slice()));
    }
    println!("Engine: {engine}. Type .help for help, .quit to exit");
    println!();

    loop {
        let cmd = match repl.read_input()? {
            ReplInput::Exit => {
                println!("Goodbye!");
                break;
            }
            ReplInput::Command(cmd) => cmd,
        };

        match cmd {
            ReplCommand::Empty => continue,
            ReplCommand::Quit => {
                println!("Goodbye!");
                break;
            }
            ReplCommand::Help => print_help(),
            ReplCommand::HelpSql => print_sql_help(),
            ReplCommand::Tables => print_tables(&session),
            ReplCommand::Examples => {
                println!("{}", example_queries(session.table_names().as_slice()))
            }
            ReplCommand::Unknown(s) => {
                eprintln!("Unknown command: {s}");
                eprintln!("Type .help for available commands");
            }
            ReplCommand::Schema(table) => {
                let mut stdout = io::stdout();
                let bindings: Vec<&TableBinding> = match &table {
                    Some(key) => match session.resolve(key) {
                        Some(binding) => vec![binding],
                        None => {
                            eprintln!("No table bound as '{key}'");
                            continue;
                        }
                    },
                    None => session.bindings().iter().collect(),
                };
                for binding in bindings {
                    if let Err(e) = print_schema(binding, &mut stdout) {
                        eprintln!("Error writing output: {e}");
                    }
                }
            }
            ReplCommand::Preview(key, rows) => match session.resolve(&key) {
                Some(binding) => {
                    let rows = rows.unwrap_or(DEFAULT_PREVIEW_ROWS);
                    if let Err(e) = print_preview(binding, rows, formatter, &mut io::stdout()) {
                        eprintln!("Error: {e}");
                    }
                }
                None => eprintln!("No table bound as '{key}'"),
            },
            ReplCommand::Load(path) => match session.load_file(Path::new(&path)) {
                Ok(binding) => println!("{}", describe_binding(binding)),
                Err(e) => eprintln!("Error: {e}"),
            },
            ReplCommand::Rename(key, new_name) => match session.rename(&key, &new_name) {
                Ok(()) => println!("Renamed '{key}' to '{new_name}'"),
                Err(e) => eprintln!("Error: {e}"),
            },
            ReplCommand::Drop(key) => match session.remove(&key) {
                Ok(binding) => println!(
                    "Removed table '{}' ({})",
                    binding.table_name(),
                    binding.file_name()
                ),
                Err(e) => eprintln!("Error: {e}"),
            },
            ReplCommand::Engine(None) => println!("Engine: {engine}"),
            ReplCommand::Engine(Some(name)) => match EngineKind::from_str(&name, true) {
                Ok(kind) => {
                    engine.set_kind(kind);
                    println!("Engine: {engine}");
                }
                Err(_) => eprintln!("Unknown engine '{name}' (expected sqlite or datafusion)"),
            },
            ReplCommand::Sql(query) => match session.run_query(&query, &engine).await {
                Ok(result) => {
                    if let Err(e) = formatter.write(&result, &mut io::stdout()) {
                        eprintln!("Error writing output: {e}");
                    }
                    report_result(&result);
                    last_result = Some(result);
                }
                Err(e) => eprintln!("Error: {e}"),
            },
            ReplCommand::Export(filename, query_opt) => {
                // Determine export format from filename
                let path = PathBuf::from(&filename);
                let format = ExportFormat::from_extension(&path).unwrap_or(ExportFormat::Csv);

                let result = match query_opt {
                    Some(query) => match session.run_query(&query, &engine).await {
                        Ok(result) => result,
                        Err(e) => {
                            eprintln!("Error: {e}");
                            continue;
                        }
                    },
                    None => match &last_result {
                        Some(result) => result.clone(),
                        None => {
                            eprintln!(
                                "No previous query result to export. Run a query first or provide one."
                            );
                            continue;
                        }
                    },
                };

                match Exporter::export(&path, format, &result) {
                    Ok(rows) => println!("Exported {rows} rows to {filename}"),
                    Err(e) => eprintln!("Export error: {e}"),
                }
            }
        }
    }

    Ok(())
}

fn print_help() {
    println!("Commands:");
    println!("  .help                     Show this help");
    println!("  .help sql                 Oracle to SQLite syntax reference");
    println!("  .tables                   List loaded tables");
    println!("  .schema [table]           Show column names, types and null counts");
    println!("  .preview <table> [n]      Show the first n rows (default {DEFAULT_PREVIEW_ROWS})");
    println!("  .load <file>              Load a CSV or Excel file");
    println!("  .rename <table> <name>    Query a table under a new name");
    println!("  .drop <table>             Remove a table");
    println!("  .engine [sqlite|datafusion]  Show or switch the SQL engine");
    println!("  .examples                 Show example queries for the loaded tables");
    println!("  .export <file> [query]    Export to file (format inferred from extension)");
    println!("  .quit                     Exit");
    println!();
    println!("Export formats: .csv, .json/.jsonl, .parquet, .sqlite/.db");
    println!("SQL queries end with a semicolon (;)");
    println!("Quote table names containing spaces: .preview \"Sales Q1\" 5");
}

fn print_sql_help() {
    for (topic, pairs) in SQL_REFERENCE {
        let mut table = Table::new();
        table.set_header(vec!["", "Oracle", "SQLite"]);
        for pair in *pairs {
            table.add_row(vec![pair.feature, pair.oracle, pair.sqlite]);
        }
        println!("{topic}");
        println!("{table}");
    }
    println!("SQLite is the default engine; DataFusion follows PostgreSQL-style syntax.");
}

fn print_tables(session: &Session) {
    if session.is_empty() {
        println!("No tables loaded.");
        return;
    }
    println!("Tables:");
    for binding in session.bindings() {
        println!(
            "  {:<24} {:>8} rows  {:>4} columns  ({}, {})",
            binding.table_name(),
            binding.num_rows(),
            binding.num_columns(),
            binding.file_name(),
            format_size(binding.memory_size())
        );
    }
    println!();
    println!("Try: {}", placeholder_query(session.table_names().as_slice()));
}
