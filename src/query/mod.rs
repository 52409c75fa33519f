//! SQL query execution over table bindings.
//!
//! Every call to [`QueryEngine::run`] builds a fresh in-memory database,
//! loads each binding into a table of the same name, executes the query and
//! drops the database again. Nothing is cached between queries.
//!
//! Two embedded engines are available:
//! - SQLite via `rusqlite` (default) - SQLite dialect (`STRFTIME`, `IFNULL`, ...)
//! - Apache DataFusion - Arrow-native, PostgreSQL-flavoured dialect

pub(crate) mod datafusion;
mod examples;
mod result;
pub(crate) mod sqlite;

pub use examples::{example_queries, placeholder_query, SyntaxPair, SQL_REFERENCE};
pub use result::QueryResult;

use std::collections::HashSet;
use std::fmt;
use std::time::Instant;

use clap::ValueEnum;
use tracing::{debug, warn};

use crate::error::{Error, QueryError};
use crate::session::TableBinding;

/// Embedded SQL engine used to run queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum EngineKind {
    /// In-memory SQLite database
    #[default]
    Sqlite,
    /// Apache DataFusion session
    #[value(name = "datafusion")]
    DataFusion,
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineKind::Sqlite => write!(f, "sqlite"),
            EngineKind::DataFusion => write!(f, "datafusion"),
        }
    }
}

/// Runs SQL against a set of table bindings.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryEngine {
    kind: EngineKind,
}

impl QueryEngine {
    pub fn new(kind: EngineKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> EngineKind {
        self.kind
    }

    pub fn set_kind(&mut self, kind: EngineKind) {
        self.kind = kind;
    }

    /// Execute `sql` with every binding registered as a table.
    ///
    /// Bindings are loaded in order, so when two share a table name the later
    /// one replaces the earlier.
    pub async fn run(&self, sql: &str, tables: &[TableBinding]) -> Result<QueryResult, Error> {
        let sql = normalize_sql(sql)?;
        warn_duplicate_names(tables);

        let started = Instant::now();
        let result = match self.kind {
            EngineKind::Sqlite => sqlite::execute(sql, tables)?,
            EngineKind::DataFusion => datafusion::execute(sql, tables).await?,
        };

        debug!(
            engine = %self.kind,
            rows = result.num_rows(),
            columns = result.num_columns(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Query finished"
        );
        Ok(result)
    }
}

impl fmt::Display for QueryEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind.fmt(f)
    }
}

/// Trim surrounding whitespace and trailing semicolons; reject blank input.
fn normalize_sql(sql: &str) -> Result<&str, QueryError> {
    let sql = sql.trim().trim_end_matches(|c: char| c == ';' || c.is_whitespace());
    if sql.is_empty() {
        Err(QueryError::Empty)
    } else {
        Ok(sql)
    }
}

fn warn_duplicate_names(tables: &[TableBinding]) {
    let mut seen = HashSet::new();
    for binding in tables {
        if !seen.insert(binding.table_name()) {
            warn!(
                table = %binding.table_name(),
                file = %binding.file_name(),
                "Duplicate table name, later file replaces earlier"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::read_csv;
    use arrow::array::{Array, Int64Array};

    fn binding(file: &str, table: &str, csv: &str) -> TableBinding {
        TableBinding::new(file, table, read_csv(file, csv.as_bytes(), 1024).unwrap())
    }

    #[test]
    fn test_normalize_sql() {
        assert_eq!(normalize_sql("  SELECT 1;  ").unwrap(), "SELECT 1");
        assert_eq!(normalize_sql("SELECT 1;;\n").unwrap(), "SELECT 1");
        assert!(matches!(normalize_sql("   \n"), Err(QueryError::Empty)));
        assert!(matches!(normalize_sql(";"), Err(QueryError::Empty)));
    }

    #[test]
    fn test_engine_kind_parse() {
        assert_eq!(
            EngineKind::from_str("SQLite", true).unwrap(),
            EngineKind::Sqlite
        );
        assert_eq!(
            EngineKind::from_str("datafusion", true).unwrap(),
            EngineKind::DataFusion
        );
        assert_eq!(EngineKind::DataFusion.to_string(), "datafusion");
    }

    #[test]
    fn test_engine_display_follows_kind() {
        let mut engine = QueryEngine::default();
        assert_eq!(format!("Engine: {engine}"), "Engine: sqlite");
        engine.set_kind(EngineKind::DataFusion);
        assert_eq!(engine.to_string(), "datafusion");
    }

    #[tokio::test]
    async fn test_empty_query_rejected_on_both_engines() {
        let tables = vec![binding("t.csv", "t", "a\n1\n")];
        for kind in [EngineKind::Sqlite, EngineKind::DataFusion] {
            let err = QueryEngine::new(kind).run("  ", &tables).await.unwrap_err();
            assert!(matches!(err, Error::Query(QueryError::Empty)));
        }
    }

    #[tokio::test]
    async fn test_later_binding_replaces_earlier() {
        let tables = vec![
            binding("old.csv", "t", "v\n1\n"),
            binding("new.csv", "t", "v\n2\n"),
        ];
        for kind in [EngineKind::Sqlite, EngineKind::DataFusion] {
            let result = QueryEngine::new(kind)
                .run("SELECT v FROM t", &tables)
                .await
                .unwrap();
            assert_eq!(result.num_rows(), 1);
            let batch = result.concat().unwrap();
            let col = batch.column(0).as_any().downcast_ref::<Int64Array>().unwrap();
            assert_eq!(col.value(0), 2, "engine {kind}");
        }
    }
}
