//! DataFusion engine: bindings become `MemTable`s in a fresh session.

use std::sync::Arc;

use datafusion::common::TableReference;
use datafusion::config::ConfigOptions;
use datafusion::datasource::MemTable;
use datafusion::error::DataFusionError;
use datafusion::prelude::*;
use tracing::debug;

use super::QueryResult;
use crate::error::QueryError;
use crate::session::TableBinding;

/// Session tuned for small interactive queries over uploaded files.
fn create_session_context() -> SessionContext {
    let mut config = ConfigOptions::default();

    // Table names come from file names; keep their case as bound
    config.sql_parser.enable_ident_normalization = false;
    // Everything is in memory; one partition per table
    config.execution.target_partitions = 1;

    SessionContext::new_with_config(config.into())
}

/// Run `sql` in a throwaway session holding `tables`.
pub async fn execute(sql: &str, tables: &[TableBinding]) -> Result<QueryResult, QueryError> {
    let ctx = create_session_context();

    for binding in tables {
        let provider = MemTable::try_new(binding.schema(), vec![binding.batches().to_vec()])?;
        let name = TableReference::bare(binding.table_name());
        ctx.deregister_table(name.clone())?;
        ctx.register_table(name, Arc::new(provider))?;
        debug!(table = binding.table_name(), rows = binding.num_rows(), "Registered MemTable");
    }

    let df = ctx.sql(sql).await?;
    let schema = df.schema().inner().clone();
    let batches = df.collect().await?;

    Ok(QueryResult::new(schema, batches))
}

/// Map a DataFusion error onto a query error category.
pub(crate) fn classify_error(err: DataFusionError) -> QueryError {
    if let DataFusionError::SQL(..) = err.find_root() {
        return QueryError::Syntax(err.to_string());
    }

    let message = err.to_string();
    if message.contains("ParserError") {
        return QueryError::Syntax(message);
    }

    // "table 'datafusion.public.<name>' not found"
    if let Some(rest) = message.split("table '").nth(1) {
        if let Some((qualified, tail)) = rest.split_once('\'') {
            if tail.trim_start().starts_with("not found") {
                let table = qualified
                    .strip_prefix("datafusion.public.")
                    .unwrap_or(qualified);
                return QueryError::UnknownTable {
                    table: table.to_string(),
                };
            }
        }
    }

    // "No field named <column>. Valid fields are ..."
    if let Some(rest) = message.split("No field named ").nth(1) {
        let column = rest
            .split(". Valid fields")
            .next()
            .unwrap_or(rest)
            .trim_end_matches('.')
            .trim_matches('"');
        return QueryError::UnknownColumn {
            column: column.to_string(),
        };
    }

    QueryError::Execution(message)
}
