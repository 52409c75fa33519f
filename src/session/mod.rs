//! Active table bindings.
//!
//! A [`Session`] is the context object for one user: it owns every uploaded
//! file's parsed data together with the SQL name it is queried under, in the
//! order the files were loaded.
//!
//! Table names are kept unique, ignoring ASCII case. A newly loaded file
//! whose default name is taken gets a `_2`, `_3`, ... suffix, and renaming
//! onto a name that another binding uses is rejected.

mod binding;

pub use binding::{ColumnInfo, TableBinding, DEFAULT_PREVIEW_ROWS};

use std::path::Path;

use tracing::{debug, info};

use crate::error::{Error, SessionError};
use crate::io::{self, default_table_name, TableData};
use crate::query::{QueryEngine, QueryResult};

/// Uploaded tables and their SQL names.
#[derive(Debug, Default)]
pub struct Session {
    bindings: Vec<TableBinding>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a file from disk and bind it under its default table name.
    ///
    /// A file name that is already bound is not parsed again; the existing
    /// binding is returned.
    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<&TableBinding, Error> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();

        if let Some(idx) = self.position_by_file(&file_name) {
            debug!(file = %file_name, "File already loaded");
            return Ok(&self.bindings[idx]);
        }

        let data = io::read_path(path)?;
        Ok(self.insert(file_name, data))
    }

    /// Bind uploaded file contents under the file's default table name.
    pub fn load_bytes(&mut self, file_name: &str, bytes: &[u8]) -> Result<&TableBinding, Error> {
        if let Some(idx) = self.position_by_file(file_name) {
            debug!(file = %file_name, "File already loaded");
            return Ok(&self.bindings[idx]);
        }

        let data = io::read_bytes(file_name, bytes)?;
        Ok(self.insert(file_name.to_string(), data))
    }

    /// Add parsed data as a new binding, picking a free table name.
    pub fn insert(&mut self, file_name: String, data: TableData) -> &TableBinding {
        let table_name = self.unique_table_name(&default_table_name(&file_name));
        info!(
            file = %file_name,
            table = %table_name,
            rows = data.num_rows(),
            columns = data.num_columns(),
            "Loaded table"
        );
        self.bindings
            .push(TableBinding::new(file_name, table_name, data));
        &self.bindings[self.bindings.len() - 1]
    }

    /// Look up a binding by its source file name.
    pub fn get(&self, file_name: &str) -> Option<&TableBinding> {
        self.position_by_file(file_name).map(|idx| &self.bindings[idx])
    }

    /// Look up a binding by its SQL table name.
    pub fn find_by_table(&self, table_name: &str) -> Option<&TableBinding> {
        self.position_by_table(table_name)
            .map(|idx| &self.bindings[idx])
    }

    /// Look up a binding by table name, falling back to file name.
    pub fn resolve(&self, key: &str) -> Option<&TableBinding> {
        self.position(key).map(|idx| &self.bindings[idx])
    }

    /// Change the SQL name of the binding identified by `key` (table or file name).
    pub fn rename(&mut self, key: &str, new_name: &str) -> Result<(), SessionError> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(SessionError::EmptyTableName);
        }

        let idx = self
            .position(key)
            .ok_or_else(|| SessionError::NotFound(key.to_string()))?;

        if let Some(other) = self.position_by_table(new_name) {
            if other != idx {
                return Err(SessionError::DuplicateTableName(new_name.to_string()));
            }
        }

        info!(
            file = %self.bindings[idx].file_name(),
            from = %self.bindings[idx].table_name(),
            to = %new_name,
            "Renamed table"
        );
        self.bindings[idx].set_table_name(new_name.to_string());
        Ok(())
    }

    /// Delete the binding identified by `key` (table or file name).
    pub fn remove(&mut self, key: &str) -> Result<TableBinding, SessionError> {
        let idx = self
            .position(key)
            .ok_or_else(|| SessionError::NotFound(key.to_string()))?;
        let removed = self.bindings.remove(idx);
        info!(file = %removed.file_name(), table = %removed.table_name(), "Removed table");
        Ok(removed)
    }

    /// Active table names in load order.
    pub fn table_names(&self) -> Vec<&str> {
        self.bindings.iter().map(|b| b.table_name()).collect()
    }

    pub fn bindings(&self) -> &[TableBinding] {
        &self.bindings
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Run `sql` against every active binding.
    pub async fn run_query(&self, sql: &str, engine: &QueryEngine) -> Result<QueryResult, Error> {
        engine.run(sql, &self.bindings).await
    }

    fn position_by_file(&self, file_name: &str) -> Option<usize> {
        self.bindings.iter().position(|b| b.file_name() == file_name)
    }

    // SQLite folds identifier case, so names are unique ignoring ASCII case
    fn position_by_table(&self, table_name: &str) -> Option<usize> {
        self.bindings
            .iter()
            .position(|b| b.table_name().eq_ignore_ascii_case(table_name))
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.position_by_table(key)
            .or_else(|| self.position_by_file(key))
    }

    fn unique_table_name(&self, base: &str) -> String {
        if self.position_by_table(base).is_none() {
            return base.to_string();
        }
        (2..)
            .map(|n| format!("{base}_{n}"))
            .find(|candidate| self.position_by_table(candidate).is_none())
            .unwrap_or_else(|| base.to_string())
    }
}
