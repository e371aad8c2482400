//! Column metadata for deferred value checks.
//!
//! Deferred conditions need the declared type of the column they compare
//! against. Types are fetched with one `SHOW COLUMNS` per table and kept for
//! the lifetime of the session; schema changes are not picked up.

use crate::driver::Params;
use crate::error::{DbError, DbResult};
use crate::session::Session;
use fluentdb_guard::ColumnType;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// One column as reported by `SHOW COLUMNS`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnMeta {
    pub name: String,
    pub column_type: ColumnType,
    pub nullable: bool,
}

/// Columns of one table, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct TableColumns {
    pub table: String,
    pub columns: Vec<ColumnMeta>,
}

impl TableColumns {
    /// Column lookup, ignoring case as MySQL does.
    pub fn column(&self, name: &str) -> Option<&ColumnMeta> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

/// Process-lifetime cache keyed by `connection/table`.
#[derive(Debug, Default)]
pub struct MetadataCache {
    tables: RwLock<HashMap<String, Arc<TableColumns>>>,
}

impl MetadataCache {
    fn key(connection: &str, table: &str) -> String {
        format!("{connection}/{}", table.to_ascii_lowercase())
    }

    pub fn get(&self, connection: &str, table: &str) -> Option<Arc<TableColumns>> {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&Self::key(connection, table))
            .cloned()
    }

    pub fn insert(&self, connection: &str, columns: TableColumns) -> Arc<TableColumns> {
        let columns = Arc::new(columns);
        self.tables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(Self::key(connection, &columns.table), Arc::clone(&columns));
        columns
    }

    pub fn len(&self) -> usize {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Source of declared column types.
pub trait ColumnLookup {
    /// Columns of `table` (already prefixed). Unknown tables are errors.
    fn table_columns(&self, table: &str) -> DbResult<Arc<TableColumns>>;
}

/// Looks tables up through a session connection, caching the result.
pub struct SessionLookup<'a> {
    session: &'a Session,
    connection: &'a str,
}

impl<'a> SessionLookup<'a> {
    pub fn new(session: &'a Session, connection: &'a str) -> Self {
        Self {
            session,
            connection,
        }
    }
}

impl ColumnLookup for SessionLookup<'_> {
    fn table_columns(&self, table: &str) -> DbResult<Arc<TableColumns>> {
        if let Some(hit) = self.session.metadata().get(self.connection, table) {
            return Ok(hit);
        }

        // `table` is a validated TableName rendering, so it is safe to splice.
        let sql = format!("SHOW COLUMNS FROM {table}");
        tracing::debug!(target: "fluentdb.guard", table, "loading column metadata");
        let rows = self
            .session
            .with_connection(self.connection, |conn| conn.query(&sql, &Params::Empty))?;
        if rows.is_empty() {
            return Err(DbError::NotFound(format!("table {table} has no columns")));
        }

        let columns = rows
            .iter()
            .map(|row| {
                Ok(ColumnMeta {
                    name: row.try_get::<String>("Field")?,
                    column_type: ColumnType::parse(&row.try_get::<String>("Type")?),
                    nullable: row
                        .try_get::<Option<String>>("Null")?
                        .is_some_and(|n| n.eq_ignore_ascii_case("YES")),
                })
            })
            .collect::<DbResult<Vec<_>>>()?;

        Ok(self.session.metadata().insert(
            self.connection,
            TableColumns {
                table: table.to_string(),
                columns,
            },
        ))
    }
}

/// A lookup for statements that must never touch the database.
pub struct NoLookup;

impl ColumnLookup for NoLookup {
    fn table_columns(&self, table: &str) -> DbResult<Arc<TableColumns>> {
        Err(DbError::validation(format!(
            "column metadata for {table} is not available here"
        )))
    }
}
