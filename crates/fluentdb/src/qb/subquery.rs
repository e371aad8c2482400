//! Builders that only produce SQL for embedding in a parent statement.

use super::build::{BuildContext, build_select};
use super::clauses::Clauses;
use super::operand::{SubqueryProvider, SubquerySql};
use super::statement::{Columns, Limit, Statement};
use crate::config::SecurityMode;
use crate::error::{DbError, DbResult};
use crate::schema::{ColumnLookup, NoLookup, SessionLookup};
use crate::session::Session;
use fluentdb_guard::TableName;
use std::sync::Arc;

/// A SELECT builder that never executes.
///
/// `get` serializes the accumulated clauses into a [`SubquerySql`], which can
/// then be passed to `where_in`, `where_exists`, `join_sub` or used as an
/// insert / update value.
#[derive(Debug, Clone)]
pub struct SubQuery {
    session: Option<Arc<Session>>,
    connection: String,
    prefix: String,
    mode: SecurityMode,
    alias: Option<String>,
    stmt: Statement,
    built: Option<SubquerySql>,
}

fn validate_alias(alias: Option<&str>) -> DbResult<Option<String>> {
    match alias.map(str::trim).filter(|a| !a.is_empty()) {
        None => Ok(None),
        Some(a) if fluentdb_guard::is_plain_column(a) && !a.contains('.') => {
            Ok(Some(a.to_string()))
        }
        Some(a) => Err(DbError::validation(format!("Invalid subquery alias: {a}"))),
    }
}

impl SubQuery {
    /// A detached subquery. Suspicious values cannot be resolved without a
    /// session, so deferred conditions are rejected at `get`.
    pub fn new(alias: Option<&str>) -> DbResult<Self> {
        Ok(Self {
            session: None,
            connection: String::new(),
            prefix: String::new(),
            mode: SecurityMode::default(),
            alias: validate_alias(alias)?,
            stmt: Statement::default(),
            built: None,
        })
    }

    pub(crate) fn attached(
        session: Arc<Session>,
        connection: &str,
        prefix: &str,
        mode: SecurityMode,
        alias: Option<&str>,
    ) -> DbResult<Self> {
        Ok(Self {
            session: Some(session),
            connection: connection.to_string(),
            prefix: prefix.to_string(),
            mode,
            ..Self::new(alias)?
        })
    }

    pub fn with_prefix(mut self, prefix: &str) -> DbResult<Self> {
        if !crate::config::is_valid_prefix(prefix) {
            return Err(DbError::config(format!("invalid table prefix: {prefix}")));
        }
        self.prefix = prefix.to_string();
        Ok(self)
    }

    pub fn with_security_mode(mut self, mode: SecurityMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn statement(&self) -> &Statement {
        &self.stmt
    }

    /// Serialize `SELECT columns FROM table ...` and keep the result for
    /// [`SubqueryProvider::subquery`]. The clause state is cleared either way.
    pub fn get(
        &mut self,
        table: &str,
        limit: impl Into<Limit>,
        columns: impl Into<Columns>,
    ) -> DbResult<SubquerySql> {
        let stmt = std::mem::take(&mut self.stmt);
        let table = TableName::parse(table)?;
        let built = match &self.session {
            Some(session) => {
                let lookup = SessionLookup::new(session, &self.connection);
                self.build(&stmt, &table, limit.into(), &columns.into(), &lookup)
            }
            None => self.build(&stmt, &table, limit.into(), &columns.into(), &NoLookup),
        }?;
        let sub = built.into_subquery(self.alias.clone());
        self.built = Some(sub.clone());
        Ok(sub)
    }

    fn build(
        &self,
        stmt: &Statement,
        table: &TableName,
        limit: Limit,
        columns: &Columns,
        lookup: &dyn ColumnLookup,
    ) -> DbResult<super::build::BuiltQuery> {
        let ctx = BuildContext {
            prefix: &self.prefix,
            lookup,
        };
        build_select(stmt, table, columns, limit, &ctx)
    }
}

impl Clauses for SubQuery {
    fn statement_mut(&mut self) -> &mut Statement {
        &mut self.stmt
    }

    fn security_mode(&self) -> SecurityMode {
        self.mode
    }
}

impl SubqueryProvider for SubQuery {
    fn subquery(&self) -> DbResult<SubquerySql> {
        self.built
            .clone()
            .ok_or_else(|| DbError::validation("subquery has not been built; call get() first"))
    }
}
