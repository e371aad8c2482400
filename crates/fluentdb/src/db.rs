//! The executor: a fluent builder bound to a named connection.
//!
//! [`Db`] accumulates clauses through [`Clauses`], and its terminal methods
//! (`get`, `insert`, `update`, `delete`, `raw_query`, ...) build the statement,
//! run it on the session connection and reset the clause state, whether the
//! call succeeded or not.
//!
//! ```ignore
//! use fluentdb::prelude::*;
//!
//! let mut db = Db::mysql(ConnectionProfile::new("localhost", "app", "secret", "shop"));
//! let users = db
//!     .where_("age", 30)?
//!     .where_("status", "active")?
//!     .get("users", Limit::All, "*")?;
//!
//! db.where_("id", 1)?.update("posts", data! { "views" => inc(1) }, Limit::All)?;
//! ```

mod execute;
mod import;
mod raw;
mod read;
mod transaction;
mod write;


pub use execute::TraceEntry;
pub use import::{LoadDataSettings, LoadXmlSettings};
pub use raw::{RawOutcome, RawValue};
pub use transaction::LockMethod;

use crate::config::{ConnectionProfile, DEFAULT_CONNECTION, DbConfig, SecurityMode, is_valid_prefix};
use crate::driver::Connector;
use crate::error::{DbError, DbResult};
use crate::monitor::SqlLogger;
use crate::qb::{Clauses, DataValue, OnDuplicate, Statement, SubQuery};
use crate::row::ReturnType;
use crate::session::Session;
use execute::Tracer;
use fluentdb_guard::validate_plain_column;
use std::sync::Arc;

/// Fluent query builder and executor.
///
/// A `Db` is not meant to be shared between threads while a statement is
/// being accumulated. Use [`Db::connection`] or [`Db::copy`] to get an
/// independent builder; both share the session (profiles, open handles and
/// the column metadata cache).
pub struct Db {
    session: Arc<Session>,
    connection: String,
    stmt: Statement,
    prefix: String,
    mode: SecurityMode,
    logger: SqlLogger,
    page_limit: u64,
    lock_method: LockMethod,
    tracer: Tracer,
    count: u64,
    total_count: u64,
    total_pages: u64,
    insert_id: Option<u64>,
    last_query: String,
    last_errors: Vec<String>,
    last_errno: i32,
    /// Set by `start_transaction` on this instance only.
    owns_transaction: bool,
}

impl Db {
    /// Builder with a single `default` profile.
    pub fn new(connector: impl Connector + 'static, profile: ConnectionProfile) -> Self {
        let session = Session::new(connector);
        session.add_profile(DEFAULT_CONNECTION, profile);
        Self::with_session(Arc::new(session), DEFAULT_CONNECTION)
    }

    /// Builder configured from a validated [`DbConfig`].
    pub fn from_config(connector: impl Connector + 'static, config: DbConfig) -> DbResult<Self> {
        config.validate()?;
        let session = Session::new(connector);
        for (name, profile) in &config.connections {
            session.add_profile(name.clone(), profile.clone());
        }
        let mut db = Self::with_session(Arc::new(session), &config.default_connection);
        db.prefix = config.prefix;
        db.mode = config.security;
        db.logger = SqlLogger::new(config.debug);
        db.page_limit = config.page_limit;
        db.tracer.enabled = config.trace;
        Ok(db)
    }

    /// Builder backed by the `mysql` crate.
    #[cfg(feature = "mysql")]
    pub fn mysql(profile: ConnectionProfile) -> Self {
        Self::new(crate::driver::MysqlConnector, profile)
    }

    fn with_session(session: Arc<Session>, connection: &str) -> Self {
        Self {
            session,
            connection: connection.to_string(),
            stmt: Statement::default(),
            prefix: String::new(),
            mode: SecurityMode::default(),
            logger: SqlLogger::default(),
            page_limit: 20,
            lock_method: LockMethod::default(),
            tracer: Tracer::default(),
            count: 0,
            total_count: 0,
            total_pages: 0,
            insert_id: None,
            last_query: String::new(),
            last_errors: Vec::new(),
            last_errno: 0,
            owns_transaction: false,
        }
    }

    /// A fresh builder on the same session with this builder's settings.
    fn sibling(&self, connection: &str) -> Self {
        let mut db = Self::with_session(Arc::clone(&self.session), connection);
        db.prefix = self.prefix.clone();
        db.mode = self.mode;
        db.logger = self.logger.clone();
        db.page_limit = self.page_limit;
        db.lock_method = self.lock_method;
        db.tracer = self.tracer.settings();
        db
    }

    // ==================== Connections ====================

    /// Register (or replace) a named profile.
    pub fn add_connection(&mut self, name: &str, profile: ConnectionProfile) -> &mut Self {
        self.session.add_profile(name, profile);
        self
    }

    /// A builder bound to another registered profile.
    pub fn connection(&self, name: &str) -> DbResult<Db> {
        if !self.session.has_profile(name) {
            return Err(DbError::config(format!("Connection '{name}' was not added.")));
        }
        Ok(self.sibling(name))
    }

    pub fn connection_name(&self) -> &str {
        &self.connection
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Close the named handle; the next statement on it reconnects.
    pub fn disconnect(&mut self, name: &str) -> bool {
        self.session.disconnect(name)
    }

    pub fn disconnect_all(&mut self) {
        self.session.disconnect_all();
    }

    /// A subquery builder sharing this builder's session, prefix and mode.
    pub fn sub_query(&self, alias: Option<&str>) -> DbResult<SubQuery> {
        SubQuery::attached(
            Arc::clone(&self.session),
            &self.connection,
            &self.prefix,
            self.mode,
            alias,
        )
    }

    /// Deep copy including pending clauses. The copy never owns a transaction.
    pub fn copy(&self) -> Db {
        let mut db = self.sibling(&self.connection);
        db.stmt = self.stmt.clone();
        db
    }

    /// Drop all pending clause state. The connection name is kept.
    pub fn reset(&mut self) -> &mut Self {
        self.stmt = Statement::default();
        self
    }

    pub fn statement(&self) -> &Statement {
        &self.stmt
    }

    // ==================== Statement settings ====================

    /// Count all matching rows (`SQL_CALC_FOUND_ROWS`) on the next `get`.
    pub fn with_total_count(&mut self) -> &mut Self {
        self.stmt.with_total_count = true;
        self
    }

    /// Key the next result set by `column`.
    pub fn map(&mut self, column: &str) -> DbResult<&mut Self> {
        self.apply(|stmt, _| {
            stmt.map_key = Some(validate_plain_column(column)?.to_string());
            Ok(())
        })
    }

    pub fn set_map_key(&mut self, column: &str) -> DbResult<&mut Self> {
        self.map(column)
    }

    pub fn array_builder(&mut self) -> &mut Self {
        self.stmt.return_type = ReturnType::Array;
        self
    }

    pub fn object_builder(&mut self) -> &mut Self {
        self.stmt.return_type = ReturnType::Object;
        self
    }

    pub fn json_builder(&mut self) -> &mut Self {
        self.stmt.return_type = ReturnType::Json;
        self
    }

    /// `ON DUPLICATE KEY UPDATE col = VALUES(col), ...` on the next insert,
    /// optionally with `id = LAST_INSERT_ID(id)` first.
    pub fn on_duplicate(
        &mut self,
        columns: &[&str],
        last_insert_id: Option<&str>,
    ) -> DbResult<&mut Self> {
        self.apply(|stmt, _| {
            let dup = stmt.on_duplicate.get_or_insert_with(OnDuplicate::default);
            if let Some(id) = last_insert_id {
                dup.last_insert_id = Some(validate_plain_column(id)?.to_string());
            }
            for column in columns {
                let column = validate_plain_column(column)?.to_string();
                dup.updates.retain(|(c, _)| *c != column);
                dup.updates.push((column, None));
            }
            Ok(())
        })
    }

    /// `ON DUPLICATE KEY UPDATE column = value` on the next insert.
    pub fn on_duplicate_set(
        &mut self,
        column: &str,
        value: impl Into<DataValue>,
    ) -> DbResult<&mut Self> {
        let value = value.into();
        self.apply(|stmt, _| {
            let column = validate_plain_column(column)?.to_string();
            let dup = stmt.on_duplicate.get_or_insert_with(OnDuplicate::default);
            dup.updates.retain(|(c, _)| *c != column);
            dup.updates.push((column, Some(value)));
            Ok(())
        })
    }

    // ==================== Builder settings ====================

    pub fn set_prefix(&mut self, prefix: &str) -> DbResult<&mut Self> {
        if !is_valid_prefix(prefix) {
            return Err(DbError::config(format!("invalid table prefix: {prefix}")));
        }
        self.prefix = prefix.to_string();
        Ok(self)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn set_security_mode(&mut self, mode: SecurityMode) -> &mut Self {
        self.mode = mode;
        self
    }

    pub fn set_page_limit(&mut self, limit: u64) -> DbResult<&mut Self> {
        if limit == 0 {
            return Err(DbError::validation("page limit must be positive"));
        }
        self.page_limit = limit;
        Ok(self)
    }

    pub fn page_limit(&self) -> u64 {
        self.page_limit
    }

    /// 0 = quiet, 1 = errors, 2 = every statement.
    pub fn set_debug(&mut self, level: u8) -> &mut Self {
        self.logger.level = level.min(2);
        self
    }

    pub fn debug_level(&self) -> u8 {
        self.logger.level
    }

    /// Replace the SQL logger (level and truncation).
    pub fn set_logger(&mut self, logger: SqlLogger) -> &mut Self {
        self.logger = logger;
        self
    }

    /// Record every executed statement with its duration and call site.
    /// `strip_prefix` is removed from the caller's file path.
    pub fn set_trace(&mut self, enabled: bool, strip_prefix: Option<&str>) -> &mut Self {
        self.tracer.enabled = enabled;
        self.tracer.strip_prefix = strip_prefix.map(str::to_string);
        self
    }

    // ==================== Accessors ====================

    /// The last statement with its bindings substituted. Never execute it.
    pub fn last_query(&self) -> &str {
        &self.last_query
    }

    pub fn last_error(&self) -> String {
        if self.last_errors.is_empty() {
            "No error".to_string()
        } else {
            self.last_errors.join(" | ")
        }
    }

    pub fn last_errno(&self) -> i32 {
        self.last_errno
    }

    /// Rows fetched or affected by the last statement.
    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    pub fn total_pages(&self) -> u64 {
        self.total_pages
    }

    pub fn insert_id(&self) -> Option<u64> {
        self.insert_id
    }

    pub fn trace(&self) -> &[TraceEntry] {
        &self.tracer.entries
    }

    // ==================== Date helpers ====================

    /// `YYYY-MM-DD` in local time.
    pub fn current_date() -> String {
        chrono::Local::now().format("%Y-%m-%d").to_string()
    }

    /// `YYYY-MM-DD HH:MM:SS` in local time.
    pub fn current_datetime() -> String {
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
    }

    /// Unix seconds.
    pub fn current_timestamp() -> i64 {
        chrono::Utc::now().timestamp()
    }
}

impl Clauses for Db {
    fn statement_mut(&mut self) -> &mut Statement {
        &mut self.stmt
    }

    fn security_mode(&self) -> SecurityMode {
        self.mode
    }

    fn rejected(&mut self, error: &DbError) {
        self.logger.rejected(error);
        self.last_errors = vec![error.to_string()];
        self.last_errno = error.code();
    }
}

impl std::fmt::Debug for Db {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Db")
            .field("connection", &self.connection)
            .field("prefix", &self.prefix)
            .field("mode", &self.mode)
            .field("stmt", &self.stmt)
            .field("owns_transaction", &self.owns_transaction)
            .finish_non_exhaustive()
    }
}

impl Drop for Db {
    fn drop(&mut self) {
        if !self.owns_transaction {
            return;
        }
        let result = self.session.with_connection(&self.connection, |conn| {
            if conn.in_transaction() {
                conn.rollback()?;
            }
            Ok(())
        });
        match result {
            Ok(()) => tracing::warn!(
                target: "fluentdb.sql",
                connection = %self.connection,
                "unfinished transaction rolled back"
            ),
            Err(e) => tracing::error!(
                target: "fluentdb.sql",
                connection = %self.connection,
                error = %e,
                "rollback of unfinished transaction failed"
            ),
        }
    }
}
