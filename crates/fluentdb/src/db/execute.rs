use super::Db;
use crate::driver::{Connection, Params};
use crate::error::{DbError, DbResult};
use crate::monitor::ExecOutcome;
use crate::qb::{BuildContext, BuiltQuery, Statement, interpolate, interpolate_named};
use crate::row::Row;
use crate::schema::SessionLookup;
use fluentdb_guard::TableName;
use std::panic::Location;
use std::time::{Duration, Instant};

pub(super) type Caller = &'static Location<'static>;

/// One executed statement, recorded when tracing is on.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceEntry {
    pub sql: String,
    pub duration: Duration,
    /// `file:line` of the public call that ran the statement.
    pub caller: String,
}

#[derive(Debug, Clone, Default)]
pub(super) struct Tracer {
    pub enabled: bool,
    pub strip_prefix: Option<String>,
    pub entries: Vec<TraceEntry>,
}

impl Tracer {
    /// Same settings, empty log.
    pub fn settings(&self) -> Self {
        Self {
            enabled: self.enabled,
            strip_prefix: self.strip_prefix.clone(),
            entries: Vec::new(),
        }
    }

    fn record(&mut self, sql: &str, duration: Duration, caller: Caller) {
        if !self.enabled {
            return;
        }
        let file = caller.file();
        let file = self
            .strip_prefix
            .as_deref()
            .and_then(|prefix| file.strip_prefix(prefix))
            .unwrap_or(file);
        self.entries.push(TraceEntry {
            sql: sql.to_string(),
            duration,
            caller: format!("{file}:{}", caller.line()),
        });
    }
}

pub(super) fn saturating_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

impl Db {
    /// Start a terminal call: clear per-statement results and take the
    /// pending clauses, leaving an empty statement behind.
    pub(super) fn begin_terminal(&mut self) -> Statement {
        self.last_errors.clear();
        self.last_errno = 0;
        self.count = 0;
        self.total_count = 0;
        self.total_pages = 0;
        std::mem::take(&mut self.stmt)
    }

    pub(super) fn record_error(&mut self, error: &DbError) {
        self.last_errors.push(error.to_string());
        self.last_errno = error.code();
    }

    /// Record a rejection that happened before anything reached the driver.
    pub(super) fn check<T>(&mut self, result: DbResult<T>) -> DbResult<T> {
        if let Err(e) = &result {
            self.logger.rejected(e);
            self.record_error(e);
        }
        result
    }

    pub(super) fn table(&mut self, name: &str) -> DbResult<TableName> {
        let parsed = TableName::parse(name).map_err(DbError::from);
        self.check(parsed)
    }

    /// Serialize `stmt`. Deferred conditions are resolved through the
    /// session's column metadata before any statement of ours runs.
    pub(super) fn build<F>(&mut self, stmt: &Statement, f: F) -> DbResult<BuiltQuery>
    where
        F: FnOnce(&Statement, &BuildContext<'_>) -> DbResult<BuiltQuery>,
    {
        let lookup = SessionLookup::new(&self.session, &self.connection);
        let ctx = BuildContext {
            prefix: &self.prefix,
            lookup: &lookup,
        };
        let result = f(stmt, &ctx);
        self.check(result)
    }

    /// Run one driver call with logging, tracing and error bookkeeping.
    pub(super) fn run<T>(
        &mut self,
        sql: &str,
        params: &Params,
        caller: Caller,
        op: impl FnOnce(&mut dyn Connection, &str, &Params) -> DbResult<T>,
        outcome: impl FnOnce(&T) -> ExecOutcome,
    ) -> DbResult<T> {
        self.last_query = match params {
            Params::Empty => sql.to_string(),
            Params::Positional(values) => interpolate(sql, values),
            Params::Named(values) => interpolate_named(sql, values),
        };

        let start = Instant::now();
        let result = self
            .session
            .with_connection(&self.connection, |conn| op(conn, sql, params));
        let duration = start.elapsed();

        let logged = match &result {
            Ok(value) => outcome(value),
            Err(e) => ExecOutcome::Error(e.to_string()),
        };
        self.logger
            .executed(sql, &self.last_query, params.len(), duration, &logged);
        self.tracer.record(sql, duration, caller);
        if let Err(e) = &result {
            self.record_error(e);
        }
        result
    }

    pub(super) fn fetch_rows(
        &mut self,
        sql: &str,
        params: &Params,
        caller: Caller,
    ) -> DbResult<Vec<Row>> {
        let rows = self.run(
            sql,
            params,
            caller,
            |conn, sql, params| conn.query(sql, params),
            |rows: &Vec<Row>| ExecOutcome::Rows(rows.len()),
        )?;
        self.count = rows.len() as u64;
        Ok(rows)
    }

    /// Affected rows and the generated id, read under the same connection lock.
    pub(super) fn execute_affected(
        &mut self,
        sql: &str,
        params: &Params,
        caller: Caller,
    ) -> DbResult<(u64, Option<u64>)> {
        let (affected, id) = self.run(
            sql,
            params,
            caller,
            |conn, sql, params| {
                let affected = conn.execute(sql, params)?;
                Ok((affected, conn.last_insert_id()))
            },
            |&(affected, _): &(u64, Option<u64>)| ExecOutcome::Affected(affected),
        )?;
        self.count = affected;
        Ok((affected, id))
    }

    pub(super) fn execute_unprepared(&mut self, sql: &str, caller: Caller) -> DbResult<u64> {
        let affected = self.run(
            sql,
            &Params::Empty,
            caller,
            |conn, sql, _| conn.execute_unprepared(sql),
            |&affected: &u64| ExecOutcome::Affected(affected),
        )?;
        self.count = affected;
        Ok(affected)
    }

    /// Connection call outside the statement path (transaction control).
    pub(super) fn with_conn<T>(
        &mut self,
        f: impl FnOnce(&mut dyn Connection) -> DbResult<T>,
    ) -> DbResult<T> {
        let result = self.session.with_connection(&self.connection, f);
        if let Err(e) = &result {
            self.record_error(e);
        }
        result
    }
}
