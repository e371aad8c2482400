use super::Db;
use crate::error::{DbError, DbResult};
use std::panic::Location;

/// Lock type used by [`Db::lock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockMethod {
    Read,
    #[default]
    Write,
}

impl LockMethod {
    pub fn parse(method: &str) -> DbResult<Self> {
        match method.trim().to_ascii_uppercase().as_str() {
            "READ" => Ok(Self::Read),
            "WRITE" => Ok(Self::Write),
            other => Err(DbError::validation(format!("Bad lock type: {other}"))),
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Read => "READ",
            Self::Write => "WRITE",
        }
    }
}

impl Db {
    pub fn set_lock_method(&mut self, method: &str) -> DbResult<&mut Self> {
        let parsed = LockMethod::parse(method);
        self.lock_method = self.check(parsed)?;
        Ok(self)
    }

    pub fn lock_method(&self) -> LockMethod {
        self.lock_method
    }

    /// `LOCK TABLES a WRITE, b WRITE`. If the statement fails, whatever it
    /// managed to lock is released before the error is returned.
    #[track_caller]
    pub fn lock(&mut self, tables: &[&str]) -> DbResult<()> {
        let caller = Location::caller();
        self.begin_terminal();
        if tables.is_empty() {
            return self.check(Err(DbError::validation("no tables to lock")));
        }

        let method = self.lock_method.as_sql();
        let mut parts = Vec::with_capacity(tables.len());
        for table in tables {
            let table = self.table(table)?;
            parts.push(format!("{} {method}", table.render(&self.prefix)));
        }
        let sql = format!("LOCK TABLES {}", parts.join(", "));

        if let Err(error) = self.execute_unprepared(&sql, caller) {
            if let Err(unlock) = self.execute_unprepared("UNLOCK TABLES", caller) {
                tracing::error!(target: "fluentdb.sql", error = %unlock, "unlock after failed lock failed");
            }
            return Err(error);
        }
        Ok(())
    }

    #[track_caller]
    pub fn unlock(&mut self) -> DbResult<()> {
        let caller = Location::caller();
        self.begin_terminal();
        self.execute_unprepared("UNLOCK TABLES", caller).map(|_| ())
    }

    /// Whether the bound connection has an open transaction.
    pub fn in_transaction(&mut self) -> DbResult<bool> {
        self.with_conn(|conn| Ok(conn.in_transaction()))
    }

    /// Begin a transaction. A transaction left open when this builder is
    /// dropped is rolled back.
    pub fn start_transaction(&mut self) -> DbResult<()> {
        if self.owns_transaction || self.in_transaction()? {
            return self.check(Err(DbError::Transaction(
                "Transaction already active".into(),
            )));
        }
        self.with_conn(|conn| conn.begin())?;
        self.owns_transaction = true;
        tracing::debug!(target: "fluentdb.sql", connection = %self.connection, "transaction started");
        Ok(())
    }

    pub fn commit(&mut self) -> DbResult<()> {
        if !self.in_transaction()? {
            return self.check(Err(DbError::Transaction(
                "No active transaction to commit".into(),
            )));
        }
        let result = self.with_conn(|conn| conn.commit());
        self.owns_transaction = false;
        result
    }

    pub fn rollback(&mut self) -> DbResult<()> {
        if !self.in_transaction()? {
            return self.check(Err(DbError::Transaction(
                "No active transaction to rollback".into(),
            )));
        }
        let result = self.with_conn(|conn| conn.rollback());
        self.owns_transaction = false;
        result
    }
}
