//! The blocking database driver boundary.
//!
//! The builder only needs a handful of primitives from a driver: prepared
//! execution with positional or named parameters, unprepared execution, the
//! last insert id and transaction control. [`Connection`] captures exactly that;
//! [`Connector`] turns a [`ConnectionProfile`] into a live connection.

use crate::config::ConnectionProfile;
use crate::error::DbResult;
use crate::row::Row;
use crate::value::Value;

#[cfg(feature = "mysql")]
mod mysql;

#[cfg(feature = "mysql")]
pub use self::mysql::MysqlConnector;

/// Parameters for one prepared statement.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Params {
    #[default]
    Empty,
    Positional(Vec<Value>),
    /// `:name` placeholders. Names are stored without the leading colon.
    Named(Vec<(String, Value)>),
}

impl Params {
    pub fn len(&self) -> usize {
        match self {
            Params::Empty => 0,
            Params::Positional(values) => values.len(),
            Params::Named(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Values in bind order.
    pub fn values(&self) -> Vec<&Value> {
        match self {
            Params::Empty => Vec::new(),
            Params::Positional(values) => values.iter().collect(),
            Params::Named(values) => values.iter().map(|(_, v)| v).collect(),
        }
    }
}

impl From<Vec<Value>> for Params {
    fn from(values: Vec<Value>) -> Self {
        if values.is_empty() {
            Params::Empty
        } else {
            Params::Positional(values)
        }
    }
}

/// A live, blocking connection.
pub trait Connection: Send {
    /// Run a prepared statement that returns rows.
    fn query(&mut self, sql: &str, params: &Params) -> DbResult<Vec<Row>>;

    /// Run a prepared statement and return the affected row count.
    fn execute(&mut self, sql: &str, params: &Params) -> DbResult<u64>;

    /// Run a statement through the text protocol (LOCK TABLES, LOAD DATA, ...).
    fn execute_unprepared(&mut self, sql: &str) -> DbResult<u64>;

    /// Id generated by the last INSERT, if any.
    fn last_insert_id(&self) -> Option<u64>;

    fn begin(&mut self) -> DbResult<()>;
    fn commit(&mut self) -> DbResult<()>;
    fn rollback(&mut self) -> DbResult<()>;
    fn in_transaction(&self) -> bool;

    fn ping(&mut self) -> DbResult<()> {
        self.query("SELECT 1", &Params::Empty).map(|_| ())
    }
}

/// Opens connections for named profiles.
pub trait Connector: Send + Sync {
    fn connect(&self, profile: &ConnectionProfile) -> DbResult<Box<dyn Connection>>;
}

impl<F> Connector for F
where
    F: Fn(&ConnectionProfile) -> DbResult<Box<dyn Connection>> + Send + Sync,
{
    fn connect(&self, profile: &ConnectionProfile) -> DbResult<Box<dyn Connection>> {
        self(profile)
    }
}
