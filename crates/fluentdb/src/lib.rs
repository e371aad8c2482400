//! # fluentdb
//!
//! A fluent, validation-first MySQL query builder and executor.
//!
//! ## Features
//!
//! - **Chained clauses**: `where_`, `join`, `order_by`, `group_by`, `having` and friends
//!   record typed entries; SQL is only produced by a terminal call
//! - **Bound values**: every value travels as a parameter, IN lists expand to one
//!   placeholder per element
//! - **Allow-listed identifiers**: columns, operators, tables and expressions are checked
//!   by [`fluentdb_guard`] before they can reach a statement
//! - **Suspicious values**: rejected outright in strict mode, or held until the target
//!   column's declared type says whether they are plausible
//! - **Tagged values**: `inc`, `dec`, `func`, `not`, `now` for raw fragments in data maps
//! - **Subqueries**: [`qb::SubQuery`] builds SQL for `where_in`, `where_exists` and joins
//! - **Blocking driver boundary**: [`driver::Connection`], with a `mysql` crate backend
//!   behind the `mysql` feature
//!
//! ## Example
//!
//! ```ignore
//! use fluentdb::prelude::*;
//!
//! let mut db = Db::mysql(ConnectionProfile::new("localhost", "app", "secret", "shop"));
//!
//! let active = db
//!     .where_("age", 30)?
//!     .where_("status", "active")?
//!     .order_by("name", "ASC")?
//!     .get("users", 10, "id, name")?;
//!
//! let id = db.insert("users", data! { "name" => "Ann", "created_at" => now("")? })?;
//!
//! db.where_("id", 1)?
//!     .update("posts", data! { "views" => inc(1) }, Limit::All)?;
//! ```

pub mod config;
pub mod db;
pub mod driver;
pub mod error;
pub mod monitor;
pub mod prelude;
pub mod qb;
pub mod row;
pub mod schema;
pub mod session;
pub mod value;

pub use config::{ConnectionProfile, DbConfig, SecurityMode};
pub use db::{Db, LoadDataSettings, LoadXmlSettings, LockMethod, RawOutcome, RawValue, TraceEntry};
pub use driver::{Connection, Connector, Params};
pub use error::{DbError, DbResult};
pub use monitor::{QueryType, SqlLogger};
pub use row::{FromValue, ResultSet, ReturnType, Row};
pub use value::{Bind, Value};

#[cfg(feature = "mysql")]
pub use driver::MysqlConnector;

pub use fluentdb_guard::{GuardError, TableName};
