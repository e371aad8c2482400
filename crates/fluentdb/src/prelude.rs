//! Convenient imports for typical `fluentdb` usage.
//!
//! ```ignore
//! use fluentdb::prelude::*;
//! ```

pub use crate::qb::{
    Clauses, Columns, Data, Limit, SubQuery, SubqueryProvider, dec, func, inc, interval, not,
    not_column, now,
};
pub use crate::{
    Bind, ConnectionProfile, Db, DbConfig, DbError, DbResult, FromValue, ResultSet, Row,
    SecurityMode, Value, data, params,
};

#[cfg(feature = "mysql")]
pub use crate::MysqlConnector;
