//! Clause accumulation and SQL serialization.
//!
//! Clause calls come from the [`Clauses`] trait, implemented by the executor
//! (`Db`) and by [`SubQuery`]. Each call validates its input on the spot and
//! records a typed entry in the [`Statement`]; nothing is turned into SQL text
//! until a terminal call hands the statement to one of the `build_*`
//! functions.
//!
//! ```
//! use fluentdb::qb::{Clauses, SubQuery, Limit};
//!
//! # fn main() -> fluentdb::DbResult<()> {
//! let mut sub = SubQuery::new(None)?;
//! sub.where_("status", "active")?.where_in("role", vec!["admin", "staff"])?;
//! let built = sub.get("users", Limit::All, "id")?;
//! assert_eq!(
//!     built.sql,
//!     "SELECT id FROM users WHERE status = ? AND role IN (?, ?)"
//! );
//! assert_eq!(built.binds.len(), 3);
//! # Ok(())
//! # }
//! ```

mod build;
mod clauses;
mod condition;
mod operand;
mod operator;
mod placeholders;
mod statement;
mod subquery;

pub use build::{
    BuildContext, BuiltQuery, build_delete, build_insert, build_insert_bulk, build_select,
    build_update,
};
pub use clauses::Clauses;
pub use condition::{Condition, Connector, Entry};
pub use operand::{
    Data, DataValue, Delta, Operand, RawFunction, SubqueryProvider, SubquerySql,
    TAGGED_FUNCTIONS, Tagged, dec, func, inc, interval, not, not_column, now,
};
pub use operator::Operator;
pub use placeholders::{expand_array_params, interpolate, interpolate_named};
pub use statement::{
    Columns, Direction, Join, JoinKind, JoinTarget, Limit, OnDuplicate, OrderItem, QueryOption,
    Statement, StatementKind,
};
pub use subquery::SubQuery;

#[cfg(test)]
mod tests;
