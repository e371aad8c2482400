//! fluentdb-guard
//!
//! Pure string checks for the parts of a MySQL statement that cannot travel as
//! bound parameters: column names, operators, table names and free-form SQL
//! expressions. Nothing in this crate touches a database.
//!
//! # Features
//!
//! - **Column safety**: plain or qualified identifiers and a small set of wrapper functions
//! - **Operator safety**: a fixed comparison allow-list
//! - **Table names**: `db.schema.table` with an optional alias
//! - **Expressions**: a recursive validator for ORDER BY / GROUP BY / select items
//! - **Suspicious values**: a heuristic for injection-like input
//! - **Column types**: parsing of declared MySQL types and value/type consistency checks
//!
//! # Example
//!
//! ```
//! use fluentdb_guard::{is_safe_column, is_safe_expression, is_suspicious};
//!
//! assert!(is_safe_column("u.created_at"));
//! assert!(is_safe_column("COUNT(*)"));
//! assert!(!is_safe_column("name; DROP TABLE users"));
//!
//! assert!(is_safe_expression("CASE WHEN status = 'active' THEN 1 ELSE 0 END"));
//! assert!(!is_safe_expression("1 UNION SELECT password FROM users"));
//!
//! assert!(is_suspicious("1' or '1'='1"));
//! ```

pub mod column;
pub mod column_type;
pub mod error;
pub mod expression;
pub mod operator;
pub mod scan;
pub mod select_list;
pub mod suspicious;
pub mod table;

pub use column::{
    AGGREGATE_FUNCTIONS, COLUMN_FUNCTIONS, ColumnTarget, column_target, is_aggregate_call,
    is_plain_column, is_safe_column, validate_column, validate_plain_column,
};
pub use column_type::{ColumnKind, ColumnType, is_numeric, round_trips_as_integer};
pub use error::{GuardError, GuardResult};
pub use expression::{
    EXPRESSION_FUNCTIONS, contains_blacklisted, is_safe_expression, is_safe_fragment,
    validate_expression, validate_fragment,
};
pub use operator::{SAFE_OPERATORS, is_safe_operator, normalize_operator, validate_operator};
pub use select_list::{SelectItem, parse_select_list};
pub use suspicious::{is_suspicious, normalize_value};
pub use table::{TableName, is_safe_table_name};
