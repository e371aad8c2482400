//! Error types for fluentdb-guard

use thiserror::Error;

/// Result type for guard checks.
pub type GuardResult<T> = Result<T, GuardError>;

/// A rejected piece of SQL text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardError {
    /// Column reference failed the identifier / wrapper-function allow-list.
    #[error("Invalid column name: {0}")]
    UnsafeColumn(String),
    /// Operator is not part of the comparison allow-list.
    #[error("Invalid operator: {0}")]
    UnsafeOperator(String),
    /// Table name (or alias) is malformed.
    #[error("Invalid table name: {0}")]
    UnsafeTable(String),
    /// Expression failed recursive validation or hit the blacklist.
    #[error("Unsafe SQL expression: {0}")]
    UnsafeExpression(String),
    /// Text could not be parsed at all (unbalanced quotes, empty items, ...).
    #[error("Parse error: {0}")]
    Parse(String),
}
