//! Error types for fluentdb

use fluentdb_guard::GuardError;
use thiserror::Error;

/// Result type alias for fluentdb operations
pub type DbResult<T> = Result<T, DbError>;

/// MySQL error code for a duplicate key.
const ER_DUP_ENTRY: u16 = 1062;

/// Error types for building and running statements
#[derive(Debug, Error)]
pub enum DbError {
    /// Builder input rejected before any SQL reached the driver
    #[error("Validation error: {0}")]
    Validation(String),

    /// Identifier, operator or expression rejected by the guard
    #[error(transparent)]
    Guard(#[from] GuardError),

    /// Suspicious value rejected (strict mode, or its column type did not fit)
    #[error("Unsafe value for column '{column}': {reason}")]
    UnsafeValue { column: String, reason: String },

    /// Missing or malformed connection configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Error reported by the database engine
    #[error("Driver error{}: {message}", .code.map(|c| format!(" {c}")).unwrap_or_default())]
    Driver { code: Option<u16>, message: String },

    /// Invalid transaction state transition
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Missing file, table or row
    #[error("Not found: {0}")]
    NotFound(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// I/O error (config files, import files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl DbError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an engine error
    pub fn driver(code: Option<u16>, message: impl Into<String>) -> Self {
        Self::Driver {
            code,
            message: message.into(),
        }
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    pub(crate) fn unsafe_value(column: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnsafeValue {
            column: column.into(),
            reason: reason.into(),
        }
    }

    /// Rejected before execution (validation, guard or unsafe value)
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::Guard(_) | Self::UnsafeValue { .. }
        )
    }

    /// Raised by the driver or the connection
    pub fn is_driver(&self) -> bool {
        matches!(self, Self::Driver { .. } | Self::Connection(_))
    }

    /// Check if this is a duplicate-key error
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::Driver { code: Some(ER_DUP_ENTRY), .. })
    }

    /// Numeric code exposed through `last_errno()`
    pub fn code(&self) -> i32 {
        match self {
            Self::Driver { code: Some(code), .. } => i32::from(*code),
            Self::Driver { code: None, .. } | Self::Connection(_) => -1,
            _ => 0,
        }
    }
}

#[cfg(feature = "mysql")]
impl From<mysql::Error> for DbError {
    fn from(err: mysql::Error) -> Self {
        match err {
            mysql::Error::MySqlError(e) => Self::driver(Some(e.code), e.message),
            mysql::Error::IoError(e) => Self::Connection(e.to_string()),
            mysql::Error::DriverError(e) => Self::Connection(e.to_string()),
            other => Self::Other(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_error_display_and_code() {
        let err = DbError::driver(Some(1062), "Duplicate entry '1' for key 'PRIMARY'");
        assert_eq!(
            err.to_string(),
            "Driver error 1062: Duplicate entry '1' for key 'PRIMARY'"
        );
        assert!(err.is_unique_violation());
        assert!(err.is_driver());
        assert_eq!(err.code(), 1062);
    }

    #[test]
    fn guard_errors_count_as_validation() {
        let err: DbError = GuardError::UnsafeColumn("x;".into()).into();
        assert!(err.is_validation());
        assert_eq!(err.code(), 0);
        assert_eq!(err.to_string(), "Invalid column name: x;");
    }
}
