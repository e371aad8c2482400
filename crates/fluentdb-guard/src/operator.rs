//! Comparison operator allow-list.

use crate::error::{GuardError, GuardResult};

/// Operators accepted in WHERE / HAVING / JOIN filters.
pub const SAFE_OPERATORS: &[&str] = &[
    "=", "!=", "<>", "<", "<=", ">", ">=", "LIKE", "NOT LIKE", "IN", "NOT IN", "BETWEEN",
    "NOT BETWEEN", "IS", "IS NOT",
];

/// Trim, collapse inner whitespace and uppercase an operator.
pub fn normalize_operator(op: &str) -> String {
    op.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_uppercase()
}

/// Whether `op` (in any case / spacing) is on the allow-list.
pub fn is_safe_operator(op: &str) -> bool {
    SAFE_OPERATORS.contains(&normalize_operator(op).as_str())
}

/// Validate an operator and return its normalized spelling.
pub fn validate_operator(op: &str) -> GuardResult<String> {
    let normalized = normalize_operator(op);
    if SAFE_OPERATORS.contains(&normalized.as_str()) {
        Ok(normalized)
    } else {
        Err(GuardError::UnsafeOperator(op.to_string()))
    }
}
