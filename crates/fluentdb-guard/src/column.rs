//! Column-name validation.

use crate::error::{GuardError, GuardResult};
use regex::Regex;
use std::sync::OnceLock;

/// Functions allowed to wrap a column reference, e.g. `DATE(created_at)`.
pub const COLUMN_FUNCTIONS: &[&str] = &[
    "DATE", "YEAR", "MONTH", "DAY", "HOUR", "MINUTE", "SECOND", "WEEK", "LOWER", "UPPER",
    "LENGTH", "TRIM", "COUNT", "SUM", "AVG", "MIN", "MAX",
];

/// Aggregate functions (valid targets for HAVING).
pub const AGGREGATE_FUNCTIONS: &[&str] = &["COUNT", "SUM", "AVG", "MIN", "MAX"];

const IDENT: &str = r"(?:[A-Za-z_][A-Za-z0-9_$]*|`[A-Za-z_][A-Za-z0-9_$]*`)";

fn plain_column_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"^{IDENT}(?:\.{IDENT})?$")).expect("invalid built-in regex")
    })
}

fn wrapped_column_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r"(?i)^([A-Za-z_]+)\(\s*(DISTINCT\s+)?(\*|{IDENT}(?:\.{IDENT})?)\s*\)$"
        ))
        .expect("invalid built-in regex")
    })
}

/// `identifier` or `identifier.identifier`, optionally backtick-quoted.
pub fn is_plain_column(column: &str) -> bool {
    let column = column.trim();
    column.len() <= 129 && plain_column_re().is_match(column)
}

/// Column reference accepted in WHERE / HAVING / JOIN filters.
///
/// Accepts plain or qualified identifiers and `FUNC(col)` for the functions in
/// [`COLUMN_FUNCTIONS`]. `*` is only allowed inside `COUNT`, `DISTINCT` only
/// inside aggregates.
pub fn is_safe_column(column: &str) -> bool {
    let column = column.trim();
    if column.is_empty() || column.len() > 192 {
        return false;
    }
    if plain_column_re().is_match(column) {
        return true;
    }
    let Some(caps) = wrapped_column_re().captures(column) else {
        return false;
    };
    let func = caps[1].to_ascii_uppercase();
    if !COLUMN_FUNCTIONS.contains(&func.as_str()) {
        return false;
    }
    if &caps[3] == "*" && func != "COUNT" {
        return false;
    }
    if caps.get(2).is_some() && !AGGREGATE_FUNCTIONS.contains(&func.as_str()) {
        return false;
    }
    true
}

/// Validate a column reference, returning it trimmed.
pub fn validate_column(column: &str) -> GuardResult<&str> {
    if is_safe_column(column) {
        Ok(column.trim())
    } else {
        Err(GuardError::UnsafeColumn(column.to_string()))
    }
}

/// Validate a column used as an assignment target (INSERT / UPDATE keys).
pub fn validate_plain_column(column: &str) -> GuardResult<&str> {
    if is_plain_column(column) {
        Ok(column.trim())
    } else {
        Err(GuardError::UnsafeColumn(column.to_string()))
    }
}

/// Whether the column reference is a whitelisted aggregate call such as `SUM(o.total)`.
pub fn is_aggregate_call(column: &str) -> bool {
    let column = column.trim();
    if !is_safe_column(column) {
        return false;
    }
    wrapped_column_re()
        .captures(column)
        .map(|caps| AGGREGATE_FUNCTIONS.contains(&caps[1].to_ascii_uppercase().as_str()))
        .unwrap_or(false)
}

/// The table qualifier and bare column name a column reference points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnTarget {
    pub qualifier: Option<String>,
    pub column: String,
}

/// Resolve a safe column reference to the underlying column.
///
/// Function wrappers are looked through (`DATE(o.created_at)` targets
/// `o.created_at`); `COUNT(*)` has no target.
pub fn column_target(column: &str) -> Option<ColumnTarget> {
    let column = column.trim();
    let inner = if plain_column_re().is_match(column) {
        column.to_string()
    } else {
        let caps = wrapped_column_re().captures(column)?;
        caps[3].to_string()
    };
    if inner == "*" {
        return None;
    }
    let mut parts = inner.split('.').map(|p| p.trim_matches('`').to_string());
    let first = parts.next()?;
    match parts.next() {
        Some(second) => Some(ColumnTarget {
            qualifier: Some(first),
            column: second,
        }),
        None => Some(ColumnTarget {
            qualifier: None,
            column: first,
        }),
    }
}
