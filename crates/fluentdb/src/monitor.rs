//! Statement classification and SQL logging.

use std::fmt;
use std::time::Duration;

pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

/// The kind of statement, detected from its leading keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    Select,
    Insert,
    Replace,
    Update,
    Delete,
    Show,
    Describe,
    Explain,
    Other,
}

impl QueryType {
    /// Detect query type from SQL string, skipping comments and opening parens.
    pub fn from_sql(sql: &str) -> Self {
        fn strip_sql_prefix(sql: &str) -> &str {
            let mut s = sql;
            loop {
                let before = s;
                s = s.trim_start();
                if let Some(rest) = s.strip_prefix("--").or_else(|| s.strip_prefix('#')) {
                    match rest.find('\n') {
                        Some(pos) => {
                            s = &rest[pos + 1..];
                            continue;
                        }
                        None => return "",
                    }
                }
                if let Some(rest) = s.strip_prefix("/*") {
                    match rest.find("*/") {
                        Some(pos) => {
                            s = &rest[pos + 2..];
                            continue;
                        }
                        None => return "",
                    }
                }
                if let Some(rest) = s.strip_prefix('(') {
                    s = rest;
                    continue;
                }
                if s == before {
                    break;
                }
            }
            s
        }

        fn starts_with_keyword(s: &str, keyword: &str) -> bool {
            let matches = s
                .get(0..keyword.len())
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case(keyword));
            matches
                && s.as_bytes()
                    .get(keyword.len())
                    .is_none_or(|b| !(b.is_ascii_alphanumeric() || *b == b'_'))
        }

        let trimmed = strip_sql_prefix(sql);
        const KEYWORDS: &[(&str, QueryType)] = &[
            ("SELECT", QueryType::Select),
            ("WITH", QueryType::Select),
            ("INSERT", QueryType::Insert),
            ("REPLACE", QueryType::Replace),
            ("UPDATE", QueryType::Update),
            ("DELETE", QueryType::Delete),
            ("SHOW", QueryType::Show),
            ("DESCRIBE", QueryType::Describe),
            ("DESC", QueryType::Describe),
            ("EXPLAIN", QueryType::Explain),
        ];
        KEYWORDS
            .iter()
            .find(|(kw, _)| starts_with_keyword(trimmed, kw))
            .map(|(_, ty)| *ty)
            .unwrap_or(QueryType::Other)
    }

    /// Statements whose results are rows rather than a row count.
    pub fn returns_rows(self) -> bool {
        matches!(
            self,
            QueryType::Select | QueryType::Show | QueryType::Describe | QueryType::Explain
        )
    }
}

/// What a statement produced, for logging.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecOutcome {
    Rows(usize),
    Affected(u64),
    Error(String),
}

impl fmt::Display for ExecOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecOutcome::Rows(n) => write!(f, "{n} rows"),
            ExecOutcome::Affected(n) => write!(f, "{n} affected"),
            ExecOutcome::Error(e) => write!(f, "error: {e}"),
        }
    }
}

/// Debug-level aware SQL logger.
///
/// * level 0: silent
/// * level 1: rejected statements and driver errors
/// * level 2: additionally every executed statement with its bindings
#[derive(Debug, Clone)]
pub struct SqlLogger {
    pub level: u8,
    /// Truncate long SQL strings (in bytes). `None` means no truncation.
    pub max_sql_length: Option<usize>,
}

impl Default for SqlLogger {
    fn default() -> Self {
        Self {
            level: 0,
            max_sql_length: Some(500),
        }
    }
}

impl SqlLogger {
    pub fn new(level: u8) -> Self {
        Self {
            level: level.min(2),
            ..Self::default()
        }
    }

    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }

    fn truncate_sql(&self, sql: &str) -> String {
        match self.max_sql_length {
            Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)),
            _ => sql.to_string(),
        }
    }

    /// A statement finished (successfully or not).
    pub fn executed(
        &self,
        sql: &str,
        interpolated: &str,
        param_count: usize,
        duration: Duration,
        outcome: &ExecOutcome,
    ) {
        let query_type = QueryType::from_sql(sql);
        match outcome {
            ExecOutcome::Error(error) if self.level >= 1 => tracing::error!(
                target: "fluentdb.sql",
                query_type = ?query_type,
                param_count,
                duration_us = duration.as_micros() as u64,
                sql = %self.truncate_sql(interpolated),
                error = %error,
                "statement failed"
            ),
            ExecOutcome::Error(_) => {}
            _ if self.level >= 2 => tracing::debug!(
                target: "fluentdb.sql",
                query_type = ?query_type,
                param_count,
                duration_us = duration.as_micros() as u64,
                sql = %self.truncate_sql(sql),
                interpolated = %self.truncate_sql(interpolated),
                result = %outcome,
                "statement executed"
            ),
            _ => {}
        }
    }

    /// A clause call or build step was rejected before reaching the driver.
    pub fn rejected(&self, error: &dyn std::error::Error) {
        if self.level >= 1 {
            tracing::warn!(target: "fluentdb.guard", error = %error, "statement rejected");
        }
    }
}
