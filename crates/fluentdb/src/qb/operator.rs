use crate::error::{DbError, DbResult};
use fluentdb_guard::{normalize_operator, validate_operator};
use std::fmt;

/// Comparison operator of a WHERE / HAVING entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    /// `!=`
    NotEq,
    /// `<>`
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
    NotLike,
    In,
    NotIn,
    Between,
    NotBetween,
    Is,
    IsNot,
    Exists,
    NotExists,
}

impl Operator {
    /// Parse an operator from the comparison allow-list (plus EXISTS forms).
    pub fn parse(op: &str) -> DbResult<Self> {
        match normalize_operator(op).as_str() {
            "EXISTS" => return Ok(Self::Exists),
            "NOT EXISTS" => return Ok(Self::NotExists),
            _ => {}
        }
        let op = validate_operator(op)?;
        let parsed = match op.as_str() {
            "=" => Self::Eq,
            "!=" => Self::NotEq,
            "<>" => Self::Ne,
            "<" => Self::Lt,
            "<=" => Self::Le,
            ">" => Self::Gt,
            ">=" => Self::Ge,
            "LIKE" => Self::Like,
            "NOT LIKE" => Self::NotLike,
            "IN" => Self::In,
            "NOT IN" => Self::NotIn,
            "BETWEEN" => Self::Between,
            "NOT BETWEEN" => Self::NotBetween,
            "IS" => Self::Is,
            "IS NOT" => Self::IsNot,
            other => return Err(DbError::validation(format!("Invalid operator: {other}"))),
        };
        Ok(parsed)
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Like => "LIKE",
            Self::NotLike => "NOT LIKE",
            Self::In => "IN",
            Self::NotIn => "NOT IN",
            Self::Between => "BETWEEN",
            Self::NotBetween => "NOT BETWEEN",
            Self::Is => "IS",
            Self::IsNot => "IS NOT",
            Self::Exists => "EXISTS",
            Self::NotExists => "NOT EXISTS",
        }
    }

    pub fn is_list(self) -> bool {
        matches!(self, Self::In | Self::NotIn)
    }

    pub fn is_range(self) -> bool {
        matches!(self, Self::Between | Self::NotBetween)
    }

    pub fn is_exists(self) -> bool {
        matches!(self, Self::Exists | Self::NotExists)
    }

    /// Operator to use when comparing against NULL, if the comparison has one.
    pub(crate) fn null_form(self) -> Option<Self> {
        match self {
            Self::Eq | Self::Is => Some(Self::Is),
            Self::NotEq | Self::Ne | Self::IsNot => Some(Self::IsNot),
            _ => None,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl std::str::FromStr for Operator {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
