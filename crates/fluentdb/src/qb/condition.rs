//! WHERE / HAVING entries and their two-phase validation.
//!
//! An entry is checked when the clause call is made. Values that look like
//! injection attempts are either rejected outright (strict mode) or kept as
//! [`Condition::Deferred`] until the declared type of the target column is
//! known; see [`Condition::resolve`].

use super::operand::Operand;
use super::operator::Operator;
use crate::config::SecurityMode;
use crate::error::{DbError, DbResult};
use crate::schema::ColumnLookup;
use crate::value::Value;
use fluentdb_guard::{
    ColumnType, SelectItem, TableName, column_target, is_aggregate_call, is_suspicious,
    validate_column,
};
use std::borrow::Cow;

/// Logical connector in front of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connector {
    /// First entry of a list.
    #[default]
    Empty,
    And,
    Or,
}

impl Connector {
    pub fn as_sql(self) -> &'static str {
        match self {
            Connector::Empty => "",
            Connector::And => "AND",
            Connector::Or => "OR",
        }
    }
}

/// One validated WHERE / HAVING fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub connector: Connector,
    /// Column or wrapped column; empty for EXISTS.
    pub column: String,
    pub operator: Operator,
    pub operand: Operand,
}

/// An entry, possibly waiting for a column-type check.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Resolved(Entry),
    Deferred {
        entry: Entry,
        /// The suspicious values to check against the column type.
        values: Vec<String>,
    },
}

fn value_text(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::Text(s) => Some(Cow::Borrowed(s)),
        Value::Bytes(b) => Some(String::from_utf8_lossy(b)),
        _ => None,
    }
}

impl Condition {
    /// Validate a clause call and build its entry.
    pub(crate) fn build(
        connector: Connector,
        column: &str,
        operand: Operand,
        operator: &str,
        mode: SecurityMode,
    ) -> DbResult<Self> {
        let mut operator = Operator::parse(operator)?;

        let column = if operator.is_exists() {
            String::new()
        } else {
            validate_column(column)?.to_string()
        };

        if operand.is_null() {
            operator = operator.null_form().ok_or_else(|| {
                DbError::validation(format!("Operator {operator} cannot compare with NULL"))
            })?;
        } else if matches!(operator, Operator::Is | Operator::IsNot) {
            return Err(DbError::validation(format!(
                "Operator {operator} only compares with NULL"
            )));
        }

        match (&operand, operator) {
            (Operand::Subquery(_), op) if op.is_range() => {
                return Err(DbError::validation(format!("{op} does not take a subquery")));
            }
            (Operand::Subquery(_), _) => {}
            (_, op) if op.is_exists() => {
                return Err(DbError::validation(format!("{op} requires a subquery")));
            }
            (Operand::List(values), op) if op.is_list() && values.is_empty() => {
                return Err(DbError::validation(format!("{op} requires a non-empty list")));
            }
            (Operand::List(_), op) if op.is_list() => {}
            (_, op) if op.is_list() => {
                return Err(DbError::validation(format!(
                    "{op} requires a list or a subquery"
                )));
            }
            (Operand::List(values), op) if op.is_range() && values.len() != 2 => {
                return Err(DbError::validation(format!(
                    "{op} requires exactly 2 values, got {}",
                    values.len()
                )));
            }
            (Operand::List(_), op) if op.is_range() => {}
            (_, op) if op.is_range() => {
                return Err(DbError::validation(format!("{op} requires exactly 2 values")));
            }
            (Operand::List(_), op) => {
                return Err(DbError::validation(format!("{op} does not take a list")));
            }
            _ => {}
        }

        let suspicious: Vec<String> = match &operand {
            Operand::Scalar(v) => value_text(v).into_iter().collect(),
            Operand::List(values) => values.iter().filter_map(value_text).collect(),
            _ => Vec::new(),
        }
        .into_iter()
        .filter(|text| is_suspicious(text))
        .map(Cow::into_owned)
        .collect();

        let entry = Entry {
            connector,
            column,
            operator,
            operand,
        };

        if suspicious.is_empty() {
            return Ok(Condition::Resolved(entry));
        }
        match mode {
            SecurityMode::Strict => Err(DbError::unsafe_value(
                entry.column,
                "value contains suspicious SQL characters",
            )),
            SecurityMode::Heuristic => {
                tracing::debug!(
                    target: "fluentdb.guard",
                    column = %entry.column,
                    "deferring suspicious value until column type is known"
                );
                Ok(Condition::Deferred {
                    entry,
                    values: suspicious,
                })
            }
        }
    }

    pub fn entry(&self) -> &Entry {
        match self {
            Condition::Resolved(entry) | Condition::Deferred { entry, .. } => entry,
        }
    }

    pub(crate) fn entry_mut(&mut self) -> &mut Entry {
        match self {
            Condition::Resolved(entry) | Condition::Deferred { entry, .. } => entry,
        }
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Condition::Deferred { .. })
    }

    /// Accept or reject a deferred entry by the declared type of its column.
    pub(crate) fn resolve(&self, scope: &TableScope<'_>, lookup: &dyn ColumnLookup) -> DbResult<Entry> {
        let (entry, values) = match self {
            Condition::Resolved(entry) => return Ok(entry.clone()),
            Condition::Deferred { entry, values } => (entry, values),
        };
        let reject = |reason: String| DbError::unsafe_value(entry.column.clone(), reason);
        let column_type = scope.value_type(&entry.column, lookup).map_err(reject)?;

        for value in values {
            if !column_type.accepts(value.trim()) {
                tracing::warn!(
                    target: "fluentdb.guard",
                    column = %entry.column,
                    declared = %column_type.declared,
                    "suspicious value rejected by column type"
                );
                return Err(reject(format!(
                    "value does not fit column type {}",
                    column_type.declared
                )));
            }
        }
        Ok(entry.clone())
    }
}

/// Tables a statement can resolve column qualifiers against. The first entry
/// is the FROM / UPDATE table.
///
/// `selected` is only filled for HAVING, where select aliases are in scope.
#[derive(Debug, Clone, Default)]
pub(crate) struct TableScope<'a> {
    pub tables: Vec<&'a TableName>,
    pub prefix: &'a str,
    pub selected: &'a [SelectItem],
}

impl<'a> TableScope<'a> {
    pub fn find(&self, qualifier: Option<&str>) -> Option<&'a TableName> {
        match qualifier {
            None => self.tables.first().copied(),
            Some(q) => self
                .tables
                .iter()
                .find(|t| t.answers_to(q, self.prefix))
                .copied(),
        }
    }

    /// The select expression behind an alias.
    fn aliased(&self, column: &str) -> Option<&'a str> {
        let bare = column.trim_matches('`');
        self.selected
            .iter()
            .find(|item| item.alias_name().is_some_and(|a| a.eq_ignore_ascii_case(bare)))
            .map(|item| item.expr.as_str())
    }

    /// The type a deferred value compared with `column` is checked against.
    ///
    /// `COUNT` always yields an integer and `SUM` / `AVG` a number. Any other
    /// reference takes the declared type of the column it points at.
    fn value_type(&self, column: &str, lookup: &dyn ColumnLookup) -> Result<ColumnType, String> {
        let column = self.aliased(column).unwrap_or(column);
        if is_aggregate_call(column) {
            let function = column.split('(').next().unwrap_or_default().trim();
            if function.eq_ignore_ascii_case("COUNT") {
                return Ok(ColumnType::parse("bigint"));
            }
            if function.eq_ignore_ascii_case("SUM") || function.eq_ignore_ascii_case("AVG") {
                return Ok(ColumnType::parse("decimal"));
            }
        }

        let target =
            column_target(column).ok_or_else(|| "cannot determine the column type".to_string())?;
        let table = self
            .find(target.qualifier.as_deref())
            .ok_or_else(|| "column does not belong to a table of the statement".to_string())?;
        let table_name = table.prefixed(self.prefix);
        let columns = lookup
            .table_columns(&table_name)
            .map_err(|e| format!("column type lookup failed: {e}"))?;
        columns
            .column(&target.column)
            .map(|meta| meta.column_type.clone())
            .ok_or_else(|| format!("unknown column in {table_name}"))
    }
}
