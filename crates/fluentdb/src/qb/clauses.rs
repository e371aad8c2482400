//! The fluent clause API shared by the executor and subquery builders.

use super::condition::{Condition, Connector};
use super::operand::{Operand, SubqueryProvider};
use super::statement::{Direction, Join, JoinKind, JoinTarget, QueryOption, Statement};
use crate::config::SecurityMode;
use crate::error::{DbError, DbResult};
use crate::value::Value;
use fluentdb_guard::scan::unquoted_mask;
use fluentdb_guard::{TableName, validate_column, validate_expression, validate_fragment};
use regex::Regex;
use std::sync::OnceLock;

fn field_value_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9.(),_ `\x{80}-\x{10FFFF}]*$").expect("invalid built-in regex")
    })
}

fn regexp_pattern_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[\w\s^$.*+?|\[\]()]+$").expect("invalid built-in regex"))
}

/// Clause methods. Every call validates its input immediately; a failing
/// call clears the whole pending statement so nothing half-built leaks into
/// the next one.
pub trait Clauses: Sized {
    fn statement_mut(&mut self) -> &mut Statement;

    fn security_mode(&self) -> SecurityMode;

    /// Called after a clause call was rejected.
    fn rejected(&mut self, _error: &DbError) {}

    #[doc(hidden)]
    fn apply<F>(&mut self, f: F) -> DbResult<&mut Self>
    where
        F: FnOnce(&mut Statement, SecurityMode) -> DbResult<()>,
    {
        let mode = self.security_mode();
        match f(self.statement_mut(), mode) {
            Ok(()) => Ok(self),
            Err(error) => {
                self.statement_mut().reset();
                self.rejected(&error);
                Err(error)
            }
        }
    }

    #[doc(hidden)]
    fn add_where(
        &mut self,
        connector: Connector,
        column: &str,
        operand: Operand,
        operator: &str,
    ) -> DbResult<&mut Self> {
        self.apply(|stmt, mode| {
            stmt.push_where(Condition::build(connector, column, operand, operator, mode)?);
            Ok(())
        })
    }

    #[doc(hidden)]
    fn add_having(
        &mut self,
        connector: Connector,
        column: &str,
        operand: Operand,
        operator: &str,
    ) -> DbResult<&mut Self> {
        self.apply(|stmt, mode| {
            if connector == Connector::Or && stmt.havings.is_empty() {
                return Err(DbError::validation("or_having requires a prior having"));
            }
            stmt.push_having(Condition::build(connector, column, operand, operator, mode)?);
            Ok(())
        })
    }

    /// `AND column = value`
    fn where_(&mut self, column: &str, value: impl Into<Operand>) -> DbResult<&mut Self> {
        self.add_where(Connector::And, column, value.into(), "=")
    }

    /// `AND column <op> value`
    fn where_op(
        &mut self,
        column: &str,
        value: impl Into<Operand>,
        operator: &str,
    ) -> DbResult<&mut Self> {
        self.add_where(Connector::And, column, value.into(), operator)
    }

    /// `OR column = value`
    fn or_where(&mut self, column: &str, value: impl Into<Operand>) -> DbResult<&mut Self> {
        self.add_where(Connector::Or, column, value.into(), "=")
    }

    /// `OR column <op> value`
    fn or_where_op(
        &mut self,
        column: &str,
        value: impl Into<Operand>,
        operator: &str,
    ) -> DbResult<&mut Self> {
        self.add_where(Connector::Or, column, value.into(), operator)
    }

    /// `AND column IN (...)`; takes a list or a subquery.
    fn where_in(&mut self, column: &str, values: impl Into<Operand>) -> DbResult<&mut Self> {
        self.add_where(Connector::And, column, values.into(), "IN")
    }

    fn where_not_in(&mut self, column: &str, values: impl Into<Operand>) -> DbResult<&mut Self> {
        self.add_where(Connector::And, column, values.into(), "NOT IN")
    }

    fn or_where_in(&mut self, column: &str, values: impl Into<Operand>) -> DbResult<&mut Self> {
        self.add_where(Connector::Or, column, values.into(), "IN")
    }

    /// `AND column BETWEEN ? AND ?`; the list must hold exactly two values.
    fn where_between(&mut self, column: &str, range: impl Into<Operand>) -> DbResult<&mut Self> {
        self.add_where(Connector::And, column, range.into(), "BETWEEN")
    }

    fn where_not_between(
        &mut self,
        column: &str,
        range: impl Into<Operand>,
    ) -> DbResult<&mut Self> {
        self.add_where(Connector::And, column, range.into(), "NOT BETWEEN")
    }

    fn where_null(&mut self, column: &str) -> DbResult<&mut Self> {
        self.add_where(Connector::And, column, Operand::Scalar(Value::Null), "IS")
    }

    fn where_not_null(&mut self, column: &str) -> DbResult<&mut Self> {
        self.add_where(Connector::And, column, Operand::Scalar(Value::Null), "IS NOT")
    }

    fn or_where_null(&mut self, column: &str) -> DbResult<&mut Self> {
        self.add_where(Connector::Or, column, Operand::Scalar(Value::Null), "IS")
    }

    fn where_exists(&mut self, subquery: &impl SubqueryProvider) -> DbResult<&mut Self> {
        let sub = subquery.subquery();
        self.apply(|stmt, mode| {
            let operand = Operand::Subquery(sub?);
            stmt.push_where(Condition::build(Connector::And, "", operand, "EXISTS", mode)?);
            Ok(())
        })
    }

    fn where_not_exists(&mut self, subquery: &impl SubqueryProvider) -> DbResult<&mut Self> {
        let sub = subquery.subquery();
        self.apply(|stmt, mode| {
            let operand = Operand::Subquery(sub?);
            stmt.push_where(Condition::build(Connector::And, "", operand, "NOT EXISTS", mode)?);
            Ok(())
        })
    }

    /// `AND column = value` in HAVING. The column must be a select alias, a
    /// GROUP BY member or an aggregate call; that is checked at build time.
    fn having(&mut self, column: &str, value: impl Into<Operand>) -> DbResult<&mut Self> {
        self.add_having(Connector::And, column, value.into(), "=")
    }

    fn having_op(
        &mut self,
        column: &str,
        value: impl Into<Operand>,
        operator: &str,
    ) -> DbResult<&mut Self> {
        self.add_having(Connector::And, column, value.into(), operator)
    }

    fn or_having(&mut self, column: &str, value: impl Into<Operand>) -> DbResult<&mut Self> {
        self.add_having(Connector::Or, column, value.into(), "=")
    }

    fn or_having_op(
        &mut self,
        column: &str,
        value: impl Into<Operand>,
        operator: &str,
    ) -> DbResult<&mut Self> {
        self.add_having(Connector::Or, column, value.into(), operator)
    }

    /// `{kind} JOIN table ON condition`. An empty `kind` means LEFT; an empty
    /// condition omits ON (for NATURAL joins).
    fn join(&mut self, table: &str, on: &str, kind: &str) -> DbResult<&mut Self> {
        self.apply(|stmt, _| {
            let target = JoinTarget::Table(TableName::parse(table)?);
            push_join(stmt, target, on, kind)
        })
    }

    /// Join a subquery. The subquery needs an alias.
    fn join_sub(
        &mut self,
        subquery: &impl SubqueryProvider,
        on: &str,
        kind: &str,
    ) -> DbResult<&mut Self> {
        let sub = subquery.subquery();
        self.apply(|stmt, _| {
            let sub = sub?;
            if sub.alias.is_none() {
                return Err(DbError::validation("a joined subquery needs an alias"));
            }
            push_join(stmt, JoinTarget::Subquery(sub), on, kind)
        })
    }

    /// Extra `AND` filter on a joined table, rendered after its ON condition.
    fn join_where(
        &mut self,
        table: &str,
        column: &str,
        value: impl Into<Operand>,
        operator: &str,
    ) -> DbResult<&mut Self> {
        let operand = value.into();
        self.apply(|stmt, mode| {
            push_join_filter(stmt, Connector::And, table, column, operand, operator, mode)
        })
    }

    /// Extra `OR` filter on a joined table.
    fn join_or_where(
        &mut self,
        table: &str,
        column: &str,
        value: impl Into<Operand>,
        operator: &str,
    ) -> DbResult<&mut Self> {
        let operand = value.into();
        self.apply(|stmt, mode| {
            push_join_filter(stmt, Connector::Or, table, column, operand, operator, mode)
        })
    }

    /// `ORDER BY field dir`. `RAND()` is accepted as a field.
    fn order_by(&mut self, field: &str, direction: &str) -> DbResult<&mut Self> {
        self.apply(|stmt, _| {
            let direction = Direction::parse(direction)?;
            let field = field.trim();
            let field = if field.eq_ignore_ascii_case("RAND()") {
                "RAND()".to_string()
            } else {
                validate_expression(field)?.to_string()
            };
            stmt.push_order(field, direction);
            Ok(())
        })
    }

    /// `ORDER BY FIELD(field, 'a', 'b', ...) dir`
    fn order_by_field(
        &mut self,
        field: &str,
        direction: &str,
        values: &[&str],
    ) -> DbResult<&mut Self> {
        self.apply(|stmt, _| {
            let direction = Direction::parse(direction)?;
            let field = validate_column(field)?;
            if values.is_empty() {
                return Err(DbError::validation("FIELD() ordering needs values"));
            }
            let mut rendered = format!("FIELD({field}");
            for value in values {
                if !field_value_re().is_match(value) {
                    return Err(DbError::validation(format!(
                        "Invalid FIELD() ordering value: {value}"
                    )));
                }
                rendered.push_str(&format!(", '{value}'"));
            }
            rendered.push(')');
            stmt.push_order(rendered, direction);
            Ok(())
        })
    }

    /// `ORDER BY field REGEXP 'pattern' dir`
    fn order_by_regexp(
        &mut self,
        field: &str,
        direction: &str,
        pattern: &str,
    ) -> DbResult<&mut Self> {
        self.apply(|stmt, _| {
            let direction = Direction::parse(direction)?;
            let field = validate_column(field)?;
            if !regexp_pattern_re().is_match(pattern) {
                return Err(DbError::validation(format!(
                    "Invalid REGEXP ordering pattern: {pattern}"
                )));
            }
            stmt.push_order(format!("{field} REGEXP '{pattern}'"), direction);
            Ok(())
        })
    }

    fn group_by(&mut self, field: &str) -> DbResult<&mut Self> {
        self.apply(|stmt, _| {
            let field = validate_expression(field)?.to_string();
            if !stmt.group_by.contains(&field) {
                stmt.group_by.push(field);
            }
            Ok(())
        })
    }

    /// Add statement modifiers (`DISTINCT`, `SQL_NO_CACHE`, `FOR UPDATE`, ...).
    fn set_query_option(&mut self, options: &[&str]) -> DbResult<&mut Self> {
        self.apply(|stmt, _| {
            for option in options {
                stmt.push_option(QueryOption::parse(option)?);
            }
            Ok(())
        })
    }
}

fn push_join(stmt: &mut Statement, target: JoinTarget, on: &str, kind: &str) -> DbResult<()> {
    let kind = JoinKind::parse(kind)?;
    let on = if on.trim().is_empty() {
        String::new()
    } else {
        let on = validate_fragment(on)?;
        if has_placeholder(on) {
            return Err(DbError::validation(format!(
                "JOIN condition cannot bind values, use join_where for them: {on}"
            )));
        }
        on.to_string()
    };
    stmt.joins.push(Join {
        kind,
        target,
        on,
        filters: Vec::new(),
    });
    Ok(())
}

/// A `?` outside quoted literals.
fn has_placeholder(fragment: &str) -> bool {
    unquoted_mask(fragment).is_some_and(|mask| {
        fragment
            .bytes()
            .zip(mask)
            .any(|(b, unquoted)| unquoted && b == b'?')
    })
}

fn push_join_filter(
    stmt: &mut Statement,
    connector: Connector,
    table: &str,
    column: &str,
    operand: Operand,
    operator: &str,
    mode: SecurityMode,
) -> DbResult<()> {
    let table = TableName::parse(table)?;
    let condition = Condition::build(connector, column, operand, operator, mode)?;
    let join: &mut Join = stmt
        .join_mut(&table)
        .ok_or_else(|| DbError::validation(format!("no join on table {table}")))?;
    join.filters.push(condition);
    Ok(())
}
