use super::Db;
use super::execute::Caller;
use crate::driver::Params;
use crate::error::DbResult;
use crate::monitor::QueryType;
use crate::qb::{Limit, Statement, StatementKind, expand_array_params};
use crate::row::{ResultSet, Row};
use crate::value::{Bind, Value};
use regex::{Captures, Regex};
use std::panic::Location;
use std::sync::OnceLock;

/// What a hand-written statement produced.
#[derive(Debug, Clone, PartialEq)]
pub enum RawOutcome {
    /// SELECT, SHOW, DESCRIBE and EXPLAIN.
    Rows(ResultSet),
    /// INSERT / REPLACE that generated an id.
    InsertId(u64),
    Affected(u64),
}

impl RawOutcome {
    pub fn into_rows(self) -> Option<ResultSet> {
        match self {
            RawOutcome::Rows(rows) => Some(rows),
            _ => None,
        }
    }
}

/// Result of [`Db::raw_query_value`].
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Empty,
    /// The statement ended in `LIMIT 1`.
    One(Value),
    Many(Vec<Value>),
}

fn table_ref_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(key\s+)?(from|into|update|join|describe)(\s+)([`']?)([A-Za-z_][A-Za-z0-9_$]*)",
        )
        .expect("invalid built-in regex")
    })
}

fn limit_one_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\blimit\s+1\s*;?\s*$").expect("invalid built-in regex"))
}

/// Prefix table names following FROM / INTO / UPDATE / JOIN / DESCRIBE.
/// Names already carrying the prefix are left alone, and so is the
/// `ON DUPLICATE KEY UPDATE` column list.
///
/// This is a textual rewrite, not a parse. Keywords inside string literals
/// and comments are rewritten too, as is the column in
/// `EXTRACT(YEAR FROM created_at)` or `TRIM(LEADING 'x' FROM name)`. Such
/// SQL should carry already-prefixed names or run without a prefix.
pub(crate) fn apply_prefix(sql: &str, prefix: &str) -> String {
    if prefix.is_empty() {
        return sql.to_string();
    }
    table_ref_re()
        .replace_all(sql, |caps: &Captures<'_>| {
            let name = &caps[5];
            if caps.get(1).is_some() || name.starts_with(prefix) {
                return caps[0].to_string();
            }
            format!("{}{}{}{prefix}{name}", &caps[2], &caps[3], &caps[4])
        })
        .into_owned()
}

impl Db {
    /// Run hand-written SQL with positional `?` binds. A [`Bind::List`]
    /// expands into one placeholder per element.
    #[track_caller]
    pub fn raw_query(&mut self, sql: &str, binds: Vec<Bind>) -> DbResult<RawOutcome> {
        let caller = Location::caller();
        let stmt = self.begin_terminal();
        let sql = apply_prefix(sql, &self.prefix);
        let (sql, params) = self.check(expand_array_params(&sql, binds))?;
        self.run_raw(&stmt, &sql, Params::from(params), caller)
    }

    /// Run hand-written SQL with `:name` binds.
    #[track_caller]
    pub fn raw_query_named<K, V>(
        &mut self,
        sql: &str,
        binds: impl IntoIterator<Item = (K, V)>,
    ) -> DbResult<RawOutcome>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let caller = Location::caller();
        let stmt = self.begin_terminal();
        let sql = apply_prefix(sql, &self.prefix);
        let named: Vec<(String, Value)> = binds
            .into_iter()
            .map(|(name, value)| {
                let name: String = name.into();
                (name.trim_start_matches(':').to_string(), value.into())
            })
            .collect();
        let params = if named.is_empty() {
            Params::Empty
        } else {
            Params::Named(named)
        };
        self.run_raw(&stmt, &sql, params, caller)
    }

    /// First row of a hand-written query.
    #[track_caller]
    pub fn raw_query_one(&mut self, sql: &str, binds: Vec<Bind>) -> DbResult<Option<Row>> {
        let outcome = self.raw_query(sql, binds)?;
        Ok(outcome
            .into_rows()
            .and_then(|rows| rows.into_rows().into_iter().next()))
    }

    /// First column of a hand-written query: a single value when the SQL
    /// ends in `LIMIT 1`, otherwise the column of every row.
    #[track_caller]
    pub fn raw_query_value(&mut self, sql: &str, binds: Vec<Bind>) -> DbResult<RawValue> {
        let single = limit_one_re().is_match(sql.trim());
        let rows = self
            .raw_query(sql, binds)?
            .into_rows()
            .map(ResultSet::into_rows)
            .unwrap_or_default();
        let mut values = rows
            .into_iter()
            .filter_map(|row| row.into_values().into_iter().next());

        if single {
            return Ok(values.next().map_or(RawValue::Empty, RawValue::One));
        }
        let values: Vec<Value> = values.collect();
        if values.is_empty() {
            Ok(RawValue::Empty)
        } else {
            Ok(RawValue::Many(values))
        }
    }

    /// Hand-written SELECT with a LIMIT appended.
    #[track_caller]
    pub fn query(&mut self, sql: &str, limit: impl Into<Limit>) -> DbResult<ResultSet> {
        let caller = Location::caller();
        let stmt = self.begin_terminal();
        let limit = self.check(limit.into().validate(StatementKind::Select))?;
        let mut sql = apply_prefix(sql.trim().trim_end_matches(';'), &self.prefix);
        if let Some(clause) = limit.render() {
            sql.push_str(&clause);
        }
        let outcome = self.run_raw(&stmt, &sql, Params::Empty, caller)?;
        Ok(outcome.into_rows().unwrap_or_default())
    }

    fn run_raw(
        &mut self,
        stmt: &Statement,
        sql: &str,
        params: Params,
        caller: Caller,
    ) -> DbResult<RawOutcome> {
        let kind = QueryType::from_sql(sql);
        if kind.returns_rows() {
            let rows = self.fetch_rows(sql, &params, caller)?;
            return Ok(RawOutcome::Rows(ResultSet::shaped(
                rows,
                stmt.return_type,
                stmt.map_key.clone(),
            )));
        }

        let (affected, id) = self.execute_affected(sql, &params, caller)?;
        match (kind, id) {
            (QueryType::Insert | QueryType::Replace, Some(id)) => {
                self.insert_id = Some(id);
                Ok(RawOutcome::InsertId(id))
            }
            _ => Ok(RawOutcome::Affected(affected)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_rewrite_targets_table_positions() {
        assert_eq!(
            apply_prefix("SELECT * FROM users u JOIN `orders` o ON o.uid = u.id", "app_"),
            "SELECT * FROM app_users u JOIN `app_orders` o ON o.uid = u.id"
        );
        assert_eq!(
            apply_prefix("insert into app_logs (a) values (?)", "app_"),
            "insert into app_logs (a) values (?)"
        );
        assert_eq!(
            apply_prefix(
                "INSERT INTO t (a) VALUES (1) ON DUPLICATE KEY UPDATE a = 2",
                "p_"
            ),
            "INSERT INTO p_t (a) VALUES (1) ON DUPLICATE KEY UPDATE a = 2"
        );
        assert_eq!(apply_prefix("SELECT 1", ""), "SELECT 1");
    }

    #[test]
    fn prefix_rewrite_is_textual() {
        assert_eq!(
            apply_prefix("SELECT EXTRACT(YEAR FROM created_at) FROM orders", "app_"),
            "SELECT EXTRACT(YEAR FROM app_created_at) FROM app_orders"
        );
        assert_eq!(
            apply_prefix("SELECT 'moved from home' AS note FROM users", "app_"),
            "SELECT 'moved from app_home' AS note FROM app_users"
        );
    }

    #[test]
    fn limit_one_detection() {
        assert!(limit_one_re().is_match("SELECT a FROM t LIMIT 1"));
        assert!(limit_one_re().is_match("select a from t limit  1;"));
        assert!(!limit_one_re().is_match("SELECT a FROM t LIMIT 10"));
    }
}
