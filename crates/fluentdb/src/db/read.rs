use super::Db;
use super::execute::{Caller, saturating_i64};
use crate::driver::Params;
use crate::error::{DbError, DbResult};
use crate::qb::{Columns, Limit, Statement, build_select, expand_array_params};
use crate::row::{ResultSet, Row};
use crate::value::{Bind, Value};
use std::panic::Location;

impl Db {
    /// `SELECT columns FROM table ...` with the pending clauses.
    #[track_caller]
    pub fn get(
        &mut self,
        table: &str,
        limit: impl Into<Limit>,
        columns: impl Into<Columns>,
    ) -> DbResult<ResultSet> {
        let caller = Location::caller();
        let stmt = self.begin_terminal();
        self.select_with(&stmt, table, limit.into(), &columns.into(), caller)
    }

    /// First matching row.
    #[track_caller]
    pub fn get_one(&mut self, table: &str, columns: impl Into<Columns>) -> DbResult<Option<Row>> {
        let caller = Location::caller();
        let stmt = self.begin_terminal();
        let rows = self.select_with(&stmt, table, Limit::Count(1), &columns.into(), caller)?;
        Ok(rows.into_rows().into_iter().next())
    }

    /// A single value: `SELECT column AS retval ... LIMIT 1`.
    #[track_caller]
    pub fn get_value(&mut self, table: &str, column: &str) -> DbResult<Option<Value>> {
        let caller = Location::caller();
        let stmt = self.begin_terminal();
        let columns = Columns::from(format!("{column} AS retval"));
        let rows = self.select_with(&stmt, table, Limit::Count(1), &columns, caller)?;
        Ok(rows.first().and_then(|row| row.get("retval")).cloned())
    }

    /// One column of every matching row.
    #[track_caller]
    pub fn get_values(
        &mut self,
        table: &str,
        column: &str,
        limit: impl Into<Limit>,
    ) -> DbResult<Vec<Value>> {
        let caller = Location::caller();
        let stmt = self.begin_terminal();
        let columns = Columns::from(format!("{column} AS retval"));
        let rows = self.select_with(&stmt, table, limit.into(), &columns, caller)?;
        Ok(rows
            .iter()
            .filter_map(|row| row.get("retval").cloned())
            .collect())
    }

    /// Whether any row matches the pending clauses.
    #[track_caller]
    pub fn has(&mut self, table: &str) -> DbResult<bool> {
        let caller = Location::caller();
        let stmt = self.begin_terminal();
        let rows = self.select_with(&stmt, table, Limit::Count(1), &Columns::from("1"), caller)?;
        Ok(!rows.is_empty())
    }

    /// Page `page` (1-based) of `page_limit` rows. Sets `total_count` and
    /// `total_pages`.
    #[track_caller]
    pub fn paginate(
        &mut self,
        table: &str,
        page: u64,
        columns: impl Into<Columns>,
    ) -> DbResult<ResultSet> {
        let caller = Location::caller();
        let mut stmt = self.begin_terminal();
        if page == 0 {
            return self.check(Err(DbError::validation("page numbers start at 1")));
        }
        stmt.with_total_count = true;
        let offset = (page - 1).saturating_mul(self.page_limit);
        let limit = Limit::Range(saturating_i64(offset), saturating_i64(self.page_limit));
        let rows = self.select_with(&stmt, table, limit, &columns.into(), caller)?;
        self.total_pages = self.total_count.div_ceil(self.page_limit);
        Ok(rows)
    }

    pub(super) fn select_with(
        &mut self,
        stmt: &Statement,
        table: &str,
        limit: Limit,
        columns: &Columns,
        caller: Caller,
    ) -> DbResult<ResultSet> {
        let table = self.table(table)?;
        let query = self.build(stmt, |stmt, ctx| {
            build_select(stmt, &table, columns, limit, ctx)
        })?;
        let rows = self.fetch_rows(&query.sql, &Params::from(query.params), caller)?;

        if stmt.with_total_count {
            let fetched = rows.len() as u64;
            let found = self.fetch_rows("SELECT FOUND_ROWS()", &Params::Empty, caller)?;
            self.total_count = found
                .first()
                .and_then(|row| row.get_index(0))
                .and_then(Value::as_u64)
                .unwrap_or(fetched);
            self.count = fetched;
        }
        Ok(ResultSet::shaped(
            rows,
            stmt.return_type,
            stmt.map_key.clone(),
        ))
    }

    /// Whether every listed table exists in the profile's database.
    #[track_caller]
    pub fn table_exists(&mut self, tables: &[&str]) -> DbResult<bool> {
        let caller = Location::caller();
        self.begin_terminal();
        if tables.is_empty() {
            return self.check(Err(DbError::validation("no tables given")));
        }

        let mut names: Vec<Value> = Vec::with_capacity(tables.len());
        for table in tables {
            let name = Value::from(self.table(table)?.prefixed(&self.prefix));
            if !names.contains(&name) {
                names.push(name);
            }
        }
        let schema = self
            .session
            .profile(&self.connection)
            .map(|profile| profile.db)
            .unwrap_or_default();
        let expected = names.len();

        let expanded = expand_array_params(
            "SELECT table_name FROM information_schema.tables \
             WHERE table_schema = ? AND table_name IN (?)",
            vec![Bind::One(schema.into()), Bind::List(names)],
        );
        let (sql, params) = self.check(expanded)?;
        let rows = self.fetch_rows(&sql, &Params::from(params), caller)?;
        Ok(rows.len() == expected)
    }

    /// Round-trip to the server, opening the connection if needed.
    pub fn ping(&mut self) -> DbResult<()> {
        self.with_conn(|conn| conn.ping())
    }
}
