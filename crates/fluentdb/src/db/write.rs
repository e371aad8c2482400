use super::Db;
use super::execute::Caller;
use crate::driver::Params;
use crate::error::{DbError, DbResult};
use crate::qb::{
    Data, Limit, Statement, StatementKind, build_delete, build_insert, build_insert_bulk,
    build_update,
};
use crate::value::Value;
use std::panic::Location;

impl Db {
    /// Single-row INSERT. Returns the generated id, if the table produced one.
    #[track_caller]
    pub fn insert(&mut self, table: &str, data: Data) -> DbResult<Option<u64>> {
        let caller = Location::caller();
        let stmt = self.begin_terminal();
        self.insert_with(&stmt, StatementKind::Insert, table, &data, caller)
    }

    /// Single-row REPLACE.
    #[track_caller]
    pub fn replace(&mut self, table: &str, data: Data) -> DbResult<Option<u64>> {
        let caller = Location::caller();
        let stmt = self.begin_terminal();
        self.insert_with(&stmt, StatementKind::Replace, table, &data, caller)
    }

    /// One INSERT per row inside a transaction. If no transaction was active
    /// the batch opens its own, and the first failing row rolls the whole
    /// batch back.
    #[track_caller]
    pub fn insert_multi(&mut self, table: &str, rows: Vec<Data>) -> DbResult<Vec<Option<u64>>> {
        let caller = Location::caller();
        let stmt = self.begin_terminal();
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let opened = !self.with_conn(|conn| Ok(conn.in_transaction()))?;
        if opened {
            self.with_conn(|conn| conn.begin())?;
        }

        let mut ids = Vec::with_capacity(rows.len());
        for (index, data) in rows.iter().enumerate() {
            match self.insert_with(&stmt, StatementKind::Insert, table, data, caller) {
                Ok(id) => ids.push(id),
                Err(error) => {
                    if opened {
                        tracing::warn!(
                            target: "fluentdb.sql",
                            table,
                            row = index,
                            error = %error,
                            "batch insert failed, rolling back"
                        );
                        if let Err(rollback) = self.with_conn(|conn| conn.rollback()) {
                            tracing::error!(target: "fluentdb.sql", error = %rollback, "batch rollback failed");
                        }
                    }
                    return Err(error);
                }
            }
        }

        if opened {
            self.with_conn(|conn| conn.commit())?;
        }
        self.count = ids.len() as u64;
        Ok(ids)
    }

    /// [`insert_multi`](Self::insert_multi) with one shared key list.
    #[track_caller]
    pub fn insert_multi_keys(
        &mut self,
        table: &str,
        keys: &[&str],
        rows: Vec<Vec<Value>>,
    ) -> DbResult<Vec<Option<u64>>> {
        if let Some((index, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != keys.len())
        {
            self.begin_terminal();
            return self.check(Err(DbError::validation(format!(
                "row {index} has {} values for {} keys",
                row.len(),
                keys.len()
            ))));
        }
        let data = rows
            .into_iter()
            .map(|row| keys.iter().copied().zip(row).collect::<Data>())
            .collect();
        self.insert_multi(table, data)
    }

    /// One multi-row INSERT. Columns come from the first row; a row missing
    /// one of them inserts NULL there. Returns the affected row count.
    #[track_caller]
    pub fn insert_bulk(&mut self, table: &str, rows: Vec<Data>) -> DbResult<u64> {
        let caller = Location::caller();
        let stmt = self.begin_terminal();
        if rows.is_empty() {
            return Ok(0);
        }
        let table = self.table(table)?;
        let query = self.build(&stmt, |stmt, ctx| {
            build_insert_bulk(stmt, &table, &rows, ctx)
        })?;
        let (affected, id) =
            self.execute_affected(&query.sql, &Params::from(query.params), caller)?;
        self.insert_id = id;
        Ok(affected)
    }

    /// `UPDATE table SET ...` with the pending clauses. Returns affected rows.
    ///
    /// Scoping the update with a WHERE clause is the caller's job.
    #[track_caller]
    pub fn update(&mut self, table: &str, data: Data, limit: impl Into<Limit>) -> DbResult<u64> {
        let caller = Location::caller();
        let stmt = self.begin_terminal();
        let limit = limit.into();
        let table = self.table(table)?;
        let query = self.build(&stmt, |stmt, ctx| {
            build_update(stmt, &table, &data, limit, ctx)
        })?;
        let (affected, _) =
            self.execute_affected(&query.sql, &Params::from(query.params), caller)?;
        Ok(affected)
    }

    /// `DELETE FROM table` with the pending clauses. Returns affected rows.
    #[track_caller]
    pub fn delete(&mut self, table: &str, limit: impl Into<Limit>) -> DbResult<u64> {
        let caller = Location::caller();
        let stmt = self.begin_terminal();
        let limit = limit.into();
        let table = self.table(table)?;
        let query = self.build(&stmt, |stmt, ctx| build_delete(stmt, &table, limit, ctx))?;
        let (affected, _) =
            self.execute_affected(&query.sql, &Params::from(query.params), caller)?;
        Ok(affected)
    }

    pub(super) fn insert_with(
        &mut self,
        stmt: &Statement,
        kind: StatementKind,
        table: &str,
        data: &Data,
        caller: Caller,
    ) -> DbResult<Option<u64>> {
        let table = self.table(table)?;
        let query = self.build(stmt, |stmt, ctx| {
            build_insert(stmt, kind, &table, data, ctx)
        })?;
        let (_, id) = self.execute_affected(&query.sql, &Params::from(query.params), caller)?;
        self.insert_id = id;
        Ok(id)
    }
}
