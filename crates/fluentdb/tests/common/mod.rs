#![allow(dead_code)]

//! A scripted in-memory driver.
//!
//! Every statement is recorded with its parameters. Row-returning statements
//! get the canned rows of the first registered SQL fragment they contain.
//! The Nth statement can be made to fail, and INSERTs hand out increasing ids.
//! Inserts made inside a transaction only count as committed after COMMIT.

use fluentdb::{Connection, ConnectionProfile, Db, DbError, DbResult, Params, Row, Value};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq)]
pub struct Executed {
    pub sql: String,
    pub params: Params,
}

#[derive(Debug, Default)]
pub struct MockState {
    pub executed: Vec<Executed>,
    pub canned: Vec<(String, Vec<Row>)>,
    pub fail_on: Option<usize>,
    pub fail_matching: Option<String>,
    pub next_insert_id: u64,
    pub affected: u64,
    pub in_transaction: bool,
    pub pending_inserts: usize,
    pub committed_inserts: usize,
    pub connects: usize,
    pub tx_events: Vec<&'static str>,
}

#[derive(Debug, Clone, Default)]
pub struct Mock {
    state: Arc<Mutex<MockState>>,
}

impl Mock {
    pub fn new() -> Self {
        let mock = Self::default();
        mock.state().next_insert_id = 1;
        mock.state().affected = 1;
        mock
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub fn db(&self) -> Db {
        let mock = self.clone();
        Db::new(
            move |_: &ConnectionProfile| -> DbResult<Box<dyn Connection>> {
                mock.state().connects += 1;
                Ok(Box::new(MockConnection {
                    state: Arc::clone(&mock.state),
                    last_insert_id: None,
                }))
            },
            ConnectionProfile::new("localhost", "app", "secret", "shop"),
        )
    }

    /// Rows returned for any query containing `fragment`.
    pub fn on(&self, fragment: &str, rows: Vec<Row>) -> &Self {
        self.state().canned.push((fragment.to_string(), rows));
        self
    }

    /// Fail the `n`th statement (1-based) from now on.
    pub fn fail_on(&self, n: usize) -> &Self {
        let mut state = self.state();
        state.fail_on = Some(state.executed.len() + n);
        drop(state);
        self
    }

    /// Fail every statement containing `fragment`.
    pub fn fail_matching(&self, fragment: &str) -> &Self {
        self.state().fail_matching = Some(fragment.to_string());
        self
    }

    pub fn sql(&self) -> Vec<String> {
        self.state().executed.iter().map(|e| e.sql.clone()).collect()
    }

    pub fn last(&self) -> Executed {
        self.state().executed.last().cloned().expect("no statement executed")
    }

    pub fn params(&self, index: usize) -> Vec<Value> {
        self.state().executed[index]
            .params
            .values()
            .into_iter()
            .cloned()
            .collect()
    }
}

pub fn row(pairs: &[(&str, Value)]) -> Row {
    Row::from_pairs(pairs.iter().cloned())
}

struct MockConnection {
    state: Arc<Mutex<MockState>>,
    last_insert_id: Option<u64>,
}

impl MockConnection {
    fn record(&self, sql: &str, params: &Params) -> DbResult<MutexGuard<'_, MockState>> {
        let mut state = self.state.lock().unwrap();
        state.executed.push(Executed {
            sql: sql.to_string(),
            params: params.clone(),
        });
        let n = state.executed.len();
        let matched = state
            .fail_matching
            .as_deref()
            .is_some_and(|fragment| sql.contains(fragment));
        if state.fail_on == Some(n) || matched {
            return Err(DbError::driver(Some(1062), format!("Duplicate entry in statement {n}")));
        }
        Ok(state)
    }
}

impl Connection for MockConnection {
    fn query(&mut self, sql: &str, params: &Params) -> DbResult<Vec<Row>> {
        let state = self.record(sql, params)?;
        Ok(state
            .canned
            .iter()
            .find(|(fragment, _)| sql.contains(fragment.as_str()))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default())
    }

    fn execute(&mut self, sql: &str, params: &Params) -> DbResult<u64> {
        let mut state = self.record(sql, params)?;
        let affected = state.affected;
        let upper = sql.trim_start().to_ascii_uppercase();
        let id = if upper.starts_with("INSERT") || upper.starts_with("REPLACE") {
            let id = state.next_insert_id;
            state.next_insert_id += 1;
            if state.in_transaction {
                state.pending_inserts += 1;
            } else {
                state.committed_inserts += 1;
            }
            Some(id)
        } else {
            None
        };
        drop(state);
        self.last_insert_id = id;
        Ok(affected)
    }

    fn execute_unprepared(&mut self, sql: &str) -> DbResult<u64> {
        let state = self.record(sql, &Params::Empty)?;
        Ok(state.affected)
    }

    fn last_insert_id(&self) -> Option<u64> {
        self.last_insert_id
    }

    fn begin(&mut self) -> DbResult<()> {
        let mut state = self.state.lock().unwrap();
        state.in_transaction = true;
        state.tx_events.push("BEGIN");
        Ok(())
    }

    fn commit(&mut self) -> DbResult<()> {
        let mut state = self.state.lock().unwrap();
        state.in_transaction = false;
        state.committed_inserts += state.pending_inserts;
        state.pending_inserts = 0;
        state.tx_events.push("COMMIT");
        Ok(())
    }

    fn rollback(&mut self) -> DbResult<()> {
        let mut state = self.state.lock().unwrap();
        state.in_transaction = false;
        state.pending_inserts = 0;
        state.tx_events.push("ROLLBACK");
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.state.lock().unwrap().in_transaction
    }
}
