//! `mysql` crate backend.

use super::{Connection, Connector, Params};
use crate::config::ConnectionProfile;
use crate::error::DbResult;
use crate::row::Row;
use crate::value::Value;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use mysql::consts::ColumnType as MysqlType;
use mysql::prelude::Queryable;
use std::sync::Arc;

/// Collation id MySQL reports for binary strings.
const BINARY_CHARSET: u16 = 63;

/// Connects with the synchronous `mysql` client.
#[derive(Debug, Clone, Copy, Default)]
pub struct MysqlConnector;

impl Connector for MysqlConnector {
    fn connect(&self, profile: &ConnectionProfile) -> DbResult<Box<dyn Connection>> {
        let mut opts = mysql::OptsBuilder::new()
            .ip_or_hostname(Some(profile.host.clone()))
            .tcp_port(profile.port)
            .user(Some(profile.username.clone()))
            .pass(Some(profile.password.clone()))
            .init(vec![format!("SET NAMES {}", profile.charset)]);
        if !profile.db.is_empty() {
            opts = opts.db_name(Some(profile.db.clone()));
        }
        if let Some(socket) = &profile.socket {
            opts = opts.socket(Some(socket.clone()));
        }

        tracing::debug!(target: "fluentdb.connection", profile = %profile, "connecting");
        let conn = mysql::Conn::new(opts)?;
        Ok(Box::new(MysqlConnection {
            conn,
            last_insert_id: None,
            in_transaction: false,
        }))
    }
}

struct MysqlConnection {
    conn: mysql::Conn,
    last_insert_id: Option<u64>,
    in_transaction: bool,
}

impl Connection for MysqlConnection {
    fn query(&mut self, sql: &str, params: &Params) -> DbResult<Vec<Row>> {
        let mut result = self.conn.exec_iter(sql, to_mysql_params(params))?;
        let mut rows = Vec::new();
        let mut columns: Option<Arc<[String]>> = None;
        for row in result.by_ref() {
            let row = row?;
            let meta = row.columns();
            let names = columns
                .get_or_insert_with(|| meta.iter().map(|c| c.name_str().into_owned()).collect())
                .clone();
            let values = row
                .unwrap()
                .into_iter()
                .zip(meta.iter())
                .map(|(v, c)| from_mysql(v, c))
                .collect();
            rows.push(Row::new(names, values));
        }
        self.last_insert_id = result.last_insert_id().filter(|id| *id > 0);
        Ok(rows)
    }

    fn execute(&mut self, sql: &str, params: &Params) -> DbResult<u64> {
        let result = self.conn.exec_iter(sql, to_mysql_params(params))?;
        let affected = result.affected_rows();
        self.last_insert_id = result.last_insert_id().filter(|id| *id > 0);
        drop(result);
        Ok(affected)
    }

    fn execute_unprepared(&mut self, sql: &str) -> DbResult<u64> {
        self.conn.query_drop(sql)?;
        let id = self.conn.last_insert_id();
        self.last_insert_id = (id > 0).then_some(id);
        Ok(self.conn.affected_rows())
    }

    fn last_insert_id(&self) -> Option<u64> {
        self.last_insert_id
    }

    fn begin(&mut self) -> DbResult<()> {
        self.conn.query_drop("START TRANSACTION")?;
        self.in_transaction = true;
        Ok(())
    }

    fn commit(&mut self) -> DbResult<()> {
        self.conn.query_drop("COMMIT")?;
        self.in_transaction = false;
        Ok(())
    }

    fn rollback(&mut self) -> DbResult<()> {
        let result = self.conn.query_drop("ROLLBACK");
        self.in_transaction = false;
        Ok(result?)
    }

    fn in_transaction(&self) -> bool {
        self.in_transaction
    }
}

fn to_mysql_params(params: &Params) -> mysql::Params {
    match params {
        Params::Empty => mysql::Params::Empty,
        Params::Positional(values) => {
            mysql::Params::Positional(values.iter().map(to_mysql).collect())
        }
        Params::Named(values) => values
            .iter()
            .map(|(name, v)| (name.clone(), to_mysql(v)))
            .collect::<Vec<_>>()
            .into(),
    }
}

fn to_mysql(value: &Value) -> mysql::Value {
    use chrono::{Datelike, Timelike};
    match value {
        Value::Null => mysql::Value::NULL,
        Value::Bool(b) => mysql::Value::Int(i64::from(*b)),
        Value::Int(n) => mysql::Value::Int(*n),
        Value::UInt(n) => mysql::Value::UInt(*n),
        Value::Float(f) => mysql::Value::Double(*f),
        Value::Text(s) => mysql::Value::Bytes(s.clone().into_bytes()),
        Value::Bytes(b) => mysql::Value::Bytes(b.clone()),
        Value::Date(d) => {
            mysql::Value::Date(d.year() as u16, d.month() as u8, d.day() as u8, 0, 0, 0, 0)
        }
        Value::DateTime(dt) => mysql::Value::Date(
            dt.year() as u16,
            dt.month() as u8,
            dt.day() as u8,
            dt.hour() as u8,
            dt.minute() as u8,
            dt.second() as u8,
            dt.nanosecond() / 1_000,
        ),
    }
}

fn from_mysql(value: mysql::Value, column: &mysql::Column) -> Value {
    match value {
        mysql::Value::NULL => Value::Null,
        mysql::Value::Int(n) => Value::Int(n),
        mysql::Value::UInt(n) => Value::UInt(n),
        mysql::Value::Float(f) => Value::Float(f64::from(f)),
        mysql::Value::Double(f) => Value::Float(f),
        mysql::Value::Bytes(bytes) if column.character_set() == BINARY_CHARSET => {
            Value::Bytes(bytes)
        }
        mysql::Value::Bytes(bytes) => match String::from_utf8(bytes) {
            Ok(text) => Value::Text(text),
            Err(e) => Value::Bytes(e.into_bytes()),
        },
        mysql::Value::Date(y, m, d, h, i, s, micros) => {
            let date = NaiveDate::from_ymd_opt(i32::from(y), u32::from(m), u32::from(d));
            let time = NaiveTime::from_hms_micro_opt(
                u32::from(h),
                u32::from(i),
                u32::from(s),
                micros,
            );
            match (date, time) {
                (Some(date), _) if column.column_type() == MysqlType::MYSQL_TYPE_DATE => {
                    Value::Date(date)
                }
                (Some(date), Some(time)) => Value::DateTime(NaiveDateTime::new(date, time)),
                // Zero dates ("0000-00-00") have no chrono form.
                _ => Value::Text(format!(
                    "{y:04}-{m:02}-{d:02} {h:02}:{i:02}:{s:02}"
                )),
            }
        }
        mysql::Value::Time(negative, days, h, i, s, _) => {
            let hours = days * 24 + u32::from(h);
            let sign = if negative { "-" } else { "" };
            Value::Text(format!("{sign}{hours:02}:{i:02}:{s:02}"))
        }
    }
}
