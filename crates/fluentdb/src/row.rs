//! Result rows and typed access.

use crate::error::{DbError, DbResult};
use crate::value::Value;
use chrono::{NaiveDate, NaiveDateTime};
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// How terminal reads shape their rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReturnType {
    /// Ordered column/value rows.
    #[default]
    Array,
    /// Rows meant to be decoded into structs with [`ResultSet::decode`].
    Object,
    /// Rows rendered as a JSON array with [`ResultSet::to_json`].
    Json,
}

/// One result row. Column names are shared between the rows of a result.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    /// Build a row from owned column/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let (columns, values): (Vec<String>, Vec<Value>) =
            pairs.into_iter().map(|(k, v)| (k.into(), v.into())).unzip();
        Self {
            columns: columns.into(),
            values,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of a column by name. The last column wins on duplicate names.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .rposition(|c| c == column)
            .map(|i| &self.values[i])
    }

    pub fn get_index(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Typed access to a column.
    pub fn try_get<T: FromValue>(&self, column: &str) -> DbResult<T> {
        let value = self
            .get(column)
            .ok_or_else(|| DbError::decode(column, "no such column"))?;
        T::from_value(value).map_err(|message| DbError::decode(column, message))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_json()))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }

    /// Decode the row into any `Deserialize` type through its JSON form.
    pub fn decode<T: DeserializeOwned>(&self) -> DbResult<T> {
        serde_json::from_value(self.to_json()).map_err(|e| DbError::decode("<row>", e.to_string()))
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

/// Conversion from a column [`Value`].
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self, String>;
}

fn mismatch(expected: &str, value: &Value) -> String {
    format!("cannot read {value:?} as {expected}")
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self, String> {
        Ok(value.clone())
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self, String> {
        value.as_i64().ok_or_else(|| mismatch("i64", value))
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> Result<Self, String> {
        value
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .ok_or_else(|| mismatch("i32", value))
    }
}

impl FromValue for u64 {
    fn from_value(value: &Value) -> Result<Self, String> {
        value.as_u64().ok_or_else(|| mismatch("u64", value))
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Float(f) => Ok(*f),
            Value::Int(n) => Ok(*n as f64),
            Value::UInt(n) => Ok(*n as f64),
            Value::Text(s) => s.trim().parse().map_err(|_| mismatch("f64", value)),
            Value::Bytes(b) => std::str::from_utf8(b)
                .ok()
                .and_then(|s| s.trim().parse().ok())
                .ok_or_else(|| mismatch("f64", value)),
            _ => Err(mismatch("f64", value)),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Bool(b) => Ok(*b),
            other => other
                .as_i64()
                .map(|n| n != 0)
                .ok_or_else(|| mismatch("bool", value)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Null => Err(mismatch("String", value)),
            Value::Bytes(b) => String::from_utf8(b.clone()).map_err(|e| e.to_string()),
            other => Ok(other.to_string()),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Bytes(b) => Ok(b.clone()),
            Value::Text(s) => Ok(s.clone().into_bytes()),
            _ => Err(mismatch("bytes", value)),
        }
    }
}

impl FromValue for NaiveDate {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Date(d) => Ok(*d),
            Value::DateTime(dt) => Ok(dt.date()),
            Value::Text(s) => {
                NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| e.to_string())
            }
            _ => Err(mismatch("NaiveDate", value)),
        }
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::DateTime(dt) => Ok(*dt),
            Value::Date(d) => d
                .and_hms_opt(0, 0, 0)
                .ok_or_else(|| mismatch("NaiveDateTime", value)),
            Value::Text(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .map_err(|e| e.to_string()),
            _ => Err(mismatch("NaiveDateTime", value)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// Rows returned by a terminal read, with the shaping the statement asked for.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultSet {
    rows: Vec<Row>,
    return_type: ReturnType,
    map_key: Option<String>,
}

impl ResultSet {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    pub(crate) fn shaped(rows: Vec<Row>, return_type: ReturnType, map_key: Option<String>) -> Self {
        Self {
            rows,
            return_type,
            map_key,
        }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }

    pub fn return_type(&self) -> ReturnType {
        self.return_type
    }

    pub fn map_key(&self) -> Option<&str> {
        self.map_key.as_deref()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    /// Rows keyed by the map column. Rows missing the column fall back to
    /// their position; without a map column every row is keyed by position.
    pub fn keyed(&self) -> Vec<(String, &Row)> {
        self.rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let key = self
                    .map_key
                    .as_deref()
                    .and_then(|k| row.get(k))
                    .map(Value::to_string)
                    .unwrap_or_else(|| i.to_string());
                (key, row)
            })
            .collect()
    }

    /// JSON rendering. Keyed results become an object, others an array.
    pub fn to_json(&self) -> serde_json::Value {
        if self.map_key.is_some() {
            let map = self
                .keyed()
                .into_iter()
                .map(|(k, row)| (k, row.to_json()))
                .collect::<serde_json::Map<_, _>>();
            return serde_json::Value::Object(map);
        }
        serde_json::Value::Array(self.rows.iter().map(Row::to_json).collect())
    }

    pub fn decode<T: DeserializeOwned>(&self) -> DbResult<Vec<T>> {
        self.rows.iter().map(Row::decode).collect()
    }
}

impl IntoIterator for ResultSet {
    type Item = Row;
    type IntoIter = std::vec::IntoIter<Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
