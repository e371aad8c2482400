//! Bind values.

use chrono::{NaiveDate, NaiveDateTime};
use std::fmt;

/// A scalar value sent to or read from MySQL.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Integer view of the value, parsing text when needed.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::UInt(n) => i64::try_from(*n).ok(),
            Value::Bool(b) => Some(i64::from(*b)),
            Value::Text(s) => s.trim().parse().ok(),
            Value::Bytes(b) => std::str::from_utf8(b).ok()?.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::UInt(n) => Some(*n),
            other => other.as_i64().and_then(|n| u64::try_from(n).ok()),
        }
    }

    /// JSON form used by the JSON return type.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(n) => Json::from(*n),
            Value::UInt(n) => Json::from(*n),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::Text(s) => Json::String(s.clone()),
            Value::Bytes(b) => Json::String(String::from_utf8_lossy(b).into_owned()),
            Value::Date(d) => Json::String(d.format("%Y-%m-%d").to_string()),
            Value::DateTime(dt) => Json::String(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        }
    }

    /// Literal SQL rendering for debug output. Never execute the result.
    pub fn to_sql_literal(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => i64::from(*b).to_string(),
            Value::Int(n) => n.to_string(),
            Value::UInt(n) => n.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Text(s) => quote_literal(s),
            Value::Bytes(b) => {
                let hex: String = b.iter().map(|byte| format!("{byte:02X}")).collect();
                format!("X'{hex}'")
            }
            Value::Date(d) => format!("'{}'", d.format("%Y-%m-%d")),
            Value::DateTime(dt) => format!("'{}'", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

/// Plain text form, used for map keys and value checks.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", i64::from(*b)),
            Value::Int(n) => write!(f, "{n}"),
            Value::UInt(n) => write!(f, "{n}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(s) => f.write_str(s),
            Value::Bytes(b) => f.write_str(&String::from_utf8_lossy(b)),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

/// Single-quote a string with backslash escapes (MySQL default SQL mode).
pub(crate) fn quote_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\0' => out.push_str("\\0"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\x1a' => out.push_str("\\Z"),
            other => out.push(other),
        }
    }
    out.push('\'');
    out
}

macro_rules! value_from {
    ($($t:ty => |$v:ident| $e:expr),* $(,)?) => {
        $(
            impl From<$t> for Value {
                fn from($v: $t) -> Self {
                    $e
                }
            }
        )*
    };
}

value_from! {
    bool => |v| Value::Bool(v),
    i8 => |v| Value::Int(v.into()),
    i16 => |v| Value::Int(v.into()),
    i32 => |v| Value::Int(v.into()),
    i64 => |v| Value::Int(v),
    u8 => |v| Value::UInt(v.into()),
    u16 => |v| Value::UInt(v.into()),
    u32 => |v| Value::UInt(v.into()),
    u64 => |v| Value::UInt(v),
    usize => |v| Value::UInt(v as u64),
    f32 => |v| Value::Float(v.into()),
    f64 => |v| Value::Float(v),
    String => |v| Value::Text(v),
    &str => |v| Value::Text(v.to_string()),
    &String => |v| Value::Text(v.clone()),
    Vec<u8> => |v| Value::Bytes(v),
    NaiveDate => |v| Value::Date(v),
    NaiveDateTime => |v| Value::DateTime(v),
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Implements `From<scalar>` (and `From<Option<scalar>>`) for a wrapper of [`Value`].
macro_rules! from_scalars {
    ($target:ty, $wrap:path) => {
        $crate::value::from_scalars!(@each $target, $wrap;
            bool, i8, i16, i32, i64, u8, u16, u32, u64, usize, f32, f64,
            String, &str, &String, chrono::NaiveDate, chrono::NaiveDateTime,
            $crate::value::Value);
    };
    (@each $target:ty, $wrap:path; $($t:ty),*) => {
        $(
            impl From<$t> for $target {
                fn from(v: $t) -> Self {
                    $wrap($crate::value::Value::from(v))
                }
            }

            impl From<Option<$t>> for $target {
                fn from(v: Option<$t>) -> Self {
                    $wrap($crate::value::Value::from(v))
                }
            }
        )*
    };
}

pub(crate) use from_scalars;

/// A positional bind before array expansion: one value, or a list that will
/// be spread over one placeholder per element.
#[derive(Debug, Clone, PartialEq)]
pub enum Bind {
    One(Value),
    List(Vec<Value>),
}

from_scalars!(Bind, Bind::One);

impl<T: Into<Value>> From<Vec<T>> for Bind {
    fn from(values: Vec<T>) -> Self {
        Bind::List(values.into_iter().map(Into::into).collect())
    }
}

/// Build a `Vec<Bind>` for raw queries.
///
/// ```
/// use fluentdb::{params, Bind};
///
/// let binds: Vec<Bind> = params![30, "active", vec![1, 2, 3]];
/// assert_eq!(binds.len(), 3);
/// ```
#[macro_export]
macro_rules! params {
    () => {
        ::std::vec::Vec::<$crate::Bind>::new()
    };
    ($($value:expr),+ $(,)?) => {
        ::std::vec![$($crate::Bind::from($value)),+]
    };
}
