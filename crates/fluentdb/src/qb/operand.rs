//! Right-hand sides of conditions and insert/update data.

use crate::error::{DbError, DbResult};
use crate::value::{Value, from_scalars};
use fluentdb_guard::is_plain_column;
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Built subquery: SQL text, its flattened binds and an optional alias.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SubquerySql {
    pub sql: String,
    pub binds: Vec<Value>,
    pub alias: Option<String>,
}

impl SubquerySql {
    /// `(sql)` or `(sql) alias`.
    pub fn render(&self) -> String {
        match &self.alias {
            Some(alias) => format!("({}) {}", self.sql, alias),
            None => format!("({})", self.sql),
        }
    }
}

/// Anything that can be embedded as a subquery.
pub trait SubqueryProvider {
    fn subquery(&self) -> DbResult<SubquerySql>;
}

impl SubqueryProvider for SubquerySql {
    fn subquery(&self) -> DbResult<SubquerySql> {
        Ok(self.clone())
    }
}

/// Signed step for [`inc`] / [`dec`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Delta {
    Int(i64),
    Float(f64),
}

impl Delta {
    fn negate(self) -> Self {
        match self {
            Delta::Int(n) => Delta::Int(n.saturating_neg()),
            Delta::Float(f) => Delta::Float(-f),
        }
    }

    fn is_negative(self) -> bool {
        match self {
            Delta::Int(n) => n < 0,
            Delta::Float(f) => f < 0.0,
        }
    }

    fn magnitude(self) -> String {
        match self {
            Delta::Int(n) => n.unsigned_abs().to_string(),
            Delta::Float(f) => f.abs().to_string(),
        }
    }
}

macro_rules! delta_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Delta {
                fn from(n: $t) -> Self {
                    Delta::Int(i64::from(n))
                }
            }
        )*
    };
}

delta_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl TryFrom<f64> for Delta {
    type Error = DbError;

    fn try_from(f: f64) -> Result<Self, Self::Error> {
        if f.is_finite() {
            Ok(Delta::Float(f))
        } else {
            Err(DbError::validation(format!("invalid increment: {f}")))
        }
    }
}

/// A validated raw SQL function expression with its own binds.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFunction {
    expr: String,
    binds: Vec<Value>,
}

impl RawFunction {
    pub fn expr(&self) -> &str {
        &self.expr
    }

    pub fn binds(&self) -> &[Value] {
        &self.binds
    }
}

/// A raw SQL fragment standing in for a bound value.
#[derive(Debug, Clone, PartialEq)]
pub enum Tagged {
    /// `col + n` / `col - n` (UPDATE data).
    Increment(Delta),
    /// A whitelisted function call or `base +/- INTERVAL n UNIT`.
    Function(RawFunction),
    /// `!col`; `None` negates the column being assigned.
    Negate(Option<String>),
}

impl Tagged {
    /// SQL fragment for a value assigned to (or compared with) `column`.
    pub fn render(&self, column: &str) -> String {
        match self {
            Tagged::Increment(delta) => {
                let sign = if delta.is_negative() { '-' } else { '+' };
                format!("{column} {sign} {}", delta.magnitude())
            }
            Tagged::Function(f) => f.expr.clone(),
            Tagged::Negate(Some(other)) => format!("!{other}"),
            Tagged::Negate(None) => format!("!{column}"),
        }
    }

    pub fn binds(&self) -> &[Value] {
        match self {
            Tagged::Function(f) => &f.binds,
            _ => &[],
        }
    }
}

/// Functions allowed in [`func`] and as interval bases.
pub const TAGGED_FUNCTIONS: &[&str] = &[
    "NOW", "CURDATE", "CURTIME", "CURRENT_DATE", "CURRENT_TIME", "CURRENT_TIMESTAMP",
    "UTC_DATE", "UTC_TIME", "UTC_TIMESTAMP", "LOCALTIME", "LOCALTIMESTAMP", "SYSDATE",
    "UNIX_TIMESTAMP", "FROM_UNIXTIME", "UUID", "RAND", "MD5", "SHA1", "SHA2", "LOWER", "UPPER",
    "TRIM", "LENGTH", "ABS", "ROUND", "FLOOR", "CEIL", "COALESCE", "IFNULL", "GREATEST",
    "LEAST", "CONCAT", "DATE", "DATE_FORMAT", "STR_TO_DATE", "INET_ATON", "INET6_ATON",
];

const INTERVAL_UNITS: &str =
    "MICROSECOND|SECOND|MINUTE|HOUR|DAY|WEEK|MONTH|QUARTER|YEAR";

fn call_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)\(\s*(\?(?:\s*,\s*\?)*)?\s*\)$")
            .expect("invalid built-in regex")
    })
}

fn interval_expr_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r"(?i)^([A-Za-z_][A-Za-z0-9_.]*(?:\(\s*\))?)\s*([+-])\s*INTERVAL\s+([0-9]+)\s+({INTERVAL_UNITS})$"
        ))
        .expect("invalid built-in regex")
    })
}

fn diff_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([+-]?)\s*([0-9]+)\s*([smhdMY]?)$").expect("invalid built-in regex"))
}

fn is_tagged_function(name: &str) -> bool {
    TAGGED_FUNCTIONS.contains(&name.to_ascii_uppercase().as_str())
}

/// `NOW()`-style base of an interval: a column or a zero-argument function.
fn is_interval_base(base: &str) -> bool {
    match base.strip_suffix(')') {
        Some(call) => call_re()
            .captures(&format!("{call})"))
            .is_some_and(|caps| caps.get(2).is_none() && is_tagged_function(&caps[1])),
        None => is_plain_column(base),
    }
}

/// Increment a numeric column in UPDATE data: `views = views + n`.
pub fn inc(n: impl Into<Delta>) -> Tagged {
    Tagged::Increment(n.into())
}

/// Decrement a numeric column in UPDATE data: `stock = stock - n`.
pub fn dec(n: impl Into<Delta>) -> Tagged {
    Tagged::Increment(n.into().negate())
}

/// Negate the assigned column: `active = !active`.
pub fn not() -> Tagged {
    Tagged::Negate(None)
}

/// Assign the negation of another column: `active = !archived`.
pub fn not_column(column: &str) -> DbResult<Tagged> {
    let column = column.trim();
    if !is_plain_column(column) {
        return Err(DbError::validation(format!("Invalid column name: {column}")));
    }
    Ok(Tagged::Negate(Some(column.to_string())))
}

/// A raw function expression with extra binds.
///
/// Accepted forms are a whitelisted call whose arguments are all `?`
/// (`SHA2(?, 256)` is not accepted, `MD5(?)` is), or
/// `base (+|-) INTERVAL n UNIT` where base is a column or a zero-argument
/// whitelisted call.
///
/// ```
/// use fluentdb::qb::func;
///
/// assert!(func("MD5(?)", vec!["secret".into()]).is_ok());
/// assert!(func("NOW() - INTERVAL 1 DAY", vec![]).is_ok());
/// assert!(func("MD5(?)", vec![]).is_err());
/// assert!(func("SLEEP(5)", vec![]).is_err());
/// ```
pub fn func(expr: &str, binds: Vec<Value>) -> DbResult<Tagged> {
    let expr = expr.trim();
    let invalid = || DbError::validation(format!("Invalid function expression: {expr}"));

    if let Some(caps) = call_re().captures(expr) {
        if !is_tagged_function(&caps[1]) {
            return Err(invalid());
        }
        let placeholders = caps.get(2).map_or(0, |m| m.as_str().matches('?').count());
        if placeholders != binds.len() {
            return Err(DbError::validation(format!(
                "function {expr} expects {placeholders} binds, got {}",
                binds.len()
            )));
        }
    } else if let Some(caps) = interval_expr_re().captures(expr) {
        if !is_interval_base(&caps[1]) || !binds.is_empty() {
            return Err(invalid());
        }
    } else {
        return Err(invalid());
    }

    Ok(Tagged::Function(RawFunction {
        expr: expr.to_string(),
        binds,
    }))
}

/// `base + INTERVAL n UNIT` from a short diff such as `"-1d"` or `"+2h"`.
///
/// Units: `s` second, `m` minute, `h` hour, `d` day (default), `M` month,
/// `Y` year. An empty diff yields the base alone.
pub fn interval(diff: &str, base: &str) -> DbResult<Tagged> {
    let base = base.trim();
    if !is_interval_base(base) {
        return Err(DbError::validation(format!("Invalid interval base: {base}")));
    }
    let diff = diff.trim();
    if diff.is_empty() {
        return Ok(Tagged::Function(RawFunction {
            expr: base.to_string(),
            binds: Vec::new(),
        }));
    }

    let caps = diff_re()
        .captures(diff)
        .ok_or_else(|| DbError::validation(format!("Invalid interval: {diff}")))?;
    let sign = if &caps[1] == "-" { "-" } else { "+" };
    let unit = match &caps[3] {
        "s" => "SECOND",
        "m" => "MINUTE",
        "h" => "HOUR",
        "M" => "MONTH",
        "Y" => "YEAR",
        _ => "DAY",
    };
    func(&format!("{base} {sign} INTERVAL {} {unit}", &caps[2]), Vec::new())
}

/// `NOW()` shifted by a diff; see [`interval`].
pub fn now(diff: &str) -> DbResult<Tagged> {
    interval(diff, "NOW()")
}

/// Right-hand side of a condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Scalar(Value),
    List(Vec<Value>),
    Subquery(SubquerySql),
    Tagged(Tagged),
}

impl Operand {
    pub fn is_null(&self) -> bool {
        matches!(self, Operand::Scalar(Value::Null))
    }
}

from_scalars!(Operand, Operand::Scalar);

impl<T: Into<Value>> From<Vec<T>> for Operand {
    fn from(values: Vec<T>) -> Self {
        Operand::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Operand {
    fn from(values: [T; N]) -> Self {
        Operand::List(values.into_iter().map(Into::into).collect())
    }
}

impl From<SubquerySql> for Operand {
    fn from(sub: SubquerySql) -> Self {
        Operand::Subquery(sub)
    }
}

impl From<Tagged> for Operand {
    fn from(tagged: Tagged) -> Self {
        Operand::Tagged(tagged)
    }
}

/// A value in INSERT / UPDATE data.
#[derive(Debug, Clone, PartialEq)]
pub enum DataValue {
    Value(Value),
    Subquery(SubquerySql),
    Tagged(Tagged),
}

from_scalars!(DataValue, DataValue::Value);

impl From<Vec<u8>> for DataValue {
    fn from(bytes: Vec<u8>) -> Self {
        DataValue::Value(Value::Bytes(bytes))
    }
}

impl From<SubquerySql> for DataValue {
    fn from(sub: SubquerySql) -> Self {
        DataValue::Subquery(sub)
    }
}

impl From<Tagged> for DataValue {
    fn from(tagged: Tagged) -> Self {
        DataValue::Tagged(tagged)
    }
}

/// Ordered column/value pairs for INSERT and UPDATE.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Data {
    entries: Vec<(String, DataValue)>,
}

impl Data {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a column, replacing an earlier value in place.
    pub fn set(mut self, column: impl Into<String>, value: impl Into<DataValue>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<DataValue>) {
        let column = column.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(c, _)| *c == column) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&DataValue> {
        self.entries
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(c, _)| c.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DataValue)> {
        self.entries.iter().map(|(c, v)| (c.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<DataValue>> FromIterator<(K, V)> for Data {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut data = Data::new();
        for (k, v) in iter {
            data.insert(k, v);
        }
        data
    }
}

impl fmt::Display for Tagged {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render("<column>"))
    }
}

/// Build a [`Data`] map.
///
/// ```
/// use fluentdb::{data, qb::inc};
///
/// let data = data! { "title" => "Hello", "views" => inc(1) };
/// assert_eq!(data.len(), 2);
/// ```
#[macro_export]
macro_rules! data {
    () => {
        $crate::qb::Data::new()
    };
    ($($column:expr => $value:expr),+ $(,)?) => {{
        let mut data = $crate::qb::Data::new();
        $(data.insert($column, $value);)+
        data
    }};
}
