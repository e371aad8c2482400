//! Declared MySQL column types and value/type consistency.
//!
//! `SHOW COLUMNS` reports types such as `int(10) unsigned`, `decimal(10,2)` or
//! `enum('draft','live')`. Size modifiers and attributes are stripped; enum and
//! set members are kept because they decide which values are acceptable.

use serde::{Deserialize, Serialize};

/// The part of a declared type that matters for value checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "values", rename_all = "snake_case")]
pub enum ColumnKind {
    Integer,
    Float,
    Enum(Vec<String>),
    Set(Vec<String>),
    Other,
}

/// A parsed column type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnType {
    /// Type as reported by the server, e.g. `int(11) unsigned`.
    pub declared: String,
    /// Lowercased base type without size or attributes, e.g. `int`.
    pub base: String,
    pub kind: ColumnKind,
}

impl ColumnType {
    pub fn parse(declared: &str) -> Self {
        let trimmed = declared.trim();
        let base: String = trimmed
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect::<String>()
            .to_ascii_lowercase();

        let kind = match base.as_str() {
            "tinyint" | "smallint" | "mediumint" | "int" | "integer" | "bigint" => {
                ColumnKind::Integer
            }
            "float" | "double" | "decimal" | "numeric" | "real" | "dec" | "fixed" => {
                ColumnKind::Float
            }
            "enum" => ColumnKind::Enum(parse_member_list(trimmed)),
            "set" => ColumnKind::Set(parse_member_list(trimmed)),
            _ => ColumnKind::Other,
        };

        Self {
            declared: trimmed.to_string(),
            base,
            kind,
        }
    }

    /// Whether `value` is structurally consistent with this column type.
    ///
    /// Types that are neither numeric nor enumerated accept anything: the value
    /// is bound, so it can only ever be compared as data.
    pub fn accepts(&self, value: &str) -> bool {
        match &self.kind {
            ColumnKind::Integer => round_trips_as_integer(value),
            ColumnKind::Float => is_numeric(value),
            ColumnKind::Enum(members) => members.iter().any(|m| m == value),
            ColumnKind::Set(members) => value
                .split(',')
                .filter(|v| !v.is_empty())
                .all(|v| members.iter().any(|m| m == v)),
            ColumnKind::Other => true,
        }
    }
}

/// The value parses as an `i64` whose decimal rendering is the value itself.
pub fn round_trips_as_integer(value: &str) -> bool {
    value
        .parse::<i64>()
        .map(|n| n.to_string() == value)
        .unwrap_or(false)
}

/// Numeric string check: optional surrounding whitespace, sign, digits with an
/// optional fraction, optional exponent.
pub fn is_numeric(value: &str) -> bool {
    let s = value.trim_start_matches([' ', '\t', '\n', '\r', '\x0b', '\x0c']);
    let s = s.trim_end_matches([' ', '\t', '\n', '\r', '\x0b', '\x0c']);
    let bytes = s.as_bytes();
    let mut i = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i += 1;
    }
    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let int_digits = i - int_start;

    let mut frac_digits = 0;
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        let frac_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        frac_digits = i - frac_start;
    }
    if int_digits == 0 && frac_digits == 0 {
        return false;
    }

    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        i += 1;
        if matches!(bytes.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        let exp_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == exp_start {
            return false;
        }
    }

    i == bytes.len()
}

/// Members of `enum('a','b')` / `set('a','b')`.
fn parse_member_list(declared: &str) -> Vec<String> {
    let (Some(open), Some(close)) = (declared.find('('), declared.rfind(')')) else {
        return Vec::new();
    };
    if close <= open {
        return Vec::new();
    }
    let inner = &declared[open + 1..close];

    let mut members = Vec::new();
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\'' {
            continue;
        }
        let mut member = String::new();
        while let Some(c) = chars.next() {
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        member.push(escaped);
                    }
                }
                '\'' if chars.peek() == Some(&'\'') => {
                    chars.next();
                    member.push('\'');
                }
                '\'' => break,
                other => member.push(other),
            }
        }
        members.push(member);
    }
    members
}
