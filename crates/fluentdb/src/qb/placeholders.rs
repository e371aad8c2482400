//! Placeholder post-processing.

use crate::error::{DbError, DbResult};
use crate::value::{Bind, Value};
use fluentdb_guard::scan::unquoted_mask;

fn mask_for(sql: &str) -> DbResult<Vec<bool>> {
    unquoted_mask(sql).ok_or_else(|| DbError::validation("unbalanced quotes in SQL"))
}

/// Spread list binds over their placeholder.
///
/// Every `?` outside quoted literals consumes one bind; a [`Bind::List`] of n
/// values turns its `?` into `?, ?, ...` (n times) and is flattened into the
/// returned values.
pub fn expand_array_params(sql: &str, binds: Vec<Bind>) -> DbResult<(String, Vec<Value>)> {
    let mask = mask_for(sql)?;
    let mut out = String::with_capacity(sql.len());
    let mut values = Vec::with_capacity(binds.len());
    let mut binds = binds.into_iter();
    let mut used = 0usize;

    for (i, c) in sql.char_indices() {
        if c != '?' || !mask[i] {
            out.push(c);
            continue;
        }
        used += 1;
        match binds.next() {
            Some(Bind::One(value)) => {
                out.push('?');
                values.push(value);
            }
            Some(Bind::List(list)) => {
                if list.is_empty() {
                    return Err(DbError::validation("cannot bind an empty list"));
                }
                out.push_str(&vec!["?"; list.len()].join(", "));
                values.extend(list);
            }
            None => {
                return Err(DbError::validation(format!(
                    "SQL has more placeholders than binds ({used} or more)"
                )));
            }
        }
    }

    let extra = binds.count();
    if extra > 0 {
        return Err(DbError::validation(format!(
            "SQL has {used} placeholders but {} binds were given",
            used + extra
        )));
    }
    Ok((out, values))
}

/// Render positional binds into the SQL for logging. Never execute the result.
pub fn interpolate(sql: &str, values: &[Value]) -> String {
    let Some(mask) = unquoted_mask(sql) else {
        return sql.to_string();
    };
    let mut out = String::with_capacity(sql.len() + values.len() * 4);
    let mut values = values.iter();
    for (i, c) in sql.char_indices() {
        if c == '?' && mask[i] {
            if let Some(value) = values.next() {
                out.push_str(&value.to_sql_literal());
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// Render `:name` binds into the SQL for logging.
pub fn interpolate_named(sql: &str, values: &[(String, Value)]) -> String {
    let Some(mask) = unquoted_mask(sql) else {
        return sql.to_string();
    };
    let bytes = sql.as_bytes();
    let mut out = String::with_capacity(sql.len());
    let mut i = 0;
    while i < bytes.len() {
        let starts_name = bytes
            .get(i + 1)
            .is_some_and(|b| b.is_ascii_alphabetic() || *b == b'_');
        if bytes[i] == b':' && mask[i] && starts_name {
            let end = (i + 1..bytes.len())
                .find(|&j| !(bytes[j].is_ascii_alphanumeric() || bytes[j] == b'_'))
                .unwrap_or(bytes.len());
            let name = &sql[i + 1..end];
            let bound = values.iter().find(|(n, _)| n.trim_start_matches(':') == name);
            if let Some((_, value)) = bound {
                out.push_str(&value.to_sql_literal());
                i = end;
                continue;
            }
        }
        let ch_len = sql[i..].chars().next().map_or(1, char::len_utf8);
        out.push_str(&sql[i..i + ch_len]);
        i += ch_len;
    }
    out
}
