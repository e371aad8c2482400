//! Recursive validation of free-form SQL expressions.
//!
//! Used for ORDER BY / GROUP BY fields and select-list items. The grammar is
//! deliberately small:
//!
//! - bare or qualified identifiers, quoted literals, numeric literals, `NULL`
//! - whitelisted function calls, arguments validated one by one
//! - `expr IS [NOT] NULL`
//! - `expr <cmp> expr` for `=`, `!=`, `<>`, `<`, `<=`, `>`, `>=`
//! - `expr <op> expr` for `+`, `-`, `*`, `/`
//! - `CASE [expr] WHEN .. THEN .. [ELSE ..] END`
//! - any of the above wrapped in parentheses
//!
//! A blacklist of statement terminators, comment markers and DML/DDL keywords
//! runs first over the whole text.

use crate::column::is_plain_column;
use crate::error::{GuardError, GuardResult};
use crate::scan::{matching_paren, split_top_level, strip_outer_parens, top_level_mask, top_level_words};
use regex::Regex;
use std::sync::OnceLock;

/// Functions callable inside an expression.
pub const EXPRESSION_FUNCTIONS: &[&str] = &[
    // date and time
    "DATE", "YEAR", "MONTH", "DAY", "HOUR", "MINUTE", "SECOND", "WEEK", "DAYOFWEEK",
    "DAYOFMONTH", "DAYOFYEAR", "QUARTER", "DATE_FORMAT", "DATE_ADD", "DATE_SUB", "DATEDIFF",
    "NOW", "CURDATE", "CURTIME", "UNIX_TIMESTAMP", "FROM_UNIXTIME", "TIMESTAMPDIFF",
    // strings
    "LOWER", "UPPER", "LENGTH", "CHAR_LENGTH", "TRIM", "LTRIM", "RTRIM", "SUBSTRING", "LEFT",
    "RIGHT", "REPLACE", "LOCATE",
    // numbers
    "ABS", "ROUND", "FLOOR", "CEIL", "CEILING", "MOD", "RAND",
    // control flow
    "COALESCE", "IFNULL", "NULLIF", "IF", "GREATEST", "LEAST", "FIELD",
    // aggregates
    "COUNT", "SUM", "AVG", "MIN", "MAX",
];

const BLACKLIST_SEQUENCES: &[&str] = &[";", "--", "/*", "*/", "#"];

const BLACKLIST_WORDS: &[&str] = &[
    "UNION", "SELECT", "INSERT", "UPDATE", "DELETE", "DROP", "ALTER", "CREATE", "TRUNCATE",
    "RENAME", "GRANT", "REVOKE", "EXEC", "EXECUTE", "CALL", "PREPARE", "DEALLOCATE", "HANDLER",
    "SHUTDOWN", "SLEEP", "BENCHMARK", "WAITFOR", "LOAD_FILE", "OUTFILE", "DUMPFILE",
    "INFORMATION_SCHEMA", "INTO",
];

const MAX_DEPTH: usize = 24;

fn numeric_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^-?[0-9]+(\.[0-9]+)?$").expect("invalid built-in regex"))
}

fn is_null_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)^(.+?)\s+IS\s+(NOT\s+)?NULL$").expect("invalid built-in regex")
    })
}

fn function_head_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)\s*\(").expect("invalid built-in regex"))
}

fn interval_arg_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^INTERVAL\s+-?[0-9]+\s+(MICROSECOND|SECOND|MINUTE|HOUR|DAY|WEEK|MONTH|QUARTER|YEAR)$")
            .expect("invalid built-in regex")
    })
}

/// Whether the text contains a blacklisted sequence or keyword anywhere,
/// including inside quoted literals.
pub fn contains_blacklisted(text: &str) -> bool {
    if BLACKLIST_SEQUENCES.iter().any(|s| text.contains(s)) {
        return true;
    }
    text.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
        .any(|w| BLACKLIST_WORDS.iter().any(|b| b.eq_ignore_ascii_case(w)))
}

/// Validate a free-form expression.
pub fn is_safe_expression(expr: &str) -> bool {
    let expr = expr.trim();
    if expr.is_empty() || expr.len() > 2048 || contains_blacklisted(expr) {
        return false;
    }
    check(expr, 0)
}

/// Validate a free-form expression, returning it trimmed.
pub fn validate_expression(expr: &str) -> GuardResult<&str> {
    if is_safe_expression(expr) {
        Ok(expr.trim())
    } else {
        Err(GuardError::UnsafeExpression(expr.to_string()))
    }
}

/// Validate an opaque SQL fragment (a JOIN's ON text): balanced quotes and
/// parentheses, and nothing from the blacklist. The fragment is not parsed.
pub fn is_safe_fragment(text: &str) -> bool {
    let text = text.trim();
    !text.is_empty()
        && text.len() <= 2048
        && !contains_blacklisted(text)
        && top_level_mask(text).is_some()
}

/// Validate an opaque fragment, returning it trimmed.
pub fn validate_fragment(text: &str) -> GuardResult<&str> {
    if is_safe_fragment(text) {
        Ok(text.trim())
    } else {
        Err(GuardError::UnsafeExpression(text.to_string()))
    }
}

fn check(expr: &str, depth: usize) -> bool {
    let expr = expr.trim();
    if expr.is_empty() || depth > MAX_DEPTH {
        return false;
    }
    if let Some(inner) = strip_outer_parens(expr) {
        return check(inner, depth + 1);
    }
    if is_plain_column(expr)
        || is_quoted_literal(expr)
        || numeric_re().is_match(expr)
        || expr.eq_ignore_ascii_case("NULL")
    {
        return true;
    }
    if starts_with_word(expr, "CASE") {
        return check_case(expr, depth);
    }
    if let Some(caps) = is_null_re().captures(expr) {
        let subject = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        if top_level_mask(subject).is_some() {
            return check(subject, depth + 1);
        }
    }
    if let Some((left, right)) = split_comparison(expr) {
        return check(left, depth + 1) && check(right, depth + 1);
    }
    if let Some((left, right)) = split_arithmetic(expr) {
        return check(left, depth + 1) && check(right, depth + 1);
    }
    if let Some((name, args)) = split_function_call(expr) {
        return check_function(name, args, depth);
    }
    false
}

fn starts_with_word(expr: &str, word: &str) -> bool {
    let (Some(head), Some(tail)) = (expr.get(..word.len()), expr.get(word.len()..)) else {
        return false;
    };
    head.eq_ignore_ascii_case(word)
        && tail
            .chars()
            .next()
            .is_none_or(|c| !(c.is_ascii_alphanumeric() || c == '_'))
}

/// A single `'...'` or `"..."` literal spanning the whole text.
fn is_quoted_literal(expr: &str) -> bool {
    let bytes = expr.as_bytes();
    let Some(&quote) = bytes.first() else {
        return false;
    };
    if quote != b'\'' && quote != b'"' {
        return false;
    }
    let mut i = 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => {
                if bytes.get(i + 1) == Some(&quote) {
                    i += 2;
                } else {
                    return i == bytes.len() - 1;
                }
            }
            _ => i += 1,
        }
    }
    false
}

fn split_comparison(expr: &str) -> Option<(&str, &str)> {
    let mask = top_level_mask(expr)?;
    let bytes = expr.as_bytes();
    for i in 0..bytes.len() {
        if !mask[i] {
            continue;
        }
        let two = bytes.get(i..i + 2).filter(|_| mask.get(i + 1) == Some(&true));
        if let Some(two) = two {
            if matches!(two, b"<=" | b">=" | b"<>" | b"!=") {
                return Some((&expr[..i], &expr[i + 2..]));
            }
        }
        if matches!(bytes[i], b'=' | b'<' | b'>') {
            return Some((&expr[..i], &expr[i + 1..]));
        }
    }
    None
}

fn split_arithmetic(expr: &str) -> Option<(&str, &str)> {
    let mask = top_level_mask(expr)?;
    let bytes = expr.as_bytes();
    (0..bytes.len())
        .filter(|&i| mask[i] && matches!(bytes[i], b'+' | b'-' | b'*' | b'/'))
        .map(|i| (&expr[..i], &expr[i + 1..]))
        .find(|(l, r)| !l.trim().is_empty() && !r.trim().is_empty())
}

fn split_function_call(expr: &str) -> Option<(&str, &str)> {
    let caps = function_head_re().captures(expr)?;
    let whole = caps.get(0)?;
    let name = caps.get(1)?.as_str();
    let open = whole.end() - 1;
    let close = matching_paren(expr, open)?;
    (close == expr.len() - 1).then(|| (name, &expr[open + 1..close]))
}

fn check_function(name: &str, args: &str, depth: usize) -> bool {
    let upper = name.to_ascii_uppercase();
    if !EXPRESSION_FUNCTIONS.contains(&upper.as_str()) {
        return false;
    }
    if args.trim().is_empty() {
        return true;
    }
    let Some(parts) = split_top_level(args, b',') else {
        return false;
    };
    let aggregate = matches!(upper.as_str(), "COUNT" | "SUM" | "AVG" | "MIN" | "MAX");
    parts.iter().all(|arg| {
        let mut arg = arg.trim();
        if arg == "*" {
            return upper == "COUNT";
        }
        if aggregate && starts_with_word(arg, "DISTINCT") {
            arg = arg["DISTINCT".len()..].trim_start();
        }
        interval_arg_re().is_match(arg) || check(arg, depth + 1)
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CaseWord {
    Case,
    When,
    Then,
    Else,
    End,
}

fn check_case(expr: &str, depth: usize) -> bool {
    let Some(words) = top_level_words(expr) else {
        return false;
    };

    // Keywords belonging to this CASE only; nested CASE blocks are skipped
    // here and validated when their segment recurses.
    let mut marks: Vec<(CaseWord, usize, usize)> = Vec::new();
    let mut nesting = 0usize;
    for (start, end) in words {
        let word = match expr[start..end].to_ascii_uppercase().as_str() {
            "CASE" => CaseWord::Case,
            "WHEN" => CaseWord::When,
            "THEN" => CaseWord::Then,
            "ELSE" => CaseWord::Else,
            "END" => CaseWord::End,
            _ => continue,
        };
        match word {
            CaseWord::Case => {
                nesting += 1;
                if nesting == 1 {
                    marks.push((word, start, end));
                }
            }
            CaseWord::End => {
                if nesting == 0 {
                    return false;
                }
                nesting -= 1;
                if nesting == 0 {
                    marks.push((word, start, end));
                }
            }
            _ if nesting == 1 => marks.push((word, start, end)),
            _ => {}
        }
    }

    if nesting != 0
        || marks.first().map(|m| (m.0, m.1)) != Some((CaseWord::Case, 0))
        || marks.last().map(|m| (m.0, m.2)) != Some((CaseWord::End, expr.len()))
    {
        return false;
    }

    let segment = |a: usize| case_segment(expr, &marks, a);

    let operand = segment(0);
    if !operand.trim().is_empty() && !check(operand, depth + 1) {
        return false;
    }

    let mut idx = 1;
    let mut arms = 0;
    while marks.get(idx).map(|m| m.0) == Some(CaseWord::When) {
        if marks.get(idx + 1).map(|m| m.0) != Some(CaseWord::Then) {
            return false;
        }
        if !check(segment(idx), depth + 1) || !check(segment(idx + 1), depth + 1) {
            return false;
        }
        idx += 2;
        arms += 1;
    }
    if marks.get(idx).map(|m| m.0) == Some(CaseWord::Else) {
        if !check(segment(idx), depth + 1) {
            return false;
        }
        idx += 1;
    }

    arms > 0 && idx == marks.len() - 1
}

/// Text between keyword `a` and the next keyword.
fn case_segment<'a>(expr: &'a str, marks: &[(CaseWord, usize, usize)], a: usize) -> &'a str {
    let from = marks[a].2;
    let to = marks.get(a + 1).map(|m| m.1).unwrap_or(expr.len());
    &expr[from..to]
}
