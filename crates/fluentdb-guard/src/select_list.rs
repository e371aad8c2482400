//! Select-list parsing.
//!
//! Splits `p.*, c.name AS category, COUNT(*) total` into items, validates each
//! expression and extracts aliases (needed to decide whether a HAVING column
//! refers to something the SELECT produces).

use crate::error::{GuardError, GuardResult};
use crate::expression::is_safe_expression;
use crate::scan::{split_top_level, top_level_words};
use regex::Regex;
use std::sync::OnceLock;

fn star_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:(?:[A-Za-z_][A-Za-z0-9_$]*|`[A-Za-z_][A-Za-z0-9_$]*`)\.)?\*$")
            .expect("invalid built-in regex")
    })
}

fn alias_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:[A-Za-z_][A-Za-z0-9_$]*|`[A-Za-z_][A-Za-z0-9_$ ]*`)$")
            .expect("invalid built-in regex")
    })
}

/// Words that end an expression and therefore can never be an implicit alias.
const NOT_AN_ALIAS: &[&str] = &["END", "NULL", "ASC", "DESC"];

/// One item of a select list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectItem {
    pub expr: String,
    pub alias: Option<String>,
}

impl SelectItem {
    /// The alias without backticks.
    pub fn alias_name(&self) -> Option<&str> {
        self.alias.as_deref().map(|a| a.trim_matches('`'))
    }

    /// `expr` or `expr AS alias`.
    pub fn render(&self) -> String {
        match &self.alias {
            Some(alias) => format!("{} AS {}", self.expr, alias),
            None => self.expr.clone(),
        }
    }
}

/// Parse and validate a comma-separated select list.
pub fn parse_select_list(columns: &str) -> GuardResult<Vec<SelectItem>> {
    let items = split_top_level(columns, b',')
        .ok_or_else(|| GuardError::Parse(format!("unbalanced select list: {columns}")))?;
    items.into_iter().map(parse_item).collect()
}

fn parse_item(item: &str) -> GuardResult<SelectItem> {
    let item = item.trim();
    if item.is_empty() {
        return Err(GuardError::Parse("empty select item".into()));
    }

    let (expr, alias) = split_alias(item);
    let expr = expr.trim();
    if !(star_re().is_match(expr) || is_safe_expression(expr)) {
        return Err(GuardError::UnsafeExpression(item.to_string()));
    }
    if let Some(alias) = alias {
        if !alias_re().is_match(alias) {
            return Err(GuardError::UnsafeExpression(item.to_string()));
        }
    }

    Ok(SelectItem {
        expr: expr.to_string(),
        alias: alias.map(str::to_string),
    })
}

fn split_alias(item: &str) -> (&str, Option<&str>) {
    let Some(words) = top_level_words(item) else {
        return (item, None);
    };
    let n = words.len();

    if n >= 2 {
        let (as_start, as_end) = words[n - 2];
        let (alias_start, alias_end) = words[n - 1];
        if item[as_start..as_end].eq_ignore_ascii_case("AS") && alias_end == item.len() {
            return (&item[..as_start], Some(&item[alias_start..]));
        }
    }

    // Backticked explicit alias: `expr AS `the name``.
    if item.ends_with('`') {
        if let Some(open) = item[..item.len() - 1].rfind('`') {
            let head = item[..open].trim_end();
            let as_at = head.len().saturating_sub(2);
            if as_at > 0 && head.get(as_at..).is_some_and(|w| w.eq_ignore_ascii_case("AS")) {
                let before = &head[..as_at];
                if before.ends_with(char::is_whitespace) {
                    return (before, Some(&item[open..]));
                }
            }
        }
    }

    // Implicit alias: `expr alias`, the last top-level word directly at the end.
    if let Some(&(start, end)) = words.last() {
        let head = item[..start].trim_end();
        let implicit = end == item.len()
            && start > 0
            && head.len() < start
            && !head.is_empty()
            && !head.ends_with(|c: char| "=<>!+-*/,(".contains(c))
            && !NOT_AN_ALIAS.iter().any(|w| w.eq_ignore_ascii_case(&item[start..end]))
            && !head
                .rsplit(char::is_whitespace)
                .next()
                .is_some_and(|w| ["IS", "NOT", "AS", "THEN", "ELSE", "WHEN", "CASE", "DISTINCT"].iter().any(|k| k.eq_ignore_ascii_case(w)));
        if implicit {
            return (head, Some(&item[start..]));
        }
    }

    (item, None)
}
