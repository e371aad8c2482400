//! Table-name validation.

use crate::error::{GuardError, GuardResult};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

const RESERVED_ALIASES: &[&str] = &[
    "AS", "ON", "USING", "WHERE", "JOIN", "LEFT", "RIGHT", "INNER", "OUTER", "NATURAL", "CROSS",
    "UNION", "SELECT", "FROM", "GROUP", "ORDER", "LIMIT", "HAVING", "SET", "VALUES", "INTO",
];

fn part_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("invalid built-in regex"))
}

fn alias_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("invalid built-in regex"))
}

/// A validated `[db.[schema.]]table [alias]` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName {
    parts: Vec<String>,
    alias: Option<String>,
}

impl TableName {
    /// Parse `name`, `db.name`, `db.schema.name`, each optionally followed by
    /// `alias` or `AS alias`.
    ///
    /// Anything that opens with `(` is rejected: derived tables must be passed
    /// as subqueries, never as text.
    pub fn parse(input: &str) -> GuardResult<Self> {
        let trimmed = input.trim();
        let err = || GuardError::UnsafeTable(input.to_string());
        if trimmed.is_empty() || trimmed.starts_with('(') {
            return Err(err());
        }

        let tokens: Vec<&str> = trimmed.split_whitespace().collect();
        let (name, alias) = match tokens.as_slice() {
            [name] => (*name, None),
            [name, alias] => (*name, Some(*alias)),
            [name, kw, alias] if kw.eq_ignore_ascii_case("AS") => (*name, Some(*alias)),
            _ => return Err(err()),
        };

        let name = name.trim_matches(|c| c == '`' || c == '\'' || c == '"');
        let parts: Vec<String> = name
            .split('.')
            .map(|p| p.trim_matches('`').to_string())
            .collect();
        if parts.is_empty() || parts.len() > 3 || parts.iter().any(|p| !part_re().is_match(p)) {
            return Err(err());
        }

        let alias = match alias {
            Some(a) => {
                let a = a.trim_matches('`');
                if !alias_re().is_match(a)
                    || RESERVED_ALIASES.iter().any(|r| r.eq_ignore_ascii_case(a))
                {
                    return Err(err());
                }
                Some(a.to_string())
            }
            None => None,
        };

        Ok(Self { parts, alias })
    }

    /// The bare table name (last segment).
    pub fn name(&self) -> &str {
        self.parts.last().map(String::as_str).unwrap_or_default()
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Dotted name without prefix or alias.
    pub fn qualified(&self) -> String {
        self.parts.join(".")
    }

    /// Dotted name with `prefix` applied to the table segment.
    pub fn prefixed(&self, prefix: &str) -> String {
        let (last, init) = match self.parts.split_last() {
            Some(split) => split,
            None => return String::new(),
        };
        let mut out = String::new();
        for p in init {
            out.push_str(p);
            out.push('.');
        }
        if !last.starts_with(prefix) || prefix.is_empty() {
            out.push_str(prefix);
        }
        out.push_str(last);
        out
    }

    /// `prefixed name [alias]`, as it appears after FROM / JOIN / UPDATE.
    pub fn render(&self, prefix: &str) -> String {
        match &self.alias {
            Some(alias) => format!("{} {}", self.prefixed(prefix), alias),
            None => self.prefixed(prefix),
        }
    }

    /// How the table is referred to elsewhere in the statement (alias if any).
    pub fn reference(&self, prefix: &str) -> String {
        match &self.alias {
            Some(alias) => alias.clone(),
            None => self.prefixed(prefix),
        }
    }

    /// Whether a column qualifier (`u` in `u.id`) points at this table.
    pub fn answers_to(&self, qualifier: &str, prefix: &str) -> bool {
        let qualifier = qualifier.trim_matches('`');
        if let Some(alias) = &self.alias {
            return alias.eq_ignore_ascii_case(qualifier);
        }
        self.name().eq_ignore_ascii_case(qualifier)
            || self.prefixed(prefix).eq_ignore_ascii_case(qualifier)
    }

    /// Same table and alias, ignoring case.
    pub fn same_as(&self, other: &TableName) -> bool {
        self.qualified().eq_ignore_ascii_case(&other.qualified())
            && match (&self.alias, &other.alias) {
                (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
                (None, None) => true,
                _ => false,
            }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(""))
    }
}

/// Whether `input` parses as a [`TableName`].
pub fn is_safe_table_name(input: &str) -> bool {
    TableName::parse(input).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_qualified_names_and_aliases() {
        let t = TableName::parse("shop.orders o").unwrap();
        assert_eq!(t.qualified(), "shop.orders");
        assert_eq!(t.alias(), Some("o"));
        assert_eq!(t.render("t_"), "shop.t_orders o");

        let t = TableName::parse("`users` AS u").unwrap();
        assert_eq!(t.name(), "users");
        assert_eq!(t.alias(), Some("u"));

        assert!(TableName::parse("a.b.c").is_ok());
    }

    #[test]
    fn rejects_malformed_names() {
        for bad in [
            "",
            "(SELECT * FROM users) x",
            "users; DROP TABLE x",
            "a.b.c.d",
            "users u extra",
            "users WHERE",
            "users-1",
            "users 1u",
        ] {
            assert!(!is_safe_table_name(bad), "{bad} should be rejected");
        }
    }

    #[test]
    fn prefix_is_applied_once() {
        let t = TableName::parse("t_users").unwrap();
        assert_eq!(t.prefixed("t_"), "t_users");
        let t = TableName::parse("users").unwrap();
        assert_eq!(t.prefixed(""), "users");
        assert_eq!(t.reference("t_"), "t_users");
    }

    #[test]
    fn qualifier_matching() {
        let t = TableName::parse("users u").unwrap();
        assert!(t.answers_to("u", ""));
        assert!(!t.answers_to("users", ""));
        let t = TableName::parse("users").unwrap();
        assert!(t.answers_to("users", "t_"));
        assert!(t.answers_to("t_users", "t_"));
    }

    #[test]
    fn multibyte_names_are_rejected() {
        for bad in ["café", "`ユーザー`", "users ü", "shop.名前", "users AS é"] {
            assert!(TableName::parse(bad).is_err(), "{bad} should be rejected");
        }
    }
}
