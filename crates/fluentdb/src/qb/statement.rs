//! Accumulated clause state of one in-progress statement.

use super::condition::{Condition, Connector};
use super::operand::{DataValue, SubquerySql};
use crate::error::{DbError, DbResult};
use crate::row::ReturnType;
use fluentdb_guard::{SelectItem, TableName, parse_select_list};

/// Statement families that decide which query options render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Replace,
    Update,
    Delete,
}

/// Join flavor; an empty string means LEFT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinKind {
    #[default]
    Left,
    Right,
    Inner,
    Outer,
    Natural,
}

impl JoinKind {
    pub fn parse(kind: &str) -> DbResult<Self> {
        match kind.trim().to_ascii_uppercase().as_str() {
            "" | "LEFT" => Ok(Self::Left),
            "RIGHT" => Ok(Self::Right),
            "INNER" => Ok(Self::Inner),
            "OUTER" => Ok(Self::Outer),
            "NATURAL" => Ok(Self::Natural),
            other => Err(DbError::validation(format!("Wrong JOIN type: {other}"))),
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Left => "LEFT",
            Self::Right => "RIGHT",
            Self::Inner => "INNER",
            Self::Outer => "OUTER",
            Self::Natural => "NATURAL",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum JoinTarget {
    Table(TableName),
    Subquery(SubquerySql),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub target: JoinTarget,
    /// Validated but otherwise opaque ON text.
    pub on: String,
    /// Extra conditions appended after ON, each keeping its connector.
    pub filters: Vec<Condition>,
}

impl Join {
    pub fn table(&self) -> Option<&TableName> {
        match &self.target {
            JoinTarget::Table(table) => Some(table),
            JoinTarget::Subquery(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    Asc,
    #[default]
    Desc,
}

impl Direction {
    /// `ASC` or `DESC`, any case. An empty direction means `DESC`.
    pub fn parse(dir: &str) -> DbResult<Self> {
        match dir.trim().to_ascii_uppercase().as_str() {
            "ASC" => Ok(Self::Asc),
            "" | "DESC" => Ok(Self::Desc),
            other => Err(DbError::validation(format!("Wrong order direction: {other}"))),
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItem {
    /// Rendered ORDER BY expression.
    pub field: String,
    pub direction: Direction,
}

/// Allow-listed statement modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOption {
    All,
    Distinct,
    DistinctRow,
    HighPriority,
    StraightJoin,
    SqlSmallResult,
    SqlBigResult,
    SqlBufferResult,
    SqlCache,
    SqlNoCache,
    SqlCalcFoundRows,
    LowPriority,
    Ignore,
    Quick,
    ForUpdate,
    LockInShareMode,
}

impl QueryOption {
    pub fn parse(option: &str) -> DbResult<Self> {
        let normalized = option
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_uppercase();
        let parsed = match normalized.as_str() {
            "ALL" => Self::All,
            "DISTINCT" => Self::Distinct,
            "DISTINCTROW" => Self::DistinctRow,
            "HIGH_PRIORITY" => Self::HighPriority,
            "STRAIGHT_JOIN" => Self::StraightJoin,
            "SQL_SMALL_RESULT" => Self::SqlSmallResult,
            "SQL_BIG_RESULT" => Self::SqlBigResult,
            "SQL_BUFFER_RESULT" => Self::SqlBufferResult,
            "SQL_CACHE" => Self::SqlCache,
            "SQL_NO_CACHE" => Self::SqlNoCache,
            "SQL_CALC_FOUND_ROWS" => Self::SqlCalcFoundRows,
            "LOW_PRIORITY" => Self::LowPriority,
            "IGNORE" => Self::Ignore,
            "QUICK" => Self::Quick,
            "FOR UPDATE" => Self::ForUpdate,
            "LOCK IN SHARE MODE" => Self::LockInShareMode,
            _ => {
                return Err(DbError::validation(format!(
                    "Wrong query option: {option}"
                )));
            }
        };
        Ok(parsed)
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            Self::All => "ALL",
            Self::Distinct => "DISTINCT",
            Self::DistinctRow => "DISTINCTROW",
            Self::HighPriority => "HIGH_PRIORITY",
            Self::StraightJoin => "STRAIGHT_JOIN",
            Self::SqlSmallResult => "SQL_SMALL_RESULT",
            Self::SqlBigResult => "SQL_BIG_RESULT",
            Self::SqlBufferResult => "SQL_BUFFER_RESULT",
            Self::SqlCache => "SQL_CACHE",
            Self::SqlNoCache => "SQL_NO_CACHE",
            Self::SqlCalcFoundRows => "SQL_CALC_FOUND_ROWS",
            Self::LowPriority => "LOW_PRIORITY",
            Self::Ignore => "IGNORE",
            Self::Quick => "QUICK",
            Self::ForUpdate => "FOR UPDATE",
            Self::LockInShareMode => "LOCK IN SHARE MODE",
        }
    }

    /// Locking suffixes render after LIMIT instead of after the verb.
    pub fn is_lock(self) -> bool {
        matches!(self, Self::ForUpdate | Self::LockInShareMode)
    }

    /// Whether MySQL accepts the modifier for `kind`.
    pub fn applies_to(self, kind: StatementKind) -> bool {
        use StatementKind::*;
        match self {
            Self::ForUpdate | Self::LockInShareMode => kind == Select,
            Self::LowPriority => matches!(kind, Insert | Replace | Update | Delete),
            Self::HighPriority => matches!(kind, Select | Insert | Replace),
            Self::Ignore => matches!(kind, Insert | Update | Delete),
            Self::Quick => kind == Delete,
            _ => kind == Select,
        }
    }
}

/// Row limit of a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Limit {
    #[default]
    All,
    Count(i64),
    /// `(offset, count)`
    Range(i64, i64),
}

impl Limit {
    pub(crate) fn validate(self, kind: StatementKind) -> DbResult<Self> {
        match self {
            Limit::Count(n) if n < 0 => Err(DbError::validation(format!("Invalid limit: {n}"))),
            Limit::Range(offset, count) if offset < 0 || count < 0 => Err(DbError::validation(
                format!("Invalid limit: {offset}, {count}"),
            )),
            Limit::Range(..) if matches!(kind, StatementKind::Update | StatementKind::Delete) => {
                Err(DbError::validation(
                    "UPDATE and DELETE accept a row count only, not an offset",
                ))
            }
            other => Ok(other),
        }
    }

    pub(crate) fn render(self) -> Option<String> {
        match self {
            Limit::All => None,
            Limit::Count(n) => Some(format!(" LIMIT {n}")),
            Limit::Range(offset, count) => Some(format!(" LIMIT {offset}, {count}")),
        }
    }
}

macro_rules! limit_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Limit {
                fn from(n: $t) -> Self {
                    Limit::Count(i64::try_from(n).unwrap_or(i64::MAX))
                }
            }

            impl From<($t, $t)> for Limit {
                fn from((offset, count): ($t, $t)) -> Self {
                    Limit::Range(
                        i64::try_from(offset).unwrap_or(i64::MAX),
                        i64::try_from(count).unwrap_or(i64::MAX),
                    )
                }
            }
        )*
    };
}

limit_from!(i32, i64, u32, u64, usize);

impl<T: Into<Limit>> From<Option<T>> for Limit {
    fn from(limit: Option<T>) -> Self {
        limit.map(Into::into).unwrap_or_default()
    }
}

/// Select list as given by the caller: `"*"`, `"a, b AS c"`, or a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Columns(Vec<String>);

impl Columns {
    pub fn all() -> Self {
        Self(vec!["*".to_string()])
    }

    /// Parse and validate every item.
    pub fn items(&self) -> DbResult<Vec<SelectItem>> {
        let mut items = Vec::new();
        for part in &self.0 {
            items.extend(parse_select_list(part)?);
        }
        if items.is_empty() {
            return Err(DbError::validation("empty column list"));
        }
        Ok(items)
    }
}

impl Default for Columns {
    fn default() -> Self {
        Self::all()
    }
}

impl From<&str> for Columns {
    fn from(columns: &str) -> Self {
        Self(vec![columns.to_string()])
    }
}

impl From<String> for Columns {
    fn from(columns: String) -> Self {
        Self(vec![columns])
    }
}

impl From<&[&str]> for Columns {
    fn from(columns: &[&str]) -> Self {
        Self(columns.iter().map(|c| c.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Columns {
    fn from(columns: [&str; N]) -> Self {
        Self(columns.iter().map(|c| c.to_string()).collect())
    }
}

impl From<Vec<&str>> for Columns {
    fn from(columns: Vec<&str>) -> Self {
        Self(columns.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<String>> for Columns {
    fn from(columns: Vec<String>) -> Self {
        Self(columns)
    }
}

/// `ON DUPLICATE KEY UPDATE` settings for INSERT.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OnDuplicate {
    /// Column rendered first as `col = LAST_INSERT_ID(col)`.
    pub last_insert_id: Option<String>,
    /// `None` renders `col = VALUES(col)`.
    pub updates: Vec<(String, Option<DataValue>)>,
}

/// The in-progress statement context.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Statement {
    pub(crate) wheres: Vec<Condition>,
    pub(crate) havings: Vec<Condition>,
    pub(crate) joins: Vec<Join>,
    pub(crate) order_by: Vec<OrderItem>,
    pub(crate) group_by: Vec<String>,
    pub(crate) options: Vec<QueryOption>,
    pub(crate) return_type: ReturnType,
    pub(crate) map_key: Option<String>,
    pub(crate) on_duplicate: Option<OnDuplicate>,
    pub(crate) with_total_count: bool,
}

impl Statement {
    pub fn wheres(&self) -> &[Condition] {
        &self.wheres
    }

    pub fn havings(&self) -> &[Condition] {
        &self.havings
    }

    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    pub fn order_by(&self) -> &[OrderItem] {
        &self.order_by
    }

    pub fn group_by(&self) -> &[String] {
        &self.group_by
    }

    pub fn options(&self) -> &[QueryOption] {
        &self.options
    }

    pub fn return_type(&self) -> ReturnType {
        self.return_type
    }

    pub fn map_key(&self) -> Option<&str> {
        self.map_key.as_deref()
    }

    /// No clause has been recorded.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }

    pub(crate) fn push_where(&mut self, mut condition: Condition) {
        if self.wheres.is_empty() {
            condition.entry_mut().connector = Connector::Empty;
        }
        self.wheres.push(condition);
    }

    pub(crate) fn push_having(&mut self, mut condition: Condition) {
        if self.havings.is_empty() {
            condition.entry_mut().connector = Connector::Empty;
        }
        self.havings.push(condition);
    }

    pub(crate) fn join_mut(&mut self, table: &TableName) -> Option<&mut Join> {
        self.joins
            .iter_mut()
            .rev()
            .find(|join| join.table().is_some_and(|t| t.same_as(table)))
    }

    /// Add an ORDER BY item; a repeated field keeps its position.
    pub(crate) fn push_order(&mut self, field: String, direction: Direction) {
        match self.order_by.iter_mut().find(|item| item.field == field) {
            Some(item) => item.direction = direction,
            None => self.order_by.push(OrderItem { field, direction }),
        }
    }

    pub(crate) fn push_option(&mut self, option: QueryOption) {
        if !self.options.contains(&option) {
            self.options.push(option);
        }
    }

    pub(crate) fn has_option(&self, option: QueryOption) -> bool {
        self.options.contains(&option)
    }
}
