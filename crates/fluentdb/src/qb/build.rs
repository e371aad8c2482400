//! SQL serialization.
//!
//! Clause order is fixed: verb and options, columns, table, joins with their
//! filters, WHERE, GROUP BY, HAVING, ORDER BY, LIMIT, locking suffix, then
//! ON DUPLICATE KEY UPDATE. Binds are collected in text order while writing;
//! list binds are spread over placeholders in a final pass.

use super::condition::{Condition, Connector, Entry, TableScope};
use super::operand::{Data, DataValue, Operand, SubquerySql};
use super::placeholders::{expand_array_params, interpolate};
use super::statement::{Columns, Join, JoinTarget, Limit, QueryOption, Statement, StatementKind};
use crate::error::{DbError, DbResult};
use crate::schema::ColumnLookup;
use crate::value::{Bind, Value};
use fluentdb_guard::{SelectItem, TableName, is_aggregate_call, validate_plain_column};

/// What serialization needs besides the statement itself.
pub struct BuildContext<'a> {
    pub prefix: &'a str,
    pub lookup: &'a dyn ColumnLookup,
}

/// Final SQL and flat positional parameters.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

impl BuiltQuery {
    /// SQL with literals substituted, for logs only.
    pub fn debug_sql(&self) -> String {
        interpolate(&self.sql, &self.params)
    }

    pub(crate) fn into_subquery(self, alias: Option<String>) -> SubquerySql {
        SubquerySql {
            sql: self.sql,
            binds: self.params,
            alias,
        }
    }
}

#[derive(Default)]
struct SqlWriter {
    sql: String,
    binds: Vec<Bind>,
}

impl SqlWriter {
    fn push(&mut self, text: &str) {
        self.sql.push_str(text);
    }

    fn bind(&mut self, value: Value) {
        self.sql.push('?');
        self.binds.push(Bind::One(value));
    }

    fn bind_list(&mut self, values: Vec<Value>) {
        self.sql.push_str("(?)");
        self.binds.push(Bind::List(values));
    }

    fn subquery(&mut self, sub: &SubquerySql) {
        self.sql.push('(');
        self.sql.push_str(&sub.sql);
        self.sql.push(')');
        self.binds.extend(sub.binds.iter().cloned().map(Bind::One));
    }

    fn extend_binds(&mut self, values: &[Value]) {
        self.binds.extend(values.iter().cloned().map(Bind::One));
    }

    fn data_value(&mut self, column: &str, value: &DataValue) {
        match value {
            DataValue::Value(v) => self.bind(v.clone()),
            DataValue::Subquery(sub) => self.subquery(sub),
            DataValue::Tagged(tagged) => {
                self.push(&tagged.render(column));
                self.extend_binds(tagged.binds());
            }
        }
    }

    fn entry(&mut self, entry: &Entry) {
        let Entry {
            column,
            operator,
            operand,
            ..
        } = entry;

        if operator.is_exists() {
            self.push(operator.as_sql());
            self.push(" ");
            if let Operand::Subquery(sub) = operand {
                self.subquery(sub);
            }
            return;
        }

        self.push(column);
        self.push(" ");
        self.push(operator.as_sql());
        self.push(" ");
        match operand {
            Operand::Scalar(Value::Null) => self.push("NULL"),
            Operand::Scalar(value) => self.bind(value.clone()),
            Operand::List(values) if operator.is_list() => self.bind_list(values.clone()),
            Operand::List(values) => {
                // BETWEEN: arity was checked when the entry was built.
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        self.push(" AND ");
                    }
                    self.bind(value.clone());
                }
            }
            Operand::Subquery(sub) => self.subquery(sub),
            Operand::Tagged(tagged) => {
                self.push(&tagged.render(column));
                self.extend_binds(tagged.binds());
            }
        }
    }

    /// Entries joined by their connectors; the first one's connector is dropped.
    fn entries(&mut self, entries: &[Entry]) {
        for (i, entry) in entries.iter().enumerate() {
            if i > 0 {
                let connector = match entry.connector {
                    Connector::Empty => Connector::And,
                    other => other,
                };
                self.push(" ");
                self.push(connector.as_sql());
                self.push(" ");
            }
            self.entry(entry);
        }
    }

    fn finish(self) -> DbResult<BuiltQuery> {
        let (sql, params) = expand_array_params(&self.sql, self.binds)?;
        Ok(BuiltQuery { sql, params })
    }
}

fn resolve_all(
    conditions: &[Condition],
    scope: &TableScope<'_>,
    ctx: &BuildContext<'_>,
) -> DbResult<Vec<Entry>> {
    conditions
        .iter()
        .map(|c| c.resolve(scope, ctx.lookup))
        .collect()
}

fn table_scope<'a>(table: &'a TableName, joins: &'a [Join], prefix: &'a str) -> TableScope<'a> {
    let mut tables = vec![table];
    tables.extend(joins.iter().filter_map(Join::table));
    TableScope {
        tables,
        prefix,
        selected: &[],
    }
}

fn options(stmt: &Statement, kind: StatementKind) -> String {
    let mut selected: Vec<QueryOption> = stmt
        .options
        .iter()
        .copied()
        .filter(|o| !o.is_lock() && o.applies_to(kind))
        .collect();
    if kind == StatementKind::Select
        && stmt.with_total_count
        && !selected.contains(&QueryOption::SqlCalcFoundRows)
    {
        selected.push(QueryOption::SqlCalcFoundRows);
    }
    selected.iter().map(|o| format!(" {}", o.as_sql())).collect()
}

fn write_joins(
    w: &mut SqlWriter,
    stmt: &Statement,
    scope: &TableScope<'_>,
    ctx: &BuildContext<'_>,
) -> DbResult<()> {
    for join in &stmt.joins {
        w.push(" ");
        w.push(join.kind.as_sql());
        w.push(" JOIN ");
        match &join.target {
            JoinTarget::Table(table) => w.push(&table.render(ctx.prefix)),
            JoinTarget::Subquery(sub) => {
                w.subquery(sub);
                if let Some(alias) = &sub.alias {
                    w.push(" ");
                    w.push(alias);
                }
            }
        }
        if !join.on.is_empty() {
            w.push(" ON ");
            w.push(&join.on);
        }
        for entry in resolve_all(&join.filters, scope, ctx)? {
            let connector = match entry.connector {
                Connector::Empty => Connector::And,
                other => other,
            };
            w.push(" ");
            w.push(connector.as_sql());
            w.push(" ");
            w.entry(&entry);
        }
    }
    Ok(())
}

fn write_where(
    w: &mut SqlWriter,
    stmt: &Statement,
    scope: &TableScope<'_>,
    ctx: &BuildContext<'_>,
) -> DbResult<()> {
    let entries = resolve_all(&stmt.wheres, scope, ctx)?;
    if !entries.is_empty() {
        w.push(" WHERE ");
        w.entries(&entries);
    }
    Ok(())
}

fn write_order_by(w: &mut SqlWriter, stmt: &Statement) {
    if stmt.order_by.is_empty() {
        return;
    }
    let items: Vec<String> = stmt
        .order_by
        .iter()
        .map(|o| format!("{} {}", o.field, o.direction.as_sql()))
        .collect();
    w.push(" ORDER BY ");
    w.push(&items.join(", "));
}

fn write_limit(w: &mut SqlWriter, limit: Limit) {
    if let Some(text) = limit.render() {
        w.push(&text);
    }
}

/// HAVING may only reference a select alias, a GROUP BY member or an aggregate.
fn check_having_targets(stmt: &Statement, items: &[SelectItem]) -> DbResult<()> {
    for condition in &stmt.havings {
        let column = condition.entry().column.as_str();
        let bare = column.trim_matches('`');
        let known = is_aggregate_call(column)
            || items
                .iter()
                .filter_map(SelectItem::alias_name)
                .any(|alias| alias.eq_ignore_ascii_case(bare))
            || stmt
                .group_by
                .iter()
                .any(|g| g.trim_matches('`').eq_ignore_ascii_case(bare));
        if !known {
            return Err(DbError::validation(format!(
                "HAVING column '{column}' is not a select alias, a GROUP BY column or an aggregate"
            )));
        }
    }
    Ok(())
}

fn reject_select_only(stmt: &Statement, verb: &str) -> DbResult<()> {
    if !stmt.havings.is_empty() {
        return Err(DbError::validation(format!("HAVING is not valid in {verb}")));
    }
    if !stmt.group_by.is_empty() {
        return Err(DbError::validation(format!("GROUP BY is not valid in {verb}")));
    }
    Ok(())
}

/// `SELECT ... FROM table ...`
pub fn build_select(
    stmt: &Statement,
    table: &TableName,
    columns: &Columns,
    limit: Limit,
    ctx: &BuildContext<'_>,
) -> DbResult<BuiltQuery> {
    let limit = limit.validate(StatementKind::Select)?;
    let items = columns.items()?;
    check_having_targets(stmt, &items)?;
    let scope = table_scope(table, &stmt.joins, ctx.prefix);

    let mut w = SqlWriter::default();
    w.push("SELECT");
    w.push(&options(stmt, StatementKind::Select));
    w.push(" ");
    w.push(
        &items
            .iter()
            .map(SelectItem::render)
            .collect::<Vec<_>>()
            .join(", "),
    );
    w.push(" FROM ");
    w.push(&table.render(ctx.prefix));
    write_joins(&mut w, stmt, &scope, ctx)?;
    write_where(&mut w, stmt, &scope, ctx)?;

    if !stmt.group_by.is_empty() {
        w.push(" GROUP BY ");
        w.push(&stmt.group_by.join(", "));
    }

    let having_scope = TableScope {
        selected: &items,
        ..scope
    };
    let havings = resolve_all(&stmt.havings, &having_scope, ctx)?;
    if !havings.is_empty() {
        w.push(" HAVING ");
        w.entries(&havings);
    }

    write_order_by(&mut w, stmt);
    write_limit(&mut w, limit);

    for option in stmt.options.iter().filter(|o| o.is_lock()) {
        w.push(" ");
        w.push(option.as_sql());
    }
    w.finish()
}

fn insert_head(
    w: &mut SqlWriter,
    stmt: &Statement,
    kind: StatementKind,
    table: &TableName,
    columns: &[&str],
    ctx: &BuildContext<'_>,
) -> DbResult<()> {
    if table.alias().is_some() {
        return Err(DbError::validation(format!(
            "INSERT target cannot have an alias: {table}"
        )));
    }
    reject_select_only(stmt, "INSERT")?;
    if !stmt.wheres.is_empty() || !stmt.joins.is_empty() {
        return Err(DbError::validation("WHERE and JOIN are not valid in INSERT"));
    }
    for column in columns {
        validate_plain_column(column)?;
    }
    w.push(if kind == StatementKind::Replace {
        "REPLACE"
    } else {
        "INSERT"
    });
    w.push(&options(stmt, kind));
    w.push(" INTO ");
    w.push(&table.prefixed(ctx.prefix));
    w.push(" (");
    w.push(&columns.join(", "));
    w.push(") VALUES ");
    Ok(())
}

fn write_on_duplicate(w: &mut SqlWriter, stmt: &Statement, kind: StatementKind) -> DbResult<()> {
    let Some(dup) = stmt.on_duplicate.as_ref().filter(|_| kind == StatementKind::Insert) else {
        return Ok(());
    };
    if dup.last_insert_id.is_none() && dup.updates.is_empty() {
        return Ok(());
    }

    w.push(" ON DUPLICATE KEY UPDATE ");
    let mut first = true;
    if let Some(id) = &dup.last_insert_id {
        validate_plain_column(id)?;
        w.push(&format!("{id} = LAST_INSERT_ID({id})"));
        first = false;
    }
    for (column, value) in &dup.updates {
        validate_plain_column(column)?;
        if !first {
            w.push(", ");
        }
        first = false;
        w.push(column);
        w.push(" = ");
        match value {
            Some(value) => w.data_value(column, value),
            None => w.push(&format!("VALUES({column})")),
        }
    }
    Ok(())
}

fn write_row(w: &mut SqlWriter, data: &Data) {
    w.push("(");
    for (i, (column, value)) in data.iter().enumerate() {
        if i > 0 {
            w.push(", ");
        }
        w.data_value(column, value);
    }
    w.push(")");
}

/// Single-row `INSERT` / `REPLACE`.
pub fn build_insert(
    stmt: &Statement,
    kind: StatementKind,
    table: &TableName,
    data: &Data,
    ctx: &BuildContext<'_>,
) -> DbResult<BuiltQuery> {
    if data.is_empty() {
        return Err(DbError::validation("insert data is empty"));
    }
    let columns: Vec<&str> = data.columns().collect();
    let mut w = SqlWriter::default();
    insert_head(&mut w, stmt, kind, table, &columns, ctx)?;
    write_row(&mut w, data);
    write_on_duplicate(&mut w, stmt, kind)?;
    w.finish()
}

/// Multi-row `INSERT` with one placeholder group per row. Columns come from
/// the first row; a row missing a column inserts NULL there.
pub fn build_insert_bulk(
    stmt: &Statement,
    table: &TableName,
    rows: &[Data],
    ctx: &BuildContext<'_>,
) -> DbResult<BuiltQuery> {
    let first = rows
        .first()
        .filter(|d| !d.is_empty())
        .ok_or_else(|| DbError::validation("insert data is empty"))?;
    let columns: Vec<&str> = first.columns().collect();
    let mut w = SqlWriter::default();
    insert_head(&mut w, stmt, StatementKind::Insert, table, &columns, ctx)?;

    let null = DataValue::Value(Value::Null);
    for (i, row) in rows.iter().enumerate() {
        if i > 0 {
            w.push(", ");
        }
        let aligned: Data = columns
            .iter()
            .map(|c| (*c, row.get(c).unwrap_or(&null).clone()))
            .collect();
        write_row(&mut w, &aligned);
    }
    write_on_duplicate(&mut w, stmt, StatementKind::Insert)?;
    w.finish()
}

/// `UPDATE table [joins] SET ... [WHERE ...] [ORDER BY ...] [LIMIT n]`
pub fn build_update(
    stmt: &Statement,
    table: &TableName,
    data: &Data,
    limit: Limit,
    ctx: &BuildContext<'_>,
) -> DbResult<BuiltQuery> {
    let limit = limit.validate(StatementKind::Update)?;
    reject_select_only(stmt, "UPDATE")?;
    if data.is_empty() {
        return Err(DbError::validation("update data is empty"));
    }
    let scope = table_scope(table, &stmt.joins, ctx.prefix);

    let mut w = SqlWriter::default();
    w.push("UPDATE");
    w.push(&options(stmt, StatementKind::Update));
    w.push(" ");
    w.push(&table.render(ctx.prefix));
    write_joins(&mut w, stmt, &scope, ctx)?;
    w.push(" SET ");
    for (i, (column, value)) in data.iter().enumerate() {
        validate_plain_column(column)?;
        if i > 0 {
            w.push(", ");
        }
        w.push(column);
        w.push(" = ");
        w.data_value(column, value);
    }
    write_where(&mut w, stmt, &scope, ctx)?;
    write_order_by(&mut w, stmt);
    write_limit(&mut w, limit);
    w.finish()
}

/// `DELETE FROM table ...`, or `DELETE ref FROM table ref JOIN ...` with joins.
pub fn build_delete(
    stmt: &Statement,
    table: &TableName,
    limit: Limit,
    ctx: &BuildContext<'_>,
) -> DbResult<BuiltQuery> {
    let limit = limit.validate(StatementKind::Delete)?;
    reject_select_only(stmt, "DELETE")?;
    let scope = table_scope(table, &stmt.joins, ctx.prefix);

    let mut w = SqlWriter::default();
    w.push("DELETE");
    w.push(&options(stmt, StatementKind::Delete));
    if stmt.joins.is_empty() {
        w.push(" FROM ");
    } else {
        w.push(" ");
        w.push(&table.reference(ctx.prefix));
        w.push(" FROM ");
    }
    w.push(&table.render(ctx.prefix));
    write_joins(&mut w, stmt, &scope, ctx)?;
    write_where(&mut w, stmt, &scope, ctx)?;
    write_order_by(&mut w, stmt);
    write_limit(&mut w, limit);
    w.finish()
}
