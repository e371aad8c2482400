use super::*;
use crate::config::SecurityMode;
use crate::error::{DbError, DbResult};
use crate::schema::{ColumnLookup, ColumnMeta, TableColumns};
use crate::value::Value;
use fluentdb_guard::{ColumnType, TableName};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug)]
struct Harness {
    stmt: Statement,
    mode: SecurityMode,
}

impl Harness {
    fn new() -> Self {
        Self {
            stmt: Statement::default(),
            mode: SecurityMode::Heuristic,
        }
    }

    fn strict() -> Self {
        Self {
            mode: SecurityMode::Strict,
            ..Self::new()
        }
    }
}

impl Clauses for Harness {
    fn statement_mut(&mut self) -> &mut Statement {
        &mut self.stmt
    }

    fn security_mode(&self) -> SecurityMode {
        self.mode
    }
}

#[derive(Default)]
struct FakeLookup {
    tables: HashMap<String, Arc<TableColumns>>,
}

impl FakeLookup {
    fn with(mut self, table: &str, columns: &[(&str, &str)]) -> Self {
        let columns = columns
            .iter()
            .map(|(name, ty)| ColumnMeta {
                name: name.to_string(),
                column_type: ColumnType::parse(ty),
                nullable: false,
            })
            .collect();
        self.tables.insert(
            table.to_string(),
            Arc::new(TableColumns {
                table: table.to_string(),
                columns,
            }),
        );
        self
    }
}

impl ColumnLookup for FakeLookup {
    fn table_columns(&self, table: &str) -> DbResult<Arc<TableColumns>> {
        self.tables
            .get(table)
            .cloned()
            .ok_or_else(|| DbError::NotFound(table.to_string()))
    }
}

fn table(name: &str) -> TableName {
    TableName::parse(name).unwrap()
}

fn select(h: &Harness, name: &str, columns: impl Into<Columns>) -> DbResult<BuiltQuery> {
    let lookup = FakeLookup::default();
    let ctx = BuildContext {
        prefix: "",
        lookup: &lookup,
    };
    build_select(&h.stmt, &table(name), &columns.into(), Limit::All, &ctx)
}

#[test]
fn where_chain_binds_in_order() {
    let mut h = Harness::new();
    h.where_("age", 30).unwrap().where_("status", "active").unwrap();
    let q = select(&h, "users", "*").unwrap();
    assert_eq!(q.sql, "SELECT * FROM users WHERE age = ? AND status = ?");
    assert_eq!(q.params, vec![Value::Int(30), Value::from("active")]);
}

#[test]
fn or_where_and_operators() {
    let mut h = Harness::new();
    h.where_op("age", 18, ">=")
        .unwrap()
        .or_where_op("name", "a%", "like")
        .unwrap();
    let q = select(&h, "users u", "u.id").unwrap();
    assert_eq!(
        q.sql,
        "SELECT u.id FROM users u WHERE age >= ? OR name LIKE ?"
    );
}

#[test]
fn first_entry_drops_its_connector() {
    let mut h = Harness::new();
    h.or_where("a", 1).unwrap();
    assert_eq!(h.stmt.wheres()[0].entry().connector, Connector::Empty);
    let q = select(&h, "t", "*").unwrap();
    assert_eq!(q.sql, "SELECT * FROM t WHERE a = ?");
}

#[test]
fn in_list_expands_to_one_placeholder_per_value() {
    let mut h = Harness::new();
    h.where_in("id", vec![1, 2, 3]).unwrap();
    let q = select(&h, "t", "*").unwrap();
    assert_eq!(q.sql, "SELECT * FROM t WHERE id IN (?, ?, ?)");
    assert_eq!(q.params, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
}

#[test]
fn empty_in_list_is_rejected() {
    let mut h = Harness::new();
    assert!(h.where_in("id", Vec::<i64>::new()).is_err());
    assert!(h.where_op("id", 5, "IN").is_err());
}

#[test]
fn between_requires_exactly_two_values() {
    for values in [vec![1], vec![1, 2, 3], vec![]] {
        let mut h = Harness::new();
        let err = h.where_between("age", values).unwrap_err();
        assert!(err.is_validation());
    }
    let mut h = Harness::new();
    h.where_between("age", ["18", "30"]).unwrap();
    h.where_not_between("score", [1.5, 2.5]).unwrap();
    let q = select(&h, "t", "*").unwrap();
    assert_eq!(
        q.sql,
        "SELECT * FROM t WHERE age BETWEEN ? AND ? AND score NOT BETWEEN ? AND ?"
    );
    assert_eq!(q.params.len(), 4);
}

#[test]
fn null_comparisons_become_is_null() {
    let mut h = Harness::new();
    h.where_("deleted_at", Value::Null)
        .unwrap()
        .where_op("archived_at", None::<i64>, "!=")
        .unwrap()
        .or_where_null("banned_at")
        .unwrap();
    let q = select(&h, "t", "*").unwrap();
    assert_eq!(
        q.sql,
        "SELECT * FROM t WHERE deleted_at IS NULL AND archived_at IS NOT NULL OR banned_at IS NULL"
    );
    assert!(q.params.is_empty());

    let mut h = Harness::new();
    assert!(h.where_op("age", Value::Null, ">").is_err());
    assert!(h.where_op("age", 3, "IS").is_err());
}

#[test]
fn failing_clause_resets_pending_state() {
    let mut h = Harness::new();
    h.where_("a", 1).unwrap().order_by("a", "DESC").unwrap();
    assert!(h.where_op("b", 2, "~~").is_err());
    assert!(h.stmt.is_empty());
}

#[test]
fn unsafe_identifiers_are_rejected() {
    let mut h = Harness::new();
    assert!(h.where_("name; DROP TABLE users", 1).is_err());
    assert!(h.where_("id -- x", 1).is_err());
    assert!(h.order_by("name; DROP TABLE x", "ASC").is_err());
    assert!(h.group_by("dept; DROP TABLE x").is_err());
    assert!(h.order_by("name", "SIDEWAYS").is_err());
    assert!(h.join("users u", "u.id = o.user_id", "CROSS").is_err());
    assert!(h.join("(SELECT 1) x", "1 = 1", "").is_err());
    assert!(h.set_query_option(&["SQL_INJECTION"]).is_err());
}

#[test]
fn join_condition_cannot_carry_placeholders() {
    let mut h = Harness::new();
    let err = h
        .join("orders o", "o.user_id = u.id AND o.status = ?", "")
        .unwrap_err();
    assert!(err.is_validation());
    assert!(err.to_string().contains("join_where"), "{err}");

    h.join("orders o", "o.user_id = u.id AND o.note <> '?'", "")
        .unwrap()
        .join_where("orders o", "o.status", "paid", "=")
        .unwrap();
    let q = select(&h, "users u", "u.id").unwrap();
    assert_eq!(
        q.sql,
        "SELECT u.id FROM users u LEFT JOIN orders o ON o.user_id = u.id AND o.note <> '?' \
         AND o.status = ?"
    );
    assert_eq!(q.params, vec![Value::from("paid")]);
}

#[test]
fn order_by_keeps_first_position_of_repeated_field() {
    let mut h = Harness::new();
    h.order_by("name", "ASC")
        .unwrap()
        .order_by("RAND()", "")
        .unwrap()
        .order_by("name", "desc")
        .unwrap();
    let q = select(&h, "t", "*").unwrap();
    assert_eq!(q.sql, "SELECT * FROM t ORDER BY name DESC, RAND() DESC");
}

#[test]
fn order_direction_defaults_to_descending() {
    let mut h = Harness::new();
    h.order_by("created_at", "").unwrap();
    h.order_by_field("status", " ", &["active"]).unwrap();
    h.order_by("id", " asc ").unwrap();
    let q = select(&h, "t", "*").unwrap();
    assert_eq!(
        q.sql,
        "SELECT * FROM t ORDER BY created_at DESC, FIELD(status, 'active') DESC, id ASC"
    );
}

#[test]
fn field_and_regexp_ordering() {
    let mut h = Harness::new();
    h.order_by_field("status", "ASC", &["active", "pending", "ünïcode"])
        .unwrap()
        .order_by_regexp("name", "DESC", "^[abc]")
        .unwrap();
    let q = select(&h, "t", "*").unwrap();
    assert_eq!(
        q.sql,
        "SELECT * FROM t ORDER BY FIELD(status, 'active', 'pending', 'ünïcode') ASC, name REGEXP '^[abc]' DESC"
    );

    let mut h = Harness::new();
    assert!(h.order_by_field("status", "ASC", &["a'b"]).is_err());
    assert!(h.order_by_regexp("name", "ASC", "a'; DROP").is_err());
}

#[test]
fn group_by_and_having_targets() {
    let mut h = Harness::new();
    h.group_by("dept")
        .unwrap()
        .having_op("total", 100, ">")
        .unwrap()
        .or_having_op("COUNT(*)", 3, ">=")
        .unwrap();
    let q = select(&h, "staff", "dept, SUM(salary) AS total").unwrap();
    assert_eq!(
        q.sql,
        "SELECT dept, SUM(salary) AS total FROM staff GROUP BY dept HAVING total > ? OR COUNT(*) >= ?"
    );
    assert_eq!(q.params, vec![Value::Int(100), Value::Int(3)]);
}

#[test]
fn having_on_unknown_column_is_rejected_at_build() {
    let mut h = Harness::new();
    h.group_by("dept").unwrap().having_op("total", 100, ">").unwrap();
    let err = select(&h, "staff", "dept, SUM(salary)").unwrap_err();
    assert!(err.to_string().contains("HAVING column 'total'"));
}

#[test]
fn or_having_requires_a_prior_having() {
    let mut h = Harness::new();
    assert!(h.or_having("dept", "x").is_err());
}

#[test]
fn having_null_renders_is_null() {
    let mut h = Harness::new();
    h.group_by("dept").unwrap().having("dept", Value::Null).unwrap();
    let q = select(&h, "staff", "dept").unwrap();
    assert_eq!(q.sql, "SELECT dept FROM staff GROUP BY dept HAVING dept IS NULL");
}

#[test]
fn joins_with_filters() {
    let mut h = Harness::new();
    h.join("orders o", "o.user_id = u.id", "")
        .unwrap()
        .join_where("orders o", "o.status", "paid", "=")
        .unwrap()
        .join_or_where("orders o", "o.total", 100, ">")
        .unwrap()
        .join("profiles p", "p.user_id = u.id", "inner")
        .unwrap()
        .where_("u.active", 1)
        .unwrap();
    let q = select(&h, "users u", "u.id, o.total").unwrap();
    assert_eq!(
        q.sql,
        "SELECT u.id, o.total FROM users u LEFT JOIN orders o ON o.user_id = u.id AND o.status = ? OR o.total > ? INNER JOIN profiles p ON p.user_id = u.id WHERE u.active = ?"
    );
    assert_eq!(
        q.params,
        vec![Value::from("paid"), Value::Int(100), Value::Int(1)]
    );
}

#[test]
fn join_where_needs_a_matching_join() {
    let mut h = Harness::new();
    h.join("orders o", "o.user_id = u.id", "").unwrap();
    assert!(h.join_where("payments", "amount", 1, "=").is_err());
}

#[test]
fn select_options_and_lock_suffix() {
    let mut h = Harness::new();
    h.set_query_option(&["DISTINCT", "for update", "LOW_PRIORITY"]).unwrap();
    let lookup = FakeLookup::default();
    let ctx = BuildContext {
        prefix: "",
        lookup: &lookup,
    };
    let q = build_select(&h.stmt, &table("t"), &"a".into(), Limit::Count(5), &ctx).unwrap();
    assert_eq!(q.sql, "SELECT DISTINCT a FROM t LIMIT 5 FOR UPDATE");

    let q = build_update(&h.stmt, &table("t"), &crate::data! { "a" => 1 }, Limit::All, &ctx)
        .unwrap();
    assert_eq!(q.sql, "UPDATE LOW_PRIORITY t SET a = ?");
}

#[test]
fn limits_are_validated() {
    let h = Harness::new();
    let lookup = FakeLookup::default();
    let ctx = BuildContext {
        prefix: "",
        lookup: &lookup,
    };
    let cols = Columns::all();
    let q = build_select(&h.stmt, &table("t"), &cols, (10, 20).into(), &ctx).unwrap();
    assert_eq!(q.sql, "SELECT * FROM t LIMIT 10, 20");
    assert!(build_select(&h.stmt, &table("t"), &cols, Limit::Count(-1), &ctx).is_err());
    assert!(build_delete(&h.stmt, &table("t"), (1, 2).into(), &ctx).is_err());
    let q = build_delete(&h.stmt, &table("t"), 3.into(), &ctx).unwrap();
    assert_eq!(q.sql, "DELETE FROM t LIMIT 3");
}

#[test]
fn update_with_increment() {
    let mut h = Harness::new();
    h.where_("id", 1).unwrap();
    let lookup = FakeLookup::default();
    let ctx = BuildContext {
        prefix: "",
        lookup: &lookup,
    };
    let q = build_update(&h.stmt, &table("t"), &crate::data! { "views" => inc(1) }, Limit::All, &ctx)
        .unwrap();
    assert_eq!(q.sql, "UPDATE t SET views = views + 1 WHERE id = ?");
    assert_eq!(q.params, vec![Value::Int(1)]);
}

#[test]
fn tagged_values_in_data() {
    let h = Harness::new();
    let lookup = FakeLookup::default();
    let ctx = BuildContext {
        prefix: "app_",
        lookup: &lookup,
    };
    let data = crate::data! {
        "a" => 1,
        "b" => inc(5),
        "stock" => dec(2),
        "active" => not(),
        "hidden" => not_column("visible").unwrap(),
        "hash" => func("SHA1(?)", vec!["pw".into()]).unwrap(),
        "expires" => now("+1d").unwrap(),
    };
    let q = build_insert(&h.stmt, StatementKind::Insert, &table("t"), &data, &ctx).unwrap();
    assert_eq!(
        q.sql,
        "INSERT INTO app_t (a, b, stock, active, hidden, hash, expires) VALUES (?, b + 5, stock - 2, !active, !visible, SHA1(?), NOW() + INTERVAL 1 DAY)"
    );
    assert_eq!(q.params, vec![Value::Int(1), Value::from("pw")]);
}

#[test]
fn function_expressions_are_validated() {
    assert!(func("NOW()", vec![]).is_ok());
    assert!(func("created_at - INTERVAL 3 month", vec![]).is_ok());
    assert!(func("UNIX_TIMESTAMP(?)", vec![]).is_err());
    assert!(func("BENCHMARK(1000, MD5(1))", vec![]).is_err());
    assert!(func("NOW() + INTERVAL 1 FORTNIGHT", vec![]).is_err());
    assert!(func("LOAD_FILE(?)", vec!["/etc/passwd".into()]).is_err());
    assert!(not_column("a; b").is_err());
    assert!(now("tomorrow").is_err());
    assert_eq!(
        interval("-2h", "updated_at").unwrap().render("x"),
        "updated_at - INTERVAL 2 HOUR"
    );
    assert_eq!(now("").unwrap().render("x"), "NOW()");
}

#[test]
fn replace_and_on_duplicate() {
    let mut h = Harness::new();
    h.stmt.on_duplicate = Some(OnDuplicate {
        last_insert_id: Some("id".into()),
        updates: vec![
            ("name".into(), None),
            ("hits".into(), Some(DataValue::Tagged(inc(1)))),
        ],
    });
    let lookup = FakeLookup::default();
    let ctx = BuildContext {
        prefix: "",
        lookup: &lookup,
    };
    let data = crate::data! { "id" => 7, "name" => "x" };
    let q = build_insert(&h.stmt, StatementKind::Insert, &table("t"), &data, &ctx).unwrap();
    assert_eq!(
        q.sql,
        "INSERT INTO t (id, name) VALUES (?, ?) ON DUPLICATE KEY UPDATE id = LAST_INSERT_ID(id), name = VALUES(name), hits = hits + 1"
    );

    let q = build_insert(&h.stmt, StatementKind::Replace, &table("t"), &data, &ctx).unwrap();
    assert_eq!(q.sql, "REPLACE INTO t (id, name) VALUES (?, ?)");
}

#[test]
fn bulk_insert_aligns_rows_to_first() {
    let h = Harness::new();
    let lookup = FakeLookup::default();
    let ctx = BuildContext {
        prefix: "",
        lookup: &lookup,
    };
    let rows = vec![
        crate::data! { "a" => 1, "b" => 2 },
        crate::data! { "b" => 4, "a" => 3 },
        crate::data! { "a" => 5 },
    ];
    let q = build_insert_bulk(&h.stmt, &table("t"), &rows, &ctx).unwrap();
    assert_eq!(q.sql, "INSERT INTO t (a, b) VALUES (?, ?), (?, ?), (?, ?)");
    assert_eq!(
        q.params,
        vec![
            Value::Int(1),
            Value::Int(2),
            Value::Int(3),
            Value::Int(4),
            Value::Int(5),
            Value::Null
        ]
    );
}

#[test]
fn delete_with_join_names_its_target() {
    let mut h = Harness::new();
    h.join("orders o", "o.user_id = u.id", "inner")
        .unwrap()
        .where_("o.status", "void")
        .unwrap();
    let lookup = FakeLookup::default();
    let ctx = BuildContext {
        prefix: "p_",
        lookup: &lookup,
    };
    let q = build_delete(&h.stmt, &table("users u"), Limit::All, &ctx).unwrap();
    assert_eq!(
        q.sql,
        "DELETE u FROM p_users u INNER JOIN p_orders o ON o.user_id = u.id WHERE o.status = ?"
    );
}

#[test]
fn update_and_delete_reject_select_only_clauses() {
    let mut h = Harness::new();
    h.group_by("dept").unwrap();
    let lookup = FakeLookup::default();
    let ctx = BuildContext {
        prefix: "",
        lookup: &lookup,
    };
    assert!(build_delete(&h.stmt, &table("t"), Limit::All, &ctx).is_err());
    assert!(build_update(&h.stmt, &table("t"), &crate::data! { "a" => 1 }, Limit::All, &ctx).is_err());
}

#[test]
fn subqueries_merge_binds_in_text_order() {
    let mut sub = SubQuery::new(None).unwrap();
    sub.where_op("total", 50, ">").unwrap();
    let built = sub.get("orders", Limit::All, "user_id").unwrap();

    let mut h = Harness::new();
    h.where_("status", "active")
        .unwrap()
        .where_in("id", built)
        .unwrap()
        .where_op("age", 21, ">")
        .unwrap();
    let q = select(&h, "users", "*").unwrap();
    assert_eq!(
        q.sql,
        "SELECT * FROM users WHERE status = ? AND id IN (SELECT user_id FROM orders WHERE total > ?) AND age > ?"
    );
    assert_eq!(
        q.params,
        vec![Value::from("active"), Value::Int(50), Value::Int(21)]
    );
}

#[test]
fn exists_and_joined_subqueries() {
    let mut sub = SubQuery::new(Some("o")).unwrap();
    sub.where_("paid", 1).unwrap();
    assert!(SubqueryProvider::subquery(&sub).is_err());
    sub.get("orders", Limit::All, "user_id, SUM(total) AS spent").unwrap();

    let mut h = Harness::new();
    h.join_sub(&sub, "o.user_id = u.id", "INNER")
        .unwrap()
        .where_exists(&sub)
        .unwrap();
    let q = select(&h, "users u", "u.name, o.spent").unwrap();
    assert_eq!(
        q.sql,
        "SELECT u.name, o.spent FROM users u INNER JOIN (SELECT user_id, SUM(total) AS spent FROM orders WHERE paid = ?) o ON o.user_id = u.id WHERE EXISTS (SELECT user_id, SUM(total) AS spent FROM orders WHERE paid = ?)"
    );
    assert_eq!(q.params, vec![Value::Int(1), Value::Int(1)]);

    let unaliased = SubQuery::new(None).unwrap();
    let mut h = Harness::new();
    assert!(h.join_sub(&unaliased, "1 = 1", "").is_err());
}

#[test]
fn strict_mode_rejects_suspicious_values() {
    let mut h = Harness::strict();
    let err = h.where_("password", "it's").unwrap_err();
    assert!(matches!(err, DbError::UnsafeValue { .. }));
    assert!(h.where_in("name", vec!["ok", "1 or 1=1"]).is_err());
    h.where_("name", "plain").unwrap();
}

#[test]
fn heuristic_mode_defers_to_column_type() {
    let lookup = FakeLookup::default().with(
        "users",
        &[
            ("id", "int(11) unsigned"),
            ("password", "varchar(255)"),
            ("role", "enum('admin','user')"),
        ],
    );
    let ctx = BuildContext {
        prefix: "",
        lookup: &lookup,
    };

    let mut h = Harness::new();
    h.where_("password", "it's").unwrap();
    assert!(h.stmt.wheres()[0].is_deferred());
    let q = build_select(&h.stmt, &table("users"), &Columns::all(), Limit::All, &ctx).unwrap();
    assert_eq!(q.params, vec![Value::from("it's")]);

    let mut h = Harness::new();
    h.where_("id", "1' OR '1'='1").unwrap();
    let err = build_select(&h.stmt, &table("users"), &Columns::all(), Limit::All, &ctx).unwrap_err();
    assert!(matches!(err, DbError::UnsafeValue { ref column, .. } if column == "id"));

    let mut h = Harness::new();
    h.where_("u.role", "admin' --").unwrap();
    assert!(build_select(&h.stmt, &table("users u"), &Columns::all(), Limit::All, &ctx).is_err());

    let mut h = Harness::new();
    h.where_("missing", "a;b").unwrap();
    assert!(build_select(&h.stmt, &table("users"), &Columns::all(), Limit::All, &ctx).is_err());
}

#[test]
fn deferred_having_checks_select_aliases_and_aggregates() {
    let lookup = FakeLookup::default().with(
        "staff",
        &[("dept", "enum('ops','o''brien')"), ("name", "varchar(64)")],
    );
    let ctx = BuildContext {
        prefix: "",
        lookup: &lookup,
    };
    let columns = Columns::from("dept AS team, MAX(name) last_name, COUNT(*) AS headcount");

    let mut h = Harness::new();
    h.group_by("dept")
        .unwrap()
        .having("team", "o'brien")
        .unwrap()
        .having("last_name", "O'Hara")
        .unwrap();
    assert!(h.stmt.havings().iter().all(Condition::is_deferred));
    let q = build_select(&h.stmt, &table("staff"), &columns, Limit::All, &ctx).unwrap();
    assert_eq!(
        q.sql,
        "SELECT dept AS team, MAX(name) AS last_name, COUNT(*) AS headcount FROM staff \
         GROUP BY dept HAVING team = ? AND last_name = ?"
    );
    assert_eq!(q.params, vec![Value::from("o'brien"), Value::from("O'Hara")]);

    let mut h = Harness::new();
    h.group_by("dept").unwrap().having("team", "x' OR '1").unwrap();
    assert!(build_select(&h.stmt, &table("staff"), &columns, Limit::All, &ctx).is_err());

    for column in ["headcount", "COUNT(*)"] {
        let mut h = Harness::new();
        h.group_by("dept").unwrap().having_op(column, "3 OR 1=1", ">").unwrap();
        let err = build_select(&h.stmt, &table("staff"), &columns, Limit::All, &ctx).unwrap_err();
        assert!(
            matches!(err, DbError::UnsafeValue { ref reason, .. } if reason.contains("bigint")),
            "{err}"
        );
    }

    // Aliases are not in scope for WHERE.
    let mut h = Harness::new();
    h.where_("team", "o'brien").unwrap();
    assert!(build_select(&h.stmt, &table("staff"), &columns, Limit::All, &ctx).is_err());
}

#[test]
fn plain_values_are_never_deferred() {
    let mut h = Harness::new();
    h.where_("name", "Ann Smith").unwrap().where_("id", 5).unwrap();
    assert!(h.stmt.wheres().iter().all(|c| !c.is_deferred()));
}

#[test]
fn tagged_operand_in_where() {
    let mut h = Harness::new();
    h.where_op("expires_at", now("-1d").unwrap(), "<").unwrap();
    let q = select(&h, "sessions", "*").unwrap();
    assert_eq!(
        q.sql,
        "SELECT * FROM sessions WHERE expires_at < NOW() - INTERVAL 1 DAY"
    );
}

#[test]
fn select_list_is_validated() {
    let h = Harness::new();
    assert!(select(&h, "t", "id, (SELECT password FROM users) AS p").is_err());
    assert!(select(&h, "t", ["id", "name n"]).is_ok());
    assert!(select(&h, "t", "").is_err());
}

#[test]
fn reset_is_idempotent() {
    let mut h = Harness::new();
    h.where_("a", 1).unwrap().group_by("a").unwrap();
    h.stmt.reset();
    let once = h.stmt.clone();
    h.stmt.reset();
    assert_eq!(once, h.stmt);
    assert!(h.stmt.is_empty());
}
