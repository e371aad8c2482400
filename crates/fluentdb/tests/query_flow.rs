#![allow(dead_code)]

mod common;

use common::{Mock, row};
use fluentdb::prelude::*;
use fluentdb::{DbError, SecurityMode};

fn users_schema(mock: &Mock) {
    mock.on(
        "SHOW COLUMNS FROM users",
        vec![
            row(&[("Field", "id".into()), ("Type", "int(11) unsigned".into()), ("Null", "NO".into())]),
            row(&[("Field", "name".into()), ("Type", "varchar(64)".into()), ("Null", "YES".into())]),
            row(&[
                ("Field", "role".into()),
                ("Type", "enum('admin','member')".into()),
                ("Null", "NO".into()),
            ]),
        ],
    );
}

#[test]
fn select_sends_placeholders_and_returns_rows() {
    let mock = Mock::new();
    mock.on(
        "FROM users",
        vec![row(&[("id", Value::Int(1)), ("name", "alice".into())])],
    );
    let mut db = mock.db();

    db.where_("status", "active")
        .unwrap()
        .where_in("id", vec![1, 2, 3])
        .unwrap()
        .order_by("id", "DESC")
        .unwrap();
    let rows = db.get("users", 10, "id, name").unwrap();

    let executed = mock.last();
    assert_eq!(
        executed.sql,
        "SELECT id, name FROM users WHERE status = ? AND id IN (?, ?, ?) ORDER BY id DESC LIMIT 10"
    );
    assert_eq!(
        mock.params(0),
        vec![Value::from("active"), Value::Int(1), Value::Int(2), Value::Int(3)]
    );
    assert_eq!(rows.len(), 1);
    assert_eq!(rows.first().unwrap().try_get::<String>("name").unwrap(), "alice");
    assert_eq!(db.count(), 1);
    assert_eq!(
        db.last_query(),
        "SELECT id, name FROM users WHERE status = 'active' AND id IN (1, 2, 3) ORDER BY id DESC LIMIT 10"
    );
    assert!(db.statement().is_empty());
}

#[test]
fn terminal_call_starts_from_a_clean_statement() {
    let mock = Mock::new();
    let mut db = mock.db();

    db.where_("id", 1).unwrap();
    db.get("users", Limit::All, "*").unwrap();
    db.get("users", Limit::All, "*").unwrap();

    assert_eq!(
        mock.sql(),
        vec!["SELECT * FROM users WHERE id = ?", "SELECT * FROM users"]
    );
}

#[test]
fn suspicious_value_is_checked_against_column_type() {
    let mock = Mock::new();
    users_schema(&mock);
    let mut db = mock.db();

    db.where_("name", "O'Brien").unwrap();
    assert!(db.statement().wheres()[0].is_deferred());
    db.get("users", Limit::All, "*").unwrap();

    db.where_("name", "D'Arcy").unwrap();
    db.get("users", Limit::All, "*").unwrap();

    let sql = mock.sql();
    let lookups = sql.iter().filter(|s| s.starts_with("SHOW COLUMNS")).count();
    assert_eq!(lookups, 1, "column metadata is cached per connection");
    assert_eq!(sql.last().unwrap(), "SELECT * FROM users WHERE name = ?");
    assert_eq!(db.session().metadata().len(), 1);
}

#[test]
fn suspicious_value_on_integer_column_never_reaches_the_server() {
    let mock = Mock::new();
    users_schema(&mock);
    let mut db = mock.db();

    db.where_("id", "1 OR 1=1").unwrap();
    let err = db.get("users", Limit::All, "*").unwrap_err();

    assert!(matches!(err, DbError::UnsafeValue { ref column, .. } if column == "id"));
    assert_eq!(mock.sql(), vec!["SHOW COLUMNS FROM users"]);
    assert!(db.last_error().contains("id"));
    assert!(db.statement().is_empty());
}

#[test]
fn enum_column_accepts_only_members() {
    let mock = Mock::new();
    users_schema(&mock);
    let mut db = mock.db();

    db.where_("role", "admin' --").unwrap();
    assert!(db.get("users", Limit::All, "*").is_err());
    assert!(!mock.sql().iter().any(|s| s.starts_with("SELECT")));
}

#[test]
fn strict_mode_rejects_at_the_clause() {
    let mock = Mock::new();
    let mut db = mock.db();
    db.set_security_mode(SecurityMode::Strict);

    let err = db.where_("name", "O'Brien").unwrap_err();
    assert!(matches!(err, DbError::UnsafeValue { .. }));
    assert!(db.statement().is_empty());
    assert_eq!(mock.state().connects, 0);
}

#[test]
fn paginate_reads_the_found_rows_total() {
    let mock = Mock::new();
    mock.on("SELECT FOUND_ROWS()", vec![row(&[("FOUND_ROWS()", Value::UInt(5))])]);
    mock.on(
        "FROM users",
        vec![
            row(&[("id", Value::Int(3))]),
            row(&[("id", Value::Int(4))]),
        ],
    );
    let mut db = mock.db();
    db.set_page_limit(2).unwrap();

    let page = db.paginate("users", 2, "id").unwrap();

    assert_eq!(
        mock.sql(),
        vec![
            "SELECT SQL_CALC_FOUND_ROWS id FROM users LIMIT 2, 2",
            "SELECT FOUND_ROWS()"
        ]
    );
    assert_eq!(page.len(), 2);
    assert_eq!(db.count(), 2);
    assert_eq!(db.total_count(), 5);
    assert_eq!(db.total_pages(), 3);
}

#[test]
fn totals_belong_to_the_last_statement() {
    let mock = Mock::new();
    mock.on("SELECT FOUND_ROWS()", vec![row(&[("FOUND_ROWS()", Value::UInt(5))])]);
    mock.on("FROM users", vec![row(&[("id", Value::Int(1))])]);
    let mut db = mock.db();
    db.set_page_limit(2).unwrap();

    db.paginate("users", 1, "id").unwrap();
    assert_eq!(db.total_count(), 5);

    db.get("users", Limit::All, "id").unwrap();
    assert_eq!(db.total_count(), 0);
    assert_eq!(db.total_pages(), 0);
    assert_eq!(db.count(), 1);

    db.with_total_count().get("users", 1, "id").unwrap();
    assert_eq!(db.total_count(), 5);
    db.insert("users", data! { "name" => "ann" }).unwrap();
    assert_eq!(db.total_count(), 0);
}

#[test]
fn get_value_and_values_alias_the_column() {
    let mock = Mock::new();
    mock.on("AS retval", vec![row(&[("retval", "alice".into())])]);
    let mut db = mock.db();

    db.where_("id", 7).unwrap();
    let value = db.get_value("users", "name").unwrap();
    assert_eq!(value, Some(Value::from("alice")));
    assert_eq!(mock.last().sql, "SELECT name AS retval FROM users WHERE id = ? LIMIT 1");

    let names = db.get_values("users", "name", Limit::All).unwrap();
    assert_eq!(names, vec![Value::from("alice")]);
    assert_eq!(mock.last().sql, "SELECT name AS retval FROM users");
}

#[test]
fn has_and_get_one() {
    let mock = Mock::new();
    mock.on("FROM users", vec![row(&[("id", Value::Int(9))])]);
    let mut db = mock.db();

    db.where_("email", "a@example.com").unwrap();
    assert!(db.has("users").unwrap());
    assert_eq!(
        mock.last().sql,
        "SELECT 1 FROM users WHERE email = ? LIMIT 1"
    );

    let first = db.get_one("users", "*").unwrap().unwrap();
    assert_eq!(first.get("id"), Some(&Value::Int(9)));

    assert!(!db.has("orders").unwrap());
}

#[test]
fn map_key_shapes_the_result() {
    let mock = Mock::new();
    mock.on(
        "FROM users",
        vec![
            row(&[("id", Value::Int(7)), ("name", "ann".into())]),
            row(&[("id", Value::Int(8)), ("name", "bob".into())]),
        ],
    );
    let mut db = mock.db();

    db.map("id").unwrap();
    let rows = db.get("users", Limit::All, "*").unwrap();
    let keys: Vec<String> = rows.keyed().into_iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec!["7", "8"]);
    assert_eq!(rows.to_json()["8"]["name"], "bob");

    let rows = db.get("users", Limit::All, "*").unwrap();
    assert_eq!(rows.map_key(), None);
}

#[test]
fn joined_select_with_subquery_keeps_bind_order() {
    let mock = Mock::new();
    let mut db = mock.db();
    db.set_prefix("app_").unwrap();

    let mut sub = db.sub_query(None).unwrap();
    sub.where_op("total", 100, ">").unwrap();
    let sub = sub.get("orders", Limit::All, "user_id").unwrap();

    db.join("profiles p", "p.user_id = u.id", "LEFT")
        .unwrap()
        .join_where("profiles p", "p.public", 1, "=")
        .unwrap()
        .where_("u.active", 1)
        .unwrap()
        .where_in("u.id", sub)
        .unwrap();
    db.get("users u", 5, "u.id, p.bio").unwrap();

    assert_eq!(
        mock.last().sql,
        "SELECT u.id, p.bio FROM app_users u LEFT JOIN app_profiles p ON p.user_id = u.id AND p.public = ? \
         WHERE u.active = ? AND u.id IN (SELECT user_id FROM app_orders WHERE total > ?) LIMIT 5"
    );
    assert_eq!(mock.params(0), vec![Value::Int(1), Value::Int(1), Value::Int(100)]);
}

#[test]
fn table_exists_checks_every_name() {
    let mock = Mock::new();
    mock.on(
        "information_schema.tables",
        vec![row(&[("table_name", "app_users".into())])],
    );
    let mut db = mock.db();
    db.set_prefix("app_").unwrap();

    assert!(db.table_exists(&["users"]).unwrap());
    assert_eq!(
        mock.last().sql,
        "SELECT table_name FROM information_schema.tables WHERE table_schema = ? AND table_name IN (?)"
    );
    assert_eq!(mock.params(0), vec![Value::from("shop"), Value::from("app_users")]);

    assert!(!db.table_exists(&["users", "orders"]).unwrap());
}

#[test]
fn trace_records_the_calling_line() {
    let mock = Mock::new();
    let mut db = mock.db();
    db.set_trace(true, None);

    db.get("users", Limit::All, "*").unwrap();
    db.where_("id", 1).unwrap();
    db.delete("users", 1).unwrap();

    let trace = db.trace();
    assert_eq!(trace.len(), 2);
    assert_eq!(trace[0].sql, "SELECT * FROM users");
    assert!(trace[0].caller.contains("query_flow.rs:"), "{}", trace[0].caller);
    assert_eq!(trace[1].sql, "DELETE FROM users WHERE id = ? LIMIT 1");
}

#[test]
fn driver_error_is_reported_with_its_code() {
    let mock = Mock::new();
    mock.fail_on(1);
    let mut db = mock.db();

    db.where_("id", 1).unwrap();
    let err = db.get("users", Limit::All, "*").unwrap_err();

    assert!(err.is_driver());
    assert_eq!(db.last_errno(), 1062);
    assert!(db.last_error().contains("Duplicate entry"));
    assert_eq!(db.last_query(), "SELECT * FROM users WHERE id = 1");

    db.get("users", Limit::All, "*").unwrap();
    assert_eq!(db.last_errno(), 0);
    assert_eq!(db.last_error(), "No error");
}
