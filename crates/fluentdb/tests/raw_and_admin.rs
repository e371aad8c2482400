#![allow(dead_code)]

mod common;

use common::{Mock, row};
use fluentdb::prelude::*;
use fluentdb::{LoadDataSettings, LoadXmlSettings, Params, RawOutcome, RawValue};
use std::path::PathBuf;

fn scratch_file(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("fluentdb-{}-{name}", std::process::id()));
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn raw_query_expands_lists_and_prefixes_tables() {
    let mock = Mock::new();
    mock.on("FROM app_users", vec![row(&[("id", Value::Int(1))])]);
    let mut db = mock.db();
    db.set_prefix("app_").unwrap();

    let outcome = db
        .raw_query(
            "SELECT * FROM users WHERE id IN (?) AND status = ?",
            params![vec![1, 2], "active"],
        )
        .unwrap();

    assert_eq!(
        mock.last().sql,
        "SELECT * FROM app_users WHERE id IN (?, ?) AND status = ?"
    );
    assert_eq!(
        mock.params(0),
        vec![Value::Int(1), Value::Int(2), Value::from("active")]
    );
    let rows = outcome.into_rows().unwrap();
    assert_eq!(rows.len(), 1);
}

#[test]
fn raw_query_reports_what_the_statement_did() {
    let mock = Mock::new();
    let mut db = mock.db();

    let inserted = db
        .raw_query("INSERT INTO logs (msg) VALUES (?)", params!["hi"])
        .unwrap();
    assert_eq!(inserted, RawOutcome::InsertId(1));
    assert_eq!(db.insert_id(), Some(1));

    mock.state().affected = 4;
    let updated = db
        .raw_query("UPDATE logs SET seen = 1", params![])
        .unwrap();
    assert_eq!(updated, RawOutcome::Affected(4));
}

#[test]
fn raw_query_placeholder_mismatch_is_rejected() {
    let mock = Mock::new();
    let mut db = mock.db();

    let err = db
        .raw_query("SELECT * FROM t WHERE a = ? AND b = ?", params![1])
        .unwrap_err();
    assert!(err.is_validation());
    assert!(mock.sql().is_empty());
    assert_ne!(db.last_error(), "No error");
}

#[test]
fn named_binds_drop_the_colon() {
    let mock = Mock::new();
    let mut db = mock.db();

    db.raw_query_named(
        "SELECT * FROM users WHERE id = :id AND role = :role",
        [(":id", Value::Int(5)), ("role", Value::from("admin"))],
    )
    .unwrap();

    assert_eq!(
        mock.last().params,
        Params::Named(vec![
            ("id".to_string(), Value::Int(5)),
            ("role".to_string(), Value::from("admin")),
        ])
    );
    assert_eq!(
        db.last_query(),
        "SELECT * FROM users WHERE id = 5 AND role = 'admin'"
    );
}

#[test]
fn raw_query_value_shapes() {
    let mock = Mock::new();
    mock.on(
        "FROM users",
        vec![
            row(&[("name", "ann".into())]),
            row(&[("name", "bob".into())]),
        ],
    );
    let mut db = mock.db();

    let one = db
        .raw_query_value("SELECT name FROM users LIMIT 1", params![])
        .unwrap();
    assert_eq!(one, RawValue::One(Value::from("ann")));

    let many = db
        .raw_query_value("SELECT name FROM users", params![])
        .unwrap();
    assert_eq!(
        many,
        RawValue::Many(vec![Value::from("ann"), Value::from("bob")])
    );

    let none = db
        .raw_query_value("SELECT name FROM orders", params![])
        .unwrap();
    assert_eq!(none, RawValue::Empty);

    let first = db
        .raw_query_one("SELECT name FROM users", params![])
        .unwrap()
        .unwrap();
    assert_eq!(first.get("name"), Some(&Value::from("ann")));
}

#[test]
fn query_appends_a_limit() {
    let mock = Mock::new();
    let mut db = mock.db();
    db.set_prefix("app_").unwrap();

    db.query("SELECT * FROM users ORDER BY id;", (10, 5)).unwrap();
    assert_eq!(
        mock.last().sql,
        "SELECT * FROM app_users ORDER BY id LIMIT 10, 5"
    );

    assert!(db.query("SELECT 1", -1).is_err());
    assert_eq!(mock.sql().len(), 1);
}

#[test]
fn lock_releases_tables_when_it_fails() {
    let mock = Mock::new();
    mock.fail_on(1);
    let mut db = mock.db();

    assert!(db.lock(&["users", "orders"]).is_err());
    assert_eq!(
        mock.sql(),
        vec!["LOCK TABLES users WRITE, orders WRITE", "UNLOCK TABLES"]
    );
}

#[test]
fn lock_and_unlock() {
    let mock = Mock::new();
    let mut db = mock.db();
    db.set_prefix("app_").unwrap().set_lock_method("read").unwrap();

    db.lock(&["users u"]).unwrap();
    db.unlock().unwrap();
    assert_eq!(
        mock.sql(),
        vec!["LOCK TABLES app_users u READ", "UNLOCK TABLES"]
    );
    assert!(db.lock(&[]).is_err());
}

#[test]
fn load_data_builds_the_import_statement() {
    let mock = Mock::new();
    let mut db = mock.db();
    let file = scratch_file("users.csv", "id;name\n1;ann\n");

    let settings = LoadDataSettings {
        enclosed_by: Some("\"".into()),
        local: true,
        ..LoadDataSettings::default()
    };
    db.load_data("users", &file, &settings).unwrap();

    let sql = mock.last().sql;
    assert!(sql.starts_with("LOAD DATA LOCAL INFILE '"), "{sql}");
    assert!(sql.contains(
        r#"INTO TABLE users FIELDS TERMINATED BY ';' ENCLOSED BY '\"' LINES TERMINATED BY '\n'"#
    ), "{sql}");
    assert!(sql.ends_with("IGNORE 1 LINES"), "{sql}");
    std::fs::remove_file(file).ok();
}

#[test]
fn load_xml_names_the_row_element() {
    let mock = Mock::new();
    let mut db = mock.db();
    let file = scratch_file("users.xml", "<list><user id=\"1\"/></list>");

    let settings = LoadXmlSettings {
        row_tag: Some("user".into()),
        ..LoadXmlSettings::default()
    };
    db.load_xml("users", &file, &settings).unwrap();

    let sql = mock.last().sql;
    assert!(sql.starts_with("LOAD XML INFILE '"), "{sql}");
    assert!(sql.ends_with("INTO TABLE users ROWS IDENTIFIED BY '<user>'"), "{sql}");
    std::fs::remove_file(file).ok();
}

#[test]
fn connections_share_one_session() {
    let mock = Mock::new();
    let mut db = mock.db();
    db.add_connection(
        "reporting",
        ConnectionProfile::new("replica", "ro", "", "shop"),
    );

    db.ping().unwrap();
    let mut reporting = db.connection("reporting").unwrap();
    reporting.get("users", Limit::All, "*").unwrap();
    assert_eq!(mock.state().connects, 2);

    db.ping().unwrap();
    assert_eq!(mock.state().connects, 2, "open handles are reused");

    assert!(db.disconnect("default"));
    db.ping().unwrap();
    assert_eq!(mock.state().connects, 3);
    assert_eq!(mock.sql()[0], "SELECT 1");
}
