#![cfg(feature = "sqlite")]

use std::sync::Arc;

use parking_lot::Mutex;

use dbaccess::types::{FetchMode, RowFactory, RowTarget};
use dbaccess::{
    Attribute, BoundVar, Connection, ConnectionProfile, DbError, Execution, ParamType,
    ParameterNormalizer, SqlValue,
};

fn memory() -> Connection {
    let raw: ConnectionProfile = [("driver", "sqlite3"), ("database", ":memory:")]
        .into_iter()
        .collect();
    let mut conn = Connection::from_profile(&raw).unwrap();
    conn.exec("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL, age INTEGER)")
        .unwrap();
    conn
}

fn insert(conn: &mut Connection, names: &[(&str, i64)]) {
    let mut stmt = conn
        .prepare("INSERT INTO users (name, age) VALUES (:name, :age)")
        .unwrap();
    for (name, age) in names {
        stmt.execute_with([("name", SqlValue::from(*name)), ("age", SqlValue::Int(*age))])
            .unwrap();
    }
}

#[derive(Debug, Default)]
struct User {
    id: i64,
    name: String,
}

impl RowTarget for User {
    fn assign(&mut self, column: &str, value: SqlValue) {
        match column {
            "id" => self.id = value.as_i64().unwrap_or_default(),
            "name" => self.name = value.as_str().unwrap_or_default().to_string(),
            _ => {}
        }
    }
}

#[test]
fn test_crud_round_trip() {
    let mut conn = memory();
    insert(&mut conn, &[("alice", 30), ("bob", 25)]);
    assert_eq!(conn.last_insert_id(None).unwrap(), "2");

    assert_eq!(
        conn.exec("UPDATE users SET age = age + 1 WHERE age > 20").unwrap(),
        2
    );

    let mut rs = conn.prepare("SELECT name, age FROM users WHERE id = ?").unwrap();
    rs.execute_with([("p1", 1)]).unwrap();
    let row = rs.fetch().unwrap().unwrap().into_row().unwrap();
    assert_eq!(row.get("name"), Some(&SqlValue::from("alice")));
    assert_eq!(row.get("age"), Some(&SqlValue::Int(31)));

    let mut delete = conn.prepare("DELETE FROM users WHERE name = ?").unwrap();
    assert_eq!(delete.execute_with([("p1", "bob")]).unwrap(), Execution::Affected(1));
    assert_eq!(delete.row_count().unwrap(), 1);
    assert_eq!(conn.last_id_in_table("id", "users").unwrap(), 1);
}

#[test]
fn test_bound_variable_is_read_at_execute() {
    let mut conn = memory();
    let mut stmt = conn
        .prepare("INSERT INTO users (name, age) VALUES (?, ?)")
        .unwrap();
    let name = BoundVar::new("first");
    stmt.bind_param("p1", &name, ParamType::Str).unwrap();
    stmt.bind_value("p2", "40", ParamType::Int).unwrap();
    stmt.execute().unwrap();
    name.set("second");
    stmt.execute().unwrap();

    let mut rs = conn.query("SELECT name, age FROM users ORDER BY id").unwrap();
    let rows: Vec<_> = rs
        .rows()
        .map(|f| f.unwrap().into_row().unwrap())
        .collect();
    assert_eq!(rows[0].get("name"), Some(&SqlValue::from("first")));
    assert_eq!(rows[1].get("name"), Some(&SqlValue::from("second")));
    assert_eq!(rows[1].get("age"), Some(&SqlValue::Int(40)));
}

#[test]
fn test_limit_query_and_row_count() {
    let mut conn = memory();
    insert(&mut conn, &[("a", 1), ("b", 2), ("c", 3), ("d", 4)]);

    let mut rs = conn
        .limit_query("SELECT id FROM users ORDER BY id;", 1, 2)
        .unwrap();
    assert_eq!(rs.row_count().unwrap(), 2);
    let ids: Vec<i64> = rs
        .rows()
        .map(|f| f.unwrap().into_row().unwrap().get("id").and_then(SqlValue::as_i64).unwrap())
        .collect();
    assert_eq!(ids, vec![2, 3]);
    assert!(rs.rewind().unwrap());
}

#[test]
fn test_limit_query_with_trailing_comment() {
    let mut conn = memory();
    insert(&mut conn, &[("a", 1), ("b", 2), ("c", 3), ("d", 4), ("e", 5)]);

    let mut rs = conn
        .limit_query("SELECT id FROM users ORDER BY id -- all ids", 0, 2)
        .unwrap();
    assert_eq!(rs.fetch_all().unwrap().len(), 2);
}

#[test]
fn test_fetch_modes() {
    let mut conn = memory();
    insert(&mut conn, &[("alice", 30), ("bob", 25)]);

    let mut rs = conn.query("SELECT id, name FROM users ORDER BY id").unwrap();
    rs.set_fetch_mode(FetchMode::AsClass(RowFactory::of::<User>()));
    rs.add_modifier(|row| {
        let upper = row
            .get("name")
            .and_then(SqlValue::as_str)
            .map(str::to_uppercase);
        if let Some(upper) = upper {
            row.set("name", upper);
        }
    });
    let user = rs.fetch().unwrap().unwrap().into_object::<User>().unwrap();
    assert_eq!(user.id, 1);
    assert_eq!(user.name, "ALICE");

    let target = Arc::new(Mutex::new(User::default()));
    rs.set_fetch_mode(FetchMode::IntoExisting(target.clone()));
    rs.fetch().unwrap().unwrap();
    assert_eq!(target.lock().name, "BOB");
}

#[test]
fn test_transaction_rollback() {
    let mut conn = memory();
    conn.begin_transaction().unwrap();
    insert(&mut conn, &[("ghost", 1)]);
    assert_eq!(
        conn.attribute(&Attribute::Autocommit).unwrap(),
        Some(SqlValue::Bool(false))
    );
    conn.rollback().unwrap();

    assert_eq!(conn.last_id_in_table("id", "users").unwrap(), 0);
    assert_eq!(
        conn.attribute(&Attribute::Autocommit).unwrap(),
        Some(SqlValue::Bool(true))
    );
}

#[test]
fn test_query_error_carries_vendor_code() {
    let mut conn = memory();
    match conn.query("SELECT * FROM missing") {
        Err(DbError::Query { sql, code, message }) => {
            assert_eq!(sql, "SELECT * FROM missing");
            assert!(code.is_some());
            assert!(message.contains("missing"));
        }
        other => panic!("Expected Query error, got {:?}", other.map(|_| ())),
    }
    assert!(conn.query("SELECT 1").is_ok());
}

#[test]
fn test_pdo_file_database_with_prefix() {
    let dir = tempfile::tempdir().unwrap();
    let dsn = format!("sqlite:{}", dir.path().join("app.db").display());
    let raw: ConnectionProfile = [
        ("driver", "pdo"),
        ("dsn", dsn.as_str()),
        ("table_prefix", "app_"),
    ]
    .into_iter()
    .collect();

    let normalizer = ParameterNormalizer::new();
    let profile = normalizer.normalize(&raw).unwrap();
    assert!(normalizer.is_extension_activated(&profile));

    let mut conn = Connection::open(profile).unwrap();
    let table = conn.enclose_name(&conn.prefix_table("items"));
    let label = conn.quote(&SqlValue::from("it's"));
    conn.exec(&format!("CREATE TABLE {table} (id INTEGER PRIMARY KEY, label TEXT)"))
        .unwrap();
    conn.exec(&format!("INSERT INTO {table} (label) VALUES ({label})"))
        .unwrap();
    conn.close();

    let mut reopened = Connection::open(normalizer.normalize(&raw).unwrap()).unwrap();
    let mut rs = reopened.query("SELECT label FROM app_items").unwrap();
    let row = rs.fetch().unwrap().unwrap().into_row().unwrap();
    assert_eq!(row.get("label"), Some(&SqlValue::from("it's")));
}

#[test]
fn test_free_after_close() {
    let mut conn = memory();
    insert(&mut conn, &[("alice", 30)]);
    let mut stmt = conn.prepare("SELECT * FROM users WHERE age > ?").unwrap();
    conn.close();

    assert!(matches!(stmt.execute_with([("p1", 1)]), Err(DbError::State(_))));
    stmt.free();
    stmt.free();
}
