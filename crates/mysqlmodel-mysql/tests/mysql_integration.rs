//! Live-server tests. Set `MYSQLMODEL_TEST_MYSQL` to a connection string
//! (`host,user,password,db_name,port`) to run them.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use mysqlmodel_core::{BindType, ConnectionParams, Connector, Driver, Row, Value};
use mysqlmodel_mysql::{MySqlConnection, MySqlConnector};

const MYSQL_ENV: &str = "MYSQLMODEL_TEST_MYSQL";

fn connect() -> Option<MySqlConnection> {
    let raw = std::env::var(MYSQL_ENV).ok()?;
    let params = match ConnectionParams::parse(&raw) {
        Ok(params) => params,
        Err(e) => {
            eprintln!("skipping MySQL integration tests: {MYSQL_ENV} is invalid: {e}");
            return None;
        }
    };
    let connector = MySqlConnector::new().connect_timeout(Duration::from_secs(10));
    Some(connector.connect(&params).expect("connect to MySQL"))
}

fn test_table_name(prefix: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_nanos();
    format!("{prefix}_{nanos}")
}

fn run(conn: &mut MySqlConnection, sql: &str, types: &[BindType], values: &[Value]) -> Vec<Row> {
    let mut stmt = conn.prepare(sql).expect("prepare");
    conn.execute(&mut stmt, types, values).expect("execute");
    let rows = conn.fetch_all(&mut stmt).expect("fetch");
    conn.close(stmt).expect("close");
    rows
}

#[test]
fn mysql_ping_and_select_1() {
    let Some(mut conn) = connect() else {
        eprintln!("skipping MySQL integration tests: set {MYSQL_ENV}");
        return;
    };
    conn.ping().expect("ping");
    let rows = run(&mut conn, "SELECT 1 AS one", &[], &[]);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get_by_name("one"), Some(&Value::Int(1)));
    conn.disconnect().expect("disconnect");
}

#[test]
fn mysql_insert_and_select_roundtrip() {
    let Some(mut conn) = connect() else {
        eprintln!("skipping MySQL integration tests: set {MYSQL_ENV}");
        return;
    };

    let table = test_table_name("mysqlmodel_roundtrip");
    run(&mut conn, &format!("DROP TABLE IF EXISTS {table}"), &[], &[]);
    run(
        &mut conn,
        &format!(
            "CREATE TABLE {table} (\
             id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,\
             name VARCHAR(64) NOT NULL,\
             score DOUBLE NULL,\
             payload BLOB NULL\
             )"
        ),
        &[],
        &[],
    );

    run(
        &mut conn,
        &format!("INSERT INTO {table} (name,score,payload) VALUES (?,?,?);"),
        &[BindType::String, BindType::Double, BindType::Blob],
        &[
            Value::Text("Ådne".into()),
            Value::Int(3),
            Value::Bytes(vec![0, 1, 2]),
        ],
    );
    let id = conn.last_insert_id();
    assert!(id > 0);
    assert_eq!(conn.affected_rows(), 1);

    let rows = run(
        &mut conn,
        &format!("SELECT * FROM {table} WHERE id=?;"),
        &[BindType::Integer],
        &[Value::Int(id as i64)],
    );
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get_by_name("name"), Some(&Value::Text("Ådne".into())));
    assert_eq!(rows[0].get_by_name("score"), Some(&Value::Double(3.0)));
    assert_eq!(rows[0].get_by_name("payload"), Some(&Value::Bytes(vec![0, 1, 2])));

    run(&mut conn, &format!("DROP TABLE IF EXISTS {table}"), &[], &[]);
}

#[test]
fn mysql_rollback_discards_changes() {
    let Some(mut conn) = connect() else {
        eprintln!("skipping MySQL integration tests: set {MYSQL_ENV}");
        return;
    };

    let table = test_table_name("mysqlmodel_tx");
    run(
        &mut conn,
        &format!("CREATE TABLE {table} (id BIGINT NOT NULL PRIMARY KEY) ENGINE=InnoDB"),
        &[],
        &[],
    );

    conn.set_autocommit(false).expect("autocommit off");
    run(
        &mut conn,
        &format!("INSERT INTO {table} (id) VALUES (?);"),
        &[BindType::Integer],
        &[Value::Int(7)],
    );
    assert!(conn.in_transaction());
    conn.rollback().expect("rollback");
    conn.set_autocommit(true).expect("autocommit on");

    let rows = run(
        &mut conn,
        &format!("SELECT COUNT(*) AS n FROM {table};"),
        &[],
        &[],
    );
    assert_eq!(rows[0].get_by_name("n"), Some(&Value::Int(0)));

    run(&mut conn, &format!("DROP TABLE IF EXISTS {table}"), &[], &[]);
}
