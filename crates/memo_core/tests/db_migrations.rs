use memo_core::db::migrations::{latest_version, schema_version as read_schema_version};
use memo_core::db::{open_db, open_db_in_memory, open_db_with, DbError};
use memo_core::{DatabaseConfig, ExecContext, FindMemo, Memo, SqliteMemoDriver, Store};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "memo");
    assert_table_exists(&conn, "memo_organizer");
    assert_table_exists(&conn, "memo_relation");
}

#[test]
fn opening_same_database_twice_keeps_data() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("memo.db");

    {
        let store = Store::new(SqliteMemoDriver::try_new(open_db(&path).unwrap()).unwrap());
        store
            .create_memo(
                &ExecContext::background(),
                &Memo::with_uid("persisted", 1, "kept"),
            )
            .unwrap();
    }

    let conn = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn), latest_version());
    let store = Store::new(SqliteMemoDriver::try_new(conn).unwrap());
    let loaded = store
        .get_memo(&ExecContext::background(), &FindMemo::by_uid("persisted"))
        .unwrap()
        .unwrap();
    assert_eq!(loaded.content, "kept");
}

#[test]
fn open_db_with_config_uses_file_path() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = DatabaseConfig {
        path: Some(dir.path().join("configured.db")),
        busy_timeout_ms: 100,
    };

    let conn = open_db_with(&cfg).unwrap();
    assert_eq!(schema_version(&conn), latest_version());
    assert!(dir.path().join("configured.db").exists());
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

fn schema_version(conn: &Connection) -> u32 {
    read_schema_version(conn).unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
