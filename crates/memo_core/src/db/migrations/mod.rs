//! Memo schema steps and the runner that brings a connection up to date.
//!
//! # Invariants
//! - Steps are listed in strictly increasing `version` order starting at 1.
//! - `PRAGMA user_version` always equals the last step fully applied.
//! - Pending steps run inside one transaction: a failing step rolls back
//!   every step of the same run, not only itself.
//! - A database stamped with a version this build does not know is refused.

use crate::db::{DbError, DbResult};
use log::{debug, info};
use rusqlite::{Connection, Transaction};
use std::time::Instant;

#[derive(Debug, Clone, Copy)]
struct SchemaStep {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MEMO_SCHEMA: &[SchemaStep] = &[
    SchemaStep {
        version: 1,
        name: "memo",
        sql: include_str!("0001_memo.sql"),
    },
    SchemaStep {
        version: 2,
        name: "memo_organizer_relation",
        sql: include_str!("0002_memo_organizer_relation.sql"),
    },
];

/// Highest schema version this build can create.
pub fn latest_version() -> u32 {
    steps_latest(MEMO_SCHEMA)
}

/// Reads the schema version stamped on `conn`.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?)
}

/// Brings the memo schema on `conn` up to `latest_version()`.
///
/// # Errors
/// - `UnsupportedSchemaVersion` when the database is newer than this build.
/// - `MigrationFailed` naming the first step that could not be applied.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    run_steps(conn, MEMO_SCHEMA)
}

fn steps_latest(steps: &[SchemaStep]) -> u32 {
    steps.last().map_or(0, |step| step.version)
}

fn run_steps(conn: &mut Connection, steps: &[SchemaStep]) -> DbResult<()> {
    let from_version = schema_version(conn)?;
    let target = steps_latest(steps);
    if from_version > target {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from_version,
            latest_supported: target,
        });
    }

    let pending: Vec<&SchemaStep> = steps
        .iter()
        .filter(|step| step.version > from_version)
        .collect();
    if pending.is_empty() {
        return Ok(());
    }

    let started_at = Instant::now();
    let tx = conn.transaction()?;
    for step in &pending {
        apply_step(&tx, step)?;
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={} to_version={} steps={} duration_ms={}",
        from_version,
        target,
        pending.len(),
        started_at.elapsed().as_millis()
    );
    Ok(())
}

fn apply_step(tx: &Transaction<'_>, step: &SchemaStep) -> DbResult<()> {
    tx.execute_batch(step.sql)
        .and_then(|()| tx.pragma_update(None, "user_version", step.version))
        .map_err(|source| DbError::MigrationFailed {
            version: step.version,
            name: step.name,
            source,
        })?;
    debug!(
        "event=db_migrate_step module=db status=ok version={} name={}",
        step.version, step.name
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{run_steps, schema_version, SchemaStep, MEMO_SCHEMA};
    use crate::db::DbError;
    use rusqlite::Connection;

    fn table_exists(conn: &Connection, name: &str) -> bool {
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1);",
            [name],
            |row| row.get::<_, i64>(0),
        )
        .unwrap()
            == 1
    }

    #[test]
    fn schema_steps_are_contiguous_from_one() {
        for (index, step) in MEMO_SCHEMA.iter().enumerate() {
            assert_eq!(step.version as usize, index + 1, "step {}", step.name);
        }
    }

    #[test]
    fn upgrade_from_partial_schema_runs_only_missing_steps() {
        let mut conn = Connection::open_in_memory().unwrap();
        run_steps(&mut conn, &MEMO_SCHEMA[..1]).unwrap();
        assert_eq!(schema_version(&conn).unwrap(), 1);
        assert!(!table_exists(&conn, "memo_organizer"));

        conn.execute_batch("INSERT INTO memo (uid, creator_id, content) VALUES ('kept', 1, 'x');")
            .unwrap();
        run_steps(&mut conn, MEMO_SCHEMA).unwrap();

        assert_eq!(schema_version(&conn).unwrap(), 2);
        assert!(table_exists(&conn, "memo_relation"));
        let kept: i64 = conn
            .query_row("SELECT COUNT(*) FROM memo WHERE uid = 'kept';", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(kept, 1);
    }

    #[test]
    fn failing_step_rolls_back_whole_run() {
        let broken = [
            MEMO_SCHEMA[0],
            SchemaStep {
                version: 2,
                name: "broken",
                sql: "CREATE TABLE memo_organizer (memo_id INTEGER); SELECT * FROM no_such_table;",
            },
        ];
        let mut conn = Connection::open_in_memory().unwrap();

        let err = run_steps(&mut conn, &broken).unwrap_err();
        assert!(matches!(
            err,
            DbError::MigrationFailed { version: 2, name: "broken", .. }
        ));
        assert_eq!(schema_version(&conn).unwrap(), 0);
        assert!(!table_exists(&conn, "memo"));
        assert!(!table_exists(&conn, "memo_organizer"));
    }
}
