//! SQLite-backed memo driver.
//!
//! # Responsibility
//! - Translate `FindMemo`/`UpdateMemo`/`DeleteMemo` descriptors into SQL.
//! - Compose `pinned` and `parent_id` from organizer and relation rows.
//! - Abort running statements when the caller's context is done.
//!
//! # Invariants
//! - One connection guarded by a mutex; calls are serialized per driver.
//! - Memo ids come from `AUTOINCREMENT` and are never reused after delete.
//! - Tags are stored as a JSON array and read back in the same order.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::config::DatabaseConfig;
use crate::context::ExecContext;
use crate::db::migrations::{latest_version, schema_version};
use crate::db::{open_db_in_memory, open_db_with};
use crate::driver::{DriverError, DriverResult, MemoDriver};
use crate::model::memo::{Memo, MemoId, MemoOrganizer, RowStatus, Visibility};
use crate::model::query::{DeleteMemo, FindMemo, UpdateMemo};
use log::{debug, warn};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::sync::Mutex;
use std::time::Instant;

const COMMENT_RELATION: &str = "COMMENT";
const REQUIRED_TABLES: [&str; 3] = ["memo", "memo_organizer", "memo_relation"];
/// VM instructions between context checks while a statement runs.
const PROGRESS_HANDLER_OPS: i32 = 1_000;

/// Memo driver over a single migrated SQLite connection.
pub struct SqliteMemoDriver {
    conn: Mutex<Connection>,
}

impl SqliteMemoDriver {
    /// Wraps a migrated connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations were not applied.
    /// - `MissingRequiredTable` when the schema is incomplete.
    pub fn try_new(conn: Connection) -> DriverResult<Self> {
        ensure_connection_ready(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens the database described by `cfg` and wraps it.
    pub fn open(cfg: &DatabaseConfig) -> DriverResult<Self> {
        Self::try_new(open_db_with(cfg)?)
    }

    pub fn open_in_memory() -> DriverResult<Self> {
        Self::try_new(open_db_in_memory()?)
    }

    /// Runs `op` on the connection while `ctx` can interrupt it.
    fn run<T>(
        &self,
        ctx: &ExecContext,
        event: &'static str,
        op: impl FnOnce(&mut Connection) -> DriverResult<T>,
    ) -> DriverResult<T> {
        let started_at = Instant::now();
        ctx.check()?;
        let mut conn = self.conn.lock().map_err(|_| DriverError::Poisoned)?;
        ctx.check()?;

        let watched = ctx.clone();
        conn.progress_handler(PROGRESS_HANDLER_OPS, Some(move || watched.err().is_some()));
        let result = op(&mut *conn);
        conn.progress_handler(PROGRESS_HANDLER_OPS, None::<fn() -> bool>);
        drop(conn);

        let result = result.map_err(|err| match ctx.err() {
            Some(reason) if err.is_interrupt() => DriverError::Context(reason),
            _ => err,
        });

        match &result {
            Ok(_) => debug!(
                "event={event} module=driver status=ok duration_ms={}",
                started_at.elapsed().as_millis()
            ),
            Err(err) => warn!(
                "event={event} module=driver status=error duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }
}

impl MemoDriver for SqliteMemoDriver {
    fn create_memo(&self, ctx: &ExecContext, create: &Memo) -> DriverResult<Memo> {
        let tags = encode_tags(&create.tags)?;

        self.run(ctx, "memo_create", |conn| {
            let tx = conn.transaction()?;
            let (id, created_ts, updated_ts): (MemoId, i64, i64) = tx.query_row(
                "INSERT INTO memo (
                    uid,
                    creator_id,
                    row_status,
                    content,
                    visibility,
                    tags
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                RETURNING id, created_ts, updated_ts;",
                params![
                    create.uid.as_str(),
                    create.creator_id,
                    create.row_status.as_str(),
                    create.content.as_str(),
                    create.visibility.as_str(),
                    tags,
                ],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )?;

            if let Some(parent_id) = create.parent_id {
                tx.execute(
                    "INSERT INTO memo_relation (memo_id, related_memo_id, type)
                     VALUES (?1, ?2, ?3);",
                    params![id, parent_id, COMMENT_RELATION],
                )?;
            }
            tx.commit()?;

            Ok(Memo {
                id,
                created_ts,
                updated_ts,
                pinned: false,
                ..create.clone()
            })
        })
    }

    fn list_memos(&self, ctx: &ExecContext, find: &FindMemo) -> DriverResult<Vec<Memo>> {
        let (sql, bind_values) = build_list_sql(find);

        self.run(ctx, "memo_list", |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query(params_from_iter(bind_values))?;
            let mut memos = Vec::new();
            while let Some(row) = rows.next()? {
                memos.push(parse_memo_row(row)?);
            }
            Ok(memos)
        })
    }

    fn update_memo(&self, ctx: &ExecContext, update: &UpdateMemo) -> DriverResult<()> {
        let (sql, bind_values) = build_update_sql(update)?;

        self.run(ctx, "memo_update", |conn| {
            let changed = conn.execute(&sql, params_from_iter(bind_values))?;
            if changed == 0 {
                return Err(DriverError::NotFound(update.id));
            }
            Ok(())
        })
    }

    fn delete_memo(&self, ctx: &ExecContext, delete: &DeleteMemo) -> DriverResult<()> {
        self.run(ctx, "memo_delete", |conn| {
            conn.execute("DELETE FROM memo WHERE id = ?1;", [delete.id])?;
            Ok(())
        })
    }

    fn upsert_memo_organizer(
        &self,
        ctx: &ExecContext,
        upsert: &MemoOrganizer,
    ) -> DriverResult<MemoOrganizer> {
        self.run(ctx, "memo_organizer_upsert", |conn| {
            conn.execute(
                "INSERT INTO memo_organizer (memo_id, user_id, pinned)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT (memo_id, user_id) DO UPDATE SET pinned = excluded.pinned;",
                params![upsert.memo_id, upsert.user_id, bool_to_int(upsert.pinned)],
            )?;
            Ok(*upsert)
        })
    }
}

/// Builds the list statement and its positional bind values.
fn build_list_sql(find: &FindMemo) -> (String, Vec<Value>) {
    let content_column = if find.exclude_content {
        "''"
    } else {
        "memo.content"
    };
    let mut sql = format!(
        "SELECT
            memo.id AS id,
            memo.uid AS uid,
            memo.creator_id AS creator_id,
            memo.created_ts AS created_ts,
            memo.updated_ts AS updated_ts,
            memo.row_status AS row_status,
            {content_column} AS content,
            memo.visibility AS visibility,
            memo.tags AS tags,
            COALESCE(memo_organizer.pinned, 0) AS pinned,
            memo_relation.related_memo_id AS parent_id
         FROM memo
         LEFT JOIN memo_organizer
           ON memo_organizer.memo_id = memo.id
          AND memo_organizer.user_id = memo.creator_id
         LEFT JOIN memo_relation
           ON memo_relation.memo_id = memo.id
          AND memo_relation.type = '{COMMENT_RELATION}'
         WHERE 1 = 1"
    );
    let mut bind_values: Vec<Value> = Vec::new();

    if let Some(id) = find.id {
        sql.push_str(" AND memo.id = ?");
        bind_values.push(Value::Integer(i64::from(id)));
    }
    if let Some(uid) = find.uid.as_ref() {
        sql.push_str(" AND memo.uid = ?");
        bind_values.push(Value::Text(uid.clone()));
    }
    if let Some(row_status) = find.row_status {
        sql.push_str(" AND memo.row_status = ?");
        bind_values.push(Value::Text(row_status.as_str().to_string()));
    }
    if let Some(creator_id) = find.creator_id {
        sql.push_str(" AND memo.creator_id = ?");
        bind_values.push(Value::Integer(i64::from(creator_id)));
    }
    if let Some(after) = find.created_ts_after {
        sql.push_str(" AND memo.created_ts >= ?");
        bind_values.push(Value::Integer(after));
    }
    if let Some(before) = find.created_ts_before {
        sql.push_str(" AND memo.created_ts < ?");
        bind_values.push(Value::Integer(before));
    }
    if let Some(after) = find.updated_ts_after {
        sql.push_str(" AND memo.updated_ts >= ?");
        bind_values.push(Value::Integer(after));
    }
    if let Some(before) = find.updated_ts_before {
        sql.push_str(" AND memo.updated_ts < ?");
        bind_values.push(Value::Integer(before));
    }
    for term in &find.content_search {
        sql.push_str(" AND memo.content LIKE ? ESCAPE '\\'");
        bind_values.push(Value::Text(like_contains_pattern(term)));
    }
    if !find.visibility_list.is_empty() {
        let placeholders = vec!["?"; find.visibility_list.len()].join(", ");
        sql.push_str(&format!(" AND memo.visibility IN ({placeholders})"));
        for visibility in &find.visibility_list {
            bind_values.push(Value::Text(visibility.as_str().to_string()));
        }
    }
    if let Some(tag) = find.tag.as_ref() {
        sql.push_str(
            " AND EXISTS (
                SELECT 1
                FROM json_each(memo.tags)
                WHERE json_each.value = ?
            )",
        );
        bind_values.push(Value::Text(tag.clone()));
    }
    if find.exclude_comments {
        sql.push_str(" AND memo_relation.related_memo_id IS NULL");
    }

    sql.push_str(" ORDER BY ");
    sql.push_str(&order_by_clause(find));

    if let Some(limit) = find.limit {
        sql.push_str(" LIMIT ?");
        bind_values.push(Value::Integer(i64::from(limit)));
        if let Some(offset) = find.offset {
            sql.push_str(" OFFSET ?");
            bind_values.push(Value::Integer(i64::from(offset)));
        }
    } else if let Some(offset) = find.offset {
        sql.push_str(" LIMIT -1 OFFSET ?");
        bind_values.push(Value::Integer(i64::from(offset)));
    }

    (sql, bind_values)
}

/// Random sampling wins; otherwise pinned first (if asked), then the chosen
/// timestamp descending, then id descending as the final tie-break.
fn order_by_clause(find: &FindMemo) -> String {
    if find.random {
        return "RANDOM()".to_string();
    }

    let mut orders = Vec::with_capacity(3);
    if find.order_by_pinned {
        orders.push("pinned DESC");
    }
    if find.order_by_updated_ts {
        orders.push("memo.updated_ts DESC");
    } else {
        orders.push("memo.created_ts DESC");
    }
    orders.push("memo.id DESC");
    orders.join(", ")
}

fn build_update_sql(update: &UpdateMemo) -> DriverResult<(String, Vec<Value>)> {
    let mut sets: Vec<&'static str> = Vec::new();
    let mut bind_values: Vec<Value> = Vec::new();

    if let Some(uid) = update.uid.as_ref() {
        sets.push("uid = ?");
        bind_values.push(Value::Text(uid.clone()));
    }
    if let Some(created_ts) = update.created_ts {
        sets.push("created_ts = ?");
        bind_values.push(Value::Integer(created_ts));
    }
    match update.updated_ts {
        Some(updated_ts) => {
            sets.push("updated_ts = ?");
            bind_values.push(Value::Integer(updated_ts));
        }
        None => sets.push("updated_ts = CAST(strftime('%s', 'now') AS INTEGER)"),
    }
    if let Some(row_status) = update.row_status {
        sets.push("row_status = ?");
        bind_values.push(Value::Text(row_status.as_str().to_string()));
    }
    if let Some(content) = update.content.as_ref() {
        sets.push("content = ?");
        bind_values.push(Value::Text(content.clone()));
    }
    if let Some(visibility) = update.visibility {
        sets.push("visibility = ?");
        bind_values.push(Value::Text(visibility.as_str().to_string()));
    }
    if let Some(tags) = update.tags.as_ref() {
        sets.push("tags = ?");
        bind_values.push(Value::Text(encode_tags(tags)?));
    }

    bind_values.push(Value::Integer(i64::from(update.id)));
    let sql = format!("UPDATE memo SET {} WHERE id = ?;", sets.join(", "));
    Ok((sql, bind_values))
}

fn parse_memo_row(row: &Row<'_>) -> DriverResult<Memo> {
    let row_status_text: String = row.get("row_status")?;
    let row_status = RowStatus::parse(&row_status_text).ok_or_else(|| {
        DriverError::InvalidData(format!(
            "invalid row status `{row_status_text}` in memo.row_status"
        ))
    })?;

    let tags_text: String = row.get("tags")?;
    let tags = serde_json::from_str::<Vec<String>>(&tags_text).map_err(|err| {
        DriverError::InvalidData(format!("invalid tags array in memo.tags: {err}"))
    })?;

    let pinned = match row.get::<_, i64>("pinned")? {
        0 => false,
        1 => true,
        other => {
            return Err(DriverError::InvalidData(format!(
                "invalid pinned value `{other}` in memo_organizer.pinned"
            )));
        }
    };

    let visibility: String = row.get("visibility")?;

    Ok(Memo {
        id: row.get("id")?,
        uid: row.get("uid")?,
        row_status,
        creator_id: row.get("creator_id")?,
        created_ts: row.get("created_ts")?,
        updated_ts: row.get("updated_ts")?,
        content: row.get("content")?,
        visibility: Visibility::from(visibility),
        tags,
        pinned,
        parent_id: row.get("parent_id")?,
    })
}

fn encode_tags(tags: &[String]) -> DriverResult<String> {
    serde_json::to_string(tags)
        .map_err(|err| DriverError::InvalidData(format!("failed to encode tags: {err}")))
}

/// Wraps `term` for a literal substring `LIKE` match with `\` as escape.
fn like_contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

fn ensure_connection_ready(conn: &Connection) -> DriverResult<()> {
    let expected_version = latest_version();
    let actual_version = schema_version(conn)?;
    if actual_version != expected_version {
        return Err(DriverError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in REQUIRED_TABLES {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(DriverError::MissingRequiredTable(table));
        }
    }

    Ok(())
}
