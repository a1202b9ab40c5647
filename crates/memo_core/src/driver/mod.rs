//! Storage driver contract for memos.
//!
//! # Responsibility
//! - Define the primitive persistence operations the store delegates to.
//! - Define the error taxonomy drivers surface to callers.
//!
//! # Invariants
//! - Drivers own durability, ordering, uniqueness and isolation.
//! - Every operation receives the caller's `ExecContext` unchanged and must
//!   stop early once it is done.

pub mod sqlite;

use crate::context::{ContextError, ExecContext};
use crate::db::DbError;
use crate::model::memo::{Memo, MemoId, MemoOrganizer};
use crate::model::query::{DeleteMemo, FindMemo, UpdateMemo};
use rusqlite::ErrorCode;

pub use sqlite::SqliteMemoDriver;

pub type DriverResult<T> = Result<T, DriverError>;

/// Failure reported by a storage driver.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("memo not found: {0}")]
    NotFound(MemoId),
    #[error("constraint violation: {0}")]
    Constraint(String),
    #[error("invalid persisted memo data: {0}")]
    InvalidData(String),
    #[error("storage connection lock poisoned")]
    Poisoned,
    #[error("connection schema version {actual_version} does not match expected {expected_version}")]
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    #[error("connection is missing required table `{0}`")]
    MissingRequiredTable(&'static str),
}

impl DriverError {
    /// Returns whether SQLite aborted the statement through an interrupt.
    pub(crate) fn is_interrupt(&self) -> bool {
        matches!(
            self,
            Self::Db(DbError::Sqlite(rusqlite::Error::SqliteFailure(err, _)))
                if err.code == ErrorCode::OperationInterrupted
        )
    }
}

impl From<rusqlite::Error> for DriverError {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::SqliteFailure(err, message)
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Self::Constraint(message.unwrap_or_else(|| err.to_string()))
            }
            other => Self::Db(DbError::Sqlite(other)),
        }
    }
}

/// Backend that executes memo persistence primitives.
pub trait MemoDriver {
    /// Persists `create`, assigning id and timestamps, and returns the stored
    /// record.
    fn create_memo(&self, ctx: &ExecContext, create: &Memo) -> DriverResult<Memo>;
    /// Returns memos matching `find` in driver-defined order.
    fn list_memos(&self, ctx: &ExecContext, find: &FindMemo) -> DriverResult<Vec<Memo>>;
    /// Applies a partial update.
    fn update_memo(&self, ctx: &ExecContext, update: &UpdateMemo) -> DriverResult<()>;
    fn delete_memo(&self, ctx: &ExecContext, delete: &DeleteMemo) -> DriverResult<()>;
    /// Inserts or replaces the organizer row for `(memo_id, user_id)`.
    fn upsert_memo_organizer(
        &self,
        ctx: &ExecContext,
        upsert: &MemoOrganizer,
    ) -> DriverResult<MemoOrganizer>;
}
