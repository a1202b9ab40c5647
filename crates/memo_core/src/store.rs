//! Memo store facade.
//!
//! # Responsibility
//! - Validate user-facing identifiers before any write reaches the driver.
//! - Delegate every persistence primitive to the injected `MemoDriver`.
//! - Compose `get_memo` out of `list_memos`.
//!
//! # Invariants
//! - The caller's `ExecContext` is forwarded to the driver unchanged.
//! - Driver errors surface unchanged; nothing is retried or swallowed.
//! - The facade holds no state besides its driver, so it can be shared by
//!   concurrent callers whenever the driver can.

use crate::context::ExecContext;
use crate::driver::{DriverError, MemoDriver};
use crate::model::memo::{Memo, MemoOrganizer, TagAmount};
use crate::model::query::{DeleteMemo, FindMemo, UpdateMemo};
use crate::uid::is_valid_uid;
use log::warn;
use std::collections::HashMap;

pub type StoreResult<T> = Result<T, StoreError>;

/// Local input rejection raised before the driver is called.
///
/// Messages never echo the rejected value; it stays available on the variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid uid: expected 1-32 alphanumerics or inner hyphens, got {} chars", .0.chars().count())]
    InvalidUid(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Driver(#[from] DriverError),
}

/// Public persistence API for memos.
pub struct Store<D: MemoDriver> {
    driver: D,
}

impl<D: MemoDriver> Store<D> {
    pub fn new(driver: D) -> Self {
        Self { driver }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Creates a memo and returns the record as stored by the driver.
    ///
    /// # Errors
    /// - `Validation` when `create.uid` is malformed; the driver is not called.
    /// - `Driver` for any storage failure.
    pub fn create_memo(&self, ctx: &ExecContext, create: &Memo) -> StoreResult<Memo> {
        ensure_valid_uid("memo_create", &create.uid)?;
        Ok(self.driver.create_memo(ctx, create)?)
    }

    /// Lists memos exactly as the driver returns them.
    pub fn list_memos(&self, ctx: &ExecContext, find: &FindMemo) -> StoreResult<Vec<Memo>> {
        Ok(self.driver.list_memos(ctx, find)?)
    }

    /// Returns the first memo the driver yields for `find`.
    ///
    /// `Ok(None)` means the lookup ran and matched nothing. No `limit` is
    /// imposed; set `limit: Some(1)` to avoid fetching extra rows.
    pub fn get_memo(&self, ctx: &ExecContext, find: &FindMemo) -> StoreResult<Option<Memo>> {
        let list = self.list_memos(ctx, find)?;
        Ok(list.into_iter().next())
    }

    /// Applies a partial update.
    ///
    /// # Errors
    /// - `Validation` when `update.uid` is set and malformed; the driver is
    ///   not called.
    /// - `Driver` for any storage failure.
    pub fn update_memo(&self, ctx: &ExecContext, update: &UpdateMemo) -> StoreResult<()> {
        if let Some(uid) = update.uid.as_deref() {
            ensure_valid_uid("memo_update", uid)?;
        }
        Ok(self.driver.update_memo(ctx, update)?)
    }

    pub fn delete_memo(&self, ctx: &ExecContext, delete: &DeleteMemo) -> StoreResult<()> {
        Ok(self.driver.delete_memo(ctx, delete)?)
    }

    /// Pins or unpins a memo for one user.
    pub fn upsert_memo_organizer(
        &self,
        ctx: &ExecContext,
        upsert: &MemoOrganizer,
    ) -> StoreResult<MemoOrganizer> {
        Ok(self.driver.upsert_memo_organizer(ctx, upsert)?)
    }

    /// Counts tag usage across memos matching `find`.
    ///
    /// Content is never fetched. Results are ordered by amount descending,
    /// then tag ascending.
    pub fn list_tag_amounts(
        &self,
        ctx: &ExecContext,
        find: &FindMemo,
    ) -> StoreResult<Vec<TagAmount>> {
        let find = FindMemo {
            exclude_content: true,
            ..find.clone()
        };
        let memos = self.list_memos(ctx, &find)?;

        let mut amounts: HashMap<String, usize> = HashMap::new();
        for memo in memos {
            for tag in memo.tags {
                *amounts.entry(tag).or_default() += 1;
            }
        }

        let mut tags: Vec<TagAmount> = amounts
            .into_iter()
            .map(|(tag, amount)| TagAmount { tag, amount })
            .collect();
        tags.sort_by(|a, b| b.amount.cmp(&a.amount).then_with(|| a.tag.cmp(&b.tag)));
        Ok(tags)
    }
}

fn ensure_valid_uid(event: &'static str, uid: &str) -> Result<(), ValidationError> {
    if is_valid_uid(uid) {
        return Ok(());
    }
    warn!(
        "event={event} module=store status=error error_code=invalid_uid uid_len={}",
        uid.chars().count()
    );
    Err(ValidationError::InvalidUid(uid.to_string()))
}
