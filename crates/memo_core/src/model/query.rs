//! Declarative query and command descriptors for memo storage.
//!
//! # Responsibility
//! - Describe read filters, projections and pagination for the driver.
//! - Describe partial updates and deletes keyed by `MemoId`.
//!
//! # Invariants
//! - `None` (or an empty set) means "no constraint on this dimension".
//! - Update fields follow partial-update semantics: `Some` overwrites, `None`
//!   leaves the stored value unchanged.

use crate::model::memo::{MemoId, RowStatus, Visibility};

/// Conjunction of optional memo filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindMemo {
    pub id: Option<MemoId>,
    pub uid: Option<String>,

    pub row_status: Option<RowStatus>,
    pub creator_id: Option<i32>,
    /// Inclusive lower bound on `created_ts`.
    pub created_ts_after: Option<i64>,
    /// Exclusive upper bound on `created_ts`.
    pub created_ts_before: Option<i64>,
    /// Inclusive lower bound on `updated_ts`.
    pub updated_ts_after: Option<i64>,
    /// Exclusive upper bound on `updated_ts`.
    pub updated_ts_before: Option<i64>,

    /// Substrings that must all appear in the content.
    pub content_search: Vec<String>,
    /// Allowed visibilities. Empty means any.
    pub visibility_list: Vec<Visibility>,
    /// Single tag the memo must carry.
    pub tag: Option<String>,
    /// Return memos with an empty `content`.
    pub exclude_content: bool,
    /// Skip memos that reply to another memo.
    pub exclude_comments: bool,
    /// Random sampling order; overrides the ordering flags.
    pub random: bool,

    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub order_by_updated_ts: bool,
    pub order_by_pinned: bool,
}

impl FindMemo {
    pub fn by_id(id: MemoId) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    pub fn by_uid(uid: impl Into<String>) -> Self {
        Self {
            uid: Some(uid.into()),
            ..Self::default()
        }
    }
}

/// Partial update keyed by memo id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateMemo {
    pub id: MemoId,
    pub uid: Option<String>,
    pub created_ts: Option<i64>,
    /// Explicit timestamp; when absent the driver stamps the current time.
    pub updated_ts: Option<i64>,
    pub row_status: Option<RowStatus>,
    pub content: Option<String>,
    pub visibility: Option<Visibility>,
    pub tags: Option<Vec<String>>,
}

impl UpdateMemo {
    /// Creates an update for `id` that changes nothing but `updated_ts`.
    pub fn new(id: MemoId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }
}

/// Delete command keyed by memo id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteMemo {
    pub id: MemoId,
}

impl DeleteMemo {
    pub fn new(id: MemoId) -> Self {
        Self { id }
    }
}
