//! Memo entity model.
//!
//! # Responsibility
//! - Define the memo record and its closed enumerations.
//! - Provide fail-safe string projections for `Visibility`.
//!
//! # Invariants
//! - `Visibility` always renders as one of `PUBLIC`, `PROTECTED`, `PRIVATE`.
//! - `pinned` and `parent_id` are composed by the driver at read time and are
//!   not part of the memo's intrinsic identity.
//! - `parent_id` is a plain value reference; it never owns the referenced memo.

use crate::uid::generate_uid;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// System-assigned memo identifier.
pub type MemoId = i32;

/// Access scope of a memo.
///
/// Conversion from strings is total: anything that is not exactly `PUBLIC` or
/// `PROTECTED` becomes `Private`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", from = "String")]
pub enum Visibility {
    Public,
    Protected,
    #[default]
    Private,
}

impl Visibility {
    /// Returns the canonical wire value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Public => "PUBLIC",
            Self::Protected => "PROTECTED",
            Self::Private => "PRIVATE",
        }
    }
}

impl Display for Visibility {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Visibility {
    fn from(value: &str) -> Self {
        match value {
            "PUBLIC" => Self::Public,
            "PROTECTED" => Self::Protected,
            _ => Self::Private,
        }
    }
}

impl From<String> for Visibility {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

/// Lifecycle state of a memo row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RowStatus {
    #[default]
    Normal,
    Archived,
}

impl RowStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Archived => "ARCHIVED",
        }
    }

    /// Parses a persisted value. Unknown values are rejected, not defaulted.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "NORMAL" => Some(Self::Normal),
            "ARCHIVED" => Some(Self::Archived),
            _ => None,
        }
    }
}

impl Display for RowStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical memo record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memo {
    /// Assigned by the driver on create; ignored on input.
    pub id: MemoId,
    /// User-facing identifier, validated by the store before any write.
    pub uid: String,

    pub row_status: RowStatus,
    /// Authoring principal. Lookup key only.
    pub creator_id: i32,
    /// Unix epoch seconds.
    pub created_ts: i64,
    /// Unix epoch seconds, refreshed on every mutation.
    pub updated_ts: i64,

    pub content: String,
    pub visibility: Visibility,
    /// Ordered as supplied by the author.
    pub tags: Vec<String>,

    /// Joined from the creator's organizer row.
    pub pinned: bool,
    /// Memo this one replies to, if any.
    pub parent_id: Option<MemoId>,
}

impl Memo {
    /// Creates a memo draft with a freshly generated UID.
    pub fn new(creator_id: i32, content: impl Into<String>) -> Self {
        Self::with_uid(generate_uid(), creator_id, content)
    }

    /// Creates a memo draft with a caller-provided UID.
    ///
    /// The UID is not validated here; `Store::create_memo` rejects malformed
    /// values before they reach storage.
    pub fn with_uid(uid: impl Into<String>, creator_id: i32, content: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            creator_id,
            content: content.into(),
            ..Self::default()
        }
    }

    /// Returns whether this memo is a reply to another memo.
    pub fn is_comment(&self) -> bool {
        self.parent_id.is_some()
    }
}

/// Per-user organizer state for a memo.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoOrganizer {
    pub memo_id: MemoId,
    pub user_id: i32,
    pub pinned: bool,
}

/// Usage count for one tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagAmount {
    pub tag: String,
    pub amount: usize,
}

#[cfg(test)]
mod tests {
    use super::{Memo, RowStatus, Visibility};
    use crate::uid::is_valid_uid;

    #[test]
    fn visibility_string_falls_back_to_private() {
        assert_eq!(Visibility::from("").to_string(), "PRIVATE");
        assert_eq!(Visibility::from("PUBLIC").to_string(), "PUBLIC");
        assert_eq!(Visibility::from("PROTECTED").to_string(), "PROTECTED");
        assert_eq!(Visibility::from("bogus").to_string(), "PRIVATE");
        assert_eq!(Visibility::from("public").to_string(), "PRIVATE");
    }

    #[test]
    fn visibility_deserializes_unknown_values_as_private() {
        let parsed: Vec<Visibility> =
            serde_json::from_str(r#"["PUBLIC", "PROTECTED", "PRIVATE", "SECRET"]"#).unwrap();
        assert_eq!(
            parsed,
            vec![
                Visibility::Public,
                Visibility::Protected,
                Visibility::Private,
                Visibility::Private
            ]
        );
        assert_eq!(
            serde_json::to_string(&Visibility::Protected).unwrap(),
            "\"PROTECTED\""
        );
    }

    #[test]
    fn row_status_parse_rejects_unknown_values() {
        assert_eq!(RowStatus::parse("ARCHIVED"), Some(RowStatus::Archived));
        assert_eq!(RowStatus::parse("archived"), None);
    }

    #[test]
    fn memo_new_sets_defaults_and_valid_uid() {
        let memo = Memo::new(7, "hello");

        assert!(is_valid_uid(&memo.uid));
        assert_eq!(memo.creator_id, 7);
        assert_eq!(memo.content, "hello");
        assert_eq!(memo.visibility, Visibility::Private);
        assert_eq!(memo.row_status, RowStatus::Normal);
        assert!(memo.tags.is_empty());
        assert!(!memo.pinned);
        assert!(!memo.is_comment());
    }
}
