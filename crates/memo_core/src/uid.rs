//! User-facing memo identifier rules.
//!
//! # Invariants
//! - A valid UID is 1..=32 ASCII alphanumerics or hyphens, starting and ending
//!   with an alphanumeric.

use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

static UID_MATCHER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9]([a-zA-Z0-9-]{0,30}[a-zA-Z0-9])?$").expect("valid uid regex")
});

/// Returns whether `candidate` is an acceptable memo UID.
pub fn is_valid_uid(candidate: &str) -> bool {
    UID_MATCHER.is_match(candidate)
}

/// Generates a fresh UID (32 lowercase hex characters).
pub fn generate_uid() -> String {
    Uuid::new_v4().simple().to_string()
}
