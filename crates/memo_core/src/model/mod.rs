//! Memo domain model and request descriptors.
//!
//! # Responsibility
//! - Define the canonical `Memo` record returned by reads.
//! - Define transient query/command descriptors scoped to a single call.
//!
//! # Invariants
//! - Every persisted memo is identified by a driver-assigned `MemoId` and a
//!   user-facing UID; both are globally unique.
//! - Descriptor fields are explicit `Option`s so "not specified" never collides
//!   with a zero value.

pub mod memo;
pub mod query;
