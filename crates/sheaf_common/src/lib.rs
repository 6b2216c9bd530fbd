//! Shared foundational types used across the sheaf stylesheet pipeline.
//!
//! This crate provides content hashing for fingerprints and artifact
//! validation, plus a small wall-clock helper for artifact timestamps.

#![warn(missing_docs)]

pub mod hash;
pub mod time;

pub use hash::{ContentHash, ContentHasher};
pub use time::unix_now;
