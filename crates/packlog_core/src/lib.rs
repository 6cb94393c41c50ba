//! Core building blocks for packlog's diff and merge engines.
//!
//! This crate holds everything the engines share and never mutate during a
//! run:
//!
//! - [`canonical`]: platform-independent asset identity keys
//! - [`checksums`]: the baseline-identity oracle and its persisted cache
//! - [`compress`]: the category-keyed zstd boundary
//! - [`handler`]: the pluggable Package/Merge format-handler contract
//! - [`baseline`]: the read-only reference dump
//!
//! All of these are constructed once at startup, then shared read-only across
//! parallel workers.

pub mod baseline;
pub mod canonical;
pub mod checksums;
pub mod compress;
pub mod error;
pub mod handler;

pub use baseline::BaselineSource;
pub use checksums::{content_hash, ChecksumIndex, ChecksumIndexBuilder};
pub use compress::{Category, ZstdBackend};
pub use error::{Error, Result};
pub use handler::{FormatHandler, HandlerError, HandlerRegistry, PriorityPair};
