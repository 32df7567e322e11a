//! # sync-types
//!
//! Data model shared by all cloudsync crates.
//!
//! - [`FileId`] - File identity
//! - [`SyncFile`], [`SyncStatus`] - File metadata and its sync lifecycle
//! - [`SyncResult`] - Outcome of one synchronize call
//! - [`StrategyKind`] - Strategy selection tag
//! - [`SyncError`], [`RepositoryError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod file;
mod ids;
mod kind;
mod result;

pub use error::{RepositoryError, SyncError};
pub use file::{SyncFile, SyncStatus};
pub use ids::FileId;
pub use kind::StrategyKind;
pub use result::SyncResult;
