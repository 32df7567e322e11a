//! # sync-core
//!
//! Pure logic for cloudsync (no I/O, instant tests).
//!
//! This crate implements the algorithms behind synchronization without
//! any network or disk I/O, enabling fast unit tests.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects:
//! - [`delta`] - Binary delta packets with base-hash verification
//! - [`queue`] - Pending queue and in-flight bookkeeping under a concurrency bound
//! - [`schedule`] - Delay before a scheduled sync
//! - [`conflict`] - Conflict detection, resolution rules and copy naming
//! - [`filter`] - Selection predicate for selective sync
//!
//! The actual I/O (repositories, timers, tasks) is performed by
//! `sync-engine`, which drives these building blocks.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod conflict;
pub mod delta;
pub mod filter;
pub mod queue;
pub mod schedule;

pub use conflict::{conflict_copy_name, detect_conflict, last_write_wins, prefer_richer_metadata};
pub use delta::{content_hash, DeltaCodec, DeltaFormatError, DeltaOp, DeltaPacket};
pub use filter::FileFilter;
pub use queue::{Enqueued, QueueError, SyncQueue};
pub use schedule::sync_delay;
