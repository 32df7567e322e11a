//! Sync queue bookkeeping.
//!
//! This module tracks the files waiting to be synchronized and the files
//! currently being synchronized:
//! - FIFO ordering for dispatch
//! - In-flight tracking (started but not yet finished)
//! - A concurrency bound on the in-flight set
//! - De-duplication by file id across both sets
//!
//! Files flow through the queue in this order:
//! 1. `enqueue()` - add to the pending queue
//! 2. `next_ready()` - pop the oldest pending file, move its id in flight
//! 3. `finish()` - remove the id from the in-flight set
//!
//! `start()` moves a file straight into flight, bypassing the queue.
//!
//! The queue holds no locks and does no I/O; the engine wraps it in a
//! mutex and drives it.

use std::collections::{HashSet, VecDeque};

use sync_types::{FileId, SyncFile};
use thiserror::Error;

/// Error type for queue operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// The file is already in flight.
    #[error("file {0} is already in flight")]
    InFlight(FileId),

    /// The in-flight set is at capacity.
    #[error("in-flight set full (capacity: {capacity})")]
    Full {
        /// Maximum in-flight files.
        capacity: usize,
    },

    /// The file is neither pending nor in flight.
    #[error("file {0} is not queued")]
    NotQueued(FileId),
}

/// Result of adding a file to the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueued {
    /// Appended to the end of the pending queue.
    Added,
    /// Already pending; the queue is unchanged.
    AlreadyPending,
    /// Already in flight; the queue is unchanged.
    AlreadyInFlight,
}

impl Enqueued {
    /// Whether the file was appended.
    pub fn is_added(self) -> bool {
        matches!(self, Self::Added)
    }
}

/// Pending files plus the in-flight id set.
///
/// A file id is in at most one of the two sets at any time, and the
/// in-flight set never grows past `max_in_flight`.
#[derive(Debug)]
pub struct SyncQueue {
    max_in_flight: usize,
    pending: VecDeque<SyncFile>,
    in_flight: HashSet<FileId>,
}

impl SyncQueue {
    /// Create a queue allowing `max_in_flight` concurrent files.
    ///
    /// A bound of zero is treated as one so the queue can always drain.
    pub fn new(max_in_flight: usize) -> Self {
        Self {
            max_in_flight: max_in_flight.max(1),
            pending: VecDeque::new(),
            in_flight: HashSet::new(),
        }
    }

    /// Append a file unless its id is already pending or in flight.
    pub fn enqueue(&mut self, file: SyncFile) -> Enqueued {
        if self.in_flight.contains(&file.id) {
            return Enqueued::AlreadyInFlight;
        }
        if self.is_pending(&file.id) {
            return Enqueued::AlreadyPending;
        }
        self.pending.push_back(file);
        Enqueued::Added
    }

    /// Enqueue each file in order. Returns how many were appended.
    pub fn enqueue_all<I>(&mut self, files: I) -> usize
    where
        I: IntoIterator<Item = SyncFile>,
    {
        files
            .into_iter()
            .filter(|file| self.enqueue(file.clone()).is_added())
            .count()
    }

    /// Pop the oldest pending file if there is in-flight capacity.
    ///
    /// The file's id is moved to the in-flight set.
    pub fn next_ready(&mut self) -> Option<SyncFile> {
        if !self.has_capacity() {
            return None;
        }
        let file = self.pending.pop_front()?;
        self.in_flight.insert(file.id);
        Some(file)
    }

    /// Move a file straight into flight.
    ///
    /// A pending entry for the same id is removed so the id stays in one
    /// set only.
    pub fn start(&mut self, id: FileId) -> Result<(), QueueError> {
        if self.in_flight.contains(&id) {
            return Err(QueueError::InFlight(id));
        }
        if !self.has_capacity() {
            return Err(QueueError::Full {
                capacity: self.max_in_flight,
            });
        }
        self.pending.retain(|file| file.id != id);
        self.in_flight.insert(id);
        Ok(())
    }

    /// Remove a finished file from the in-flight set.
    ///
    /// Returns false if the id was not in flight.
    pub fn finish(&mut self, id: &FileId) -> bool {
        self.in_flight.remove(id)
    }

    /// Remove a pending file.
    ///
    /// In-flight files cannot be cancelled.
    pub fn cancel(&mut self, id: &FileId) -> Result<SyncFile, QueueError> {
        if self.in_flight.contains(id) {
            return Err(QueueError::InFlight(*id));
        }
        let index = self
            .pending
            .iter()
            .position(|file| file.id == *id)
            .ok_or(QueueError::NotQueued(*id))?;
        self.pending
            .remove(index)
            .ok_or(QueueError::NotQueued(*id))
    }

    /// Check if a file is waiting in the pending queue.
    pub fn is_pending(&self, id: &FileId) -> bool {
        self.pending.iter().any(|file| file.id == *id)
    }

    /// Check if a file is being synchronized.
    pub fn is_in_flight(&self, id: &FileId) -> bool {
        self.in_flight.contains(id)
    }

    /// Check if a file is pending or in flight.
    pub fn contains(&self, id: &FileId) -> bool {
        self.is_in_flight(id) || self.is_pending(id)
    }

    /// Whether another file may start.
    pub fn has_capacity(&self) -> bool {
        self.in_flight.len() < self.max_in_flight
    }

    /// Number of pending files.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Number of in-flight files.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Maximum in-flight files.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    /// Pending file ids, oldest first.
    pub fn pending_ids(&self) -> Vec<FileId> {
        self.pending.iter().map(|file| file.id).collect()
    }
}

impl Default for SyncQueue {
    fn default() -> Self {
        Self::new(3)
    }
}
