//! Delay calculation for scheduled synchronization.
//!
//! Small, recently modified files go first:
//!
//! ```text
//! delay = max(MIN_DELAY, min(size_mib, SIZE_CAP) + min(age_hours, AGE_CAP))  seconds
//! ```
//!
//! Size is counted in whole MiB and age in whole hours since the last
//! modification. A modification time in the future counts as age zero.

use std::time::Duration;

use chrono::{DateTime, Utc};
use sync_types::SyncFile;

/// Lower bound on the delay, in seconds.
pub const MIN_DELAY_SECS: u64 = 5;

/// Cap on the size component, in seconds.
pub const SIZE_CAP_SECS: u64 = 60;

/// Cap on the age component, in seconds.
pub const AGE_CAP_SECS: u64 = 30;

const MIB: u64 = 1024 * 1024;

/// Delay before `file` is synchronized, evaluated at `now`.
pub fn sync_delay(file: &SyncFile, now: DateTime<Utc>) -> Duration {
    let size_component = (file.size / MIB).min(SIZE_CAP_SECS);
    let age_hours = u64::try_from((now - file.modified_at).num_hours()).unwrap_or(0);
    let age_component = age_hours.min(AGE_CAP_SECS);

    Duration::from_secs((size_component + age_component).max(MIN_DELAY_SECS))
}
