//! Build timestamps.
//!
//! Settings stamps and file modification times share one scale so they can be
//! compared directly: nanoseconds since the Unix epoch.

use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Nanoseconds since the Unix epoch, or [`MISSING_TIMESTAMP`].
pub type Timestamp = i64;

/// Stamp of an output that does not exist or a setting that was never set.
pub const MISSING_TIMESTAMP: Timestamp = -1;

/// Current wall-clock time.
pub fn now_nanos() -> Timestamp {
  system_time_nanos(SystemTime::now()).unwrap_or(0)
}

/// Modification time of `path`, or `None` if it cannot be read.
pub fn modified_nanos(path: &Path) -> Option<Timestamp> {
  let modified = fs::metadata(path).ok()?.modified().ok()?;
  system_time_nanos(modified)
}

fn system_time_nanos(time: SystemTime) -> Option<Timestamp> {
  let since_epoch = time.duration_since(UNIX_EPOCH).ok()?;
  Timestamp::try_from(since_epoch.as_nanos()).ok()
}
