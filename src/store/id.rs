//! Snapshot ids.
//!
//! An id is the local creation time at whole-second precision
//! (`YYYYMMDDHHMMSS`). Two snapshots created in the same second get a
//! numeric suffix (`20240101120000_1`) so ids stay unique and still sort
//! by creation time.

use std::fmt;

use chrono::{Local, NaiveDateTime};
use serde::Serialize;

pub const ID_FORMAT: &str = "%Y%m%d%H%M%S";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SnapshotId(String);

impl SnapshotId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Creation time encoded in the id, if it follows the timestamp scheme.
    /// Ids read from a hand-edited index may not.
    pub fn created_at(&self) -> Option<NaiveDateTime> {
        let stamp = self.0.get(..14)?;
        NaiveDateTime::parse_from_str(stamp, ID_FORMAT).ok()
    }
}

impl From<String> for SnapshotId {
    fn from(s: String) -> Self {
        SnapshotId(s)
    }
}

impl From<&str> for SnapshotId {
    fn from(s: &str) -> Self {
        SnapshotId(s.to_string())
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

/// Wall clock in local time.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Always returns the same instant. Used to get predictable ids.
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Produce a fresh id from `clock`, suffixing `_1`, `_2`, ... while `taken` says the
/// candidate is already in use.
pub(crate) fn next_id(clock: &dyn Clock, taken: impl Fn(&str) -> bool) -> SnapshotId {
    let base = clock.now().format(ID_FORMAT).to_string();
    if !taken(&base) {
        return SnapshotId(base);
    }

    let mut n: u32 = 1;
    loop {
        let candidate = format!("{base}_{n}");
        if !taken(&candidate) {
            return SnapshotId(candidate);
        }
        n += 1;
    }
}
