//! Identifiers.
//!
//! `TrackID` is a monotonically increasing counter owned by the tracker, not
//! a UUID — identifiers are compared and sorted by callers (the
//! coordinator's deterministic tie-break among equal-urgency alerts) and
//! must never repeat.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A stable, monotonically-allocated track identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TrackID(u64);

impl TrackID {
    /// Only the tracker's id allocator should call this directly; exposed so
    /// tests and repositories can reconstruct an id from a stored value.
    pub fn from_raw(value: u64) -> Self {
        TrackID(value)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TrackID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "track-{}", self.0)
    }
}

/// Monotonic, thread-unsafe counter owned exclusively by one `Tracker`.
#[derive(Debug, Default)]
pub struct TrackIdAllocator {
    next: u64,
}

impl TrackIdAllocator {
    pub fn new() -> Self {
        TrackIdAllocator { next: 0 }
    }

    pub fn allocate(&mut self) -> TrackID {
        let id = TrackID(self.next);
        self.next += 1;
        id
    }
}

/// A sensor's stable name, e.g. `"radar-0"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SensorID(String);

impl SensorID {
    pub fn new(name: impl Into<String>) -> Self {
        SensorID(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SensorID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocator_is_monotonic_and_never_reuses() {
        let mut alloc = TrackIdAllocator::new();
        let a = alloc.allocate();
        let b = alloc.allocate();
        let c = alloc.allocate();
        assert!(a < b && b < c);
        assert_ne!(a, b);
    }

    #[test]
    fn sensor_id_display() {
        let s = SensorID::new("lidar-1");
        assert_eq!(s.to_string(), "lidar-1");
    }
}
