//! Rolling per-track history kept by the coordinator.
//!
//! A capacity-bounded vector per track id, evicting the oldest entry on
//! overflow rather than growing without bound.

use std::collections::HashMap;
use tracking_core::{Track, TrackID};

/// Append-only, capacity-bounded snapshot history, one vector per track.
#[derive(Debug)]
pub struct HistoryStore {
    capacity: usize,
    snapshots: HashMap<TrackID, Vec<Track>>,
}

impl HistoryStore {
    pub fn new(capacity: usize) -> Self {
        HistoryStore {
            capacity,
            snapshots: HashMap::new(),
        }
    }

    /// Append the current snapshot of every active track.
    pub fn update(&mut self, active: &[Track]) {
        for track in active {
            let entries = self
                .snapshots
                .entry(track.id)
                .or_insert_with(|| Vec::with_capacity(self.capacity));
            if entries.len() >= self.capacity {
                entries.remove(0);
            }
            entries.push(track.clone());
        }
    }

    /// Drop histories whose id is absent from the current active set.
    pub fn prune(&mut self, active_ids: &[TrackID]) {
        let live: std::collections::HashSet<_> = active_ids.iter().copied().collect();
        self.snapshots.retain(|id, _| live.contains(id));
    }

    pub fn trail(&self, id: TrackID) -> &[Track] {
        self.snapshots.get(&id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tracking_core::{Confidence, Detection, Position3D, SensorID};

    fn track(id: u64) -> Track {
        let det = Detection::new(
            Utc::now(),
            Position3D::new(0.0, 0.0, 0.0),
            Confidence::new(0.9).unwrap(),
            SensorID::new("s0"),
        );
        Track::spawn(TrackID::from_raw(id), &det)
    }

    #[test]
    fn history_caps_at_capacity() {
        let mut store = HistoryStore::new(2);
        let t = track(0);
        store.update(&[t.clone()]);
        store.update(&[t.clone()]);
        store.update(&[t.clone()]);
        assert_eq!(store.trail(TrackID::from_raw(0)).len(), 2);
    }

    #[test]
    fn prune_drops_absent_ids() {
        let mut store = HistoryStore::new(4);
        store.update(&[track(0), track(1)]);
        store.prune(&[TrackID::from_raw(0)]);
        assert_eq!(store.len(), 1);
        assert!(store.trail(TrackID::from_raw(1)).is_empty());
    }
}
