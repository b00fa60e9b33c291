//! Track entities and lifecycle.

use crate::detection::Detection;
use crate::geometry::{Confidence, Covariance, Position3D, Velocity3D};
use crate::ids::TrackID;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Track lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackStatus {
    Tentative,
    Active,
    Lost,
    Deleted,
}

/// Ordinal threat severity; `Ord` makes `level >= threshold` read naturally
/// for the coordinator's priority filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatLevel {
    Low = 0,
    Medium = 1,
    High = 2,
    Critical = 3,
}

impl ThreatLevel {
    /// Number of variants, used by the coordinator's urgency formula.
    pub const COUNT: u8 = 4;

    pub fn ordinal(&self) -> u8 {
        *self as u8
    }
}

/// The filter's position/velocity estimate at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackState {
    pub position: Position3D,
    pub velocity: Velocity3D,
}

/// A persistent object hypothesis.
///
/// Filter scratch state (the Kalman mean/covariance) is intentionally *not*
/// stored here — it lives in the tracker's own `TrackID -> FilterState` map,
/// keeping this entity a plain snapshot that's cheap to clone into a
/// `TrackingResult`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackID,
    pub state: TrackState,
    pub status: TrackStatus,
    pub confidence: Confidence,
    pub threat_level: ThreatLevel,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub hits: u32,
    pub missed: u32,
    /// Last known `(w, h)` extent from a detection that carried one; carried
    /// forward across misses so a predicted bounding box (centered on
    /// `state.position`) stays available to the association cost kernel.
    pub bbox_extent: Option<(f64, f64)>,
}

/// `bbox_w`/`bbox_h` keyed floats from `Detection::attributes`, the same
/// channel-adapter convention the tracker's detection-side IoU input uses.
fn bbox_extent(detection: &Detection) -> Option<(f64, f64)> {
    let w = *detection.attributes.get("bbox_w")?;
    let h = *detection.attributes.get("bbox_h")?;
    Some((w, h))
}

impl Track {
    /// Spawn a new TENTATIVE track from an unmatched detection.
    pub fn spawn(id: TrackID, detection: &Detection) -> Self {
        let now = detection.timestamp;
        Track {
            id,
            state: TrackState {
                position: detection.position,
                velocity: detection.velocity.unwrap_or_else(Velocity3D::zero),
            },
            status: TrackStatus::Tentative,
            confidence: detection.confidence,
            threat_level: ThreatLevel::Low,
            created_at: now,
            updated_at: now,
            hits: 1,
            missed: 0,
            bbox_extent: bbox_extent(detection),
        }
    }

    /// Apply a matched detection: adopt the filter's post-update state
    /// (position and velocity), confidence EMA (alpha = 0.5), hit/miss
    /// reset, threat reassessment, and TENTATIVE -> ACTIVE promotion.
    pub fn apply_update(&mut self, detection: &Detection, state: TrackState, min_hits: u32) {
        self.state = state;
        if let Some(extent) = bbox_extent(detection) {
            self.bbox_extent = Some(extent);
        }

        let score = detection.confidence.value();
        let blended = 0.5 * self.confidence.value() + 0.5 * score;
        self.confidence = Confidence::clamped(blended);

        self.missed = 0;
        self.hits += 1;
        self.updated_at = detection.timestamp;
        self.threat_level = self.assess_threat();

        if self.status == TrackStatus::Tentative && self.hits >= min_hits {
            self.status = TrackStatus::Active;
        }
    }

    /// Apply a filter-only prediction (no matched detection this frame).
    pub fn apply_predicted_state(&mut self, state: TrackState) {
        self.state = state;
    }

    /// Record a frame in which no detection matched this track.
    ///
    /// ACTIVE demotes to LOST unconditionally on the very first miss, with no
    /// grace period.
    pub fn mark_missed(&mut self) {
        self.missed += 1;
        if self.missed > 0 && self.status == TrackStatus::Active {
            self.status = TrackStatus::Lost;
        }
    }

    pub fn time_since_update(&self) -> u32 {
        self.missed
    }

    /// Should this track be pruned this frame? Either condition is
    /// independently sufficient.
    pub fn should_prune(&self, now: DateTime<Utc>, max_age: u32, staleness_ttl_s: f64) -> bool {
        let stale_secs = (now - self.updated_at).num_milliseconds() as f64 / 1000.0;
        self.missed > max_age || stale_secs > staleness_ttl_s
    }

    /// Speed-based threat assessment; the coordinator's `ThreatAnalyzer`
    /// combines this with a confidence-band assessment.
    pub fn assess_threat(&self) -> ThreatLevel {
        let speed = self.state.velocity.magnitude();
        if speed > 50.0 {
            ThreatLevel::Critical
        } else if speed > 30.0 {
            ThreatLevel::High
        } else if speed > 10.0 {
            ThreatLevel::Medium
        } else {
            ThreatLevel::Low
        }
    }
}

/// Per-frame snapshot returned by `Tracker::update`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingResult {
    pub active_tracks: Vec<Track>,
    pub new_tracks: Vec<Track>,
    pub deleted_tracks: Vec<TrackID>,
    pub processing_time_ms: f64,
}

impl TrackingResult {
    /// ISO-8601/`Z`-suffixed JSON encoding of the frame snapshot — `chrono`'s
    /// `Serialize` impl for `DateTime<Utc>` already produces that format.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }
}

impl Track {
    /// Compact binary encoding for repository hand-off; the repository
    /// implementation itself is an external collaborator, but this crate
    /// owns the wire shape.
    pub fn to_bincode(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    pub fn from_bincode(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SensorID;

    fn det_at(x: f64, ts: DateTime<Utc>) -> Detection {
        Detection::new(
            ts,
            Position3D::new(x, 0.0, 0.0),
            Confidence::new(0.9).unwrap(),
            SensorID::new("s0"),
        )
    }

    #[test]
    fn bincode_round_trips_a_track() {
        let t = Track::spawn(TrackID::from_raw(0), &det_at(1.0, Utc::now()));
        let bytes = t.to_bincode().unwrap();
        let back = Track::from_bincode(&bytes).unwrap();
        assert_eq!(back.id, t.id);
        assert_eq!(back.state.position, t.state.position);
    }

    #[test]
    fn tracking_result_json_round_trips() {
        let result = TrackingResult {
            active_tracks: vec![Track::spawn(TrackID::from_raw(0), &det_at(0.0, Utc::now()))],
            new_tracks: Vec::new(),
            deleted_tracks: Vec::new(),
            processing_time_ms: 1.5,
        };
        let json = result.to_json().unwrap();
        let back = TrackingResult::from_json(&json).unwrap();
        assert_eq!(back.active_tracks.len(), 1);
    }

    #[test]
    fn spawn_is_tentative_with_one_hit() {
        let now = Utc::now();
        let t = Track::spawn(TrackID::from_raw(0), &det_at(0.0, now));
        assert_eq!(t.status, TrackStatus::Tentative);
        assert_eq!(t.hits, 1);
        assert_eq!(t.missed, 0);
    }

    #[test]
    fn promotion_after_min_hits() {
        let t0 = Utc::now();
        let mut t = Track::spawn(TrackID::from_raw(0), &det_at(0.0, t0));
        for i in 1..3 {
            let ts = t0 + chrono::Duration::milliseconds(100 * i);
            let d = det_at(i as f64, ts);
            let state = TrackState { position: d.position, velocity: Velocity3D::zero() };
            t.apply_update(&d, state, 3);
        }
        assert_eq!(t.status, TrackStatus::Active);
        assert_eq!(t.hits, 3);
    }

    #[test]
    fn first_miss_demotes_active_to_lost_immediately() {
        let t0 = Utc::now();
        let mut t = Track::spawn(TrackID::from_raw(0), &det_at(0.0, t0));
        t.status = TrackStatus::Active;
        t.mark_missed();
        assert_eq!(t.status, TrackStatus::Lost);
    }

    #[test]
    fn prune_triggers_on_either_condition() {
        let t0 = Utc::now();
        let mut t = Track::spawn(TrackID::from_raw(0), &det_at(0.0, t0));
        t.missed = 31;
        assert!(t.should_prune(t0, 30, 5.0));

        let mut t2 = Track::spawn(TrackID::from_raw(1), &det_at(0.0, t0));
        t2.missed = 0;
        let later = t0 + chrono::Duration::seconds(6);
        assert!(t2.should_prune(later, 30, 5.0));
    }

    #[test]
    fn assess_threat_thresholds() {
        let t0 = Utc::now();
        let mut t = Track::spawn(TrackID::from_raw(0), &det_at(0.0, t0));
        t.state.velocity = Velocity3D::new(60.0, 0.0, 0.0);
        assert_eq!(t.assess_threat(), ThreatLevel::Critical);
        t.state.velocity = Velocity3D::new(5.0, 0.0, 0.0);
        assert_eq!(t.assess_threat(), ThreatLevel::Low);
    }
}
