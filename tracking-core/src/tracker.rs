//! The per-frame tracking kernel.
//!
//! One owning struct drives predict -> associate via a gated Hungarian/greedy
//! match -> update matched -> spawn unmatched detections -> miss unmatched
//! tracks -> delete stale tracks, holding a `HashMap<TrackID, Track>` of
//! domain entities plus a parallel `HashMap<TrackID, Box<dyn MotionFilter>>`
//! of numerical scratch state kept outside the track entity itself.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};

use crate::assoc::{self, AssocCandidate, BBox};
use crate::config::{FilterKind, TrackerConfig};
use crate::detection::{Detection, SensorCharacteristics};
use crate::error::TrackerError;
use crate::filter::{kf::KalmanFilter, ukf::UnscentedKalmanFilter, MotionFilter};
use crate::fusion;
use crate::ids::{SensorID, TrackID, TrackIdAllocator};
use crate::metrics::Metrics;
use crate::track::{Track, TrackState, TrackStatus, TrackingResult};

/// Drives association, fusion, filtering and lifecycle management for the
/// full set of live tracks. Owns the tracks and their filter state
/// exclusively; callers only see snapshots via [`TrackingResult`].
pub struct Tracker {
    config: TrackerConfig,
    tracks: HashMap<TrackID, Track>,
    filters: HashMap<TrackID, Box<dyn MotionFilter>>,
    id_alloc: TrackIdAllocator,
    sensor_characteristics: HashMap<SensorID, SensorCharacteristics>,
    metrics: Arc<Metrics>,
}

impl Tracker {
    pub fn new(config: TrackerConfig) -> Self {
        Tracker::with_metrics(config, Arc::new(Metrics::new()))
    }

    pub fn with_metrics(config: TrackerConfig, metrics: Arc<Metrics>) -> Self {
        Tracker {
            config,
            tracks: HashMap::new(),
            filters: HashMap::new(),
            id_alloc: TrackIdAllocator::new(),
            sensor_characteristics: HashMap::new(),
            metrics,
        }
    }

    /// Install the `SensorID -> SensorCharacteristics` lookup the fusion
    /// subsystem and filter initialization use.
    pub fn set_sensor_characteristics(
        &mut self,
        characteristics: HashMap<SensorID, SensorCharacteristics>,
    ) {
        self.sensor_characteristics = characteristics;
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Current live tracks (tentative, active, or lost; never deleted — a
    /// deleted track is removed from the store in the same frame it prunes).
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    fn measurement_variance_for(&self, sensor_id: Option<&SensorID>) -> f64 {
        sensor_id
            .and_then(|id| self.sensor_characteristics.get(id))
            .map(|c| {
                let m = c.measurement_covariance.inner();
                (m[(0, 0)] + m[(1, 1)] + m[(2, 2)]) / 3.0
            })
            .unwrap_or(self.config.default_measurement_variance)
    }

    fn new_filter(&self, detection: &Detection) -> Box<dyn MotionFilter> {
        let variance = self.measurement_variance_for(detection.sensor_id.as_ref());
        match self.config.filter {
            FilterKind::Linear => Box::new(KalmanFilter::new(detection.position, variance)),
            FilterKind::Unscented => Box::new(UnscentedKalmanFilter::new(
                detection.position,
                variance,
                Default::default(),
            )),
        }
    }

    /// Run one frame: predict -> fuse -> associate -> update/spawn/miss ->
    /// prune -> promote -> emit.
    pub fn update(
        &mut self,
        detections: &[Detection],
        frame_ts: DateTime<Utc>,
    ) -> Result<TrackingResult, TrackerError> {
        let started = Instant::now();

        // Step 1: predict every live track forward to `frame_ts`.
        let mut track_ids: Vec<TrackID> = self.tracks.keys().copied().collect();
        track_ids.sort_unstable();
        for &id in &track_ids {
            let track = self.tracks.get(&id).expect("tracked id must exist");
            let dt_raw = (frame_ts - track.updated_at).num_milliseconds() as f64 / 1000.0;
            let dt = dt_raw.min(self.config.max_predict_horizon_s).max(0.0);

            if let Some(filter) = self.filters.get_mut(&id) {
                filter.predict(dt);
                let state = filter.state();
                let track = self.tracks.get_mut(&id).expect("tracked id must exist");
                track.apply_predicted_state(state);
                if dt_raw > self.config.max_predict_horizon_s {
                    // Edge case: dt beyond the horizon was clamped; flag
                    // low confidence rather than trusting the stale state.
                    track.confidence = crate::geometry::Confidence::clamped(
                        track.confidence.value() * 0.5,
                    );
                }
            }
        }

        // Step 2: fuse same-frame multi-sensor detections.
        let fused = fusion::fuse_detections(
            detections,
            &self.config.fusion,
            &self.sensor_characteristics,
        );

        // Step 3: associate predicted tracks against fused detections.
        let outcome = self.associate(&track_ids, &fused)?;

        // Step 4: update matched tracks with their assigned detection.
        for &(track_idx, det_idx) in &outcome.matched {
            let id = track_ids[track_idx];
            let detection = &fused[det_idx];
            let Some(filter) = self.filters.get_mut(&id) else {
                continue;
            };
            match filter.update(detection.position) {
                Ok(_mahalanobis_sq) => {
                    let state = filter.state();
                    let track = self.tracks.get_mut(&id).expect("tracked id must exist");
                    track.apply_update(detection, state, self.config.min_hits);
                }
                Err(_err) => {
                    // Filter errors are locally recovered: the track
                    // drops to LOST and the frame continues.
                    self.metrics.incr_tracker_filter_degenerate();
                    if let Some(track) = self.tracks.get_mut(&id) {
                        track.status = TrackStatus::Lost;
                    }
                }
            }
        }

        // Step 5: spawn new tracks from unmatched detections.
        let mut new_tracks = Vec::with_capacity(outcome.unmatched_detections.len());
        for &det_idx in &outcome.unmatched_detections {
            let detection = &fused[det_idx];
            let id = self.id_alloc.allocate();
            let track = Track::spawn(id, detection);
            let filter = self.new_filter(detection);
            self.tracks.insert(id, track.clone());
            self.filters.insert(id, filter);
            new_tracks.push(track);
        }

        // Step 6: mark unmatched tracks missed.
        for &track_idx in &outcome.unmatched_tracks {
            let id = track_ids[track_idx];
            if let Some(track) = self.tracks.get_mut(&id) {
                track.mark_missed();
            }
        }

        // Step 7: prune tracks past max_age or staleness_ttl.
        let to_delete: Vec<TrackID> = self
            .tracks
            .values()
            .filter(|t| t.should_prune(frame_ts, self.config.max_age, self.config.staleness_ttl_s))
            .map(|t| t.id)
            .collect();
        for id in &to_delete {
            self.tracks.remove(id);
            self.filters.remove(id);
        }

        // Step 8 (promotion) happens inline inside `Track::apply_update`.

        // Step 9: emit the frame snapshot.
        let mut active_tracks: Vec<Track> = self.tracks.values().cloned().collect();
        active_tracks.sort_by_key(|t| t.id);

        Ok(TrackingResult {
            active_tracks,
            new_tracks,
            deleted_tracks: to_delete,
            processing_time_ms: started.elapsed().as_secs_f64() * 1000.0,
        })
    }

    fn associate(
        &mut self,
        track_ids: &[TrackID],
        detections: &[Detection],
    ) -> Result<assoc::AssocOutcome, TrackerError> {
        let track_candidates: Vec<AssocCandidate> = track_ids
            .iter()
            .map(|id| {
                let track = &self.tracks[id];
                let innovation_cov = self.filters.get(id).map(|f| f.innovation_covariance());
                let bbox = track.bbox_extent.map(|(w, h)| BBox {
                    cx: track.state.position.x,
                    cy: track.state.position.y,
                    w,
                    h,
                });
                AssocCandidate {
                    position: track.state.position,
                    bbox,
                    confidence: track.confidence.value(),
                    innovation_cov,
                }
            })
            .collect();

        let det_candidates: Vec<AssocCandidate> = detections
            .iter()
            .map(|d| AssocCandidate {
                position: d.position,
                bbox: detection_bbox(d),
                confidence: d.confidence.value(),
                innovation_cov: None,
            })
            .collect();

        let use_hybrid = det_candidates.iter().any(|c| c.bbox.is_some());
        let cost = if use_hybrid {
            assoc::build_hybrid_cost_matrix(
                &track_candidates,
                &det_candidates,
                &self.config.association.weights,
                self.config.association.chi_square_gate,
                self.config.association.max_cost,
            )
        } else {
            assoc::build_euclidean_cost_matrix(
                &track_candidates,
                &det_candidates,
                self.config.max_distance,
            )
        };

        let outcome = assoc::solve(&cost, &self.config.association).unwrap_or_else(|_err| {
            self.metrics.incr_assoc_infeasible();
            assoc::AssocOutcome {
                matched: Vec::new(),
                unmatched_tracks: (0..track_ids.len()).collect(),
                unmatched_detections: (0..detections.len()).collect(),
            }
        });
        Ok(outcome)
    }
}

/// Bounding box extent carried in `Detection::attributes` as `bbox_w`/
/// `bbox_h` keyed floats, center taken from `position.x`/`.y` — the optional
/// channel adapters use to opt a detection into the IoU cost kernel.
fn detection_bbox(detection: &Detection) -> Option<BBox> {
    let w = *detection.attributes.get("bbox_w")?;
    let h = *detection.attributes.get("bbox_h")?;
    Some(BBox {
        cx: detection.position.x,
        cy: detection.position.y,
        w,
        h,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Confidence, Position3D};
    use chrono::Duration;

    fn det(x: f64, sensor: &str, ts: DateTime<Utc>) -> Detection {
        Detection::new(
            ts,
            Position3D::new(x, 0.0, 0.0),
            Confidence::new(0.95).unwrap(),
            SensorID::new(sensor),
        )
    }

    #[test]
    fn single_target_constant_velocity_promotes_and_tracks_speed() {
        let mut tracker = Tracker::new(TrackerConfig::default());
        let t0 = Utc::now();
        for i in 0..10 {
            let ts = t0 + Duration::milliseconds(100 * i);
            let d = det(i as f64, "radar-0", ts);
            let result = tracker.update(&[d], ts).unwrap();
            if i == 9 {
                assert_eq!(result.active_tracks.len(), 1);
                let track = &result.active_tracks[0];
                assert_eq!(track.status, TrackStatus::Active);
                assert!((track.state.velocity.vx - 10.0).abs() < 1.0);
                assert_eq!(track.missed, 0);
            }
        }
    }

    #[test]
    fn gating_beyond_max_distance_spawns_instead_of_matching() {
        let mut tracker = Tracker::new(TrackerConfig::default());
        let t0 = Utc::now();
        tracker.update(&[det(0.0, "radar-0", t0)], t0).unwrap();

        let t1 = t0 + Duration::milliseconds(100);
        let far = det(100.0, "radar-0", t1);
        let result = tracker.update(&[far], t1).unwrap();

        assert_eq!(result.new_tracks.len(), 1);
        let original = result
            .active_tracks
            .iter()
            .find(|t| t.id == TrackID::from_raw(0))
            .unwrap();
        assert_eq!(original.missed, 1);
    }

    #[test]
    fn empty_detections_only_increments_miss_counters() {
        let mut tracker = Tracker::new(TrackerConfig::default());
        let t0 = Utc::now();
        tracker.update(&[det(0.0, "radar-0", t0)], t0).unwrap();

        let t1 = t0 + Duration::milliseconds(100);
        let result = tracker.update(&[], t1).unwrap();
        assert!(result.new_tracks.is_empty());
        assert_eq!(result.active_tracks[0].missed, 1);
    }

    #[test]
    fn staleness_ttl_prunes_independent_of_max_age() {
        let mut config = TrackerConfig::default();
        config.staleness_ttl_s = 5.0;
        config.max_age = 30;
        let mut tracker = Tracker::new(config);
        let t0 = Utc::now();
        tracker.update(&[det(0.0, "radar-0", t0)], t0).unwrap();

        let t3 = t0 + Duration::seconds(3);
        let r3 = tracker.update(&[], t3).unwrap();
        assert_eq!(r3.active_tracks.len(), 1);

        let t6 = t0 + Duration::seconds(6);
        let r6 = tracker.update(&[], t6).unwrap();
        assert!(r6.active_tracks.is_empty());
        assert_eq!(r6.deleted_tracks.len(), 1);
    }

    #[test]
    fn max_age_zero_deletes_on_first_miss_next_frame() {
        let mut config = TrackerConfig::default();
        config.max_age = 0;
        config.staleness_ttl_s = 1000.0;
        let mut tracker = Tracker::new(config);
        let t0 = Utc::now();
        tracker.update(&[det(0.0, "radar-0", t0)], t0).unwrap();

        let t1 = t0 + Duration::milliseconds(100);
        let r1 = tracker.update(&[], t1).unwrap();
        assert!(r1.active_tracks.is_empty());
        assert_eq!(r1.deleted_tracks.len(), 1);
    }

    #[test]
    fn track_ids_never_reused_after_deletion() {
        let mut config = TrackerConfig::default();
        config.max_age = 0;
        let mut tracker = Tracker::new(config);
        let t0 = Utc::now();
        let r0 = tracker.update(&[det(0.0, "radar-0", t0)], t0).unwrap();
        let first_id = r0.new_tracks[0].id;

        let t1 = t0 + Duration::milliseconds(100);
        tracker.update(&[], t1).unwrap(); // prunes the first track

        let t2 = t0 + Duration::milliseconds(200);
        let r2 = tracker.update(&[det(0.0, "radar-0", t2)], t2).unwrap();
        assert!(r2.new_tracks[0].id > first_id);
    }

    #[test]
    fn order_invariance_of_detections_within_a_frame() {
        let t0 = Utc::now();
        let a = det(0.0, "radar-0", t0);
        let b = det(50.0, "radar-1", t0);

        let mut forward = Tracker::new(TrackerConfig::default());
        let r_fwd = forward.update(&[a.clone(), b.clone()], t0).unwrap();

        let mut backward = Tracker::new(TrackerConfig::default());
        let r_bwd = backward.update(&[b, a], t0).unwrap();

        assert_eq!(r_fwd.new_tracks.len(), r_bwd.new_tracks.len());
        assert_eq!(r_fwd.active_tracks.len(), r_bwd.active_tracks.len());
    }
}
