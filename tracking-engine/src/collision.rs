//! Pairwise collision prediction over the priority threat subset.
//!
//! Constant-velocity closest-approach in 3D: `t* = -(dp.dv)/|dv|^2` gives
//! the time of closest approach, `d_min = |dp + dv*t*|` the distance at
//! that time.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use tracking_core::{Track, TrackID};

/// A predicted closest approach between two tracks within `time_horizon`.
///
/// Holds ids, not live track references.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Collision {
    pub track1: TrackID,
    pub track2: TrackID,
    pub time_to_collision: f64,
    pub probability: f64,
}

pub trait CollisionPredictor: Send + Sync {
    fn predict(&self, tracks: &[&Track]) -> Vec<Collision>;
}

#[derive(Debug, Clone, Copy)]
pub struct ClosestApproachPredictor {
    pub collision_threshold_m: f64,
    pub time_horizon_s: f64,
}

impl ClosestApproachPredictor {
    pub fn new(collision_threshold_m: f64, time_horizon_s: f64) -> Self {
        ClosestApproachPredictor {
            collision_threshold_m,
            time_horizon_s,
        }
    }

    fn check_pair(&self, track1: &Track, track2: &Track) -> Option<Collision> {
        let p1 = Vector3::new(track1.state.position.x, track1.state.position.y, track1.state.position.z);
        let p2 = Vector3::new(track2.state.position.x, track2.state.position.y, track2.state.position.z);
        let v1 = Vector3::new(track1.state.velocity.vx, track1.state.velocity.vy, track1.state.velocity.vz);
        let v2 = Vector3::new(track2.state.velocity.vx, track2.state.velocity.vy, track2.state.velocity.vz);

        let rel_pos = p2 - p1;
        let rel_vel = v2 - v1;
        let rel_speed = rel_vel.norm();
        if rel_speed < 0.01 {
            return None;
        }

        let t_star = -(rel_pos.dot(&rel_vel)) / (rel_speed * rel_speed);
        if t_star < 0.0 || t_star > self.time_horizon_s {
            return None;
        }

        let closest = (rel_pos + rel_vel * t_star).norm();
        if closest < self.collision_threshold_m {
            Some(Collision {
                track1: track1.id,
                track2: track2.id,
                time_to_collision: t_star,
                probability: 1.0 - closest / self.collision_threshold_m,
            })
        } else {
            None
        }
    }
}

impl CollisionPredictor for ClosestApproachPredictor {
    fn predict(&self, tracks: &[&Track]) -> Vec<Collision> {
        let mut collisions = Vec::new();
        for i in 0..tracks.len() {
            for j in (i + 1)..tracks.len() {
                if let Some(c) = self.check_pair(tracks[i], tracks[j]) {
                    collisions.push(c);
                }
            }
        }
        collisions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tracking_core::{Confidence, Detection, Position3D, SensorID, Velocity3D};

    fn track_at(id: u64, x: f64, vx: f64) -> Track {
        let det = Detection::new(
            Utc::now(),
            Position3D::new(x, 0.0, 0.0),
            Confidence::new(0.9).unwrap(),
            SensorID::new("s0"),
        );
        let mut t = Track::spawn(TrackID::from_raw(id), &det);
        t.state.velocity = Velocity3D::new(vx, 0.0, 0.0);
        t
    }

    #[test]
    fn head_on_tracks_collide_within_horizon() {
        let predictor = ClosestApproachPredictor::new(10.0, 30.0);
        let a = track_at(0, -50.0, 10.0);
        let b = track_at(1, 50.0, -10.0);
        let collisions = predictor.predict(&[&a, &b]);
        assert_eq!(collisions.len(), 1);
        assert!((collisions[0].time_to_collision - 5.0).abs() < 0.5);
    }

    #[test]
    fn stationary_relative_velocity_never_collides() {
        let predictor = ClosestApproachPredictor::new(10.0, 30.0);
        let a = track_at(0, 0.0, 5.0);
        let b = track_at(1, 100.0, 5.0);
        assert!(predictor.predict(&[&a, &b]).is_empty());
    }

    #[test]
    fn diverging_tracks_do_not_collide() {
        let predictor = ClosestApproachPredictor::new(10.0, 30.0);
        let a = track_at(0, 0.0, -10.0);
        let b = track_at(1, 10.0, 10.0);
        assert!(predictor.predict(&[&a, &b]).is_empty());
    }
}
