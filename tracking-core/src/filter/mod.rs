//! State estimation.
//!
//! Two interchangeable estimators share the [`MotionFilter`] contract: a
//! linear Kalman filter over the constant-velocity model ([`kf::KalmanFilter`])
//! and an unscented Kalman filter for non-linear measurement functions
//! ([`ukf::UnscentedKalmanFilter`]). Both operate on the same 6-dimensional
//! state `[x, y, z, vx, vy, vz]`.

pub mod kf;
pub mod ukf;

pub use kf::KalmanFilter;
pub use ukf::UnscentedKalmanFilter;

use crate::error::FilterError;
use crate::geometry::Position3D;
use crate::track::TrackState;
use nalgebra::Matrix3;

/// Shared contract for the predict/update estimators used by the tracker.
pub trait MotionFilter {
    /// Advance the state by `dt` seconds under the constant-velocity model.
    /// A no-op when `dt <= 0`.
    fn predict(&mut self, dt: f64);

    /// Incorporate a position measurement, returning the squared
    /// Mahalanobis distance of the innovation for gating.
    fn update(&mut self, measurement: Position3D) -> Result<f64, FilterError>;

    /// Current mean as a track state.
    fn state(&self) -> TrackState;

    /// Trace of the position block of the covariance, a scalar summary used
    /// for confidence reporting.
    fn position_variance(&self) -> f64;

    fn velocity_variance(&self) -> f64;

    /// Predicted innovation covariance `S = H P H^T + R` at the current mean,
    /// without mutating state — the association subsystem's gating primitive.
    fn innovation_covariance(&self) -> Matrix3<f64>;

    /// Squared Mahalanobis distance of `measurement` against the current
    /// predicted state, used by association for chi-square gating.
    /// Returns `+inf` if the innovation covariance is singular.
    fn mahalanobis(&self, measurement: Position3D) -> f64 {
        let s = self.innovation_covariance();
        match s.try_inverse() {
            Some(s_inv) => {
                let pos = self.state().position.to_vector3();
                let y = measurement.to_vector3() - pos;
                (y.transpose() * s_inv * y)[(0, 0)]
            }
            None => f64::INFINITY,
        }
    }
}
