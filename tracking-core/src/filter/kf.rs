//! Linear Kalman filter over the 6-state constant-velocity model.
//!
//! Generalizes the radar engine's 4-state ARPA filter (`[lat, lon, dlat/dt,
//! dlon/dt]` with an `atan2`/range measurement Jacobian) to 3D Cartesian
//! state `[x, y, z, vx, vy, vz]` with a linear position-only measurement
//! model, which makes the observation Jacobian constant and the filter a
//! textbook linear KF instead of an EKF.

use super::MotionFilter;
use crate::error::FilterError;
use crate::geometry::Position3D;
use crate::track::TrackState;
use nalgebra::{Matrix3, Matrix3x6, Matrix6, Matrix6x3, Vector3, Vector6};

type State = Vector6<f64>;
type Cov = Matrix6<f64>;

/// A single track's Kalman filter state and noise model.
#[derive(Debug, Clone)]
pub struct KalmanFilter {
    /// `[x, y, z, vx, vy, vz]`
    x: State,
    /// State covariance.
    p: Cov,
    /// Process noise.
    q: Cov,
    /// Measurement noise (position only).
    r: Matrix3<f64>,
}

fn observation_matrix() -> Matrix3x6<f64> {
    let mut h = Matrix3x6::zeros();
    h[(0, 0)] = 1.0;
    h[(1, 1)] = 1.0;
    h[(2, 2)] = 1.0;
    h
}

impl KalmanFilter {
    /// `R = I*1.0`, `Q = diag(0.1..)`, `P = diag(10,10,10,4,4,4)` — tight
    /// position priors, looser velocity priors since the first detection
    /// carries no velocity information.
    pub fn new(position: Position3D, measurement_variance: f64) -> Self {
        let mut x = Vector6::zeros();
        x[0] = position.x;
        x[1] = position.y;
        x[2] = position.z;

        KalmanFilter {
            x,
            p: Cov::from_diagonal(&Vector6::new(10.0, 10.0, 10.0, 4.0, 4.0, 4.0)),
            q: Cov::from_diagonal(&Vector6::from_element(0.1)),
            r: Matrix3::identity() * measurement_variance,
        }
    }

    fn transition_matrix(dt: f64) -> Cov {
        let mut f = Cov::identity();
        f[(0, 3)] = dt;
        f[(1, 4)] = dt;
        f[(2, 5)] = dt;
        f
    }
}

impl MotionFilter for KalmanFilter {
    fn predict(&mut self, dt: f64) {
        if dt <= 0.0 {
            return;
        }
        let f = Self::transition_matrix(dt);
        self.x = f * self.x;
        self.p = f * self.p * f.transpose() + self.q;
    }

    fn update(&mut self, measurement: Position3D) -> Result<f64, FilterError> {
        let h = observation_matrix();
        let z = Vector3::new(measurement.x, measurement.y, measurement.z);
        let y = z - h * self.x;

        let s: Matrix3<f64> = h * self.p * h.transpose() + self.r;
        let s_inv = s
            .try_inverse()
            .ok_or(FilterError::SingularInnovation)?;

        let k: Matrix6x3<f64> = self.p * h.transpose() * s_inv;
        self.x += k * y;

        // Joseph form: numerically stabler than `P = (I - KH)P`, preserves
        // SPD under finite-precision arithmetic.
        let ikh = Cov::identity() - k * h;
        self.p = ikh * self.p * ikh.transpose() + k * self.r * k.transpose();

        if !is_symmetric(&self.p, 1e-6) {
            self.p = 0.5 * (self.p + self.p.transpose());
        }

        let mahalanobis_sq = (y.transpose() * s_inv * y)[(0, 0)];
        Ok(mahalanobis_sq)
    }

    fn state(&self) -> TrackState {
        TrackState {
            position: Position3D::new(self.x[0], self.x[1], self.x[2]),
            velocity: crate::geometry::Velocity3D::new(self.x[3], self.x[4], self.x[5]),
        }
    }

    fn position_variance(&self) -> f64 {
        (self.p[(0, 0)] + self.p[(1, 1)] + self.p[(2, 2)]) / 3.0
    }

    fn velocity_variance(&self) -> f64 {
        (self.p[(3, 3)] + self.p[(4, 4)] + self.p[(5, 5)]) / 3.0
    }

    fn innovation_covariance(&self) -> Matrix3<f64> {
        let h = observation_matrix();
        h * self.p * h.transpose() + self.r
    }
}

fn is_symmetric(m: &Cov, atol: f64) -> bool {
    for i in 0..6 {
        for j in 0..6 {
            if (m[(i, j)] - m[(j, i)]).abs() > atol {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn new_filter_starts_at_given_position_with_zero_velocity() {
        let kf = KalmanFilter::new(Position3D::new(1.0, 2.0, 3.0), 1.0);
        let s = kf.state();
        assert_eq!(s.position, Position3D::new(1.0, 2.0, 3.0));
        assert_eq!(s.velocity, crate::geometry::Velocity3D::zero());
    }

    #[test]
    fn predict_advances_position_by_velocity_times_dt() {
        let mut kf = KalmanFilter::new(Position3D::new(0.0, 0.0, 0.0), 1.0);
        kf.x[3] = 10.0; // vx
        kf.predict(1.0);
        assert_relative_eq!(kf.state().position.x, 10.0);
    }

    #[test]
    fn predict_is_noop_for_nonpositive_dt() {
        let mut kf = KalmanFilter::new(Position3D::new(5.0, 0.0, 0.0), 1.0);
        let before = kf.state();
        kf.predict(0.0);
        kf.predict(-1.0);
        assert_eq!(kf.state().position, before.position);
    }

    #[test]
    fn update_pulls_state_toward_measurement() {
        let mut kf = KalmanFilter::new(Position3D::new(0.0, 0.0, 0.0), 1.0);
        let maha = kf.update(Position3D::new(10.0, 0.0, 0.0)).unwrap();
        assert!(maha > 0.0);
        assert!(kf.state().position.x > 0.0 && kf.state().position.x < 10.0);
    }

    #[test]
    fn covariance_stays_symmetric_after_update() {
        let mut kf = KalmanFilter::new(Position3D::new(0.0, 0.0, 0.0), 1.0);
        kf.predict(0.1);
        kf.update(Position3D::new(1.0, 0.0, 0.0)).unwrap();
        assert!(is_symmetric(&kf.p, 1e-6));
    }
}
