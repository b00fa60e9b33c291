//! Unscented Kalman filter over the 6-state constant-velocity model.
//!
//! Merwe scaled sigma points with a weighted unscented transform. Sigma
//! points are drawn from the Cholesky factor of the covariance rather than
//! the covariance itself — a square-root formulation that keeps the matrix
//! handed to `nalgebra`'s decomposition always symmetric-by-construction;
//! the covariance is re-symmetrized and re-factored after every update so a
//! single numerical hiccup cannot compound across frames.

use super::MotionFilter;
use crate::error::FilterError;
use crate::geometry::{Position3D, Velocity3D};
use crate::track::TrackState;
use nalgebra::{Matrix3, Matrix6, Vector3, Vector6};

const N: usize = 6;
const NUM_SIGMA: usize = 2 * N + 1;

/// Merwe scaled sigma point parameters.
#[derive(Debug, Clone, Copy)]
pub struct UkfParams {
    pub alpha: f64,
    pub beta: f64,
    pub kappa: f64,
}

impl Default for UkfParams {
    fn default() -> Self {
        UkfParams {
            alpha: 1e-3,
            beta: 2.0,
            kappa: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UnscentedKalmanFilter {
    x: Vector6<f64>,
    p: Matrix6<f64>,
    q: Matrix6<f64>,
    r: Matrix3<f64>,
    params: UkfParams,
    lambda: f64,
    wm: [f64; NUM_SIGMA],
    wc: [f64; NUM_SIGMA],
}

fn weights(params: UkfParams, lambda: f64) -> ([f64; NUM_SIGMA], [f64; NUM_SIGMA]) {
    let n = N as f64;
    let mut wm = [0.5 / (n + lambda); NUM_SIGMA];
    let mut wc = wm;
    wm[0] = lambda / (n + lambda);
    wc[0] = lambda / (n + lambda) + (1.0 - params.alpha * params.alpha + params.beta);
    (wm, wc)
}

impl UnscentedKalmanFilter {
    pub fn new(position: Position3D, measurement_variance: f64, params: UkfParams) -> Self {
        let n = N as f64;
        let lambda = params.alpha * params.alpha * (n + params.kappa) - n;
        let (wm, wc) = weights(params, lambda);

        let mut x = Vector6::zeros();
        x[0] = position.x;
        x[1] = position.y;
        x[2] = position.z;

        UnscentedKalmanFilter {
            x,
            p: Matrix6::from_diagonal(&Vector6::new(10.0, 10.0, 10.0, 4.0, 4.0, 4.0)),
            q: Matrix6::from_diagonal(&Vector6::from_element(0.1)),
            r: Matrix3::identity() * measurement_variance,
            params,
            lambda,
            wm,
            wc,
        }
    }

    /// `2n+1` sigma points from the current mean/covariance.
    fn sigma_points(&self) -> Option<[Vector6<f64>; NUM_SIGMA]> {
        let scale = (N as f64 + self.lambda).max(0.0);
        let chol = (self.p * scale).cholesky()?;
        let l = chol.l();

        let mut points = [Vector6::zeros(); NUM_SIGMA];
        points[0] = self.x;
        for i in 0..N {
            let col = l.column(i).into_owned();
            points[i + 1] = self.x + col;
            points[N + i + 1] = self.x - col;
        }
        Some(points)
    }

    fn propagate(point: Vector6<f64>, dt: f64) -> Vector6<f64> {
        let mut p = point;
        p[0] += p[3] * dt;
        p[1] += p[4] * dt;
        p[2] += p[5] * dt;
        p
    }

    fn measure(point: Vector6<f64>) -> Vector3<f64> {
        Vector3::new(point[0], point[1], point[2])
    }

    fn repair(&mut self) {
        self.p = 0.5 * (self.p + self.p.transpose());
        if self.p.cholesky().is_none() {
            // Nudge the diagonal until a valid square root exists again.
            self.p += Matrix6::identity() * 1e-6;
        }
    }
}

impl MotionFilter for UnscentedKalmanFilter {
    fn predict(&mut self, dt: f64) {
        if dt <= 0.0 {
            return;
        }
        let Some(sigmas) = self.sigma_points() else {
            self.repair();
            return;
        };
        let propagated: Vec<Vector6<f64>> = sigmas.iter().map(|s| Self::propagate(*s, dt)).collect();

        let mut mean = Vector6::zeros();
        for i in 0..NUM_SIGMA {
            mean += self.wm[i] * propagated[i];
        }

        let mut cov = Matrix6::zeros();
        for i in 0..NUM_SIGMA {
            let d = propagated[i] - mean;
            cov += self.wc[i] * (d * d.transpose());
        }
        cov += self.q;

        self.x = mean;
        self.p = cov;
        self.repair();
    }

    fn update(&mut self, measurement: Position3D) -> Result<f64, FilterError> {
        let sigmas = self.sigma_points().ok_or(FilterError::Degenerate)?;
        let z_sigmas: Vec<Vector3<f64>> = sigmas.iter().map(|s| Self::measure(*s)).collect();

        let mut z_mean = Vector3::zeros();
        for i in 0..NUM_SIGMA {
            z_mean += self.wm[i] * z_sigmas[i];
        }

        let mut s = Matrix3::zeros();
        let mut pxz = nalgebra::Matrix6x3::<f64>::zeros();
        for i in 0..NUM_SIGMA {
            let dz = z_sigmas[i] - z_mean;
            let dx = sigmas[i] - self.x;
            s += self.wc[i] * (dz * dz.transpose());
            pxz += self.wc[i] * (dx * dz.transpose());
        }
        s += self.r;

        let s_inv = s.try_inverse().ok_or(FilterError::SingularInnovation)?;
        let k = pxz * s_inv;

        let z = Vector3::new(measurement.x, measurement.y, measurement.z);
        let innovation = z - z_mean;
        self.x += k * innovation;
        self.p -= k * s * k.transpose();
        self.repair();

        let mahalanobis_sq = (innovation.transpose() * s_inv * innovation)[(0, 0)];
        Ok(mahalanobis_sq)
    }

    fn state(&self) -> TrackState {
        TrackState {
            position: Position3D::new(self.x[0], self.x[1], self.x[2]),
            velocity: Velocity3D::new(self.x[3], self.x[4], self.x[5]),
        }
    }

    fn position_variance(&self) -> f64 {
        (self.p[(0, 0)] + self.p[(1, 1)] + self.p[(2, 2)]) / 3.0
    }

    fn velocity_variance(&self) -> f64 {
        (self.p[(3, 3)] + self.p[(4, 4)] + self.p[(5, 5)]) / 3.0
    }

    /// Approximates `S` from the position block of `P` plus `R` rather than
    /// re-running the unscented transform, since the measurement function is
    /// still position-only here; exact for this crate's `h`, and avoids a
    /// second sigma-point pass just to answer a gating query.
    fn innovation_covariance(&self) -> Matrix3<f64> {
        let mut block = Matrix3::zeros();
        for i in 0..3 {
            for j in 0..3 {
                block[(i, j)] = self.p[(i, j)];
            }
        }
        block + self.r
    }
}
