//! Geometric and statistical value types shared across the tracking kernel.
//!
//! All types here are small, `Copy` where practical, and immutable — callers
//! build a new value rather than mutate one in place.

use nalgebra::{Matrix6, SMatrix};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A position in meters, in whatever frame the caller's sensors share.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position3D {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        debug_assert!(x.is_finite() && y.is_finite() && z.is_finite());
        Position3D { x, y, z }
    }

    pub fn to_vector3(self) -> nalgebra::Vector3<f64> {
        nalgebra::Vector3::new(self.x, self.y, self.z)
    }

    pub fn from_vector3(v: nalgebra::Vector3<f64>) -> Self {
        Position3D::new(v.x, v.y, v.z)
    }

    pub fn distance_to(&self, other: &Position3D) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// A velocity in meters/second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Velocity3D {
    pub vx: f64,
    pub vy: f64,
    pub vz: f64,
}

impl Velocity3D {
    pub fn new(vx: f64, vy: f64, vz: f64) -> Self {
        debug_assert!(vx.is_finite() && vy.is_finite() && vz.is_finite());
        Velocity3D { vx, vy, vz }
    }

    pub fn zero() -> Self {
        Velocity3D::new(0.0, 0.0, 0.0)
    }

    pub fn to_vector3(self) -> nalgebra::Vector3<f64> {
        nalgebra::Vector3::new(self.vx, self.vy, self.vz)
    }

    pub fn from_vector3(v: nalgebra::Vector3<f64>) -> Self {
        Velocity3D::new(v.x, v.y, v.z)
    }

    /// Speed in meters/second.
    pub fn magnitude(&self) -> f64 {
        (self.vx * self.vx + self.vy * self.vy + self.vz * self.vz).sqrt()
    }
}

/// A per-observation confidence in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Confidence(f64);

impl Confidence {
    /// Returns `None` if `value` is outside `[0, 1]` or not finite.
    pub fn new(value: f64) -> Option<Self> {
        if value.is_finite() && (0.0..=1.0).contains(&value) {
            Some(Confidence(value))
        } else {
            None
        }
    }

    /// Clamps `value` into `[0, 1]`, mapping NaN to 0.0.
    pub fn clamped(value: f64) -> Self {
        let v = if value.is_finite() { value.clamp(0.0, 1.0) } else { 0.0 };
        Confidence(v)
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl Default for Confidence {
    fn default() -> Self {
        Confidence(1.0)
    }
}

/// 6x6 state covariance for the constant-velocity filter: `[x,y,z,vx,vy,vz]`.
///
/// Wraps a `nalgebra::Matrix6<f64>` and enforces the symmetric
/// positive-semidefinite invariant at the boundaries where it matters —
/// construction from a diagonal and the `is_spd` check used by tests and by
/// the filter's repair path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Covariance(pub Matrix6<f64>);

impl Covariance {
    pub fn from_diagonal(diag: [f64; 6]) -> Self {
        Covariance(Matrix6::from_diagonal(&SMatrix::<f64, 6, 1>::from(diag)))
    }

    pub fn inner(&self) -> &Matrix6<f64> {
        &self.0
    }

    /// Symmetric within `atol`, and positive-semidefinite within `atol`
    /// (checked via the Cholesky of a small positive shift, since computing
    /// full eigenvalues for a 6x6 every frame would be wasteful).
    pub fn is_spd(&self, atol: f64) -> bool {
        let m = &self.0;
        for i in 0..6 {
            for j in 0..6 {
                if (m[(i, j)] - m[(j, i)]).abs() > atol {
                    return false;
                }
            }
        }
        let shifted = m + Matrix6::identity() * atol;
        shifted.cholesky().is_some()
    }

    /// Re-symmetrize `P <- 1/2 (P + P^T)` to repair small numerical drift.
    pub fn resymmetrize(&mut self) {
        self.0 = 0.5 * (self.0 + self.0.transpose());
    }
}

// nalgebra's own serde support is feature-gated behind `serde-serialize`,
// which this crate does not enable; flatten to a plain array instead, the
// same trick the radar engine uses for its 4x4 ARPA covariance.
impl Serialize for Covariance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let flat: Vec<f64> = self.0.iter().copied().collect();
        flat.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Covariance {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let flat: Vec<f64> = Vec::deserialize(deserializer)?;
        if flat.len() != 36 {
            return Err(serde::de::Error::custom(format!(
                "expected 36 covariance entries, got {}",
                flat.len()
            )));
        }
        Ok(Covariance(Matrix6::from_column_slice(&flat)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_distance() {
        let a = Position3D::new(0.0, 0.0, 0.0);
        let b = Position3D::new(3.0, 4.0, 0.0);
        assert_eq!(a.distance_to(&b), 5.0);
    }

    #[test]
    fn velocity_magnitude() {
        let v = Velocity3D::new(3.0, 4.0, 0.0);
        assert_eq!(v.magnitude(), 5.0);
    }

    #[test]
    fn confidence_rejects_out_of_range() {
        assert!(Confidence::new(1.5).is_none());
        assert!(Confidence::new(-0.1).is_none());
        assert!(Confidence::new(0.5).is_some());
    }

    #[test]
    fn confidence_clamped_handles_nan() {
        assert_eq!(Confidence::clamped(f64::NAN).value(), 0.0);
        assert_eq!(Confidence::clamped(2.0).value(), 1.0);
    }

    #[test]
    fn covariance_diagonal_is_spd() {
        let cov = Covariance::from_diagonal([10.0, 10.0, 10.0, 4.0, 4.0, 4.0]);
        assert!(cov.is_spd(1e-8));
    }

    #[test]
    fn covariance_resymmetrize_fixes_asymmetry() {
        let mut m = Matrix6::identity();
        m[(0, 1)] = 1.0; // asymmetric
        let mut cov = Covariance(m);
        assert!(!cov.is_spd(1e-8));
        cov.resymmetrize();
        assert!(cov.is_spd(1e-8));
    }
}
