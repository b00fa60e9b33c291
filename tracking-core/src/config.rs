//! Tunable configuration for the tracker kernel, following a plain
//! `Default`-implementing settings struct passed explicitly to a
//! constructor rather than read from a global.

use serde::{Deserialize, Serialize};

/// `tracking.*` options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Frames of consecutive misses before deletion.
    pub max_age: u32,
    /// Hits required to promote TENTATIVE -> ACTIVE.
    pub min_hits: u32,
    /// Gating radius in meters for association.
    pub max_distance: f64,
    /// Seconds since last update before forced deletion regardless of `max_age`.
    pub staleness_ttl_s: f64,
    pub association: AssociationConfig,
    pub fusion: FusionConfig,
    /// Which motion filter backs each track's state estimate.
    pub filter: FilterKind,
    /// Measurement noise variance fed to a track's filter when no
    /// per-sensor `measurement_covariance` is available.
    pub default_measurement_variance: f64,
    /// `dt` beyond this is clamped before prediction.
    pub max_predict_horizon_s: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        TrackerConfig {
            max_age: 30,
            min_hits: 3,
            max_distance: 50.0,
            staleness_ttl_s: 5.0,
            association: AssociationConfig::default(),
            fusion: FusionConfig::default(),
            filter: FilterKind::default(),
            default_measurement_variance: 1.0,
            max_predict_horizon_s: 5.0,
        }
    }
}

/// Selects the per-track motion filter implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    /// Linear Kalman filter over the constant-velocity model; the default.
    Linear,
    /// Unscented Kalman filter (square-root formulation).
    Unscented,
}

impl Default for FilterKind {
    fn default() -> Self {
        FilterKind::Linear
    }
}

/// Which solver the association subsystem should run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Solver {
    /// Fast-path nearest-neighbor; the default.
    Greedy,
    /// Optimal one-to-one assignment via Kuhn-Munkres.
    Hungarian,
    /// Top-k assignments for JPDA-style soft association.
    KBest { k: usize },
}

impl Default for Solver {
    fn default() -> Self {
        Solver::Greedy
    }
}

/// `association.weights`: relative contribution of each cost kernel in the
/// hybrid cost.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AssociationWeights {
    pub iou: f64,
    pub motion: f64,
    pub confidence: f64,
}

impl Default for AssociationWeights {
    fn default() -> Self {
        AssociationWeights {
            iou: 0.5,
            motion: 0.4,
            confidence: 0.1,
        }
    }
}

/// `association.*` options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssociationConfig {
    pub solver: Solver,
    pub weights: AssociationWeights,
    /// Gating threshold; pairs costing more than this are infeasible.
    pub max_cost: f64,
    /// Chi-square gate applied to the Mahalanobis term before normalization.
    pub chi_square_gate: f64,
    /// Below this many tracks+detections, always use the greedy solver
    /// regardless of `solver`.
    pub small_frame_threshold: usize,
}

impl Default for AssociationConfig {
    fn default() -> Self {
        AssociationConfig {
            solver: Solver::default(),
            weights: AssociationWeights::default(),
            max_cost: 1e6,
            chi_square_gate: 9.21, // 99% for 2 DOF
            small_frame_threshold: 6,
        }
    }
}

/// `fusion.*` options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionConfig {
    pub cluster_threshold_m: f64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        FusionConfig {
            cluster_threshold_m: 5.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = TrackerConfig::default();
        assert_eq!(cfg.max_age, 30);
        assert_eq!(cfg.min_hits, 3);
        assert_eq!(cfg.max_distance, 50.0);
        assert_eq!(cfg.association.weights.iou, 0.5);
        assert_eq!(cfg.association.weights.motion, 0.4);
        assert_eq!(cfg.association.weights.confidence, 0.1);
        assert_eq!(cfg.fusion.cluster_threshold_m, 5.0);
    }
}
