//! Data association: cost construction and solvers.

pub mod greedy;
pub mod hungarian;
pub mod murty;

use crate::config::{AssociationConfig, AssociationWeights, Solver};
use crate::error::AssociationError;
use crate::geometry::Position3D;
use nalgebra::{DMatrix, Matrix3};

/// Axis-aligned bounding box in center/extent form, for the IoU cost kernel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub cx: f64,
    pub cy: f64,
    pub w: f64,
    pub h: f64,
}

impl BBox {
    fn corners(&self) -> (f64, f64, f64, f64) {
        (
            self.cx - self.w / 2.0,
            self.cy - self.h / 2.0,
            self.cx + self.w / 2.0,
            self.cy + self.h / 2.0,
        )
    }
}

/// Axis-aligned IoU.
pub fn iou(a: &BBox, b: &BBox) -> f64 {
    let (ax0, ay0, ax1, ay1) = a.corners();
    let (bx0, by0, bx1, by1) = b.corners();

    let ix0 = ax0.max(bx0);
    let iy0 = ay0.max(by0);
    let ix1 = ax1.min(bx1);
    let iy1 = ay1.min(by1);

    let iw = (ix1 - ix0).max(0.0);
    let ih = (iy1 - iy0).max(0.0);
    let intersection = iw * ih;

    let area_a = (a.w * a.h).max(0.0);
    let area_b = (b.w * b.h).max(0.0);
    let union = area_a + area_b - intersection;

    if union <= 0.0 {
        0.0
    } else {
        intersection / union
    }
}

/// One side of a (track, detection) association candidate: a predicted
/// position plus whatever optional cost-kernel inputs are available this
/// frame.
#[derive(Debug, Clone)]
pub struct AssocCandidate {
    pub position: Position3D,
    pub bbox: Option<BBox>,
    pub confidence: f64,
    /// Innovation covariance `S = H P H^T + R`; required for the Mahalanobis
    /// kernel, absent falls back to treating the pair as ungated by distance.
    pub innovation_cov: Option<Matrix3<f64>>,
}

/// Result of solving a cost matrix: zero-indexed row/column pairs plus the
/// leftover indices on each side.
#[derive(Debug, Clone, Default)]
pub struct AssocOutcome {
    pub matched: Vec<(usize, usize)>,
    pub unmatched_tracks: Vec<usize>,
    pub unmatched_detections: Vec<usize>,
}

fn mahalanobis_sq(track: &AssocCandidate, det: &AssocCandidate) -> Option<f64> {
    let cov = track.innovation_cov?;
    let s_inv = cov.try_inverse()?;
    let d = det.position.to_vector3() - track.position.to_vector3();
    Some((d.transpose() * s_inv * d)[(0, 0)])
}

/// Build the hybrid cost matrix: `w_iou*(1-IoU) + w_maha*maha_norm +
/// w_conf*(1/conf)_norm`, gated to infinity by the chi-square threshold and
/// by `max_cost`.
///
/// When every pair is gated to infinity, the Mahalanobis term is left at
/// infinity everywhere rather than normalized by a degenerate zero/NaN
/// maximum.
pub fn build_hybrid_cost_matrix(
    tracks: &[AssocCandidate],
    detections: &[AssocCandidate],
    weights: &AssociationWeights,
    chi_square_gate: f64,
    max_cost: f64,
) -> DMatrix<f64> {
    let rows = tracks.len();
    let cols = detections.len();
    let mut iou_cost = DMatrix::from_element(rows, cols, 1.0);
    let mut maha_cost = DMatrix::from_element(rows, cols, f64::INFINITY);
    let mut conf_cost = DMatrix::from_element(rows, cols, 1.0);

    for i in 0..rows {
        for j in 0..cols {
            if let (Some(a), Some(b)) = (&tracks[i].bbox, &detections[j].bbox) {
                iou_cost[(i, j)] = 1.0 - iou(a, b);
            }
            if let Some(d2) = mahalanobis_sq(&tracks[i], &detections[j]) {
                maha_cost[(i, j)] = if d2 <= chi_square_gate { d2 } else { f64::INFINITY };
            }
            let conf = detections[j].confidence.clamp(1e-3, 1.0);
            conf_cost[(i, j)] = 1.0 / conf;
        }
    }

    let normalize = |m: &mut DMatrix<f64>| {
        let max = m.iter().copied().filter(|v| v.is_finite()).fold(0.0_f64, f64::max);
        if max > 0.0 {
            for v in m.iter_mut() {
                if v.is_finite() {
                    *v /= max + 1e-6;
                }
            }
        }
    };
    normalize(&mut maha_cost);
    normalize(&mut conf_cost);

    let mut combined = DMatrix::zeros(rows, cols);
    for i in 0..rows {
        for j in 0..cols {
            let cost = weights.iou * iou_cost[(i, j)]
                + weights.motion * maha_cost[(i, j)]
                + weights.confidence * conf_cost[(i, j)];
            combined[(i, j)] = if cost > max_cost || !cost.is_finite() {
                f64::INFINITY
            } else {
                cost
            };
        }
    }
    combined
}

/// Plain Euclidean distance cost matrix, the fast-path kernel used by the
/// default greedy solver when no bounding boxes are available.
pub fn build_euclidean_cost_matrix(
    tracks: &[AssocCandidate],
    detections: &[AssocCandidate],
    max_distance: f64,
) -> DMatrix<f64> {
    let rows = tracks.len();
    let cols = detections.len();
    let mut m = DMatrix::zeros(rows, cols);
    for i in 0..rows {
        for j in 0..cols {
            let d = tracks[i].position.distance_to(&detections[j].position);
            m[(i, j)] = if d > max_distance { f64::INFINITY } else { d };
        }
    }
    m
}

/// Dispatch to the configured solver, honoring the small-frame fast path
/// regardless of the configured default.
pub fn solve(cost: &DMatrix<f64>, config: &AssociationConfig) -> Result<AssocOutcome, AssociationError> {
    let (rows, cols) = (cost.nrows(), cost.ncols());
    if rows + cols <= config.small_frame_threshold {
        return Ok(greedy::solve(cost, config.max_cost));
    }
    match config.solver {
        Solver::Greedy => Ok(greedy::solve(cost, config.max_cost)),
        Solver::Hungarian => Ok(hungarian::solve(cost, config.max_cost)),
        Solver::KBest { k } => {
            let solutions = murty::solve_k_best(cost, config.max_cost, k);
            Ok(solutions
                .into_iter()
                .next()
                .unwrap_or_else(|| fully_unmatched(rows, cols)))
        }
    }
}

fn fully_unmatched(rows: usize, cols: usize) -> AssocOutcome {
    AssocOutcome {
        matched: Vec::new(),
        unmatched_tracks: (0..rows).collect(),
        unmatched_detections: (0..cols).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iou_identical_boxes_is_one() {
        let b = BBox { cx: 0.0, cy: 0.0, w: 2.0, h: 2.0 };
        assert!((iou(&b, &b) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn iou_disjoint_boxes_is_zero() {
        let a = BBox { cx: 0.0, cy: 0.0, w: 1.0, h: 1.0 };
        let b = BBox { cx: 100.0, cy: 100.0, w: 1.0, h: 1.0 };
        assert_eq!(iou(&a, &b), 0.0);
    }

    fn candidate(x: f64) -> AssocCandidate {
        AssocCandidate {
            position: Position3D::new(x, 0.0, 0.0),
            bbox: None,
            confidence: 0.9,
            innovation_cov: None,
        }
    }

    #[test]
    fn all_infeasible_hybrid_matrix_stays_all_infinite() {
        let tracks = vec![candidate(0.0)];
        let dets = vec![candidate(1000.0)];
        let weights = AssociationWeights::default();
        // No bbox/cov supplied -> iou/maha terms default to worst case; force
        // gating via max_cost of zero so every cell must end up infinite.
        let m = build_hybrid_cost_matrix(&tracks, &dets, &weights, 9.21, 0.0);
        assert!(m.iter().all(|v| v.is_infinite()));
    }

    #[test]
    fn euclidean_gates_by_max_distance() {
        let tracks = vec![candidate(0.0)];
        let dets = vec![candidate(10.0), candidate(100.0)];
        let m = build_euclidean_cost_matrix(&tracks, &dets, 50.0);
        assert_eq!(m[(0, 0)], 10.0);
        assert!(m[(0, 1)].is_infinite());
    }
}
