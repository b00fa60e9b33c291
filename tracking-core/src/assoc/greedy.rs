//! Greedy nearest-neighbor solver — the default fast path.
//!
//! Iterate detections in index order, take the lowest-cost unused track
//! within the gate, and remove it from the pool so it can't be claimed
//! twice.

use super::AssocOutcome;
use nalgebra::DMatrix;

pub fn solve(cost: &DMatrix<f64>, max_cost: f64) -> AssocOutcome {
    let rows = cost.nrows();
    let cols = cost.ncols();
    let mut used_rows = vec![false; rows];
    let mut matched = Vec::new();
    let mut unmatched_detections = Vec::new();

    for j in 0..cols {
        let mut best: Option<(usize, f64)> = None;
        for i in 0..rows {
            if used_rows[i] {
                continue;
            }
            let c = cost[(i, j)];
            if !c.is_finite() || c > max_cost {
                continue;
            }
            if best.map_or(true, |(_, bc)| c < bc) {
                best = Some((i, c));
            }
        }
        match best {
            Some((i, _)) => {
                used_rows[i] = true;
                matched.push((i, j));
            }
            None => unmatched_detections.push(j),
        }
    }

    let unmatched_tracks = (0..rows).filter(|&i| !used_rows[i]).collect();
    matched.sort_unstable();

    AssocOutcome {
        matched,
        unmatched_tracks,
        unmatched_detections,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_nearest_unused_track_per_detection() {
        let cost = DMatrix::from_row_slice(2, 2, &[1.0, 5.0, 2.0, 0.5]);
        let outcome = solve(&cost, 10.0);
        assert_eq!(outcome.matched.len(), 2);
        assert!(outcome.unmatched_tracks.is_empty());
        assert!(outcome.unmatched_detections.is_empty());
    }

    #[test]
    fn gates_out_costs_above_max_cost() {
        let cost = DMatrix::from_row_slice(1, 1, &[100.0]);
        let outcome = solve(&cost, 10.0);
        assert!(outcome.matched.is_empty());
        assert_eq!(outcome.unmatched_detections, vec![0]);
        assert_eq!(outcome.unmatched_tracks, vec![0]);
    }

    #[test]
    fn does_not_reuse_a_matched_track() {
        let cost = DMatrix::from_row_slice(1, 2, &[1.0, 1.5]);
        let outcome = solve(&cost, 10.0);
        assert_eq!(outcome.matched, vec![(0, 0)]);
        assert_eq!(outcome.unmatched_detections, vec![1]);
    }
}
