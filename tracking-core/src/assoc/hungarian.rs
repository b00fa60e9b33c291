//! Optimal assignment via the Hungarian (Kuhn-Munkres) algorithm.
//!
//! Minimizes total cost over a cost matrix gated by `max_cost`, as a
//! from-scratch `O(n^3)` implementation. Rectangular matrices are padded to
//! square with a large sentinel cost; padded and infinite-cost cells never
//! survive the final `max_cost` filter.

use super::AssocOutcome;
use nalgebra::DMatrix;

const SENTINEL: f64 = 1e12;

fn sanitize(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        SENTINEL
    }
}

/// Minimizes total cost over a square `n x n` matrix, returning `col_for_row`.
fn solve_square(a: &[Vec<f64>]) -> Vec<usize> {
    let n = a.len();
    // 1-indexed arrays, following the textbook formulation, to keep the
    // potential-update bookkeeping exactly as commonly verified.
    let inf = f64::INFINITY;
    let mut u = vec![0.0_f64; n + 1];
    let mut v = vec![0.0_f64; n + 1];
    let mut p = vec![0usize; n + 1]; // p[j] = row matched to column j (1-indexed), 0 = unmatched
    let mut way = vec![0usize; n + 1];

    for i in 1..=n {
        p[0] = i;
        let mut j0 = 0usize;
        let mut minv = vec![inf; n + 1];
        let mut used = vec![false; n + 1];
        loop {
            used[j0] = true;
            let i0 = p[j0];
            let mut delta = inf;
            let mut j1 = 0usize;
            for j in 1..=n {
                if used[j] {
                    continue;
                }
                let cur = a[i0 - 1][j - 1] - u[i0] - v[j];
                if cur < minv[j] {
                    minv[j] = cur;
                    way[j] = j0;
                }
                if minv[j] < delta {
                    delta = minv[j];
                    j1 = j;
                }
            }
            for j in 0..=n {
                if used[j] {
                    u[p[j]] += delta;
                    v[j] -= delta;
                } else {
                    minv[j] -= delta;
                }
            }
            j0 = j1;
            if p[j0] == 0 {
                break;
            }
        }
        loop {
            let j1 = way[j0];
            p[j0] = p[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    let mut col_for_row = vec![usize::MAX; n];
    for j in 1..=n {
        if p[j] != 0 {
            col_for_row[p[j] - 1] = j - 1;
        }
    }
    col_for_row
}

pub fn solve(cost: &DMatrix<f64>, max_cost: f64) -> AssocOutcome {
    let rows = cost.nrows();
    let cols = cost.ncols();
    if rows == 0 || cols == 0 {
        return AssocOutcome {
            matched: Vec::new(),
            unmatched_tracks: (0..rows).collect(),
            unmatched_detections: (0..cols).collect(),
        };
    }

    let n = rows.max(cols);
    let mut padded = vec![vec![SENTINEL; n]; n];
    for i in 0..rows {
        for j in 0..cols {
            padded[i][j] = sanitize(cost[(i, j)]);
        }
    }

    let col_for_row = solve_square(&padded);

    let mut matched = Vec::new();
    let mut used_rows = vec![false; rows];
    let mut used_cols = vec![false; cols];
    for i in 0..rows {
        let j = col_for_row[i];
        if j < cols {
            let original = cost[(i, j)];
            if original.is_finite() && original < max_cost {
                matched.push((i, j));
                used_rows[i] = true;
                used_cols[j] = true;
            }
        }
    }
    matched.sort_unstable();

    let unmatched_tracks = (0..rows).filter(|&i| !used_rows[i]).collect();
    let unmatched_detections = (0..cols).filter(|&j| !used_cols[j]).collect();

    AssocOutcome {
        matched,
        unmatched_tracks,
        unmatched_detections,
    }
}
