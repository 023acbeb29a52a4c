//! Probability-vector and row-stochastic checks.

use super::matrix::Matrix;

/// Default tolerance for "sums to one" checks.
pub const STOCHASTIC_TOL: f64 = 1e-9;

/// True if `values` is a probability distribution: every entry finite and in
/// [0, 1], and the entries sum to 1 within `tol`.
pub fn is_distribution(values: &[f64], tol: f64) -> bool {
    if values.is_empty() {
        return false;
    }
    if values
        .iter()
        .any(|v| !v.is_finite() || *v < 0.0 || *v > 1.0 + tol)
    {
        return false;
    }
    let sum: f64 = values.iter().sum();
    (sum - 1.0).abs() <= tol
}

/// True if every row of `m` is a probability distribution.
pub fn is_row_stochastic(m: &Matrix, tol: f64) -> bool {
    if m.rows() == 0 {
        return false;
    }
    (0..m.rows()).all(|r| is_distribution(m.row(r), tol))
}

/// Index of the first row that is not a distribution, if any.
pub fn first_non_stochastic_row(m: &Matrix, tol: f64) -> Option<usize> {
    (0..m.rows()).find(|&r| !is_distribution(m.row(r), tol))
}

/// Index of the largest value; ties resolve to the lowest index.
///
/// NaN entries never win. Returns None for empty input or all-NaN input.
pub fn argmax_first(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}
