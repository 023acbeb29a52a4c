//! Log-domain helpers for reporting likelihoods.
//!
//! The recognition pipeline works in linear probability space; these are
//! used where a likelihood is reported on a log scale.

/// Natural log of a probability, mapping 0 to NEG_INFINITY.
///
/// Negative and NaN inputs yield NaN.
pub fn ln_or_neg_inf(p: f64) -> f64 {
    if p.is_nan() || p < 0.0 {
        return f64::NAN;
    }
    if p == 0.0 {
        return f64::NEG_INFINITY;
    }
    p.ln()
}
