//! Shared numeric helpers
//!
//! The handful of derived quantities (relative deviation, percentages, the
//! cohort log transform) the analysis, report and cohort modules share.

// ============================================================================
// Derived quantities
// ============================================================================

/// Relative deviation of two readings with respect to their mean
///
/// |a - b| / ((a + b) / 2)
///
/// Used for the time/frequency sweep and Cox-Merz consistency checks.
/// NaN propagates, so a missing reading yields a missing deviation.
#[inline]
pub fn relative_deviation(a: f64, b: f64) -> f64 {
    (a - b).abs() / ((a + b) / 2.0)
}

/// Fraction to percent
#[inline]
pub fn to_percent(fraction: f64) -> f64 {
    fraction * 100.0
}

/// log10(x + 1), the transform applied to cohort columns before comparison
#[inline]
pub fn log10_plus_one(x: f64) -> f64 {
    (x + 1.0).log10()
}

/// Round to a fixed number of decimals, for report tables
#[inline]
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

// ============================================================================
// Tests
// ============================================================================
