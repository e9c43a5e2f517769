//! Utility modules for rheological analysis
//!
//! Helper functions shared across the analysis, report and cohort modules.

pub mod units;

// Re-export commonly used items
pub use units::{relative_deviation, to_percent, log10_plus_one, round_to};
