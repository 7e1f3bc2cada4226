//! Immutable scheduling configuration.

use crate::algorithm::fsrs::Fsrs;

/// Days in `fsrs_active` after which a scripture item graduates.
pub const GRADUATION_DAYS: i64 = 30;

/// Stability (days) at which a scripture item graduates early.
pub const GRADUATION_STABILITY: f64 = 30.0;

/// Maintenance cadence for graduated items.
pub const GRADUATE_REVIEW_DAYS: i64 = 20;

/// Longest recurring interval a learner may choose, about ten years.
pub const MAX_INTERVAL_DAYS: u32 = 3650;

/// Thresholds and model parameters shared by every scheduling operation.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub fsrs: Fsrs,
    pub graduation_days: i64,
    pub graduation_stability: f64,
    pub graduate_review_days: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fsrs: Fsrs::default(),
            graduation_days: GRADUATION_DAYS,
            graduation_stability: GRADUATION_STABILITY,
            graduate_review_days: GRADUATE_REVIEW_DAYS,
        }
    }
}
