//! FSRS (Free Spaced Repetition Scheduler) forgetting-curve model.
//!
//! DSR model over a 17-weight vector:
//! - Difficulty (D): resistance to stability growth, 1-10
//! - Stability (S): days until retrievability decays to the reference level
//! - Retrievability (R): probability of recall after `t` days
//!
//! Everything here is pure; the weights are passed in explicitly.

use chrono::{DateTime, Duration, Utc};

use crate::dates::elapsed_days;
use crate::error::{Result, ScheduleError};
use crate::types::Rating;

/// Retention targeted by interval computation unless overridden.
pub const DEFAULT_RETENTION: f64 = 0.9;

/// Floor applied to any stability the model produces.
pub const MIN_STABILITY: f64 = 0.01;

/// Stability assumed before an item's first FSRS review.
pub const INITIAL_STABILITY: f64 = 0.4;

/// Difficulty assumed before an item's first FSRS review.
pub const INITIAL_DIFFICULTY: f64 = 5.0;

pub const MIN_DIFFICULTY: f64 = 1.0;
pub const MAX_DIFFICULTY: f64 = 10.0;

/// The 17 model coefficients.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weights([f64; 17]);

impl Weights {
    pub const LEN: usize = 17;

    /// Build from a caller-supplied vector, which must hold exactly 17 values.
    pub fn new(values: &[f64]) -> Result<Self> {
        let w: [f64; 17] = values.try_into().map_err(|_| {
            ScheduleError::invalid_input(format!(
                "FSRS requires exactly {} weights, got {}",
                Self::LEN,
                values.len()
            ))
        })?;
        Ok(Self(w))
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

impl Default for Weights {
    fn default() -> Self {
        Self([
            0.4,  // w[0]: initial stability
            5.0,  // w[1]: initial difficulty
            0.3,  // w[2]: difficulty delta per rating step
            0.2,  // w[3]: lapse stability base
            0.5,  // w[4]: lapse stability exponent
            1.2,  // w[5]: recall growth base (exp)
            0.3,  // w[6]: stability decay
            1.0,  // w[7]: retrievability effect
            0.85, // w[8]: hard penalty
            1.15, // w[9]: easy bonus
            0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
        ])
    }
}

impl std::ops::Index<usize> for Weights {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.0[index]
    }
}

/// Model inputs carried between reviews.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemoryState {
    pub stability: f64,
    pub difficulty: f64,
    pub last_review: Option<DateTime<Utc>>,
}

impl MemoryState {
    /// State of an item that has never been reviewed under FSRS.
    pub fn initial() -> Self {
        Self {
            stability: INITIAL_STABILITY,
            difficulty: INITIAL_DIFFICULTY,
            last_review: None,
        }
    }
}

/// Outcome of one review.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReviewResult {
    pub state: MemoryState,
    /// Fractional days until the next review, at least 1.
    pub interval_days: f64,
    pub interval: Duration,
}

/// Clamp a stability value into the model's safe range.
pub fn sanitize_stability(stability: f64) -> f64 {
    if stability.is_finite() && stability >= MIN_STABILITY {
        stability
    } else {
        MIN_STABILITY
    }
}

/// Replace a degenerate difficulty with `fallback`, then clamp to 1-10.
pub fn sanitize_difficulty(difficulty: f64, fallback: f64) -> f64 {
    let d = if difficulty.is_finite() && difficulty > 0.0 {
        difficulty
    } else {
        fallback
    };
    d.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY)
}

/// R(t, S) = (1 + t / S)^-1
pub fn retrievability(elapsed_days: f64, stability: f64) -> f64 {
    let t = elapsed_days.max(0.0);
    let s = sanitize_stability(stability);
    (1.0 + t / s).powf(-1.0)
}

/// I = S * (1 / R_target - 1), never shorter than one day.
pub fn next_interval_days(stability: f64, target_retention: f64) -> f64 {
    let interval = if target_retention <= 0.0 || target_retention >= 1.0 {
        stability
    } else {
        stability * (1.0 / target_retention - 1.0)
    };
    if interval.is_finite() {
        interval.max(1.0)
    } else {
        1.0
    }
}

/// D' = clamp(D + w[2] * (3 - G), 1, 10)
pub fn update_difficulty(difficulty: f64, rating: Rating, w: &Weights) -> f64 {
    let d = difficulty + w[2] * (3.0 - rating.to_value() as f64);
    d.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY)
}

/// S' = w[3] * S^w[4]
fn lapse_stability(stability: f64, w: &Weights) -> f64 {
    w[3] * stability.powf(w[4])
}

/// S' = S * (1 + e^w[5] * (11 - D) * S^-w[6] * (e^((1 - R) * w[7]) - 1)) * modifier
fn recall_stability(
    stability: f64,
    difficulty: f64,
    retrievability: f64,
    rating: Rating,
    w: &Weights,
) -> f64 {
    let growth = w[5].exp()
        * (11.0 - difficulty)
        * stability.powf(-w[6])
        * (((1.0 - retrievability) * w[7]).exp() - 1.0);

    let modifier = match rating {
        Rating::Hard => w[8],
        Rating::Easy => w[9],
        _ => 1.0,
    };

    stability * (1.0 + growth) * modifier
}

/// Apply one rating at `now`.
///
/// With no previous review the memory is treated as fully decayed (R = 0).
/// The resulting stability is floored at [`MIN_STABILITY`], which also
/// absorbs NaN and infinities; this is a safety net on top of the formula.
pub fn review(
    state: MemoryState,
    rating: Rating,
    now: DateTime<Utc>,
    w: &Weights,
    target_retention: f64,
) -> ReviewResult {
    let r = match state.last_review {
        Some(last) => retrievability(elapsed_days(last, now), state.stability),
        None => 0.0,
    };

    let mut difficulty = update_difficulty(state.difficulty, rating, w);
    if !difficulty.is_finite() || difficulty <= 0.0 {
        difficulty = w[1];
    }

    let stability = match rating {
        Rating::Again => lapse_stability(state.stability, w),
        _ => recall_stability(state.stability, state.difficulty, r, rating, w),
    };
    let stability = sanitize_stability(stability);

    let interval_days = next_interval_days(stability, target_retention);

    ReviewResult {
        state: MemoryState {
            stability,
            difficulty,
            last_review: Some(now),
        },
        interval_days,
        interval: Duration::seconds((interval_days * 86_400.0) as i64),
    }
}

/// FSRS model bound to a weight vector and a retention target.
#[derive(Debug, Clone, PartialEq)]
pub struct Fsrs {
    pub request_retention: f64,
    pub w: Weights,
}

impl Default for Fsrs {
    fn default() -> Self {
        Self {
            request_retention: DEFAULT_RETENTION,
            w: Weights::default(),
        }
    }
}

impl Fsrs {
    pub fn new(w: Weights, request_retention: f64) -> Self {
        Self {
            request_retention,
            w,
        }
    }

    pub fn schedule(&self, state: MemoryState, rating: Rating, now: DateTime<Utc>) -> ReviewResult {
        review(state, rating, now, &self.w, self.request_retention)
    }

    pub fn interval_days(&self, stability: f64) -> f64 {
        next_interval_days(stability, self.request_retention)
    }
}
