//! Fixed-cadence interval phase.
//!
//! Before FSRS takes over, an item is reviewed every `interval_days` days on a
//! 3-point scale. Ratings are only logged; they do not change the cadence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dates::days_later_at_midnight;
use crate::error::{Result, ScheduleError};

/// Rating given during the interval phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalRating {
    Bad,
    Good,
    Perfect,
}

impl IntervalRating {
    pub fn to_value(self) -> u8 {
        match self {
            Self::Bad => 1,
            Self::Good => 2,
            Self::Perfect => 3,
        }
    }

    pub fn from_value(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Bad),
            2 => Some(Self::Good),
            3 => Some(Self::Perfect),
            _ => None,
        }
    }

    pub fn parse(value: i64) -> Result<Self> {
        u8::try_from(value)
            .ok()
            .and_then(Self::from_value)
            .ok_or_else(|| {
                ScheduleError::invalid_input(
                    "rating must be between 1 and 3 (1=bad, 2=good, 3=perfect)",
                )
            })
    }
}

/// Performance label derived from the average interval rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Performance {
    NoReviews,
    Bad,
    Good,
    Perfect,
}

impl Performance {
    pub fn from_average(average: f64, total_reviews: u64) -> Self {
        if total_reviews == 0 {
            Self::NoReviews
        } else if average < 1.5 {
            Self::Bad
        } else if average < 2.5 {
            Self::Good
        } else {
            Self::Perfect
        }
    }
}

/// Rolling statistics over an item's interval ratings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalStats {
    pub average_rating: f64,
    pub total_reviews: u64,
    pub performance: Performance,
}

impl IntervalStats {
    pub fn from_summary(average_rating: f64, total_reviews: u64) -> Self {
        let average_rating = if total_reviews == 0 || !average_rating.is_finite() {
            0.0
        } else {
            average_rating
        };
        Self {
            average_rating,
            total_reviews,
            performance: Performance::from_average(average_rating, total_reviews),
        }
    }
}

/// Next recurring review: `interval_days` after `from`, at the start of that day.
pub fn next_recurring_review(from: DateTime<Utc>, interval_days: u32) -> DateTime<Utc> {
    days_later_at_midnight(from, i64::from(interval_days))
}
