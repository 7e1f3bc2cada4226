//! Item lifecycle state machine.
//!
//! ```text
//! menghafal -> interval -> fsrs_active -> pending_graduate -> graduate
//!                                      \-------------------> graduate
//! fsrs_active <-> inactive   (non-scripture only)
//! ```
//!
//! Each function validates ownership and the current phase, then mutates the
//! item in place. Persisting the result (guarded on the status read before the
//! call) is the caller's job.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::algorithm::fsrs::MemoryState;
use crate::algorithm::interval::{next_recurring_review, IntervalRating};
use crate::config::{EngineConfig, MAX_INTERVAL_DAYS};
use crate::dates::{days_later_at_midnight, midnight_after};
use crate::error::{Result, ScheduleError};
use crate::governance::{self, GraduationOutcome};
use crate::types::{IntervalReviewRecord, Item, ItemStatus, Rating};

pub fn ensure_owner(item: &Item, actor_id: Uuid) -> Result<()> {
    if item.owner_id == actor_id {
        Ok(())
    } else {
        Err(ScheduleError::unauthorized("item belongs to another user"))
    }
}

fn require_status(item: &Item, expected: ItemStatus, action: &str) -> Result<()> {
    if item.status == expected {
        Ok(())
    } else {
        Err(ScheduleError::invalid_state(format!(
            "item must be in '{expected}' status to {action}"
        )))
    }
}

/// menghafal -> interval.
pub fn start_interval(
    item: &mut Item,
    actor_id: Uuid,
    interval_days: i64,
    now: DateTime<Utc>,
) -> Result<()> {
    ensure_owner(item, actor_id)?;
    require_status(item, ItemStatus::Menghafal, "start interval")?;

    let days = u32::try_from(interval_days)
        .ok()
        .filter(|d| (1..=MAX_INTERVAL_DAYS).contains(d))
        .ok_or_else(|| {
            ScheduleError::invalid_input(format!(
                "interval_days must be between 1 and {MAX_INTERVAL_DAYS}"
            ))
        })?;

    item.status = ItemStatus::Interval;
    item.interval_days = days;
    item.interval_start_at = Some(now);
    item.interval_next_review_at = Some(next_recurring_review(now, days));
    Ok(())
}

/// Recurring interval review. The item stays in `interval`.
pub fn review_interval(
    item: &mut Item,
    actor_id: Uuid,
    rating: i64,
    now: DateTime<Utc>,
) -> Result<IntervalReviewRecord> {
    ensure_owner(item, actor_id)?;
    require_status(item, ItemStatus::Interval, "review")?;
    let rating = IntervalRating::parse(rating)?;

    if let Some(earliest) = item.interval_next_review_at {
        if now < earliest {
            return Err(ScheduleError::TooEarly { earliest });
        }
    }

    item.interval_next_review_at = Some(next_recurring_review(now, item.interval_days));
    item.review_count += 1;
    item.last_review_at = Some(now);

    Ok(IntervalReviewRecord {
        id: Uuid::new_v4(),
        user_id: actor_id,
        item_id: item.id,
        rating: rating.to_value(),
        reviewed_at: now,
    })
}

fn enter_fsrs(item: &mut Item, now: DateTime<Utc>) {
    item.status = ItemStatus::FsrsActive;
    item.ensure_memory_defaults();
    item.fsrs_start_at = Some(now);
}

/// True when the legacy fixed interval deadline has passed.
pub fn interval_deadline_reached(item: &Item, now: DateTime<Utc>) -> bool {
    item.status == ItemStatus::Interval && item.interval_end_at.is_some_and(|end| end <= now)
}

/// interval -> fsrs_active, triggered by the deadline sweep.
///
/// The promotion moment, not the old deadline, starts the graduation clock.
pub fn promote_on_deadline(item: &mut Item, now: DateTime<Utc>) -> Result<()> {
    require_status(item, ItemStatus::Interval, "promote")?;
    if !interval_deadline_reached(item, now) {
        return Err(ScheduleError::invalid_state(
            "interval deadline has not been reached",
        ));
    }
    enter_fsrs(item, now);
    Ok(())
}

/// interval -> fsrs_active, on the learner's request.
pub fn activate_to_fsrs(item: &mut Item, actor_id: Uuid, now: DateTime<Utc>) -> Result<()> {
    ensure_owner(item, actor_id)?;
    require_status(item, ItemStatus::Interval, "activate FSRS")?;

    enter_fsrs(item, now);
    item.interval_end_at = Some(now);
    item.next_review_at = Some(next_recurring_review(now, item.interval_days));
    Ok(())
}

/// Result of an FSRS review, before and after graduation is settled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FsrsReview {
    pub rating: Rating,
    pub interval_days: i64,
    pub next_review_at: DateTime<Utc>,
    /// The item crossed the graduation threshold on this review.
    pub graduation_due: bool,
    pub outcome: Option<GraduationOutcome>,
}

impl FsrsReview {
    pub fn graduated(&self) -> bool {
        self.outcome == Some(GraduationOutcome::Graduated)
    }

    pub fn pending_graduate(&self) -> bool {
        self.outcome == Some(GraduationOutcome::PendingApproval)
    }
}

/// FSRS review of an `fsrs_active` or `graduate` item.
///
/// Reviews before `next_review_at` are rejected, except the very first one.
/// Graduated items keep a flat maintenance cadence instead of the model's
/// interval. When `graduation_due` comes back true the caller settles it with
/// [`governance::settle_review`].
pub fn review_fsrs(
    item: &mut Item,
    actor_id: Uuid,
    rating: i64,
    now: DateTime<Utc>,
    config: &EngineConfig,
) -> Result<FsrsReview> {
    ensure_owner(item, actor_id)?;
    if !matches!(item.status, ItemStatus::FsrsActive | ItemStatus::Graduate) {
        return Err(ScheduleError::invalid_state(
            "item must be in 'fsrs_active' or 'graduate' status to review",
        ));
    }
    let rating = Rating::parse(rating)?;

    let first_review = item.last_review_at.is_none();
    if !first_review {
        if let Some(earliest) = item.next_review_at {
            if now < earliest {
                return Err(ScheduleError::TooEarly { earliest });
            }
        }
    }

    let state = if first_review {
        MemoryState::initial()
    } else {
        item.memory_state()
    };
    let result = config.fsrs.schedule(state, rating, now);

    item.set_memory_state(result.state.stability, result.state.difficulty);
    item.review_count += 1;
    item.last_review_at = Some(now);

    let (interval_days, next_review_at) = if item.status == ItemStatus::Graduate {
        (
            config.graduate_review_days,
            days_later_at_midnight(now, config.graduate_review_days),
        )
    } else {
        (
            result.interval.num_hours() / 24,
            midnight_after(now, result.interval),
        )
    };
    item.next_review_at = Some(next_review_at);

    Ok(FsrsReview {
        rating,
        interval_days,
        next_review_at,
        graduation_due: governance::graduation_due(item, now, config),
        outcome: None,
    })
}

fn require_non_scripture(item: &Item, verb: &str) -> Result<()> {
    if item.source_type.is_scripture() {
        Err(ScheduleError::invalid_state(format!(
            "quran items cannot be {verb}"
        )))
    } else {
        Ok(())
    }
}

/// fsrs_active -> inactive (non-scripture only).
pub fn deactivate(item: &mut Item, actor_id: Uuid) -> Result<()> {
    ensure_owner(item, actor_id)?;
    require_non_scripture(item, "deactivated")?;
    require_status(item, ItemStatus::FsrsActive, "deactivate")?;
    item.status = ItemStatus::Inactive;
    Ok(())
}

/// inactive -> fsrs_active (non-scripture only).
pub fn reactivate(item: &mut Item, actor_id: Uuid) -> Result<()> {
    ensure_owner(item, actor_id)?;
    require_non_scripture(item, "reactivated")?;
    require_status(item, ItemStatus::Inactive, "reactivate")?;
    item.status = ItemStatus::FsrsActive;
    Ok(())
}
