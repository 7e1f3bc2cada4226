//! Graduation governance.
//!
//! Three arms:
//! - automatic: a scripture item crossing the time or stability threshold
//!   graduates, or waits for a teacher when its owner studies in a Quran class
//! - teacher: approve/reject of a pending item, scoped to one class
//! - manual: an audit-only decision record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::dates::{days_later_at_midnight, whole_days_between};
use crate::error::{Result, ScheduleError};
use crate::lifecycle::FsrsReview;
use crate::types::{
    ClassInfo, ClassKind, GraduationAction, GraduationDecision, Item, ItemStatus,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraduationOutcome {
    Graduated,
    /// Owner is in an active Quran class; a teacher has to approve.
    PendingApproval,
}

/// Whole days since FSRS started for `item`, falling back to the legacy
/// interval deadline for items promoted before the start time was recorded.
pub fn days_in_fsrs(item: &Item, now: DateTime<Utc>) -> i64 {
    item.fsrs_start_at
        .or(item.interval_end_at)
        .map_or(0, |start| whole_days_between(start, now))
}

/// Whether an `fsrs_active` scripture item has crossed a graduation threshold.
pub fn graduation_due(item: &Item, now: DateTime<Utc>, config: &EngineConfig) -> bool {
    item.status == ItemStatus::FsrsActive
        && item.source_type.is_scripture()
        && (days_in_fsrs(item, now) >= config.graduation_days
            || item.stability() >= config.graduation_stability)
}

/// Apply the automatic arm to an item already known to be due.
pub fn apply_automatic(
    item: &mut Item,
    in_scripture_class: bool,
    now: DateTime<Utc>,
    config: &EngineConfig,
) -> GraduationOutcome {
    if in_scripture_class {
        item.status = ItemStatus::PendingGraduate;
        GraduationOutcome::PendingApproval
    } else {
        item.status = ItemStatus::Graduate;
        item.next_review_at = Some(days_later_at_midnight(now, config.graduate_review_days));
        GraduationOutcome::Graduated
    }
}

/// Settle a review that came back with `graduation_due`, keeping the
/// reported schedule in line with the item.
pub fn settle_review(
    item: &mut Item,
    review: &mut FsrsReview,
    in_scripture_class: bool,
    now: DateTime<Utc>,
    config: &EngineConfig,
) -> GraduationOutcome {
    let outcome = apply_automatic(item, in_scripture_class, now, config);
    if outcome == GraduationOutcome::Graduated {
        review.interval_days = config.graduate_review_days;
        if let Some(next) = item.next_review_at {
            review.next_review_at = next;
        }
    }
    review.outcome = Some(outcome);
    outcome
}

/// Checks shared by approve and reject, in the order callers observe them.
fn check_teacher_action(
    item: &Item,
    class: &ClassInfo,
    teacher_id: Uuid,
    owner_is_member: bool,
) -> Result<()> {
    if class.teacher_id != teacher_id {
        return Err(ScheduleError::unauthorized("only the class teacher can do this"));
    }
    if class.kind != ClassKind::Quran {
        return Err(ScheduleError::invalid_state(
            "graduation approval only applies to quran classes",
        ));
    }
    if item.status != ItemStatus::PendingGraduate {
        return Err(ScheduleError::invalid_state(
            "item is not pending graduation",
        ));
    }
    if !owner_is_member {
        return Err(ScheduleError::unauthorized(
            "item owner is not a member of this class",
        ));
    }
    Ok(())
}

/// pending_graduate -> graduate, recording who approved it.
pub fn approve(
    item: &mut Item,
    class: &ClassInfo,
    teacher_id: Uuid,
    owner_is_member: bool,
    now: DateTime<Utc>,
) -> Result<()> {
    check_teacher_action(item, class, teacher_id, owner_is_member)?;
    item.status = ItemStatus::Graduate;
    item.approved_by = Some(teacher_id);
    item.approved_at = Some(now);
    Ok(())
}

/// pending_graduate -> fsrs_active.
pub fn reject(
    item: &mut Item,
    class: &ClassInfo,
    teacher_id: Uuid,
    owner_is_member: bool,
) -> Result<()> {
    check_teacher_action(item, class, teacher_id, owner_is_member)?;
    item.status = ItemStatus::FsrsActive;
    Ok(())
}

/// Build the audit record for a manual decision. The item is not touched.
pub fn record_decision(
    actor_id: Uuid,
    item_id: Uuid,
    action: &str,
    reason: impl Into<String>,
    now: DateTime<Utc>,
) -> Result<GraduationDecision> {
    let action: GraduationAction = action.parse()?;
    Ok(GraduationDecision {
        id: Uuid::new_v4(),
        user_id: actor_id,
        item_id,
        action,
        reason: reason.into(),
        created_at: now,
    })
}

/// Row of a teacher's pending-approval queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingGraduation {
    pub item_id: Uuid,
    pub student_id: Uuid,
    pub content_ref: String,
    pub stability: f64,
    pub days_in_fsrs: i64,
    /// Days between the last review and the scheduled next one.
    pub last_interval_days: i64,
    pub review_count: u32,
}

impl PendingGraduation {
    pub fn from_item(item: &Item, now: DateTime<Utc>) -> Self {
        Self {
            item_id: item.id,
            student_id: item.owner_id,
            content_ref: item.content_ref.clone(),
            stability: item.stability(),
            days_in_fsrs: days_in_fsrs(item, now),
            last_interval_days: match (item.last_review_at, item.next_review_at) {
                (Some(last), Some(next)) => whole_days_between(last, next).max(0),
                _ => 0,
            },
            review_count: item.review_count,
        }
    }
}
