//! Daily task snapshot assembly.
//!
//! Candidates arrive already ordered by source priority. The builder only
//! deduplicates, caps and numbers them; gathering and persisting belong to
//! the caller.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::dates::task_date;
use crate::types::{ChapterGroup, DailyTask, DueCard, Item, TaskSource, TaskState};

/// Something due today, before deduplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub item_id: Uuid,
    pub card_id: Option<Uuid>,
    pub source: TaskSource,
}

impl Candidate {
    pub fn item(item: &Item, source: TaskSource) -> Self {
        Self {
            item_id: item.id,
            card_id: None,
            source,
        }
    }

    pub fn card(card: &DueCard) -> Self {
        Self {
            item_id: card.item_id,
            card_id: Some(card.card_id),
            source: TaskSource::Card,
        }
    }
}

/// Chapter group whose graduated items are due for maintenance today.
///
/// With every group active, group `n` is reviewed on day `n` of the month, so
/// day 31 picks nothing. Otherwise the active groups, sorted by index, are
/// walked cyclically by day of month.
pub fn rotation_group(groups: &[ChapterGroup], day_of_month: u32) -> Option<&ChapterGroup> {
    let mut active: Vec<&ChapterGroup> = groups.iter().filter(|g| g.is_active).collect();
    if active.is_empty() {
        return None;
    }
    if active.len() == groups.len() {
        return groups.iter().find(|g| g.index == day_of_month);
    }

    active.sort_by_key(|g| g.index);
    let slot = (day_of_month.max(1) as usize - 1) % active.len();
    Some(active[slot])
}

/// Turn ordered candidates into today's snapshot rows.
///
/// The first occurrence of each (item, card) pair wins. A `limit` of `None`
/// or `Some(0)` means no ceiling. Positions start at 0.
pub fn build_snapshot(
    user_id: Uuid,
    now: DateTime<Utc>,
    candidates: impl IntoIterator<Item = Candidate>,
    limit: Option<usize>,
) -> Vec<DailyTask> {
    let date = task_date(now);
    let limit = limit.filter(|n| *n > 0).unwrap_or(usize::MAX);
    let mut seen = HashSet::new();

    candidates
        .into_iter()
        .filter(|c| seen.insert((c.item_id, c.card_id)))
        .take(limit)
        .enumerate()
        .map(|(position, c)| DailyTask {
            id: Uuid::new_v4(),
            user_id,
            item_id: c.item_id,
            card_id: c.card_id,
            task_date: date,
            position: position as u32,
            source: c.source,
            state: TaskState::Pending,
            created_at: now,
        })
        .collect()
}
