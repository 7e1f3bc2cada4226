//! Daily snapshot service.
//!
//! `generate_today` is the only operation that writes snapshot rows. Reads
//! never recompute, and task transitions only move rows out of `pending`.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use murajaah_core::dates::task_date;
use murajaah_core::snapshot::{build_snapshot, rotation_group, Candidate};
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::{CardDueFeed, ChapterGroupDirectory, DailyTaskRepository, ItemRepository, Store};
use crate::error::{ApiError, Result};
use crate::models::{DailyTask, TaskSource, TaskState, TodayResponse, TodayTask};
use crate::services::{GraduationService, ItemService};

#[derive(Clone)]
pub struct DailyTaskService {
    store: Arc<dyn Store>,
    items: ItemService,
    graduation: GraduationService,
}

impl DailyTaskService {
    pub fn new(store: Arc<dyn Store>, items: ItemService, graduation: GraduationService) -> Self {
        Self {
            store,
            items,
            graduation,
        }
    }

    /// Build and persist today's snapshot, replacing any earlier one.
    pub async fn generate_today(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
        limit: Option<usize>,
    ) -> Result<Vec<DailyTask>> {
        let graduated = self.graduation.sweep(user_id, now).await?;

        let promoted = self.items.promote_due_intervals(user_id, now).await?;
        let recurring = self.store.interval_reviews_due(user_id, now).await?;
        let fsrs = self.store.fsrs_due(user_id, now).await?;
        let cards = self.store.due_cards(user_id, now, limit).await?;

        let groups = self.store.chapter_groups(user_id).await?;
        let graduates = match rotation_group(&groups, now.day()) {
            Some(group) => self.store.graduates_in_groups(user_id, &[group.id]).await?,
            None => Vec::new(),
        };

        debug!(
            %user_id,
            graduated,
            interval = promoted.len(),
            interval_recurring = recurring.len(),
            fsrs = fsrs.len(),
            card = cards.len(),
            graduate_monthly = graduates.len(),
            "snapshot candidates collected"
        );

        let candidates = promoted
            .iter()
            .map(|item| Candidate::item(item, TaskSource::Interval))
            .chain(recurring.iter().map(|item| Candidate::item(item, TaskSource::IntervalRecurring)))
            .chain(fsrs.iter().map(|item| Candidate::item(item, TaskSource::Fsrs)))
            .chain(cards.iter().map(Candidate::card))
            .chain(graduates.iter().map(|item| Candidate::item(item, TaskSource::GraduateMonthly)));

        let date = task_date(now);
        let tasks = build_snapshot(user_id, now, candidates, limit);
        self.store.replace_day(user_id, date, &tasks).await?;

        info!(%user_id, %date, tasks = tasks.len(), "daily snapshot generated");
        Ok(tasks)
    }

    /// Today's persisted snapshot, as stored.
    pub async fn list_today(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<Vec<DailyTask>> {
        self.store.list_day(user_id, task_date(now)).await
    }

    /// Today's snapshot with item details and a time estimate.
    pub async fn today_agenda(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<TodayResponse> {
        let tasks = self.list_today(user_id, now).await?;
        let mut entries = Vec::with_capacity(tasks.len());
        for task in tasks {
            let item = self.store.get_item(task.item_id).await?;
            entries.push(TodayTask {
                content_ref: item.as_ref().map(|i| i.content_ref.clone()),
                estimated_review_seconds: item.map_or(0, |i| i.estimated_review_seconds),
                task,
            });
        }

        let pending: Vec<&TodayTask> = entries
            .iter()
            .filter(|e| e.task.state == TaskState::Pending)
            .collect();
        Ok(TodayResponse {
            date: task_date(now),
            pending: pending.len(),
            estimated_seconds: pending
                .iter()
                .map(|e| u64::from(e.estimated_review_seconds))
                .sum(),
            tasks: entries,
        })
    }

    pub async fn mark_done(&self, user_id: Uuid, key: Uuid, now: DateTime<Utc>) -> Result<()> {
        self.transition(user_id, key, now, TaskState::Done).await
    }

    pub async fn mark_skipped(&self, user_id: Uuid, key: Uuid, now: DateTime<Utc>) -> Result<()> {
        self.transition(user_id, key, now, TaskState::Skipped).await
    }

    async fn transition(
        &self,
        user_id: Uuid,
        key: Uuid,
        now: DateTime<Utc>,
        state: TaskState,
    ) -> Result<()> {
        let date = task_date(now);
        if self.store.transition_pending(user_id, date, key, state).await? {
            info!(%user_id, %key, state = state.as_str(), "daily task updated");
            Ok(())
        } else {
            tracing::warn!(%user_id, %key, "no pending daily task to update");
            Err(ApiError::Conflict(
                "no pending task found for today".to_string(),
            ))
        }
    }
}
