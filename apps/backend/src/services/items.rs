//! Item lifecycle service.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use murajaah_core::{governance, lifecycle, EngineConfig, IntervalStats};
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::{ClassDirectory, IntervalReviewRepository, ItemRepository, Store};
use crate::error::{ApiError, Result};
use crate::models::{
    CreateItemRequest, IntervalReviewResponse, Item, ItemGuard, ItemStatus, ReviewItemResponse,
};
use crate::services::{complete_task_best_effort, concurrent_change, load_item, save_guarded};

#[derive(Clone)]
pub struct ItemService {
    store: Arc<dyn Store>,
    engine: Arc<EngineConfig>,
}

impl ItemService {
    pub fn new(store: Arc<dyn Store>, engine: Arc<EngineConfig>) -> Self {
        Self { store, engine }
    }

    pub async fn create_item(
        &self,
        owner_id: Uuid,
        request: CreateItemRequest,
        now: DateTime<Utc>,
    ) -> Result<Item> {
        if request.content_ref.trim().is_empty() {
            return Err(ApiError::BadRequest("content_ref is required".to_string()));
        }
        let mut item = Item::new(owner_id, request.source_type, request.content_ref, now);
        item.estimated_review_seconds = request.estimated_review_seconds;
        self.store.insert_item(&item).await?;

        info!(user_id = %owner_id, item_id = %item.id, source = %item.source_type, "item created");
        Ok(item)
    }

    pub async fn get_item(&self, item_id: Uuid, actor_id: Uuid) -> Result<Item> {
        let item = load_item(self.store.as_ref(), item_id).await?;
        lifecycle::ensure_owner(&item, actor_id)?;
        Ok(item)
    }

    pub async fn items_by_status(&self, actor_id: Uuid, status: &str) -> Result<Vec<Item>> {
        let status: ItemStatus = status.parse()?;
        self.store.items_by_owner_and_status(actor_id, status).await
    }

    pub async fn start_interval(
        &self,
        item_id: Uuid,
        actor_id: Uuid,
        interval_days: i64,
        now: DateTime<Utc>,
    ) -> Result<Item> {
        let mut item = load_item(self.store.as_ref(), item_id).await?;
        let guard = ItemGuard::of(&item);
        lifecycle::start_interval(&mut item, actor_id, interval_days, now)?;
        save_guarded(self.store.as_ref(), &item, guard).await?;

        info!(user_id = %actor_id, %item_id, interval_days, "interval started");
        Ok(item)
    }

    pub async fn review_interval(
        &self,
        item_id: Uuid,
        actor_id: Uuid,
        rating: i64,
        now: DateTime<Utc>,
    ) -> Result<IntervalReviewResponse> {
        let mut item = load_item(self.store.as_ref(), item_id).await?;
        let guard = ItemGuard::of(&item);
        let record = lifecycle::review_interval(&mut item, actor_id, rating, now)?;

        if !self.store.record_interval_review(&item, guard, &record).await? {
            return Err(concurrent_change(&item, guard));
        }
        complete_task_best_effort(self.store.as_ref(), actor_id, item_id, now).await;

        info!(
            user_id = %actor_id,
            %item_id,
            rating = record.rating,
            review_count = item.review_count,
            "interval review recorded"
        );
        Ok(IntervalReviewResponse {
            next_review_at: item.interval_next_review_at,
            rating: record.rating,
            item,
        })
    }

    pub async fn interval_stats(&self, item_id: Uuid, actor_id: Uuid) -> Result<IntervalStats> {
        let item = load_item(self.store.as_ref(), item_id).await?;
        lifecycle::ensure_owner(&item, actor_id)?;
        let (average, total) = self.store.interval_rating_summary(item_id).await?;
        Ok(IntervalStats::from_summary(average, total))
    }

    pub async fn activate_to_fsrs(
        &self,
        item_id: Uuid,
        actor_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Item> {
        let mut item = load_item(self.store.as_ref(), item_id).await?;
        let guard = ItemGuard::of(&item);
        lifecycle::activate_to_fsrs(&mut item, actor_id, now)?;
        save_guarded(self.store.as_ref(), &item, guard).await?;

        info!(user_id = %actor_id, %item_id, "item activated to fsrs");
        Ok(item)
    }

    /// FSRS review, settling graduation when the item crosses the threshold.
    pub async fn review_item(
        &self,
        item_id: Uuid,
        actor_id: Uuid,
        rating: i64,
        now: DateTime<Utc>,
    ) -> Result<ReviewItemResponse> {
        let mut item = load_item(self.store.as_ref(), item_id).await?;
        let guard = ItemGuard::of(&item);
        let mut review = lifecycle::review_fsrs(&mut item, actor_id, rating, now, &self.engine)?;

        if review.graduation_due {
            let in_class = self.store.in_active_scripture_class(item.owner_id).await?;
            let outcome =
                governance::settle_review(&mut item, &mut review, in_class, now, &self.engine);
            info!(user_id = %actor_id, %item_id, ?outcome, "graduation threshold reached");
        }

        save_guarded(self.store.as_ref(), &item, guard).await?;
        complete_task_best_effort(self.store.as_ref(), actor_id, item_id, now).await;

        debug!(
            %item_id,
            stability = item.stability(),
            difficulty = item.difficulty(),
            interval_days = review.interval_days,
            "fsrs review applied"
        );
        Ok(ReviewItemResponse {
            interval_days: review.interval_days,
            next_review_at: review.next_review_at,
            graduated: review.graduated(),
            pending_graduate: review.pending_graduate(),
            review_count: item.review_count,
            item,
        })
    }

    pub async fn deactivate_item(&self, item_id: Uuid, actor_id: Uuid) -> Result<Item> {
        let mut item = load_item(self.store.as_ref(), item_id).await?;
        let guard = ItemGuard::of(&item);
        lifecycle::deactivate(&mut item, actor_id)?;
        save_guarded(self.store.as_ref(), &item, guard).await?;

        info!(user_id = %actor_id, %item_id, "item deactivated");
        Ok(item)
    }

    pub async fn reactivate_item(&self, item_id: Uuid, actor_id: Uuid) -> Result<Item> {
        let mut item = load_item(self.store.as_ref(), item_id).await?;
        let guard = ItemGuard::of(&item);
        lifecycle::reactivate(&mut item, actor_id)?;
        save_guarded(self.store.as_ref(), &item, guard).await?;

        info!(user_id = %actor_id, %item_id, "item reactivated");
        Ok(item)
    }

    /// Deadline sweep: promote every interval item whose fixed end has passed.
    ///
    /// Items changed concurrently are skipped rather than failing the sweep.
    pub async fn promote_due_intervals(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<Vec<Item>> {
        let due = self.store.interval_deadline_reached(user_id, now).await?;
        let mut promoted = Vec::with_capacity(due.len());

        for mut item in due {
            let guard = ItemGuard::of(&item);
            lifecycle::promote_on_deadline(&mut item, now)?;
            match save_guarded(self.store.as_ref(), &item, guard).await {
                Ok(()) => promoted.push(item),
                Err(ApiError::Conflict(_)) => continue,
                Err(e) => return Err(e),
            }
        }

        if !promoted.is_empty() {
            info!(%user_id, count = promoted.len(), "interval items promoted to fsrs");
        }
        Ok(promoted)
    }
}
