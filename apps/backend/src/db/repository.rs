//! Persistence contract consumed by the services.
//!
//! Every store (PostgreSQL, in-memory) implements all of these traits; the
//! services only ever see an `Arc<dyn Store>`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    ChapterGroup, ClassInfo, DailyTask, DueCard, GraduationDecision, IntervalReviewRecord, Item,
    ItemGuard, ItemStatus, TaskState,
};

#[async_trait]
pub trait ItemRepository: Send + Sync {
    async fn get_item(&self, id: Uuid) -> Result<Option<Item>>;

    async fn insert_item(&self, item: &Item) -> Result<()>;

    /// Write `item` only while the stored row still matches `guard`.
    ///
    /// Returns `false` when another writer got there first.
    async fn update_item_guarded(&self, item: &Item, guard: ItemGuard) -> Result<bool>;

    async fn items_by_owner_and_status(&self, owner_id: Uuid, status: ItemStatus)
        -> Result<Vec<Item>>;

    /// `interval` items whose legacy fixed deadline is at or before `now`.
    async fn interval_deadline_reached(&self, owner_id: Uuid, now: DateTime<Utc>)
        -> Result<Vec<Item>>;

    /// `interval` items whose recurring review time has arrived.
    async fn interval_reviews_due(&self, owner_id: Uuid, now: DateTime<Utc>) -> Result<Vec<Item>>;

    /// `fsrs_active` items never scheduled, or scheduled at or before `now`.
    async fn fsrs_due(&self, owner_id: Uuid, now: DateTime<Utc>) -> Result<Vec<Item>>;

    /// Scripture items in `fsrs_active`; the graduation sweep filters further.
    async fn graduation_candidates(&self, owner_id: Uuid) -> Result<Vec<Item>>;

    /// Graduated items belonging to any of `group_ids`.
    async fn graduates_in_groups(&self, owner_id: Uuid, group_ids: &[Uuid]) -> Result<Vec<Item>>;

    /// Scripture items in `pending_graduate` owned by any of `owner_ids`.
    async fn pending_graduates(&self, owner_ids: &[Uuid]) -> Result<Vec<Item>>;
}

#[async_trait]
pub trait IntervalReviewRepository: Send + Sync {
    /// Apply a guarded item update and append its review record as one unit.
    ///
    /// Returns `false`, writing nothing, when the item no longer matches `guard`.
    async fn record_interval_review(
        &self,
        item: &Item,
        guard: ItemGuard,
        record: &IntervalReviewRecord,
    ) -> Result<bool>;

    /// Average rating and number of ratings for one item.
    async fn interval_rating_summary(&self, item_id: Uuid) -> Result<(f64, u64)>;
}

#[async_trait]
pub trait DailyTaskRepository: Send + Sync {
    /// Atomically swap a user's rows for `date` with `tasks`.
    async fn replace_day(&self, user_id: Uuid, date: NaiveDate, tasks: &[DailyTask]) -> Result<()>;

    /// Rows for `date`, ordered by position.
    async fn list_day(&self, user_id: Uuid, date: NaiveDate) -> Result<Vec<DailyTask>>;

    /// Move pending rows keyed by `key` to `state`. Card rows are keyed by
    /// their card id; item ids only key rows without a card.
    ///
    /// Returns `false` when no pending row matched.
    async fn transition_pending(
        &self,
        user_id: Uuid,
        date: NaiveDate,
        key: Uuid,
        state: TaskState,
    ) -> Result<bool>;
}

#[async_trait]
pub trait GraduationRepository: Send + Sync {
    async fn record_decision(&self, decision: &GraduationDecision) -> Result<()>;

    /// Oldest first.
    async fn decisions_for_item(&self, item_id: Uuid) -> Result<Vec<GraduationDecision>>;
}

#[async_trait]
pub trait ClassDirectory: Send + Sync {
    async fn get_class(&self, class_id: Uuid) -> Result<Option<ClassInfo>>;

    async fn is_member(&self, class_id: Uuid, user_id: Uuid) -> Result<bool>;

    /// Whether `user_id` belongs to at least one active Quran class.
    async fn in_active_scripture_class(&self, user_id: Uuid) -> Result<bool>;

    async fn members(&self, class_id: Uuid) -> Result<Vec<Uuid>>;
}

#[async_trait]
pub trait ChapterGroupDirectory: Send + Sync {
    /// All of a user's chapter groups, active or not.
    async fn chapter_groups(&self, user_id: Uuid) -> Result<Vec<ChapterGroup>>;
}

/// Legacy card-based review state, read as one more due-work source.
#[async_trait]
pub trait CardDueFeed: Send + Sync {
    /// Active cards due at or before `now`, oldest due first.
    async fn due_cards(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
        limit: Option<usize>,
    ) -> Result<Vec<DueCard>>;
}

/// Everything a scheduling service needs from storage.
pub trait Store:
    ItemRepository
    + IntervalReviewRepository
    + DailyTaskRepository
    + GraduationRepository
    + ClassDirectory
    + ChapterGroupDirectory
    + CardDueFeed
{
}

impl<T> Store for T where
    T: ItemRepository
        + IntervalReviewRepository
        + DailyTaskRepository
        + GraduationRepository
        + ClassDirectory
        + ChapterGroupDirectory
        + CardDueFeed
{
}
