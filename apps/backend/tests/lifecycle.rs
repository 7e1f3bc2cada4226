//! Item lifecycle through the services, with an explicit clock.

mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use common::fixtures::{self, days, midnight, now};
use common::TestContext;
use pretty_assertions::assert_eq;
use uuid::Uuid;

use murajaah_backend::db::{
    CardDueFeed, ChapterGroupDirectory, ClassDirectory, DailyTaskRepository, GraduationRepository,
    IntervalReviewRepository, ItemRepository, MemoryStore,
};
use murajaah_backend::error::{ApiError, Result};
use murajaah_backend::models::{
    ChapterGroup, ClassInfo, CreateItemRequest, DailyTask, DueCard, GraduationDecision,
    IntervalReviewRecord, Item, ItemGuard, ItemStatus, Performance, SourceType, TaskSource,
    TaskState,
};
use murajaah_backend::AppState;
use murajaah_core::EngineConfig;

fn create_request(source_type: SourceType) -> CreateItemRequest {
    CreateItemRequest {
        source_type,
        content_ref: "surah:67".to_string(),
        estimated_review_seconds: 90,
    }
}

#[tokio::test]
async fn test_create_item_starts_in_menghafal() {
    let ctx = TestContext::new();
    let user = Uuid::new_v4();

    let item = ctx
        .state
        .items
        .create_item(user, create_request(SourceType::Quran), now())
        .await
        .unwrap();

    assert_eq!(item.status, ItemStatus::Menghafal);
    assert_eq!(item.review_count, 0);
    assert_eq!(item.estimated_review_seconds, 90);
    assert_eq!(ctx.reload(item.id).await, item);
}

#[tokio::test]
async fn test_create_item_requires_content_ref() {
    let ctx = TestContext::new();
    let mut request = create_request(SourceType::Personal);
    request.content_ref = "   ".to_string();

    let result = ctx.state.items.create_item(Uuid::new_v4(), request, now()).await;
    assert!(matches!(result, Err(ApiError::BadRequest(_))));
}

#[tokio::test]
async fn test_weekly_interval_review_cycle() {
    let ctx = TestContext::new();
    let user = Uuid::new_v4();
    let item = ctx.insert(fixtures::new_item(user, SourceType::Quran)).await;

    let started = ctx
        .state
        .items
        .start_interval(item.id, user, 7, now())
        .await
        .unwrap();
    assert_eq!(started.status, ItemStatus::Interval);
    assert_eq!(started.interval_next_review_at, Some(midnight(2026, 2, 13)));

    let early = ctx
        .state
        .items
        .review_interval(item.id, user, 2, now() + days(3))
        .await;
    assert!(matches!(early, Err(ApiError::TooEarly(_))));

    let reviewed = ctx
        .state
        .items
        .review_interval(item.id, user, 2, now() + days(7))
        .await
        .unwrap();
    assert_eq!(reviewed.next_review_at, Some(midnight(2026, 2, 20)));
    assert_eq!(reviewed.rating, 2);
    assert_eq!(reviewed.item.review_count, 1);
    assert_eq!(reviewed.item.status, ItemStatus::Interval);

    let stats = ctx.state.items.interval_stats(item.id, user).await.unwrap();
    assert_eq!(stats.total_reviews, 1);
    assert_eq!(stats.average_rating, 2.0);
    assert_eq!(stats.performance, Performance::Good);
}

#[tokio::test]
async fn test_interval_stats_without_reviews() {
    let ctx = TestContext::new();
    let user = Uuid::new_v4();
    let item = ctx.insert(fixtures::interval_item(user, 3, 1)).await;

    let stats = ctx.state.items.interval_stats(item.id, user).await.unwrap();
    assert_eq!(stats.total_reviews, 0);
    assert_eq!(stats.average_rating, 0.0);
    assert_eq!(stats.performance, Performance::NoReviews);
}

#[tokio::test]
async fn test_interval_review_rejects_wrong_phase_and_rating() {
    let ctx = TestContext::new();
    let user = Uuid::new_v4();
    let fresh = ctx.insert(fixtures::new_item(user, SourceType::Quran)).await;
    let interval = ctx.insert(fixtures::interval_item(user, 3, 5)).await;

    let result = ctx.state.items.review_interval(fresh.id, user, 2, now()).await;
    assert!(matches!(result, Err(ApiError::InvalidState(_))));

    for rating in [0, 4, -1] {
        let result = ctx
            .state
            .items
            .review_interval(interval.id, user, rating, now())
            .await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))), "rating {rating}");
    }
    assert_eq!(ctx.reload(interval.id).await.review_count, 0);
}

#[tokio::test]
async fn test_start_interval_rules() {
    let ctx = TestContext::new();
    let user = Uuid::new_v4();
    let item = ctx.insert(fixtures::new_item(user, SourceType::Personal)).await;

    let zero = ctx.state.items.start_interval(item.id, user, 0, now()).await;
    assert!(matches!(zero, Err(ApiError::BadRequest(_))));
    for huge in [3651, 100_000_000, i64::from(u32::MAX), i64::MAX] {
        let result = ctx.state.items.start_interval(item.id, user, huge, now()).await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }
    assert_eq!(ctx.reload(item.id).await.status, ItemStatus::Menghafal);

    let longest = ctx
        .state
        .items
        .start_interval(item.id, user, 3650, now())
        .await
        .unwrap();
    assert_eq!(longest.interval_days, 3650);
    assert_eq!(longest.interval_next_review_at, Some(midnight(2036, 2, 4)));

    let again = ctx.state.items.start_interval(item.id, user, 2, now()).await;
    assert!(matches!(again, Err(ApiError::InvalidState(_))));
}

#[tokio::test]
async fn test_other_users_items_are_forbidden() {
    let ctx = TestContext::new();
    let owner = Uuid::new_v4();
    let stranger = Uuid::new_v4();
    let item = ctx.insert(fixtures::interval_item(owner, 3, 5)).await;

    assert!(matches!(
        ctx.state.items.get_item(item.id, stranger).await,
        Err(ApiError::Forbidden(_))
    ));
    assert!(matches!(
        ctx.state.items.review_interval(item.id, stranger, 2, now()).await,
        Err(ApiError::Forbidden(_))
    ));
    assert!(matches!(
        ctx.state.items.activate_to_fsrs(item.id, stranger, now()).await,
        Err(ApiError::Forbidden(_))
    ));
    assert_eq!(ctx.reload(item.id).await, item);
}

#[tokio::test]
async fn test_missing_item_is_not_found() {
    let ctx = TestContext::new();
    let result = ctx
        .state
        .items
        .review_item(Uuid::new_v4(), Uuid::new_v4(), 3, now())
        .await;
    assert!(matches!(result, Err(ApiError::NotFound(_))));
}

#[tokio::test]
async fn test_activate_then_first_review_easy() {
    let ctx = TestContext::new();
    let user = Uuid::new_v4();
    let item = ctx.insert(fixtures::interval_item(user, 3, 10)).await;

    let activated = ctx
        .state
        .items
        .activate_to_fsrs(item.id, user, now() - days(5))
        .await
        .unwrap();
    assert_eq!(activated.status, ItemStatus::FsrsActive);
    assert_eq!(activated.fsrs_start_at, Some(now() - days(5)));
    assert_eq!(activated.interval_end_at, Some(now() - days(5)));
    assert_eq!(activated.next_review_at, Some(midnight(2026, 2, 4)));

    let review = ctx.state.items.review_item(item.id, user, 4, now()).await.unwrap();
    assert_eq!(review.review_count, 1);
    assert!(!review.graduated);
    assert!(!review.pending_graduate);
    assert!(review.interval_days >= 1);
    assert!(review.item.stability() > 1.0);
    assert!(review.item.difficulty() < 5.0);
    assert_eq!(review.next_review_at, review.item.next_review_at.unwrap());
    assert_eq!(
        review.next_review_at,
        murajaah_core::dates::start_of_day(review.next_review_at)
    );
}

#[tokio::test]
async fn test_fsrs_review_too_early_after_first_review() {
    let ctx = TestContext::new();
    let user = Uuid::new_v4();
    let item = ctx.insert(fixtures::fsrs_item(user, SourceType::Personal, 3)).await;

    let first = ctx.state.items.review_item(item.id, user, 3, now()).await.unwrap();
    assert!(first.next_review_at > now());

    let second = ctx
        .state
        .items
        .review_item(item.id, user, 3, now() + chrono::Duration::hours(1))
        .await;
    assert!(matches!(second, Err(ApiError::TooEarly(_))));
    assert_eq!(ctx.reload(item.id).await.review_count, 1);
}

#[tokio::test]
async fn test_fsrs_review_rejects_bad_rating_and_phase() {
    let ctx = TestContext::new();
    let user = Uuid::new_v4();
    let active = ctx.insert(fixtures::fsrs_item(user, SourceType::Personal, 3)).await;
    let fresh = ctx.insert(fixtures::new_item(user, SourceType::Personal)).await;

    assert!(matches!(
        ctx.state.items.review_item(active.id, user, 5, now()).await,
        Err(ApiError::BadRequest(_))
    ));
    assert!(matches!(
        ctx.state.items.review_item(fresh.id, user, 3, now()).await,
        Err(ApiError::InvalidState(_))
    ));
}

#[tokio::test]
async fn test_deactivate_and_reactivate_personal_items_only() {
    let ctx = TestContext::new();
    let user = Uuid::new_v4();
    let personal = ctx.insert(fixtures::fsrs_item(user, SourceType::Personal, 3)).await;
    let quran = ctx.insert(fixtures::fsrs_item(user, SourceType::Quran, 3)).await;

    let inactive = ctx.state.items.deactivate_item(personal.id, user).await.unwrap();
    assert_eq!(inactive.status, ItemStatus::Inactive);
    let active = ctx.state.items.reactivate_item(personal.id, user).await.unwrap();
    assert_eq!(active.status, ItemStatus::FsrsActive);

    assert!(matches!(
        ctx.state.items.deactivate_item(quran.id, user).await,
        Err(ApiError::InvalidState(_))
    ));
    assert!(matches!(
        ctx.state.items.reactivate_item(personal.id, user).await,
        Err(ApiError::InvalidState(_))
    ));
}

#[tokio::test]
async fn test_items_by_status() {
    let ctx = TestContext::new();
    let user = Uuid::new_v4();
    ctx.insert(fixtures::new_item(user, SourceType::Quran)).await;
    let interval = ctx.insert(fixtures::interval_item(user, 3, 1)).await;
    ctx.insert(fixtures::interval_item(Uuid::new_v4(), 3, 1)).await;

    let items = ctx.state.items.items_by_status(user, "interval").await.unwrap();
    assert_eq!(items, vec![interval]);

    assert!(matches!(
        ctx.state.items.items_by_status(user, "memorised").await,
        Err(ApiError::BadRequest(_))
    ));
}

#[tokio::test]
async fn test_deadline_promotion_starts_fsrs_clock_now() {
    let ctx = TestContext::new();
    let user = Uuid::new_v4();
    let mut overdue = fixtures::interval_item(user, 7, 40);
    overdue.interval_end_at = Some(now() - days(10));
    let overdue = ctx.insert(overdue).await;
    let mut running = fixtures::interval_item(user, 7, 2);
    running.interval_end_at = Some(now() + days(20));
    let running = ctx.insert(running).await;

    let promoted = ctx.state.items.promote_due_intervals(user, now()).await.unwrap();
    assert_eq!(promoted.len(), 1);
    assert_eq!(promoted[0].id, overdue.id);

    let stored = ctx.reload(overdue.id).await;
    assert_eq!(stored.status, ItemStatus::FsrsActive);
    assert_eq!(stored.fsrs_start_at, Some(now()));
    assert_eq!(ctx.reload(running.id).await.status, ItemStatus::Interval);
}

#[tokio::test]
async fn test_stale_write_loses() {
    let ctx = TestContext::new();
    let user = Uuid::new_v4();
    let item = ctx.insert(fixtures::interval_item(user, 3, 5)).await;
    let stale_guard = ItemGuard::of(&item);

    ctx.state
        .items
        .review_interval(item.id, user, 3, now())
        .await
        .unwrap();

    let mut stale = item.clone();
    stale.status = ItemStatus::FsrsActive;
    let applied = ctx.store.update_item_guarded(&stale, stale_guard).await.unwrap();
    assert!(!applied);
    assert_eq!(ctx.reload(item.id).await.status, ItemStatus::Interval);

    let record = IntervalReviewRecord {
        id: Uuid::new_v4(),
        user_id: user,
        item_id: item.id,
        rating: 4,
        reviewed_at: now(),
    };
    let recorded = ctx
        .store
        .record_interval_review(&item, stale_guard, &record)
        .await
        .unwrap();
    assert!(!recorded);
    assert_eq!(ctx.store.interval_rating_summary(item.id).await.unwrap().1, 1);
}

/// Memory store whose interval review writes fail while `failing` is set.
struct FailingReviewStore {
    inner: MemoryStore,
    failing: AtomicBool,
}

#[async_trait]
impl ItemRepository for FailingReviewStore {
    async fn get_item(&self, id: Uuid) -> Result<Option<Item>> {
        self.inner.get_item(id).await
    }

    async fn insert_item(&self, item: &Item) -> Result<()> {
        self.inner.insert_item(item).await
    }

    async fn update_item_guarded(&self, item: &Item, guard: ItemGuard) -> Result<bool> {
        self.inner.update_item_guarded(item, guard).await
    }

    async fn items_by_owner_and_status(&self, owner_id: Uuid, status: ItemStatus) -> Result<Vec<Item>> {
        self.inner.items_by_owner_and_status(owner_id, status).await
    }

    async fn interval_deadline_reached(&self, owner_id: Uuid, now: DateTime<Utc>) -> Result<Vec<Item>> {
        self.inner.interval_deadline_reached(owner_id, now).await
    }

    async fn interval_reviews_due(&self, owner_id: Uuid, now: DateTime<Utc>) -> Result<Vec<Item>> {
        self.inner.interval_reviews_due(owner_id, now).await
    }

    async fn fsrs_due(&self, owner_id: Uuid, now: DateTime<Utc>) -> Result<Vec<Item>> {
        self.inner.fsrs_due(owner_id, now).await
    }

    async fn graduation_candidates(&self, owner_id: Uuid) -> Result<Vec<Item>> {
        self.inner.graduation_candidates(owner_id).await
    }

    async fn graduates_in_groups(&self, owner_id: Uuid, group_ids: &[Uuid]) -> Result<Vec<Item>> {
        self.inner.graduates_in_groups(owner_id, group_ids).await
    }

    async fn pending_graduates(&self, owner_ids: &[Uuid]) -> Result<Vec<Item>> {
        self.inner.pending_graduates(owner_ids).await
    }
}

#[async_trait]
impl IntervalReviewRepository for FailingReviewStore {
    async fn record_interval_review(
        &self,
        item: &Item,
        guard: ItemGuard,
        record: &IntervalReviewRecord,
    ) -> Result<bool> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ApiError::Database(sqlx::Error::PoolTimedOut));
        }
        self.inner.record_interval_review(item, guard, record).await
    }

    async fn interval_rating_summary(&self, item_id: Uuid) -> Result<(f64, u64)> {
        self.inner.interval_rating_summary(item_id).await
    }
}

#[async_trait]
impl DailyTaskRepository for FailingReviewStore {
    async fn replace_day(&self, user_id: Uuid, date: NaiveDate, tasks: &[DailyTask]) -> Result<()> {
        self.inner.replace_day(user_id, date, tasks).await
    }

    async fn list_day(&self, user_id: Uuid, date: NaiveDate) -> Result<Vec<DailyTask>> {
        self.inner.list_day(user_id, date).await
    }

    async fn transition_pending(
        &self,
        user_id: Uuid,
        date: NaiveDate,
        key: Uuid,
        state: TaskState,
    ) -> Result<bool> {
        self.inner.transition_pending(user_id, date, key, state).await
    }
}

#[async_trait]
impl GraduationRepository for FailingReviewStore {
    async fn record_decision(&self, decision: &GraduationDecision) -> Result<()> {
        self.inner.record_decision(decision).await
    }

    async fn decisions_for_item(&self, item_id: Uuid) -> Result<Vec<GraduationDecision>> {
        self.inner.decisions_for_item(item_id).await
    }
}

#[async_trait]
impl ClassDirectory for FailingReviewStore {
    async fn get_class(&self, class_id: Uuid) -> Result<Option<ClassInfo>> {
        self.inner.get_class(class_id).await
    }

    async fn is_member(&self, class_id: Uuid, user_id: Uuid) -> Result<bool> {
        self.inner.is_member(class_id, user_id).await
    }

    async fn in_active_scripture_class(&self, user_id: Uuid) -> Result<bool> {
        self.inner.in_active_scripture_class(user_id).await
    }

    async fn members(&self, class_id: Uuid) -> Result<Vec<Uuid>> {
        self.inner.members(class_id).await
    }
}

#[async_trait]
impl ChapterGroupDirectory for FailingReviewStore {
    async fn chapter_groups(&self, user_id: Uuid) -> Result<Vec<ChapterGroup>> {
        self.inner.chapter_groups(user_id).await
    }
}

#[async_trait]
impl CardDueFeed for FailingReviewStore {
    async fn due_cards(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
        limit: Option<usize>,
    ) -> Result<Vec<DueCard>> {
        self.inner.due_cards(user_id, now, limit).await
    }
}

#[tokio::test]
async fn test_failed_review_write_leaves_item_untouched() {
    let store = Arc::new(FailingReviewStore {
        inner: MemoryStore::new(),
        failing: AtomicBool::new(true),
    });
    let state = AppState::new(store.clone(), EngineConfig::default());
    let user = Uuid::new_v4();
    let item = fixtures::interval_item(user, 3, 5);
    store.insert_item(&item).await.unwrap();

    let failed = state.items.review_interval(item.id, user, 3, now()).await;
    assert!(matches!(failed, Err(ApiError::Database(_))));
    assert_eq!(store.get_item(item.id).await.unwrap(), Some(item.clone()));
    let stats = state.items.interval_stats(item.id, user).await.unwrap();
    assert_eq!(stats.total_reviews, 0);

    store.failing.store(false, Ordering::SeqCst);
    let retried = state
        .items
        .review_interval(item.id, user, 3, now())
        .await
        .unwrap();
    assert_eq!(retried.item.review_count, item.review_count + 1);
    let stats = state.items.interval_stats(item.id, user).await.unwrap();
    assert_eq!(stats.total_reviews, 1);
    assert_eq!(stats.average_rating, 3.0);
}

#[tokio::test]
async fn test_review_completes_todays_task() {
    let ctx = TestContext::new();
    let user = Uuid::new_v4();
    let item = ctx.insert(fixtures::interval_item(user, 3, 5)).await;

    let tasks = ctx.state.tasks.generate_today(user, now(), None).await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].source, TaskSource::IntervalRecurring);

    ctx.state
        .items
        .review_interval(item.id, user, 2, now())
        .await
        .unwrap();

    let today = ctx.today(user, now()).await;
    assert_eq!(today[0].state, TaskState::Done);
}

#[tokio::test]
async fn test_review_without_snapshot_still_succeeds() {
    let ctx = TestContext::new();
    let user = Uuid::new_v4();
    let item = ctx.insert(fixtures::fsrs_item(user, SourceType::Personal, 2)).await;

    let review = ctx.state.items.review_item(item.id, user, 1, now()).await;
    assert!(review.is_ok());
    assert!(ctx.today(user, now()).await.is_empty());
}
