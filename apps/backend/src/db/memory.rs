//! In-process store.
//!
//! Same semantics as the PostgreSQL adapter, held behind one `RwLock` so that
//! every trait method is atomic. Collaborator data (classes, chapter groups,
//! legacy cards) is seeded through the inherent helpers.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::repository::{
    CardDueFeed, ChapterGroupDirectory, ClassDirectory, DailyTaskRepository, GraduationRepository,
    IntervalReviewRepository, ItemRepository,
};
use crate::error::Result;
use crate::models::{
    ChapterGroup, ClassInfo, ClassKind, DailyTask, DueCard, GraduationDecision,
    IntervalReviewRecord, Item, ItemGuard, ItemStatus, SourceType, TaskState,
};

#[derive(Debug, Clone)]
struct CardState {
    user_id: Uuid,
    card: DueCard,
}

#[derive(Default)]
struct Inner {
    items: HashMap<Uuid, Item>,
    interval_reviews: Vec<IntervalReviewRecord>,
    tasks: HashMap<(Uuid, NaiveDate), Vec<DailyTask>>,
    decisions: Vec<GraduationDecision>,
    classes: HashMap<Uuid, ClassInfo>,
    memberships: HashMap<Uuid, HashSet<Uuid>>,
    groups: Vec<ChapterGroup>,
    group_items: HashMap<Uuid, HashSet<Uuid>>,
    cards: Vec<CardState>,
}

/// Store backed by process memory
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

fn sorted_by<K: Ord>(mut items: Vec<Item>, key: impl Fn(&Item) -> K) -> Vec<Item> {
    items.sort_by(|a, b| key(a).cmp(&key(b)).then(a.created_at.cmp(&b.created_at)).then(a.id.cmp(&b.id)));
    items
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_class(&self, class: ClassInfo) {
        self.inner.write().await.classes.insert(class.id, class);
    }

    pub async fn add_member(&self, class_id: Uuid, user_id: Uuid) {
        self.inner
            .write()
            .await
            .memberships
            .entry(class_id)
            .or_default()
            .insert(user_id);
    }

    pub async fn add_chapter_group(&self, group: ChapterGroup) {
        self.inner.write().await.groups.push(group);
    }

    pub async fn set_chapter_group_active(&self, group_id: Uuid, active: bool) {
        let mut inner = self.inner.write().await;
        if let Some(group) = inner.groups.iter_mut().find(|g| g.id == group_id) {
            group.is_active = active;
        }
    }

    pub async fn assign_to_group(&self, group_id: Uuid, item_id: Uuid) {
        self.inner
            .write()
            .await
            .group_items
            .entry(group_id)
            .or_default()
            .insert(item_id);
    }

    pub async fn add_card(&self, user_id: Uuid, card: DueCard) {
        self.inner.write().await.cards.push(CardState {
            user_id,
            card,
        });
    }

    async fn owned_where(&self, owner_id: Uuid, pred: impl Fn(&Item) -> bool) -> Vec<Item> {
        self.inner
            .read()
            .await
            .items
            .values()
            .filter(|item| item.owner_id == owner_id && pred(item))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ItemRepository for MemoryStore {
    async fn get_item(&self, id: Uuid) -> Result<Option<Item>> {
        Ok(self.inner.read().await.items.get(&id).cloned())
    }

    async fn insert_item(&self, item: &Item) -> Result<()> {
        self.inner.write().await.items.insert(item.id, item.clone());
        Ok(())
    }

    async fn update_item_guarded(&self, item: &Item, guard: ItemGuard) -> Result<bool> {
        let mut inner = self.inner.write().await;
        match inner.items.get_mut(&item.id) {
            Some(stored) if ItemGuard::of(stored) == guard => {
                *stored = item.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn items_by_owner_and_status(
        &self,
        owner_id: Uuid,
        status: ItemStatus,
    ) -> Result<Vec<Item>> {
        let items = self.owned_where(owner_id, |i| i.status == status).await;
        Ok(sorted_by(items, |i| i.created_at))
    }

    async fn interval_deadline_reached(
        &self,
        owner_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<Item>> {
        let items = self
            .owned_where(owner_id, |i| {
                i.status == ItemStatus::Interval && i.interval_end_at.is_some_and(|end| end <= now)
            })
            .await;
        Ok(sorted_by(items, |i| i.interval_end_at))
    }

    async fn interval_reviews_due(&self, owner_id: Uuid, now: DateTime<Utc>) -> Result<Vec<Item>> {
        let items = self
            .owned_where(owner_id, |i| {
                i.status == ItemStatus::Interval
                    && i.interval_next_review_at.is_some_and(|next| next <= now)
            })
            .await;
        Ok(sorted_by(items, |i| i.interval_next_review_at))
    }

    async fn fsrs_due(&self, owner_id: Uuid, now: DateTime<Utc>) -> Result<Vec<Item>> {
        let items = self
            .owned_where(owner_id, |i| {
                i.status == ItemStatus::FsrsActive && i.next_review_at.map_or(true, |next| next <= now)
            })
            .await;
        Ok(sorted_by(items, |i| i.next_review_at))
    }

    async fn graduation_candidates(&self, owner_id: Uuid) -> Result<Vec<Item>> {
        let items = self
            .owned_where(owner_id, |i| {
                i.status == ItemStatus::FsrsActive && i.source_type == SourceType::Quran
            })
            .await;
        Ok(sorted_by(items, |i| i.created_at))
    }

    async fn graduates_in_groups(&self, owner_id: Uuid, group_ids: &[Uuid]) -> Result<Vec<Item>> {
        let members: HashSet<Uuid> = {
            let inner = self.inner.read().await;
            group_ids
                .iter()
                .filter_map(|g| inner.group_items.get(g))
                .flatten()
                .copied()
                .collect()
        };
        let items = self
            .owned_where(owner_id, |i| {
                i.status == ItemStatus::Graduate && members.contains(&i.id)
            })
            .await;
        Ok(sorted_by(items, |i| i.next_review_at))
    }

    async fn pending_graduates(&self, owner_ids: &[Uuid]) -> Result<Vec<Item>> {
        let inner = self.inner.read().await;
        let items = inner
            .items
            .values()
            .filter(|i| {
                i.status == ItemStatus::PendingGraduate
                    && i.source_type == SourceType::Quran
                    && owner_ids.contains(&i.owner_id)
            })
            .cloned()
            .collect();
        Ok(sorted_by(items, |i| i.created_at))
    }
}

#[async_trait]
impl IntervalReviewRepository for MemoryStore {
    async fn record_interval_review(
        &self,
        item: &Item,
        guard: ItemGuard,
        record: &IntervalReviewRecord,
    ) -> Result<bool> {
        let mut inner = self.inner.write().await;
        match inner.items.get_mut(&item.id) {
            Some(stored) if ItemGuard::of(stored) == guard => *stored = item.clone(),
            _ => return Ok(false),
        }
        inner.interval_reviews.push(record.clone());
        Ok(true)
    }

    async fn interval_rating_summary(&self, item_id: Uuid) -> Result<(f64, u64)> {
        let inner = self.inner.read().await;
        let ratings: Vec<f64> = inner
            .interval_reviews
            .iter()
            .filter(|r| r.item_id == item_id)
            .map(|r| f64::from(r.rating))
            .collect();
        if ratings.is_empty() {
            return Ok((0.0, 0));
        }
        let total = ratings.len() as u64;
        Ok((ratings.iter().sum::<f64>() / total as f64, total))
    }
}

#[async_trait]
impl DailyTaskRepository for MemoryStore {
    async fn replace_day(&self, user_id: Uuid, date: NaiveDate, tasks: &[DailyTask]) -> Result<()> {
        self.inner
            .write()
            .await
            .tasks
            .insert((user_id, date), tasks.to_vec());
        Ok(())
    }

    async fn list_day(&self, user_id: Uuid, date: NaiveDate) -> Result<Vec<DailyTask>> {
        let mut tasks = self
            .inner
            .read()
            .await
            .tasks
            .get(&(user_id, date))
            .cloned()
            .unwrap_or_default();
        tasks.sort_by_key(|t| t.position);
        Ok(tasks)
    }

    async fn transition_pending(
        &self,
        user_id: Uuid,
        date: NaiveDate,
        key: Uuid,
        state: TaskState,
    ) -> Result<bool> {
        let mut inner = self.inner.write().await;
        let mut changed = false;
        if let Some(tasks) = inner.tasks.get_mut(&(user_id, date)) {
            for task in tasks
                .iter_mut()
                .filter(|t| t.state == TaskState::Pending && t.matches_key(key))
            {
                task.state = state;
                changed = true;
            }
        }
        Ok(changed)
    }
}

#[async_trait]
impl GraduationRepository for MemoryStore {
    async fn record_decision(&self, decision: &GraduationDecision) -> Result<()> {
        self.inner.write().await.decisions.push(decision.clone());
        Ok(())
    }

    async fn decisions_for_item(&self, item_id: Uuid) -> Result<Vec<GraduationDecision>> {
        Ok(self
            .inner
            .read()
            .await
            .decisions
            .iter()
            .filter(|d| d.item_id == item_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ClassDirectory for MemoryStore {
    async fn get_class(&self, class_id: Uuid) -> Result<Option<ClassInfo>> {
        Ok(self.inner.read().await.classes.get(&class_id).cloned())
    }

    async fn is_member(&self, class_id: Uuid, user_id: Uuid) -> Result<bool> {
        Ok(self
            .inner
            .read()
            .await
            .memberships
            .get(&class_id)
            .is_some_and(|m| m.contains(&user_id)))
    }

    async fn in_active_scripture_class(&self, user_id: Uuid) -> Result<bool> {
        let inner = self.inner.read().await;
        Ok(inner.memberships.iter().any(|(class_id, members)| {
            members.contains(&user_id)
                && inner
                    .classes
                    .get(class_id)
                    .is_some_and(|c| c.is_active && c.kind == ClassKind::Quran)
        }))
    }

    async fn members(&self, class_id: Uuid) -> Result<Vec<Uuid>> {
        let mut members: Vec<Uuid> = self
            .inner
            .read()
            .await
            .memberships
            .get(&class_id)
            .map(|m| m.iter().copied().collect())
            .unwrap_or_default();
        members.sort();
        Ok(members)
    }
}

#[async_trait]
impl ChapterGroupDirectory for MemoryStore {
    async fn chapter_groups(&self, user_id: Uuid) -> Result<Vec<ChapterGroup>> {
        let mut groups: Vec<ChapterGroup> = self
            .inner
            .read()
            .await
            .groups
            .iter()
            .filter(|g| g.user_id == user_id)
            .cloned()
            .collect();
        groups.sort_by_key(|g| g.index);
        Ok(groups)
    }
}

#[async_trait]
impl CardDueFeed for MemoryStore {
    async fn due_cards(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
        limit: Option<usize>,
    ) -> Result<Vec<DueCard>> {
        let mut due: Vec<DueCard> = self
            .inner
            .read()
            .await
            .cards
            .iter()
            .filter(|c| c.user_id == user_id && c.card.next_review_at <= now)
            .map(|c| c.card.clone())
            .collect();
        due.sort_by(|a, b| {
            a.next_review_at
                .cmp(&b.next_review_at)
                .then(a.stability.total_cmp(&b.stability))
        });
        if let Some(limit) = limit.filter(|n| *n > 0) {
            due.truncate(limit);
        }
        Ok(due)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use murajaah_core::types::TaskSource;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 6, 9, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_guarded_update_rejects_stale_writer() {
        let store = MemoryStore::new();
        let mut item = Item::new(Uuid::new_v4(), SourceType::Personal, "note:1", now());
        store.insert_item(&item).await.unwrap();

        let guard = ItemGuard::of(&item);
        item.status = ItemStatus::Interval;
        assert!(store.update_item_guarded(&item, guard).await.unwrap());
        assert!(!store.update_item_guarded(&item, guard).await.unwrap());
    }

    #[tokio::test]
    async fn test_transition_only_from_pending() {
        let store = MemoryStore::new();
        let user_id = Uuid::new_v4();
        let item_id = Uuid::new_v4();
        let task = DailyTask {
            id: Uuid::new_v4(),
            user_id,
            item_id,
            card_id: None,
            task_date: now().date_naive(),
            position: 0,
            source: TaskSource::Fsrs,
            state: TaskState::Pending,
            created_at: now(),
        };
        store.replace_day(user_id, task.task_date, &[task.clone()]).await.unwrap();

        let date = task.task_date;
        assert!(store.transition_pending(user_id, date, item_id, TaskState::Done).await.unwrap());
        assert!(!store.transition_pending(user_id, date, item_id, TaskState::Skipped).await.unwrap());
    }

    #[tokio::test]
    async fn test_due_cards_order_and_limit() {
        let store = MemoryStore::new();
        let user_id = Uuid::new_v4();
        for (n, (hours_ago, stability)) in [(1, 5.0), (3, 2.0), (3, 1.0), (-2, 0.5)].into_iter().enumerate() {
            store
                .add_card(
                    user_id,
                    DueCard {
                        item_id: Uuid::from_u128(n as u128),
                        card_id: Uuid::from_u128(100 + n as u128),
                        next_review_at: now() - Duration::hours(hours_ago),
                        stability,
                    },
                )
                .await;
        }

        let due = store.due_cards(user_id, now(), Some(2)).await.unwrap();
        let stabilities: Vec<f64> = due.iter().map(|c| c.stability).collect();
        assert_eq!(stabilities, vec![1.0, 2.0]);
    }
}
