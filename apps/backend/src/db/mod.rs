//! PostgreSQL database operations

pub mod memory;
pub mod repository;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{postgres::PgPoolOptions, PgExecutor, PgPool, Row};
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

pub use memory::MemoryStore;
pub use repository::{
    CardDueFeed, ChapterGroupDirectory, ClassDirectory, DailyTaskRepository, GraduationRepository,
    IntervalReviewRepository, ItemRepository, Store,
};

const ITEM_SELECT: &str = r#"
    SELECT id, owner_id, source_type, content_ref, status,
           interval_days, interval_start_at, interval_next_review_at, interval_end_at,
           stability, difficulty, review_count, last_review_at, next_review_at, fsrs_start_at,
           approved_by, approved_at, estimated_review_seconds, created_at
    FROM items
"#;

fn to_items(rows: Vec<DbItem>) -> Result<Vec<Item>> {
    rows.iter().map(DbItem::to_core_item).collect()
}

/// Database wrapper with connection pool
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect to PostgreSQL and create connection pool
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_items(&self, filter: &str, owner_id: Uuid) -> Result<Vec<Item>> {
        let sql = format!("{ITEM_SELECT} {filter}");
        let rows = sqlx::query_as::<_, DbItem>(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;
        to_items(rows)
    }

    async fn fetch_items_at(
        &self,
        filter: &str,
        owner_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<Item>> {
        let sql = format!("{ITEM_SELECT} {filter}");
        let rows = sqlx::query_as::<_, DbItem>(&sql)
            .bind(owner_id)
            .bind(now)
            .fetch_all(&self.pool)
            .await?;
        to_items(rows)
    }
}

/// Write `item` only while the row still matches `guard`.
async fn update_guarded<'e>(
    executor: impl PgExecutor<'e>,
    item: &Item,
    guard: ItemGuard,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE items
        SET status = $4,
            interval_days = $5,
            interval_start_at = $6,
            interval_next_review_at = $7,
            interval_end_at = $8,
            stability = $9,
            difficulty = $10,
            review_count = $11,
            last_review_at = $12,
            next_review_at = $13,
            fsrs_start_at = $14,
            approved_by = $15,
            approved_at = $16,
            estimated_review_seconds = $17,
            updated_at = NOW()
        WHERE id = $1 AND status = $2 AND review_count = $3
        "#,
    )
    .bind(item.id)
    .bind(guard.status.as_str())
    .bind(int4(guard.review_count))
    .bind(item.status.as_str())
    .bind(int4(item.interval_days))
    .bind(item.interval_start_at)
    .bind(item.interval_next_review_at)
    .bind(item.interval_end_at)
    .bind(item.stability())
    .bind(item.difficulty())
    .bind(int4(item.review_count))
    .bind(item.last_review_at)
    .bind(item.next_review_at)
    .bind(item.fsrs_start_at)
    .bind(item.approved_by)
    .bind(item.approved_at)
    .bind(int4(item.estimated_review_seconds))
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Saturating conversion into an INTEGER column.
fn int4(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

// === Item Repository ===

#[async_trait]
impl ItemRepository for Database {
    async fn get_item(&self, id: Uuid) -> Result<Option<Item>> {
        let sql = format!("{ITEM_SELECT} WHERE id = $1");
        let row = sqlx::query_as::<_, DbItem>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| r.to_core_item()).transpose()
    }

    async fn insert_item(&self, item: &Item) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO items (id, owner_id, source_type, content_ref, status,
                               interval_days, stability, difficulty, review_count,
                               estimated_review_seconds, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(item.id)
        .bind(item.owner_id)
        .bind(item.source_type.as_str())
        .bind(&item.content_ref)
        .bind(item.status.as_str())
        .bind(int4(item.interval_days))
        .bind(item.stability())
        .bind(item.difficulty())
        .bind(int4(item.review_count))
        .bind(int4(item.estimated_review_seconds))
        .bind(item.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_item_guarded(&self, item: &Item, guard: ItemGuard) -> Result<bool> {
        update_guarded(&self.pool, item, guard).await
    }

    async fn items_by_owner_and_status(
        &self,
        owner_id: Uuid,
        status: ItemStatus,
    ) -> Result<Vec<Item>> {
        let sql = format!("{ITEM_SELECT} WHERE owner_id = $1 AND status = $2 ORDER BY created_at, id");
        let rows = sqlx::query_as::<_, DbItem>(&sql)
            .bind(owner_id)
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await?;
        to_items(rows)
    }

    async fn interval_deadline_reached(
        &self,
        owner_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<Item>> {
        self.fetch_items_at(
            r#"
            WHERE owner_id = $1 AND status = 'interval'
              AND interval_end_at IS NOT NULL AND interval_end_at <= $2
            ORDER BY interval_end_at, created_at, id
            "#,
            owner_id,
            now,
        )
        .await
    }

    async fn interval_reviews_due(&self, owner_id: Uuid, now: DateTime<Utc>) -> Result<Vec<Item>> {
        self.fetch_items_at(
            r#"
            WHERE owner_id = $1 AND status = 'interval'
              AND interval_next_review_at IS NOT NULL AND interval_next_review_at <= $2
            ORDER BY interval_next_review_at, created_at, id
            "#,
            owner_id,
            now,
        )
        .await
    }

    async fn fsrs_due(&self, owner_id: Uuid, now: DateTime<Utc>) -> Result<Vec<Item>> {
        self.fetch_items_at(
            r#"
            WHERE owner_id = $1 AND status = 'fsrs_active'
              AND (next_review_at IS NULL OR next_review_at <= $2)
            ORDER BY next_review_at ASC NULLS FIRST, created_at, id
            "#,
            owner_id,
            now,
        )
        .await
    }

    async fn graduation_candidates(&self, owner_id: Uuid) -> Result<Vec<Item>> {
        self.fetch_items(
            r#"
            WHERE owner_id = $1 AND status = 'fsrs_active' AND source_type = 'quran'
            ORDER BY created_at, id
            "#,
            owner_id,
        )
        .await
    }

    async fn graduates_in_groups(&self, owner_id: Uuid, group_ids: &[Uuid]) -> Result<Vec<Item>> {
        let sql = format!(
            r#"{ITEM_SELECT}
            WHERE owner_id = $1 AND status = 'graduate'
              AND id IN (SELECT item_id FROM juz_items WHERE juz_id = ANY($2))
            ORDER BY next_review_at ASC NULLS FIRST, created_at, id
            "#
        );
        let rows = sqlx::query_as::<_, DbItem>(&sql)
            .bind(owner_id)
            .bind(group_ids)
            .fetch_all(&self.pool)
            .await?;
        to_items(rows)
    }

    async fn pending_graduates(&self, owner_ids: &[Uuid]) -> Result<Vec<Item>> {
        let sql = format!(
            r#"{ITEM_SELECT}
            WHERE owner_id = ANY($1) AND status = 'pending_graduate' AND source_type = 'quran'
            ORDER BY created_at, id
            "#
        );
        let rows = sqlx::query_as::<_, DbItem>(&sql)
            .bind(owner_ids)
            .fetch_all(&self.pool)
            .await?;
        to_items(rows)
    }
}

// === Interval Review Repository ===

#[async_trait]
impl IntervalReviewRepository for Database {
    async fn record_interval_review(
        &self,
        item: &Item,
        guard: ItemGuard,
        record: &IntervalReviewRecord,
    ) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        if !update_guarded(&mut *tx, item, guard).await? {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO interval_reviews (id, user_id, item_id, rating, reviewed_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(record.id)
        .bind(record.user_id)
        .bind(record.item_id)
        .bind(i16::from(record.rating))
        .bind(record.reviewed_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn interval_rating_summary(&self, item_id: Uuid) -> Result<(f64, u64)> {
        let row = sqlx::query(
            r#"
            SELECT COALESCE(AVG(rating)::float8, 0) AS average, COUNT(*) AS total
            FROM interval_reviews
            WHERE item_id = $1
            "#,
        )
        .bind(item_id)
        .fetch_one(&self.pool)
        .await?;

        let total: i64 = row.get("total");
        Ok((row.get("average"), total.max(0) as u64))
    }
}

// === Daily Task Repository ===

#[async_trait]
impl DailyTaskRepository for Database {
    async fn replace_day(&self, user_id: Uuid, date: NaiveDate, tasks: &[DailyTask]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        // Serialise concurrent generation for the same user and day.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1)::bigint)")
            .bind(format!("daily_tasks:{user_id}:{date}"))
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM daily_tasks WHERE user_id = $1 AND task_date = $2")
            .bind(user_id)
            .bind(date)
            .execute(&mut *tx)
            .await?;

        for task in tasks {
            sqlx::query(
                r#"
                INSERT INTO daily_tasks (id, user_id, item_id, card_id, task_date,
                                         position, source, state, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(task.id)
            .bind(task.user_id)
            .bind(task.item_id)
            .bind(task.card_id)
            .bind(task.task_date)
            .bind(int4(task.position))
            .bind(task.source.as_str())
            .bind(task.state.as_str())
            .bind(task.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list_day(&self, user_id: Uuid, date: NaiveDate) -> Result<Vec<DailyTask>> {
        let rows = sqlx::query_as::<_, DbDailyTask>(
            r#"
            SELECT id, user_id, item_id, card_id, task_date, position, source, state, created_at
            FROM daily_tasks
            WHERE user_id = $1 AND task_date = $2
            ORDER BY position
            "#,
        )
        .bind(user_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(DbDailyTask::to_core_task).collect()
    }

    async fn transition_pending(
        &self,
        user_id: Uuid,
        date: NaiveDate,
        key: Uuid,
        state: TaskState,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE daily_tasks
            SET state = $4
            WHERE user_id = $1 AND task_date = $2
              AND (card_id = $3 OR (card_id IS NULL AND item_id = $3))
              AND state = 'pending'
            "#,
        )
        .bind(user_id)
        .bind(date)
        .bind(key)
        .bind(state.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

// === Graduation Repository ===

#[async_trait]
impl GraduationRepository for Database {
    async fn record_decision(&self, decision: &GraduationDecision) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO graduation_decisions (id, user_id, item_id, action, reason, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(decision.id)
        .bind(decision.user_id)
        .bind(decision.item_id)
        .bind(decision.action.as_str())
        .bind(&decision.reason)
        .bind(decision.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn decisions_for_item(&self, item_id: Uuid) -> Result<Vec<GraduationDecision>> {
        let rows = sqlx::query_as::<_, DbGraduationDecision>(
            r#"
            SELECT id, user_id, item_id, action, reason, created_at
            FROM graduation_decisions
            WHERE item_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(item_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(DbGraduationDecision::to_core_decision).collect()
    }
}

// === Collaborator lookups ===

#[async_trait]
impl ClassDirectory for Database {
    async fn get_class(&self, class_id: Uuid) -> Result<Option<ClassInfo>> {
        let row = sqlx::query_as::<_, DbClass>(
            "SELECT id, teacher_id, class_type, is_active FROM classes WHERE id = $1",
        )
        .bind(class_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|c| c.to_class_info()))
    }

    async fn is_member(&self, class_id: Uuid, user_id: Uuid) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM class_members WHERE class_id = $1 AND user_id = $2)",
        )
        .bind(class_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn in_active_scripture_class(&self, user_id: Uuid) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1
                FROM class_members m
                JOIN classes c ON c.id = m.class_id
                WHERE m.user_id = $1 AND c.is_active AND c.class_type = 'quran'
            )
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn members(&self, class_id: Uuid) -> Result<Vec<Uuid>> {
        let members = sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM class_members WHERE class_id = $1 ORDER BY user_id",
        )
        .bind(class_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(members)
    }
}

#[async_trait]
impl ChapterGroupDirectory for Database {
    async fn chapter_groups(&self, user_id: Uuid) -> Result<Vec<ChapterGroup>> {
        let rows = sqlx::query_as::<_, DbChapterGroup>(
            "SELECT id, user_id, juz_index, is_active FROM juz WHERE user_id = $1 ORDER BY juz_index",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(DbChapterGroup::to_chapter_group).collect())
    }
}

#[async_trait]
impl CardDueFeed for Database {
    async fn due_cards(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
        limit: Option<usize>,
    ) -> Result<Vec<DueCard>> {
        let rows = sqlx::query_as::<_, DbDueCard>(
            r#"
            SELECT item_id, card_id, next_review_at, stability
            FROM card_review_states
            WHERE user_id = $1 AND state = 'active' AND next_review_at <= $2
            ORDER BY next_review_at, stability NULLS FIRST
            LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(now)
        .bind(limit.filter(|n| *n > 0).map(|n| n as i64))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(DbDueCard::to_due_card).collect())
    }
}
