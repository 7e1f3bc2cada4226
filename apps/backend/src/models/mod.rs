//! Database models and API types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::ApiError;

// Re-export shared types from murajaah-core
pub use murajaah_core::governance::PendingGraduation;
pub use murajaah_core::types::{
    ChapterGroup, ClassInfo, ClassKind, DailyTask, DueCard, GraduationAction, GraduationDecision,
    IntervalReviewRecord, Item, ItemGuard, ItemStatus, Rating, SourceType, TaskSource, TaskState,
};
pub use murajaah_core::{IntervalStats, Performance};

fn parse_column<T>(value: &str) -> Result<T, ApiError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e: T::Err| ApiError::Parse(e.to_string()))
}

fn non_negative(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

// === Database Entity Types ===

/// Memorization item stored in PostgreSQL
#[derive(Debug, Clone, FromRow)]
pub struct DbItem {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub source_type: String,
    pub content_ref: String,
    pub status: String,
    pub interval_days: i32,
    pub interval_start_at: Option<DateTime<Utc>>,
    pub interval_next_review_at: Option<DateTime<Utc>>,
    pub interval_end_at: Option<DateTime<Utc>>,
    pub stability: Option<f64>,
    pub difficulty: Option<f64>,
    pub review_count: i32,
    pub last_review_at: Option<DateTime<Utc>>,
    pub next_review_at: Option<DateTime<Utc>>,
    pub fsrs_start_at: Option<DateTime<Utc>>,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub estimated_review_seconds: i32,
    pub created_at: DateTime<Utc>,
}

impl DbItem {
    /// Convert to the core item. Stored stability/difficulty are loaded raw;
    /// the core sanitizes them on every read.
    pub fn to_core_item(&self) -> Result<Item, ApiError> {
        let mut item = Item::new(
            self.owner_id,
            parse_column(&self.source_type)?,
            self.content_ref.clone(),
            self.created_at,
        );
        item.id = self.id;
        item.status = parse_column(&self.status)?;
        item.interval_days = non_negative(self.interval_days);
        item.interval_start_at = self.interval_start_at;
        item.interval_next_review_at = self.interval_next_review_at;
        item.interval_end_at = self.interval_end_at;
        item.load_memory_state(
            self.stability.unwrap_or(0.0),
            self.difficulty.unwrap_or(0.0),
        );
        item.review_count = non_negative(self.review_count);
        item.last_review_at = self.last_review_at;
        item.next_review_at = self.next_review_at;
        item.fsrs_start_at = self.fsrs_start_at;
        item.approved_by = self.approved_by;
        item.approved_at = self.approved_at;
        item.estimated_review_seconds = non_negative(self.estimated_review_seconds);
        Ok(item)
    }
}

/// Daily task row in PostgreSQL
#[derive(Debug, Clone, FromRow)]
pub struct DbDailyTask {
    pub id: Uuid,
    pub user_id: Uuid,
    pub item_id: Uuid,
    pub card_id: Option<Uuid>,
    pub task_date: NaiveDate,
    pub position: i32,
    pub source: String,
    pub state: String,
    pub created_at: DateTime<Utc>,
}

impl DbDailyTask {
    pub fn to_core_task(&self) -> Result<DailyTask, ApiError> {
        Ok(DailyTask {
            id: self.id,
            user_id: self.user_id,
            item_id: self.item_id,
            card_id: self.card_id,
            task_date: self.task_date,
            position: non_negative(self.position),
            source: parse_column(&self.source)?,
            state: parse_column(&self.state)?,
            created_at: self.created_at,
        })
    }
}

/// Manual graduation decision row
#[derive(Debug, Clone, FromRow)]
pub struct DbGraduationDecision {
    pub id: Uuid,
    pub user_id: Uuid,
    pub item_id: Uuid,
    pub action: String,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

impl DbGraduationDecision {
    pub fn to_core_decision(&self) -> Result<GraduationDecision, ApiError> {
        Ok(GraduationDecision {
            id: self.id,
            user_id: self.user_id,
            item_id: self.item_id,
            action: parse_column(&self.action)?,
            reason: self.reason.clone(),
            created_at: self.created_at,
        })
    }
}

/// Class row, reduced to what graduation governance needs
#[derive(Debug, Clone, FromRow)]
pub struct DbClass {
    pub id: Uuid,
    pub teacher_id: Uuid,
    pub class_type: String,
    pub is_active: bool,
}

impl DbClass {
    pub fn to_class_info(&self) -> ClassInfo {
        ClassInfo {
            id: self.id,
            teacher_id: self.teacher_id,
            kind: if self.class_type == "quran" {
                ClassKind::Quran
            } else {
                ClassKind::Book
            },
            is_active: self.is_active,
        }
    }
}

/// Juz row
#[derive(Debug, Clone, FromRow)]
pub struct DbChapterGroup {
    pub id: Uuid,
    pub user_id: Uuid,
    pub juz_index: i32,
    pub is_active: bool,
}

impl DbChapterGroup {
    pub fn to_chapter_group(&self) -> ChapterGroup {
        ChapterGroup {
            id: self.id,
            user_id: self.user_id,
            index: non_negative(self.juz_index),
            is_active: self.is_active,
        }
    }
}

/// Legacy card review state due for a user
#[derive(Debug, Clone, FromRow)]
pub struct DbDueCard {
    pub item_id: Uuid,
    pub card_id: Uuid,
    pub next_review_at: DateTime<Utc>,
    pub stability: Option<f64>,
}

impl DbDueCard {
    pub fn to_due_card(&self) -> DueCard {
        DueCard {
            item_id: self.item_id,
            card_id: self.card_id,
            next_review_at: self.next_review_at,
            stability: self.stability.unwrap_or(0.0),
        }
    }
}

// === API Request/Response Types ===

/// Create item request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateItemRequest {
    pub source_type: SourceType,
    pub content_ref: String,
    #[serde(default)]
    pub estimated_review_seconds: u32,
}

/// Query parameters for listing items
#[derive(Debug, Clone, Deserialize)]
pub struct ItemsQuery {
    pub status: String,
}

/// Start interval request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartIntervalRequest {
    pub interval_days: i64,
}

/// Rating submitted for an interval or FSRS review
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingRequest {
    pub rating: i64,
}

/// Interval review response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntervalReviewResponse {
    pub item: Item,
    pub next_review_at: Option<DateTime<Utc>>,
    pub rating: u8,
}

/// FSRS review response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewItemResponse {
    pub item: Item,
    pub interval_days: i64,
    pub next_review_at: DateTime<Utc>,
    pub graduated: bool,
    pub pending_graduate: bool,
    pub review_count: u32,
}

/// Manual graduation decision request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecideGraduationRequest {
    pub action: String,
    #[serde(default)]
    pub reason: String,
}

/// Query parameters for snapshot generation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateQuery {
    pub limit: Option<usize>,
}

/// A snapshot row with the item details a session needs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TodayTask {
    #[serde(flatten)]
    pub task: DailyTask,
    pub content_ref: Option<String>,
    pub estimated_review_seconds: u32,
}

/// Today's snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TodayResponse {
    pub date: NaiveDate,
    pub tasks: Vec<TodayTask>,
    pub pending: usize,
    pub estimated_seconds: u64,
}

/// Response after marking a task done or skipped
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskTransitionResponse {
    pub key: Uuid,
    pub state: TaskState,
}

/// Response of the interval deadline sweep
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromotionResponse {
    pub promoted: Vec<Uuid>,
}
