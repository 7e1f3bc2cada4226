//! Core types for the review scheduling engine.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

use crate::algorithm::fsrs::{
    sanitize_difficulty, sanitize_stability, MemoryState, INITIAL_DIFFICULTY, INITIAL_STABILITY,
};
use crate::error::ScheduleError;

/// Lifecycle phase of a memorization item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// Being memorized, not yet scheduled.
    Menghafal,
    /// Fixed-cadence review before FSRS.
    Interval,
    FsrsActive,
    /// Crossed the graduation threshold, waiting for a teacher.
    PendingGraduate,
    Graduate,
    /// Paused by the learner (non-scripture items only).
    Inactive,
}

impl ItemStatus {
    pub const ALL: [ItemStatus; 6] = [
        Self::Menghafal,
        Self::Interval,
        Self::FsrsActive,
        Self::PendingGraduate,
        Self::Graduate,
        Self::Inactive,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Menghafal => "menghafal",
            Self::Interval => "interval",
            Self::FsrsActive => "fsrs_active",
            Self::PendingGraduate => "pending_graduate",
            Self::Graduate => "graduate",
            Self::Inactive => "inactive",
        }
    }
}

impl Default for ItemStatus {
    fn default() -> Self {
        Self::Menghafal
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemStatus {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ScheduleError::invalid_input(format!("invalid status: {s}")))
    }
}

/// Where an item's content comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// Quran passage. The only source that auto-graduates.
    Quran,
    Personal,
    /// Book excerpt assigned through a class.
    #[serde(rename = "class")]
    ClassBook,
}

impl SourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Quran => "quran",
            Self::Personal => "personal",
            Self::ClassBook => "class",
        }
    }

    pub fn is_scripture(self) -> bool {
        matches!(self, Self::Quran)
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "quran" => Ok(Self::Quran),
            "personal" => Ok(Self::Personal),
            "class" => Ok(Self::ClassBook),
            other => Err(ScheduleError::invalid_input(format!(
                "invalid source type: {other}"
            ))),
        }
    }
}

/// Rating for an FSRS review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    Again,
    Hard,
    Good,
    Easy,
}

impl Rating {
    /// Convert to 4-point numeric value (1-4).
    pub fn to_value(self) -> u8 {
        match self {
            Self::Again => 1,
            Self::Hard => 2,
            Self::Good => 3,
            Self::Easy => 4,
        }
    }

    /// Create from 4-point numeric value.
    pub fn from_value(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Again),
            2 => Some(Self::Hard),
            3 => Some(Self::Good),
            4 => Some(Self::Easy),
            _ => None,
        }
    }

    /// Parse a caller-supplied rating, rejecting anything outside 1-4.
    pub fn parse(value: i64) -> Result<Self, ScheduleError> {
        u8::try_from(value)
            .ok()
            .and_then(Self::from_value)
            .ok_or_else(|| ScheduleError::invalid_input("invalid rating (1-4)"))
    }
}

/// A memorization item and its scheduling state.
///
/// Stability and difficulty are private: persisted rows may hold NaN, infinite
/// or negative values from older data, so every read goes through an accessor
/// that clamps, and every write goes through [`Item::set_memory_state`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub source_type: SourceType,
    pub content_ref: String,
    pub status: ItemStatus,

    pub interval_days: u32,
    pub interval_start_at: Option<DateTime<Utc>>,
    pub interval_next_review_at: Option<DateTime<Utc>>,
    /// Legacy fixed deadline of the interval phase.
    pub interval_end_at: Option<DateTime<Utc>>,

    #[serde(serialize_with = "serialize_exposed")]
    stability: f64,
    #[serde(serialize_with = "serialize_difficulty")]
    difficulty: f64,
    pub review_count: u32,
    pub last_review_at: Option<DateTime<Utc>>,
    pub next_review_at: Option<DateTime<Utc>>,
    pub fsrs_start_at: Option<DateTime<Utc>>,

    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub estimated_review_seconds: u32,
    pub created_at: DateTime<Utc>,
}

impl Item {
    pub fn new(
        owner_id: Uuid,
        source_type: SourceType,
        content_ref: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            source_type,
            content_ref: content_ref.into(),
            status: ItemStatus::Menghafal,
            interval_days: 0,
            interval_start_at: None,
            interval_next_review_at: None,
            interval_end_at: None,
            stability: 0.0,
            difficulty: INITIAL_DIFFICULTY,
            review_count: 0,
            last_review_at: None,
            next_review_at: None,
            fsrs_start_at: None,
            approved_by: None,
            approved_at: None,
            estimated_review_seconds: 0,
            created_at: now,
        }
    }

    /// Stability as exposed to callers: degenerate values read as 0.
    pub fn stability(&self) -> f64 {
        exposed(self.stability)
    }

    /// Difficulty as exposed to callers: degenerate values read as the
    /// model's initial difficulty, anything else is clamped to 1-10.
    pub fn difficulty(&self) -> f64 {
        sanitize_difficulty(self.difficulty, INITIAL_DIFFICULTY)
    }

    /// State fed into the forgetting-curve model. Unset or degenerate values
    /// fall back to the model's initial stability and difficulty.
    pub fn memory_state(&self) -> MemoryState {
        let stability = if self.stability.is_finite() && self.stability > 0.0 {
            self.stability
        } else {
            INITIAL_STABILITY
        };
        MemoryState {
            stability,
            difficulty: sanitize_difficulty(self.difficulty, INITIAL_DIFFICULTY),
            last_review: self.last_review_at,
        }
    }

    /// Write back model output, clamped to the model's safe ranges.
    pub fn set_memory_state(&mut self, stability: f64, difficulty: f64) {
        self.stability = sanitize_stability(stability);
        self.difficulty = sanitize_difficulty(difficulty, INITIAL_DIFFICULTY);
    }

    /// Restore raw persisted values. Accessors still sanitize on read.
    pub fn load_memory_state(&mut self, stability: f64, difficulty: f64) {
        self.stability = stability;
        self.difficulty = difficulty;
    }

    /// Seed initial stability/difficulty if they were never set.
    pub fn ensure_memory_defaults(&mut self) {
        let state = self.memory_state();
        self.stability = state.stability;
        self.difficulty = state.difficulty;
    }
}

fn exposed(value: f64) -> f64 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        0.0
    }
}

fn serialize_exposed<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(exposed(*value))
}

fn serialize_difficulty<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(sanitize_difficulty(*value, INITIAL_DIFFICULTY))
}

/// Optimistic-concurrency token captured when an item is read.
///
/// A store applies an update only while the row still carries this status and
/// review count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemGuard {
    pub status: ItemStatus,
    pub review_count: u32,
}

impl ItemGuard {
    pub fn of(item: &Item) -> Self {
        Self {
            status: item.status,
            review_count: item.review_count,
        }
    }
}

/// One rating recorded during the interval phase. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalReviewRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub item_id: Uuid,
    pub rating: u8,
    pub reviewed_at: DateTime<Utc>,
}

/// Which due-work source produced a daily task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskSource {
    /// Interval deadline passed; promoted to FSRS while generating.
    Interval,
    IntervalRecurring,
    Fsrs,
    GraduateMonthly,
    /// Legacy card-based review state.
    Card,
}

impl TaskSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Interval => "interval",
            Self::IntervalRecurring => "interval_recurring",
            Self::Fsrs => "fsrs",
            Self::GraduateMonthly => "graduate_monthly",
            Self::Card => "card",
        }
    }
}

impl FromStr for TaskSource {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "interval" => Ok(Self::Interval),
            "interval_recurring" => Ok(Self::IntervalRecurring),
            "fsrs" => Ok(Self::Fsrs),
            "graduate_monthly" => Ok(Self::GraduateMonthly),
            "card" => Ok(Self::Card),
            other => Err(ScheduleError::invalid_input(format!(
                "invalid task source: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    Done,
    Skipped,
}

impl TaskState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Done => "done",
            Self::Skipped => "skipped",
        }
    }
}

impl FromStr for TaskState {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "done" => Ok(Self::Done),
            "skipped" => Ok(Self::Skipped),
            other => Err(ScheduleError::invalid_input(format!(
                "invalid task state: {other}"
            ))),
        }
    }
}

/// A row of a user's daily snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyTask {
    pub id: Uuid,
    pub user_id: Uuid,
    pub item_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_id: Option<Uuid>,
    pub task_date: NaiveDate,
    /// Order within the day's snapshot.
    pub position: u32,
    pub source: TaskSource,
    pub state: TaskState,
    pub created_at: DateTime<Utc>,
}

impl DailyTask {
    /// True when `key` names this task's card. Item keys only match rows
    /// that carry no card.
    pub fn matches_key(&self, key: Uuid) -> bool {
        match self.card_id {
            Some(card_id) => card_id == key,
            None => self.item_id == key,
        }
    }
}

/// Manual governance action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraduationAction {
    Graduate,
    Freeze,
    Reactivate,
}

impl GraduationAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Graduate => "graduate",
            Self::Freeze => "freeze",
            Self::Reactivate => "reactivate",
        }
    }
}

impl FromStr for GraduationAction {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "graduate" => Ok(Self::Graduate),
            "freeze" => Ok(Self::Freeze),
            "reactivate" => Ok(Self::Reactivate),
            _ => Err(ScheduleError::invalid_input("invalid graduation action")),
        }
    }
}

/// Audit record of a manual governance action. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraduationDecision {
    pub id: Uuid,
    pub user_id: Uuid,
    pub item_id: Uuid,
    pub action: GraduationAction,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassKind {
    Quran,
    Book,
}

/// Class as seen by graduation governance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassInfo {
    pub id: Uuid,
    pub teacher_id: Uuid,
    pub kind: ClassKind,
    pub is_active: bool,
}

/// A learner's juz. Graduated items rotate through these for maintenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterGroup {
    pub id: Uuid,
    pub user_id: Uuid,
    /// 1-30.
    pub index: u32,
    pub is_active: bool,
}

/// Due entry from the legacy card-based review state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DueCard {
    pub item_id: Uuid,
    pub card_id: Uuid,
    pub next_review_at: DateTime<Utc>,
    pub stability: f64,
}
