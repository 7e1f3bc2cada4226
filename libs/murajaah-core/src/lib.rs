//! Review scheduling core shared by the backend service.
//!
//! Provides:
//! - FSRS forgetting-curve model and the fixed-cadence interval phase
//! - Item lifecycle transitions (menghafal through graduate)
//! - Graduation governance (automatic, teacher and manual arms)
//! - Daily snapshot assembly and chapter-group rotation
//!
//! Nothing here performs I/O. Every operation takes `now` explicitly.

pub mod algorithm;
pub mod config;
pub mod dates;
pub mod error;
pub mod governance;
pub mod lifecycle;
pub mod snapshot;
pub mod types;

pub use algorithm::{Fsrs, IntervalRating, IntervalStats, MemoryState, Performance, ReviewResult, Weights};
pub use config::EngineConfig;
pub use error::{Result, ScheduleError};
pub use governance::{GraduationOutcome, PendingGraduation};
pub use lifecycle::FsrsReview;
pub use snapshot::{build_snapshot, rotation_group, Candidate};
pub use types::{
    ChapterGroup, ClassInfo, ClassKind, DailyTask, DueCard, GraduationAction, GraduationDecision,
    IntervalReviewRecord, Item, ItemGuard, ItemStatus, Rating, SourceType, TaskSource, TaskState,
};
