//! Scheduling algorithms: the FSRS forgetting-curve model and the
//! fixed-cadence interval phase that precedes it.

pub mod fsrs;
pub mod interval;

pub use fsrs::{Fsrs, MemoryState, ReviewResult, Weights};
pub use interval::{IntervalRating, IntervalStats, Performance};
