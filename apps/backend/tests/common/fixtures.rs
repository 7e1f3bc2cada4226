//! Test fixtures and factory functions for creating test data.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::json;
use uuid::Uuid;

use murajaah_backend::models::{DueCard, Item, ItemStatus, SourceType};

/// Fixed clock for service-level tests: Friday 2026-02-06 10:00 UTC.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 6, 10, 0, 0).unwrap()
}

pub fn days(n: i64) -> Duration {
    Duration::days(n)
}

pub fn midnight(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}

/// A fresh item in `menghafal`, created two months before [`now`].
pub fn new_item(owner_id: Uuid, source_type: SourceType) -> Item {
    Item::new(owner_id, source_type, "surah:78:1-16", now() - days(60))
}

/// An interval item started `started_days_ago` with the given cadence.
pub fn interval_item(owner_id: Uuid, interval_days: u32, started_days_ago: i64) -> Item {
    let mut item = new_item(owner_id, SourceType::Quran);
    let start = now() - days(started_days_ago);
    item.status = ItemStatus::Interval;
    item.interval_days = interval_days;
    item.interval_start_at = Some(start);
    item.interval_next_review_at = Some(murajaah_core::dates::days_later_at_midnight(
        start,
        i64::from(interval_days),
    ));
    item
}

/// An `fsrs_active` item whose FSRS phase began `fsrs_days` ago.
pub fn fsrs_item(owner_id: Uuid, source_type: SourceType, fsrs_days: i64) -> Item {
    let mut item = new_item(owner_id, source_type);
    item.status = ItemStatus::FsrsActive;
    item.interval_days = 7;
    item.fsrs_start_at = Some(now() - days(fsrs_days));
    item.ensure_memory_defaults();
    item
}

/// A graduated scripture item with its next maintenance review at `next`.
pub fn graduate_item(owner_id: Uuid, next: DateTime<Utc>) -> Item {
    let mut item = fsrs_item(owner_id, SourceType::Quran, 90);
    item.status = ItemStatus::Graduate;
    item.last_review_at = Some(next - days(20));
    item.next_review_at = Some(next);
    item
}

pub fn due_card(item_id: Uuid, due: DateTime<Utc>) -> DueCard {
    DueCard {
        item_id,
        card_id: Uuid::new_v4(),
        next_review_at: due,
        stability: 1.5,
    }
}

/// Create an item request body.
pub fn create_item_request(source_type: &str, content_ref: &str) -> serde_json::Value {
    json!({
        "source_type": source_type,
        "content_ref": content_ref,
        "estimated_review_seconds": 120
    })
}

/// Create a start interval request body.
pub fn start_interval_request(interval_days: i64) -> serde_json::Value {
    json!({ "interval_days": interval_days })
}

/// Create a rating request body.
pub fn rating_request(rating: i64) -> serde_json::Value {
    json!({ "rating": rating })
}

/// Create a graduation decision request body.
pub fn decide_request(action: &str, reason: &str) -> serde_json::Value {
    json!({ "action": action, "reason": reason })
}
