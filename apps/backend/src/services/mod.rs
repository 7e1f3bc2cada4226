//! Request-scoped services orchestrating the scheduling core against a store.
//!
//! Services never read the clock; every operation takes `now`.

pub mod daily_task;
pub mod graduation;
pub mod items;

use chrono::{DateTime, Utc};
use murajaah_core::dates::task_date;
use uuid::Uuid;

use crate::db::{DailyTaskRepository, ItemRepository, Store};
use crate::error::{ApiError, Result};
use crate::models::{Item, ItemGuard, TaskState};

pub use daily_task::DailyTaskService;
pub use graduation::GraduationService;
pub use items::ItemService;

async fn load_item(store: &dyn Store, item_id: Uuid) -> Result<Item> {
    store
        .get_item(item_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("item not found".to_string()))
}

/// Persist `item` if nobody changed it since it was read with `guard`.
async fn save_guarded(store: &dyn Store, item: &Item, guard: ItemGuard) -> Result<()> {
    if store.update_item_guarded(item, guard).await? {
        Ok(())
    } else {
        Err(concurrent_change(item, guard))
    }
}

fn concurrent_change(item: &Item, guard: ItemGuard) -> ApiError {
    tracing::warn!(item_id = %item.id, status = %guard.status, "item changed concurrently");
    ApiError::Conflict("item was modified by another request".to_string())
}

/// Mark today's pending task for `item_id` done. Never fails the caller.
async fn complete_task_best_effort(
    store: &dyn Store,
    user_id: Uuid,
    item_id: Uuid,
    now: DateTime<Utc>,
) {
    match store
        .transition_pending(user_id, task_date(now), item_id, TaskState::Done)
        .await
    {
        Ok(true) => tracing::debug!(%user_id, %item_id, "daily task completed by review"),
        Ok(false) => tracing::debug!(%user_id, %item_id, "no pending daily task for reviewed item"),
        Err(e) => tracing::warn!(%user_id, %item_id, error = %e, "failed to complete daily task"),
    }
}
