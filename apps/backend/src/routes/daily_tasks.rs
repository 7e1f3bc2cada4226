//! Daily task endpoints

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::Utc;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{DailyTask, GenerateQuery, TaskState, TaskTransitionResponse, TodayResponse};
use crate::routes::auth::AuthenticatedUser;
use crate::AppState;

/// POST /api/daily-tasks/generate?limit=
pub async fn generate(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Query(query): Query<GenerateQuery>,
) -> Result<Json<Vec<DailyTask>>> {
    let tasks = state
        .tasks
        .generate_today(auth.user_id, Utc::now(), query.limit)
        .await?;
    Ok(Json(tasks))
}

/// GET /api/daily-tasks/today
pub async fn today(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<Json<TodayResponse>> {
    Ok(Json(state.tasks.today_agenda(auth.user_id, Utc::now()).await?))
}

/// POST /api/daily-tasks/:key/done
pub async fn done(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(key): Path<Uuid>,
) -> Result<Json<TaskTransitionResponse>> {
    state.tasks.mark_done(auth.user_id, key, Utc::now()).await?;
    Ok(Json(TaskTransitionResponse {
        key,
        state: TaskState::Done,
    }))
}

/// POST /api/daily-tasks/:key/skipped
pub async fn skipped(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(key): Path<Uuid>,
) -> Result<Json<TaskTransitionResponse>> {
    state.tasks.mark_skipped(auth.user_id, key, Utc::now()).await?;
    Ok(Json(TaskTransitionResponse {
        key,
        state: TaskState::Skipped,
    }))
}
