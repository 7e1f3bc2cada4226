//! Graduation endpoints

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::Utc;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{DecideGraduationRequest, GraduationDecision, Item, PendingGraduation};
use crate::routes::auth::AuthenticatedUser;
use crate::AppState;

/// GET /api/classes/:class_id/graduations
pub async fn pending(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(class_id): Path<Uuid>,
) -> Result<Json<Vec<PendingGraduation>>> {
    let pending = state
        .graduation
        .pending_graduations(class_id, auth.user_id, Utc::now())
        .await?;
    Ok(Json(pending))
}

/// POST /api/classes/:class_id/graduations/:item_id/approve
pub async fn approve(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path((class_id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Item>> {
    let item = state
        .graduation
        .approve(class_id, auth.user_id, item_id, Utc::now())
        .await?;
    Ok(Json(item))
}

/// POST /api/classes/:class_id/graduations/:item_id/reject
pub async fn reject(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path((class_id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Item>> {
    let item = state
        .graduation
        .reject(class_id, auth.user_id, item_id)
        .await?;
    Ok(Json(item))
}

/// POST /api/items/:id/graduation/decide
pub async fn decide(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(item_id): Path<Uuid>,
    Json(payload): Json<DecideGraduationRequest>,
) -> Result<Json<GraduationDecision>> {
    let decision = state
        .graduation
        .decide(auth.user_id, item_id, &payload.action, &payload.reason, Utc::now())
        .await?;
    Ok(Json(decision))
}

/// GET /api/items/:id/graduation/decisions
pub async fn decisions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(item_id): Path<Uuid>,
) -> Result<Json<Vec<GraduationDecision>>> {
    Ok(Json(state.graduation.decisions(auth.user_id, item_id).await?))
}
