//! Item lifecycle endpoints

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::Utc;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;
use crate::routes::auth::AuthenticatedUser;
use crate::AppState;

/// POST /api/items
pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Json(payload): Json<CreateItemRequest>,
) -> Result<Json<Item>> {
    let item = state
        .items
        .create_item(auth.user_id, payload, Utc::now())
        .await?;
    Ok(Json(item))
}

/// GET /api/items?status=
pub async fn list_by_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Query(query): Query<ItemsQuery>,
) -> Result<Json<Vec<Item>>> {
    let items = state.items.items_by_status(auth.user_id, &query.status).await?;
    Ok(Json(items))
}

/// GET /api/items/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(item_id): Path<Uuid>,
) -> Result<Json<Item>> {
    Ok(Json(state.items.get_item(item_id, auth.user_id).await?))
}

/// POST /api/items/:id/interval/start
pub async fn start_interval(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(item_id): Path<Uuid>,
    Json(payload): Json<StartIntervalRequest>,
) -> Result<Json<Item>> {
    let item = state
        .items
        .start_interval(item_id, auth.user_id, payload.interval_days, Utc::now())
        .await?;
    Ok(Json(item))
}

/// POST /api/items/:id/interval/review
pub async fn review_interval(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(item_id): Path<Uuid>,
    Json(payload): Json<RatingRequest>,
) -> Result<Json<IntervalReviewResponse>> {
    let response = state
        .items
        .review_interval(item_id, auth.user_id, payload.rating, Utc::now())
        .await?;
    Ok(Json(response))
}

/// GET /api/items/:id/interval/stats
pub async fn interval_stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(item_id): Path<Uuid>,
) -> Result<Json<IntervalStats>> {
    Ok(Json(state.items.interval_stats(item_id, auth.user_id).await?))
}

/// POST /api/items/:id/activate
pub async fn activate(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(item_id): Path<Uuid>,
) -> Result<Json<Item>> {
    let item = state
        .items
        .activate_to_fsrs(item_id, auth.user_id, Utc::now())
        .await?;
    Ok(Json(item))
}

/// POST /api/items/:id/review
pub async fn review(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(item_id): Path<Uuid>,
    Json(payload): Json<RatingRequest>,
) -> Result<Json<ReviewItemResponse>> {
    let response = state
        .items
        .review_item(item_id, auth.user_id, payload.rating, Utc::now())
        .await?;
    Ok(Json(response))
}

/// POST /api/items/:id/deactivate
pub async fn deactivate(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(item_id): Path<Uuid>,
) -> Result<Json<Item>> {
    Ok(Json(state.items.deactivate_item(item_id, auth.user_id).await?))
}

/// POST /api/items/:id/reactivate
pub async fn reactivate(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(item_id): Path<Uuid>,
) -> Result<Json<Item>> {
    Ok(Json(state.items.reactivate_item(item_id, auth.user_id).await?))
}

/// POST /api/items/promote-due
pub async fn promote_due(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<Json<PromotionResponse>> {
    let promoted = state
        .items
        .promote_due_intervals(auth.user_id, Utc::now())
        .await?;
    Ok(Json(PromotionResponse {
        promoted: promoted.into_iter().map(|item| item.id).collect(),
    }))
}
