//! HTTP routes

pub mod auth;
pub mod daily_tasks;
pub mod graduation;
pub mod items;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::AppState;

/// Build the API router without transport layers.
pub fn router(state: AppState) -> Router {
    let protected_routes = Router::new()
        // Item routes
        .route("/api/items", get(items::list_by_status).post(items::create))
        .route("/api/items/promote-due", post(items::promote_due))
        .route("/api/items/:id", get(items::get))
        .route("/api/items/:id/interval/start", post(items::start_interval))
        .route("/api/items/:id/interval/review", post(items::review_interval))
        .route("/api/items/:id/interval/stats", get(items::interval_stats))
        .route("/api/items/:id/activate", post(items::activate))
        .route("/api/items/:id/review", post(items::review))
        .route("/api/items/:id/deactivate", post(items::deactivate))
        .route("/api/items/:id/reactivate", post(items::reactivate))
        // Graduation routes
        .route("/api/items/:id/graduation/decide", post(graduation::decide))
        .route("/api/items/:id/graduation/decisions", get(graduation::decisions))
        .route("/api/classes/:class_id/graduations", get(graduation::pending))
        .route(
            "/api/classes/:class_id/graduations/:item_id/approve",
            post(graduation::approve),
        )
        .route(
            "/api/classes/:class_id/graduations/:item_id/reject",
            post(graduation::reject),
        )
        // Daily task routes
        .route("/api/daily-tasks/generate", post(daily_tasks::generate))
        .route("/api/daily-tasks/today", get(daily_tasks::today))
        .route("/api/daily-tasks/:key/done", post(daily_tasks::done))
        .route("/api/daily-tasks/:key/skipped", post(daily_tasks::skipped))
        .layer(middleware::from_fn(auth::auth_middleware));

    Router::new()
        .route("/health", get(health_check))
        .merge(protected_routes)
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
