pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::Router;
use murajaah_core::EngineConfig;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::AppConfig;
use crate::db::{Database, Store};
use crate::services::{DailyTaskService, GraduationService, ItemService};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub items: ItemService,
    pub graduation: GraduationService,
    pub tasks: DailyTaskService,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, engine: EngineConfig) -> Self {
        let engine = Arc::new(engine);
        let items = ItemService::new(store.clone(), engine.clone());
        let graduation = GraduationService::new(store.clone(), engine);
        let tasks = DailyTaskService::new(store, items.clone(), graduation.clone());
        Self {
            items,
            graduation,
            tasks,
        }
    }
}

/// Full application: API routes plus CORS and request tracing.
pub fn app(state: AppState) -> Router {
    routes::router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    )
}

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    tracing::info!("Connecting to database...");
    let db = Database::connect(&config.database_url, config.database_max_connections).await?;

    tracing::info!("Running migrations...");
    db.run_migrations().await?;

    let state = AppState::new(Arc::new(db), config.engine.clone());
    let app = app(state);

    let addr = config.bind_addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
