//! Common test utilities and fixtures for integration tests.
//!
//! This module provides shared test infrastructure including:
//! - TestContext wiring the services and router over an in-memory store
//! - Seeding helpers for items, classes and chapter groups
//! - Authentication helpers
//!
//! Tests marked `#[ignore = "requires database"]` additionally need a
//! PostgreSQL database (set DATABASE_URL env var).

pub mod fixtures;

use std::sync::Arc;

use axum::Router;
use axum_test::TestServer;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use murajaah_backend::db::{ItemRepository, MemoryStore};
use murajaah_backend::models::{ChapterGroup, ClassInfo, ClassKind, Item};
use murajaah_backend::{routes, AppState};
use murajaah_core::EngineConfig;

/// Test context containing the store, services and router.
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub state: AppState,
    app: Router,
}

impl TestContext {
    /// Create a new test context with default scheduling config.
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(store.clone(), EngineConfig::default());
        let app = routes::router(state.clone());
        Self { store, state, app }
    }

    /// Get the router for use with axum-test.
    pub fn router(&self) -> Router {
        self.app.clone()
    }

    pub fn server(&self) -> TestServer {
        TestServer::new(self.router()).unwrap()
    }

    /// Format authorization header value.
    pub fn auth_header_value(user_id: Uuid) -> String {
        format!("Bearer {}", user_id)
    }

    /// Store `item` as is and hand it back.
    pub async fn insert(&self, item: Item) -> Item {
        self.store.insert_item(&item).await.unwrap();
        item
    }

    /// Current stored state of an item.
    pub async fn reload(&self, item_id: Uuid) -> Item {
        self.store.get_item(item_id).await.unwrap().unwrap()
    }

    /// Create an active class taught by `teacher_id` with `members`.
    pub async fn class(&self, teacher_id: Uuid, kind: ClassKind, members: &[Uuid]) -> ClassInfo {
        let class = ClassInfo {
            id: Uuid::new_v4(),
            teacher_id,
            kind,
            is_active: true,
        };
        self.store.add_class(class.clone()).await;
        for member in members {
            self.store.add_member(class.id, *member).await;
        }
        class
    }

    /// Create the 30 chapter groups for `user_id`, active where `active` says so.
    pub async fn chapter_groups(&self, user_id: Uuid, active: impl Fn(u32) -> bool) -> Vec<ChapterGroup> {
        let mut groups = Vec::new();
        for index in 1..=30 {
            let group = ChapterGroup {
                id: Uuid::new_v4(),
                user_id,
                index,
                is_active: active(index),
            };
            self.store.add_chapter_group(group.clone()).await;
            groups.push(group);
        }
        groups
    }

    /// Today's persisted snapshot for `user_id`.
    pub async fn today(&self, user_id: Uuid, now: DateTime<Utc>) -> Vec<murajaah_backend::models::DailyTask> {
        self.state.tasks.list_today(user_id, now).await.unwrap()
    }
}
