//! Graduation governance service.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use murajaah_core::{governance, lifecycle, EngineConfig};
use tracing::info;
use uuid::Uuid;

use crate::db::{ClassDirectory, GraduationRepository, ItemRepository, Store};
use crate::error::{ApiError, Result};
use crate::models::{ClassInfo, ClassKind, GraduationDecision, Item, ItemGuard, PendingGraduation};
use crate::services::{load_item, save_guarded};

#[derive(Clone)]
pub struct GraduationService {
    store: Arc<dyn Store>,
    engine: Arc<EngineConfig>,
}

impl GraduationService {
    pub fn new(store: Arc<dyn Store>, engine: Arc<EngineConfig>) -> Self {
        Self { store, engine }
    }

    async fn load_class(&self, class_id: Uuid) -> Result<ClassInfo> {
        self.store
            .get_class(class_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("class not found".to_string()))
    }

    /// Load class and item, then check teacher, class kind, status and
    /// membership in that order.
    async fn load_for_teacher(&self, class_id: Uuid, item_id: Uuid) -> Result<(ClassInfo, Item, bool)> {
        let class = self.load_class(class_id).await?;
        let item = load_item(self.store.as_ref(), item_id).await?;
        let owner_is_member = self.store.is_member(class_id, item.owner_id).await?;
        Ok((class, item, owner_is_member))
    }

    pub async fn approve(
        &self,
        class_id: Uuid,
        teacher_id: Uuid,
        item_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Item> {
        let (class, mut item, owner_is_member) = self.load_for_teacher(class_id, item_id).await?;
        let guard = ItemGuard::of(&item);
        governance::approve(&mut item, &class, teacher_id, owner_is_member, now)?;
        save_guarded(self.store.as_ref(), &item, guard).await?;

        info!(%class_id, %teacher_id, %item_id, "graduation approved");
        Ok(item)
    }

    pub async fn reject(&self, class_id: Uuid, teacher_id: Uuid, item_id: Uuid) -> Result<Item> {
        let (class, mut item, owner_is_member) = self.load_for_teacher(class_id, item_id).await?;
        let guard = ItemGuard::of(&item);
        governance::reject(&mut item, &class, teacher_id, owner_is_member)?;
        save_guarded(self.store.as_ref(), &item, guard).await?;

        info!(%class_id, %teacher_id, %item_id, "graduation rejected");
        Ok(item)
    }

    /// Record a manual decision. Only the action is validated; the item is
    /// neither loaded nor changed.
    pub async fn decide(
        &self,
        actor_id: Uuid,
        item_id: Uuid,
        action: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<GraduationDecision> {
        let decision = governance::record_decision(actor_id, item_id, action, reason, now)?;
        self.store.record_decision(&decision).await?;

        info!(user_id = %actor_id, %item_id, action = decision.action.as_str(), "graduation decision recorded");
        Ok(decision)
    }

    pub async fn decisions(&self, actor_id: Uuid, item_id: Uuid) -> Result<Vec<GraduationDecision>> {
        let item = load_item(self.store.as_ref(), item_id).await?;
        lifecycle::ensure_owner(&item, actor_id)?;
        self.store.decisions_for_item(item_id).await
    }

    /// Items of the class's members waiting for this teacher.
    pub async fn pending_graduations(
        &self,
        class_id: Uuid,
        teacher_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<PendingGraduation>> {
        let class = self.load_class(class_id).await?;
        if class.teacher_id != teacher_id {
            return Err(ApiError::Forbidden(
                "only the class teacher can view pending graduations".to_string(),
            ));
        }
        if class.kind != ClassKind::Quran {
            return Err(ApiError::InvalidState(
                "graduation approval only applies to quran classes".to_string(),
            ));
        }

        let members = self.store.members(class_id).await?;
        if members.is_empty() {
            return Ok(Vec::new());
        }
        let items = self.store.pending_graduates(&members).await?;
        Ok(items
            .iter()
            .map(|item| PendingGraduation::from_item(item, now))
            .collect())
    }

    /// Automatic arm over every eligible item of `user_id`.
    ///
    /// Returns how many items left `fsrs_active`.
    pub async fn sweep(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<usize> {
        let due: Vec<Item> = self
            .store
            .graduation_candidates(user_id)
            .await?
            .into_iter()
            .filter(|item| governance::graduation_due(item, now, &self.engine))
            .collect();
        if due.is_empty() {
            return Ok(0);
        }

        let in_class = self.store.in_active_scripture_class(user_id).await?;
        let mut settled = 0;
        for mut item in due {
            let guard = ItemGuard::of(&item);
            let outcome = governance::apply_automatic(&mut item, in_class, now, &self.engine);
            match save_guarded(self.store.as_ref(), &item, guard).await {
                Ok(()) => {
                    settled += 1;
                    info!(%user_id, item_id = %item.id, ?outcome, "item graduated by sweep");
                }
                Err(ApiError::Conflict(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(settled)
    }
}
