use std::sync::Arc;
use uuid::Uuid;

use crate::security::error::SecurityError;
use crate::security::model::{Grant, RecipientFields, RecipientRef};
use crate::security::payload::Payload;
use crate::security::store::{GrantInsert, SecurityStore};

/// Outcome of a revoke that matched at least one active grant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Revocation {
    pub security_level_id: Uuid,
    pub recipient: RecipientRef,
    pub count: u64,
}

/// Issues and revokes permission mappings between a level and one recipient
pub struct GrantRegistry {
    store: Arc<dyn SecurityStore>,
}

impl GrantRegistry {
    pub fn new(store: Arc<dyn SecurityStore>) -> Self {
        Self { store }
    }

    /// Level must be active, recipient well-formed, and no active grant may
    /// already cover the pair. Checked in that order, so the recipient fields
    /// are not parsed until the level is known.
    pub async fn grant(&self, security_level_id: Uuid, data: &Payload) -> Result<Grant, SecurityError> {
        if self.store.find_level(security_level_id).await?.is_none() {
            return Err(SecurityError::not_found("Security level not found"));
        }
        let recipient = RecipientRef::try_from(RecipientFields::from_payload(data)?)?;

        let grant = Grant::new(security_level_id, recipient);
        match self.store.insert_grant(&grant).await? {
            GrantInsert::Inserted => Ok(grant),
            GrantInsert::Duplicate => Err(SecurityError::AlreadyExists(
                "Access already granted to this recipient".to_string(),
            )),
            // Removed between the lookup above and the insert
            GrantInsert::LevelMissing => Err(SecurityError::not_found("Security level not found")),
        }
    }

    pub async fn revoke(
        &self,
        security_level_id: Uuid,
        fields: RecipientFields,
    ) -> Result<Revocation, SecurityError> {
        let recipient = RecipientRef::try_from(fields)?;
        let count = self.store.revoke_grants(security_level_id, &recipient).await?;
        if count == 0 {
            return Err(SecurityError::not_found("Access grant not found"));
        }
        Ok(Revocation {
            security_level_id,
            recipient,
            count,
        })
    }

    pub async fn active_grants(&self, security_level_id: Uuid) -> Result<Vec<Grant>, SecurityError> {
        Ok(self.store.active_grants(security_level_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::model::{Classification, RecordState, SecurityLevel};
    use crate::security::store::MemoryStore;
    use chrono::Utc;
    use serde_json::{json, Value};

    fn payload(value: Value) -> Payload {
        value.as_object().cloned().unwrap()
    }

    async fn registry_with_level() -> (GrantRegistry, Arc<MemoryStore>, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        let level = SecurityLevel {
            id: Uuid::new_v4(),
            title: "Confidential".to_string(),
            description: None,
            project_id: Uuid::new_v4(),
            level: Classification::Confidential,
            created: now,
            modified: now,
            state: RecordState::Active,
        };
        store.insert_level(&level).await.unwrap();
        (GrantRegistry::new(store.clone()), store, level.id)
    }

    fn user(id: Uuid) -> RecipientFields {
        RecipientFields { user_id: Some(id), ..Default::default() }
    }

    fn grant_to(fields: RecipientFields) -> Payload {
        payload(json!({
            "userId": fields.user_id,
            "teamId": fields.team_id,
            "projectRoleId": fields.project_role_id,
        }))
    }

    #[tokio::test]
    async fn second_identical_grant_conflicts() {
        let (registry, store, level) = registry_with_level().await;
        let u1 = Uuid::new_v4();

        registry.grant(level, &grant_to(user(u1))).await.unwrap();
        let err = registry.grant(level, &grant_to(user(u1))).await.unwrap_err();

        assert!(matches!(err, SecurityError::AlreadyExists(_)));
        assert_eq!(store.active_grants(level).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn grant_with_two_recipients_creates_nothing() {
        let (registry, store, level) = registry_with_level().await;
        let fields = RecipientFields {
            user_id: Some(Uuid::new_v4()),
            team_id: Some(Uuid::new_v4()),
            project_role_id: None,
        };
        let err = registry.grant(level, &grant_to(fields)).await.unwrap_err();
        assert!(matches!(err, SecurityError::InvalidData(_)));
        assert_eq!(store.grant_rows().await, 0);
    }

    #[tokio::test]
    async fn unknown_level_is_reported_before_recipient_shape() {
        let (registry, _, _) = registry_with_level().await;
        let err = registry
            .grant(Uuid::new_v4(), &payload(json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, SecurityError::NotFound(_)));
    }

    #[tokio::test]
    async fn unknown_level_is_reported_before_malformed_recipient_id() {
        let (registry, _, _) = registry_with_level().await;
        let err = registry
            .grant(Uuid::new_v4(), &payload(json!({ "userId": "not-a-uuid" })))
            .await
            .unwrap_err();
        assert!(matches!(err, SecurityError::NotFound(_)));
    }

    #[tokio::test]
    async fn revoke_without_active_grant_is_not_found() {
        let (registry, store, level) = registry_with_level().await;
        let err = registry.revoke(level, user(Uuid::new_v4())).await.unwrap_err();
        assert!(matches!(err, SecurityError::NotFound(_)));
        assert_eq!(store.grant_rows().await, 0);
    }

    #[tokio::test]
    async fn revoke_then_regrant_is_allowed() {
        let (registry, _, level) = registry_with_level().await;
        let team = RecipientFields { team_id: Some(Uuid::new_v4()), ..Default::default() };

        registry.grant(level, &grant_to(team)).await.unwrap();
        let revoked = registry.revoke(level, team).await.unwrap();
        assert_eq!(revoked.count, 1);
        assert!(registry.active_grants(level).await.unwrap().is_empty());

        registry.grant(level, &grant_to(team)).await.unwrap();
        assert_eq!(registry.active_grants(level).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn revoke_matches_recipient_kind_exactly() {
        let (registry, _, level) = registry_with_level().await;
        let id = Uuid::new_v4();
        registry.grant(level, &grant_to(user(id))).await.unwrap();

        let as_team = RecipientFields { team_id: Some(id), ..Default::default() };
        assert!(matches!(
            registry.revoke(level, as_team).await,
            Err(SecurityError::NotFound(_))
        ));
        assert_eq!(registry.active_grants(level).await.unwrap().len(), 1);
    }
}
