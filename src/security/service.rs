use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth::Actor;
use crate::security::catalog::SecurityLevelCatalog;
use crate::security::directory::{
    EntityClassification, ProjectDirectory, ProjectRoleMembership, TeamMembership,
};
use crate::security::error::SecurityError;
use crate::security::events::{EventNotifier, SecurityEvent};
use crate::security::gate::{Capability, PermissionGate};
use crate::security::grants::{GrantRegistry, Revocation};
use crate::security::model::{
    EntityKind, EntityRef, Grant, LevelChanges, LevelDraft, RecipientFields, SecurityLevel,
};
use crate::security::payload::{self, Payload};
use crate::security::resolver::{AccessPath, AccessResolver};
use crate::security::store::{RemovedLevel, SecurityStore};
use crate::types::Action;

/// Result of an access check
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessDecision {
    pub security_level_id: Uuid,
    pub user_id: Uuid,
    pub has_access: bool,
    #[serde(skip)]
    pub path: Option<AccessPath>,
}

/// Result of an access check against a ticket or project
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityAccessDecision {
    pub entity_id: Uuid,
    pub entity_type: EntityKind,
    pub user_id: Uuid,
    /// Null when the entity carries no level
    pub security_level_id: Option<Uuid>,
    pub has_access: bool,
}

/// Entry point for the security-level actions.
///
/// Mutations run gate, then component, then notifier. Read, list and both
/// checks skip the gate and are open to any authenticated actor.
pub struct SecurityService {
    store: Arc<dyn SecurityStore>,
    catalog: SecurityLevelCatalog,
    grants: GrantRegistry,
    resolver: AccessResolver,
    gate: Arc<dyn PermissionGate>,
    notifier: Arc<dyn EventNotifier>,
}

impl SecurityService {
    pub fn new<D>(
        store: Arc<dyn SecurityStore>,
        directory: Arc<D>,
        gate: Arc<dyn PermissionGate>,
        notifier: Arc<dyn EventNotifier>,
    ) -> Self
    where
        D: ProjectDirectory + TeamMembership + ProjectRoleMembership + EntityClassification + 'static,
    {
        Self {
            catalog: SecurityLevelCatalog::new(store.clone(), directory.clone()),
            grants: GrantRegistry::new(store.clone()),
            resolver: AccessResolver::new(store.clone(), directory.clone(), directory.clone(), directory),
            store,
            gate,
            notifier,
        }
    }

    pub async fn create(&self, actor: &Actor, data: &Payload) -> Result<SecurityLevel, SecurityError> {
        self.authorize(actor, Action::Create).await?;
        let draft = LevelDraft::from_payload(data)?;

        let level = self.catalog.create(draft).await.map_err(|e| log_failure(Action::Create, e))?;
        info!(
            "Security level created: id={} project={} level={} by {}",
            level.id, level.project_id, level.level, actor.username
        );

        self.publish(
            SecurityEvent::new(Action::Create, level.id, &actor.username, json!({
                "title": level.title,
                "level": level.level,
            }))
            .in_project(level.project_id),
        );
        Ok(level)
    }

    pub async fn read(&self, _actor: &Actor, data: &Payload) -> Result<SecurityLevel, SecurityError> {
        let id = payload::required_uuid(data, "securityLevelId")?;
        self.catalog.read(id).await.map_err(|e| log_failure(Action::Read, e))
    }

    pub async fn list(&self, _actor: &Actor, data: &Payload) -> Result<Vec<SecurityLevel>, SecurityError> {
        let project_id = payload::optional_uuid(data, "projectId")?;
        self.catalog.list(project_id).await.map_err(|e| log_failure(Action::List, e))
    }

    pub async fn modify(&self, actor: &Actor, data: &Payload) -> Result<SecurityLevel, SecurityError> {
        self.authorize(actor, Action::Modify).await?;
        let id = payload::required_uuid(data, "securityLevelId")?;
        let changes = LevelChanges::from_payload(data)?;

        let level = self.catalog.modify(id, changes).await.map_err(|e| log_failure(Action::Modify, e))?;
        info!("Security level updated: id={} by {}", level.id, actor.username);

        self.publish(
            SecurityEvent::new(Action::Modify, level.id, &actor.username, json!({
                "title": level.title,
                "description": level.description,
                "level": level.level,
            }))
            .in_project(level.project_id),
        );
        Ok(level)
    }

    pub async fn remove(&self, actor: &Actor, data: &Payload) -> Result<RemovedLevel, SecurityError> {
        self.authorize(actor, Action::Remove).await?;
        let id = payload::required_uuid(data, "securityLevelId")?;

        let removed = self.catalog.remove(id).await.map_err(|e| log_failure(Action::Remove, e))?;
        info!(
            "Security level removed: id={} grants_revoked={} by {}",
            id, removed.grants_revoked, actor.username
        );

        self.publish(
            SecurityEvent::new(Action::Remove, id, &actor.username, json!({
                "grantsRevoked": removed.grants_revoked,
            }))
            .in_project(removed.level.project_id),
        );
        Ok(removed)
    }

    pub async fn grant(&self, actor: &Actor, data: &Payload) -> Result<Grant, SecurityError> {
        self.authorize(actor, Action::Grant).await?;
        let level_id = payload::required_uuid(data, "securityLevelId")?;

        let grant = self
            .grants
            .grant(level_id, data)
            .await
            .map_err(|e| log_failure(Action::Grant, e))?;
        info!(
            "Security level access granted: level={} {}={} by {}",
            level_id,
            grant.recipient.field(),
            grant.recipient.id(),
            actor.username
        );

        self.publish(SecurityEvent::new(
            Action::Grant,
            level_id,
            &actor.username,
            json!({ "mappingId": grant.id, grant.recipient.field(): grant.recipient.id() }),
        ));
        Ok(grant)
    }

    pub async fn revoke(&self, actor: &Actor, data: &Payload) -> Result<Revocation, SecurityError> {
        self.authorize(actor, Action::Revoke).await?;
        let level_id = payload::required_uuid(data, "securityLevelId")?;
        let fields = RecipientFields::from_payload(data)?;

        let revocation = self
            .grants
            .revoke(level_id, fields)
            .await
            .map_err(|e| log_failure(Action::Revoke, e))?;
        info!(
            "Security level access revoked: level={} {}={} count={} by {}",
            level_id,
            revocation.recipient.field(),
            revocation.recipient.id(),
            revocation.count,
            actor.username
        );

        self.publish(SecurityEvent::new(
            Action::Revoke,
            level_id,
            &actor.username,
            json!({ revocation.recipient.field(): revocation.recipient.id() }),
        ));
        Ok(revocation)
    }

    /// The principal is `userId` (or `principalId`) when given, else the actor
    pub async fn check(&self, actor: &Actor, data: &Payload) -> Result<AccessDecision, SecurityError> {
        let level_id = payload::required_uuid(data, "securityLevelId")?;
        let user_id = principal(actor, data)?;

        let path = self
            .resolver
            .resolve(level_id, user_id)
            .await
            .map_err(|e| log_failure(Action::Check, e))?;
        info!(
            "Security level access check: level={} user={} access={} via={:?}",
            level_id,
            user_id,
            path.is_some(),
            path
        );

        Ok(AccessDecision {
            security_level_id: level_id,
            user_id,
            has_access: path.is_some(),
            path,
        })
    }

    /// Resolves the level placed on a ticket or project, then checks it like `check`
    pub async fn check_entity(
        &self,
        actor: &Actor,
        data: &Payload,
    ) -> Result<EntityAccessDecision, SecurityError> {
        let entity = EntityRef::from_payload(data)?;
        let user_id = principal(actor, data)?;

        let access = self
            .resolver
            .check_entity(entity, user_id)
            .await
            .map_err(|e| log_failure(Action::CheckEntity, e))?;
        info!(
            "Entity access check: {}={} level={:?} user={} access={} via={:?}",
            entity.kind, entity.id, access.security_level_id, user_id, access.has_access, access.path
        );

        Ok(EntityAccessDecision {
            entity_id: entity.id,
            entity_type: entity.kind,
            user_id,
            security_level_id: access.security_level_id,
            has_access: access.has_access,
        })
    }

    pub async fn health(&self) -> Result<(), SecurityError> {
        Ok(self.store.ping().await?)
    }

    async fn authorize(&self, actor: &Actor, action: Action) -> Result<(), SecurityError> {
        let Some(permission) = action.required_permission() else {
            return Ok(());
        };
        let capability = Capability::security_level(permission);

        match self.gate.authorize(actor, capability).await {
            Ok(true) => Ok(()),
            Ok(false) => {
                warn!("{} denied for {}: insufficient permission", action, actor.username);
                Err(SecurityError::Forbidden("Insufficient permissions".to_string()))
            }
            Err(e) => {
                error!("Permission check failed for {} by {}: {}", action, actor.username, e);
                Err(SecurityError::PermissionService(e))
            }
        }
    }

    fn publish(&self, event: SecurityEvent) {
        self.notifier.notify(event);
    }
}

fn principal(actor: &Actor, data: &Payload) -> Result<Uuid, SecurityError> {
    match payload::optional_uuid(data, "userId")? {
        Some(id) => Ok(id),
        None => Ok(payload::optional_uuid(data, "principalId")?.unwrap_or(actor.user_id)),
    }
}

fn log_failure(action: Action, err: SecurityError) -> SecurityError {
    match &err {
        SecurityError::Database(e) => error!("{} failed: {}", action, e),
        SecurityError::NotFound(msg) | SecurityError::AlreadyExists(msg) => {
            warn!("{} rejected: {}", action, msg)
        }
        _ => {}
    }
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AccessLevel;
    use crate::security::directory::StaticDirectory;
    use crate::security::events::BroadcastNotifier;
    use crate::security::gate::{AccessClaimGate, GateError};
    use crate::security::store::MemoryStore;
    use async_trait::async_trait;
    use serde_json::Value;

    struct FailingGate;

    #[async_trait]
    impl PermissionGate for FailingGate {
        async fn authorize(&self, _: &Actor, _: Capability) -> Result<bool, GateError> {
            Err(GateError::Status {
                status: 503,
                body: "down".to_string(),
            })
        }
    }

    struct Harness {
        service: SecurityService,
        store: Arc<MemoryStore>,
        directory: Arc<StaticDirectory>,
        notifier: Arc<BroadcastNotifier>,
        project: Uuid,
    }

    async fn harness_with_gate(gate: Arc<dyn PermissionGate>) -> Harness {
        let store = Arc::new(MemoryStore::new());
        let directory = Arc::new(StaticDirectory::new());
        let notifier = Arc::new(BroadcastNotifier::new(16));
        let project = Uuid::new_v4();
        directory.add_project(project).await;
        let service = SecurityService::new(store.clone(), directory.clone(), gate, notifier.clone());
        Harness { service, store, directory, notifier, project }
    }

    async fn harness() -> Harness {
        harness_with_gate(Arc::new(AccessClaimGate)).await
    }

    fn actor(access: AccessLevel) -> Actor {
        Actor {
            user_id: Uuid::new_v4(),
            username: "alice".to_string(),
            tenant: "acme".to_string(),
            access,
        }
    }

    fn data(value: Value) -> Payload {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn denied_actor_cannot_create() {
        let h = harness().await;
        let err = h
            .service
            .create(
                &actor(AccessLevel::Read),
                &data(json!({ "title": "Secret", "projectId": h.project, "level": 5 })),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SecurityError::Forbidden(_)));
        assert!(h.store.list_levels(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn gate_failure_fails_closed() {
        let h = harness_with_gate(Arc::new(FailingGate)).await;
        let err = h
            .service
            .create(
                &actor(AccessLevel::Root),
                &data(json!({ "title": "Secret", "projectId": h.project, "level": 5 })),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SecurityError::PermissionService(_)));
        assert!(h.store.list_levels(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn check_is_not_gated() {
        let h = harness_with_gate(Arc::new(FailingGate)).await;
        let decision = h
            .service
            .check(&actor(AccessLevel::Read), &data(json!({ "securityLevelId": Uuid::new_v4() })))
            .await
            .unwrap();
        assert!(!decision.has_access);
    }

    #[tokio::test]
    async fn entity_check_is_not_gated_and_defaults_to_caller() {
        let h = harness_with_gate(Arc::new(FailingGate)).await;
        let reader = actor(AccessLevel::Read);
        let ticket = EntityRef::new(EntityKind::Ticket, Uuid::new_v4());
        h.directory.set_entity_level(ticket, None).await;

        let decision = h
            .service
            .check_entity(&reader, &data(json!({ "entityId": ticket.id, "entityType": "ticket" })))
            .await
            .unwrap();
        assert!(decision.has_access);
        assert_eq!(decision.user_id, reader.user_id);
        assert_eq!(decision.security_level_id, None);
    }

    #[tokio::test]
    async fn check_defaults_to_caller() {
        let h = harness().await;
        let admin = actor(AccessLevel::Full);
        let level = h
            .service
            .create(&admin, &data(json!({ "title": "Internal", "projectId": h.project, "level": 2 })))
            .await
            .unwrap();
        h.service
            .grant(&admin, &data(json!({ "securityLevelId": level.id, "userId": admin.user_id })))
            .await
            .unwrap();

        let decision = h
            .service
            .check(&admin, &data(json!({ "securityLevelId": level.id })))
            .await
            .unwrap();
        assert_eq!(decision.user_id, admin.user_id);
        assert!(decision.has_access);
        assert_eq!(decision.path, Some(AccessPath::Direct));
    }

    #[tokio::test]
    async fn principal_id_is_accepted_for_check() {
        let h = harness().await;
        let admin = actor(AccessLevel::Root);
        let (team, member) = (Uuid::new_v4(), Uuid::new_v4());
        h.directory.add_team_member(team, member).await;
        let level = h
            .service
            .create(&admin, &data(json!({ "title": "Restricted", "projectId": h.project, "level": 4 })))
            .await
            .unwrap();
        h.service
            .grant(&admin, &data(json!({ "securityLevelId": level.id, "teamId": team })))
            .await
            .unwrap();

        let decision = h
            .service
            .check(&admin, &data(json!({ "securityLevelId": level.id, "principalId": member })))
            .await
            .unwrap();
        assert_eq!(decision.user_id, member);
        assert_eq!(decision.path, Some(AccessPath::Team(team)));
    }

    #[tokio::test]
    async fn mutations_publish_events() {
        let h = harness().await;
        let mut rx = h.notifier.subscribe();
        let admin = actor(AccessLevel::Root);

        let level = h
            .service
            .create(&admin, &data(json!({ "title": "Secret", "projectId": h.project, "level": 5 })))
            .await
            .unwrap();
        h.service
            .remove(&admin, &data(json!({ "securityLevelId": level.id })))
            .await
            .unwrap();

        let created = rx.recv().await.unwrap();
        assert_eq!(created.action, Action::Create);
        assert_eq!(created.project_id, Some(h.project));
        let removed = rx.recv().await.unwrap();
        assert_eq!(removed.action, Action::Remove);
        assert_eq!(removed.security_level_id, level.id);
    }

    #[tokio::test]
    async fn failed_mutation_publishes_nothing() {
        let h = harness().await;
        let mut rx = h.notifier.subscribe();
        let admin = actor(AccessLevel::Root);

        let err = h
            .service
            .create(&admin, &data(json!({ "title": "Bad", "projectId": h.project, "level": 9 })))
            .await
            .unwrap_err();
        assert!(matches!(err, SecurityError::InvalidData(_)));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn edit_access_may_grant_but_not_remove() {
        let h = harness().await;
        let admin = actor(AccessLevel::Root);
        let editor = actor(AccessLevel::Edit);
        let level = h
            .service
            .create(&admin, &data(json!({ "title": "Internal", "projectId": h.project, "level": 2 })))
            .await
            .unwrap();

        h.service
            .grant(&editor, &data(json!({ "securityLevelId": level.id, "userId": Uuid::new_v4() })))
            .await
            .unwrap();
        let err = h
            .service
            .remove(&editor, &data(json!({ "securityLevelId": level.id })))
            .await
            .unwrap_err();
        assert!(matches!(err, SecurityError::Forbidden(_)));
    }
}
