use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::security::directory::{EntityClassification, ProjectRoleMembership, TeamMembership};
use crate::security::error::SecurityError;
use crate::security::model::{EntityMarking, EntityRef, RecipientRef};
use crate::security::store::SecurityStore;

/// Which grant opened the level to the principal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "via", content = "id", rename_all = "camelCase")]
pub enum AccessPath {
    Direct,
    Team(Uuid),
    ProjectRole(Uuid),
}

/// Access to a ticket or project through the level placed on it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityAccess {
    /// None when the entity carries no level
    pub security_level_id: Option<Uuid>,
    pub path: Option<AccessPath>,
    pub has_access: bool,
}

/// Answers "may principal P see level L" by walking direct, team, then
/// project-role grants. No ordinal comparison between levels is made.
///
/// Every answer is read fresh from the store and directory; nothing is cached,
/// so a revoke is visible to the very next check.
pub struct AccessResolver {
    store: Arc<dyn SecurityStore>,
    teams: Arc<dyn TeamMembership>,
    roles: Arc<dyn ProjectRoleMembership>,
    entities: Arc<dyn EntityClassification>,
}

impl AccessResolver {
    pub fn new(
        store: Arc<dyn SecurityStore>,
        teams: Arc<dyn TeamMembership>,
        roles: Arc<dyn ProjectRoleMembership>,
        entities: Arc<dyn EntityClassification>,
    ) -> Self {
        Self { store, teams, roles, entities }
    }

    /// An entity without a level is unrestricted. Otherwise the principal
    /// needs access to the entity's level.
    pub async fn check_entity(
        &self,
        entity: EntityRef,
        principal_id: Uuid,
    ) -> Result<EntityAccess, SecurityError> {
        match self.entities.entity_marking(entity).await? {
            EntityMarking::Missing => Err(SecurityError::not_found(format!(
                "{} not found",
                capitalize(entity.kind.as_str())
            ))),
            EntityMarking::Unrestricted => Ok(EntityAccess {
                security_level_id: None,
                path: None,
                has_access: true,
            }),
            EntityMarking::Level(level_id) => {
                let path = self.resolve(level_id, principal_id).await?;
                Ok(EntityAccess {
                    security_level_id: Some(level_id),
                    path,
                    has_access: path.is_some(),
                })
            }
        }
    }

    pub async fn check(&self, security_level_id: Uuid, principal_id: Uuid) -> Result<bool, SecurityError> {
        Ok(self.resolve(security_level_id, principal_id).await?.is_some())
    }

    /// First matching path, or None. An unknown or removed level resolves to None.
    pub async fn resolve(
        &self,
        security_level_id: Uuid,
        principal_id: Uuid,
    ) -> Result<Option<AccessPath>, SecurityError> {
        let Some(level) = self.store.find_level(security_level_id).await? else {
            return Ok(None);
        };
        let grants = self.store.active_grants(security_level_id).await?;

        if grants.iter().any(|g| g.recipient == RecipientRef::User(principal_id)) {
            return Ok(Some(AccessPath::Direct));
        }

        for team_id in grants.iter().filter_map(|g| g.recipient.team_id()) {
            if self.teams.is_team_member(team_id, principal_id).await? {
                return Ok(Some(AccessPath::Team(team_id)));
            }
        }

        for role_id in grants.iter().filter_map(|g| g.recipient.project_role_id()) {
            if self
                .roles
                .has_project_role(role_id, principal_id, level.project_id)
                .await?
            {
                return Ok(Some(AccessPath::ProjectRole(role_id)));
            }
        }

        Ok(None)
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
