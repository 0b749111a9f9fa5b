//! Read-only facts owned by other subsystems: project liveness, team membership,
//! project-role membership and the level placed on tickets and projects. The
//! core queries them and never writes them.

use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::DatabaseError;
use crate::security::model::{EntityMarking, EntityRef};

#[async_trait]
pub trait ProjectDirectory: Send + Sync {
    /// True when the project exists and is not tombstoned
    async fn project_exists(&self, project_id: Uuid) -> Result<bool, DatabaseError>;
}

#[async_trait]
pub trait TeamMembership: Send + Sync {
    /// True when the user is an active member of the team
    async fn is_team_member(&self, team_id: Uuid, user_id: Uuid) -> Result<bool, DatabaseError>;
}

#[async_trait]
pub trait ProjectRoleMembership: Send + Sync {
    /// True when the user actively holds the role within the project
    async fn has_project_role(
        &self,
        project_role_id: Uuid,
        user_id: Uuid,
        project_id: Uuid,
    ) -> Result<bool, DatabaseError>;
}

#[async_trait]
pub trait EntityClassification: Send + Sync {
    /// The security level assigned to a live entity, if any
    async fn entity_marking(&self, entity: EntityRef) -> Result<EntityMarking, DatabaseError>;
}

/// Directory over the `project`, `ticket`, `team_user` and `project_role_user_mapping` tables
#[derive(Clone)]
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProjectDirectory for PgDirectory {
    async fn project_exists(&self, project_id: Uuid) -> Result<bool, DatabaseError> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM project WHERE id = $1 AND deleted = false")
                .bind(project_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count.0 > 0)
    }
}

#[async_trait]
impl TeamMembership for PgDirectory {
    async fn is_team_member(&self, team_id: Uuid, user_id: Uuid) -> Result<bool, DatabaseError> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM team_user WHERE team_id = $1 AND user_id = $2 AND deleted = false",
        )
        .bind(team_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count.0 > 0)
    }
}

#[async_trait]
impl ProjectRoleMembership for PgDirectory {
    async fn has_project_role(
        &self,
        project_role_id: Uuid,
        user_id: Uuid,
        project_id: Uuid,
    ) -> Result<bool, DatabaseError> {
        let count: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM project_role_user_mapping
            WHERE project_role_id = $1 AND user_id = $2 AND project_id = $3 AND deleted = false
            "#,
        )
        .bind(project_role_id)
        .bind(user_id)
        .bind(project_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count.0 > 0)
    }
}

#[async_trait]
impl EntityClassification for PgDirectory {
    async fn entity_marking(&self, entity: EntityRef) -> Result<EntityMarking, DatabaseError> {
        // table() only yields fixed identifiers
        let sql = format!(
            "SELECT security_level_id FROM {} WHERE id = $1 AND deleted = false",
            entity.kind.table()
        );
        let row: Option<(Option<Uuid>,)> = sqlx::query_as(&sql)
            .bind(entity.id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(match row {
            None => EntityMarking::Missing,
            Some((None,)) => EntityMarking::Unrestricted,
            Some((Some(level_id),)) => EntityMarking::Level(level_id),
        })
    }
}

#[derive(Default)]
struct Facts {
    projects: HashSet<Uuid>,
    team_members: HashSet<(Uuid, Uuid)>,
    project_roles: HashSet<(Uuid, Uuid, Uuid)>,
    entities: HashMap<EntityRef, Option<Uuid>>,
}

/// In-memory directory, seeded by the embedding application or a test
#[derive(Default)]
pub struct StaticDirectory {
    facts: RwLock<Facts>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_project(&self, project_id: Uuid) {
        self.facts.write().await.projects.insert(project_id);
    }

    pub async fn remove_project(&self, project_id: Uuid) {
        self.facts.write().await.projects.remove(&project_id);
    }

    pub async fn add_team_member(&self, team_id: Uuid, user_id: Uuid) {
        self.facts.write().await.team_members.insert((team_id, user_id));
    }

    pub async fn remove_team_member(&self, team_id: Uuid, user_id: Uuid) {
        self.facts.write().await.team_members.remove(&(team_id, user_id));
    }

    pub async fn add_project_role(&self, project_role_id: Uuid, user_id: Uuid, project_id: Uuid) {
        self.facts
            .write()
            .await
            .project_roles
            .insert((project_role_id, user_id, project_id));
    }

    /// Register a ticket or project, optionally carrying a security level
    pub async fn set_entity_level(&self, entity: EntityRef, security_level_id: Option<Uuid>) {
        self.facts.write().await.entities.insert(entity, security_level_id);
    }

    pub async fn remove_project_role(&self, project_role_id: Uuid, user_id: Uuid, project_id: Uuid) {
        self.facts
            .write()
            .await
            .project_roles
            .remove(&(project_role_id, user_id, project_id));
    }
}

#[async_trait]
impl ProjectDirectory for StaticDirectory {
    async fn project_exists(&self, project_id: Uuid) -> Result<bool, DatabaseError> {
        Ok(self.facts.read().await.projects.contains(&project_id))
    }
}

#[async_trait]
impl TeamMembership for StaticDirectory {
    async fn is_team_member(&self, team_id: Uuid, user_id: Uuid) -> Result<bool, DatabaseError> {
        Ok(self.facts.read().await.team_members.contains(&(team_id, user_id)))
    }
}

#[async_trait]
impl ProjectRoleMembership for StaticDirectory {
    async fn has_project_role(
        &self,
        project_role_id: Uuid,
        user_id: Uuid,
        project_id: Uuid,
    ) -> Result<bool, DatabaseError> {
        Ok(self
            .facts
            .read()
            .await
            .project_roles
            .contains(&(project_role_id, user_id, project_id)))
    }
}

#[async_trait]
impl EntityClassification for StaticDirectory {
    async fn entity_marking(&self, entity: EntityRef) -> Result<EntityMarking, DatabaseError> {
        Ok(match self.facts.read().await.entities.get(&entity) {
            None => EntityMarking::Missing,
            Some(None) => EntityMarking::Unrestricted,
            Some(Some(level_id)) => EntityMarking::Level(*level_id),
        })
    }
}
