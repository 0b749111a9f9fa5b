use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::database::DatabaseError;
use crate::security::model::{
    Classification, Grant, LevelUpdate, RecipientFields, RecipientRef, RecordState, SecurityLevel,
};
use crate::security::store::{GrantInsert, RemovedLevel, SecurityStore};

const LEVEL_COLUMNS: &str = "id, title, description, project_id, level, created, modified, deleted";
const GRANT_COLUMNS: &str =
    "id, security_level_id, user_id, team_id, project_role_id, created, deleted";

#[derive(Debug, FromRow)]
struct LevelRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    project_id: Uuid,
    level: i16,
    created: DateTime<Utc>,
    modified: DateTime<Utc>,
    deleted: bool,
}

impl TryFrom<LevelRow> for SecurityLevel {
    type Error = DatabaseError;

    fn try_from(row: LevelRow) -> Result<Self, Self::Error> {
        let level = Classification::try_from(row.level as i64)
            .map_err(|e| DatabaseError::CorruptRow(format!("security_level {}: {}", row.id, e)))?;
        Ok(SecurityLevel {
            id: row.id,
            title: row.title,
            description: row.description,
            project_id: row.project_id,
            level,
            created: row.created,
            modified: row.modified,
            state: RecordState::from_deleted(row.deleted),
        })
    }
}

#[derive(Debug, FromRow)]
struct GrantRow {
    id: Uuid,
    security_level_id: Uuid,
    user_id: Option<Uuid>,
    team_id: Option<Uuid>,
    project_role_id: Option<Uuid>,
    created: DateTime<Utc>,
    deleted: bool,
}

impl TryFrom<GrantRow> for Grant {
    type Error = DatabaseError;

    fn try_from(row: GrantRow) -> Result<Self, Self::Error> {
        let recipient = RecipientRef::try_from(RecipientFields {
            user_id: row.user_id,
            team_id: row.team_id,
            project_role_id: row.project_role_id,
        })
        .map_err(|e| {
            DatabaseError::CorruptRow(format!("security_level_permission_mapping {}: {}", row.id, e))
        })?;
        Ok(Grant {
            id: row.id,
            security_level_id: row.security_level_id,
            recipient,
            created: row.created,
            state: RecordState::from_deleted(row.deleted),
        })
    }
}

/// Postgres-backed store over `security_level` and `security_level_permission_mapping`
#[derive(Clone)]
pub struct PgSecurityStore {
    pool: PgPool,
}

impl PgSecurityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SecurityStore for PgSecurityStore {
    async fn insert_level(&self, level: &SecurityLevel) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO security_level (id, title, description, project_id, level, created, modified, deleted)
            VALUES ($1, $2, $3, $4, $5, $6, $7, false)
            "#,
        )
        .bind(level.id)
        .bind(&level.title)
        .bind(&level.description)
        .bind(level.project_id)
        .bind(level.level.ordinal())
        .bind(level.created)
        .bind(level.modified)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_level(&self, id: Uuid) -> Result<Option<SecurityLevel>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM security_level WHERE id = $1 AND deleted = false",
            LEVEL_COLUMNS
        );
        let row = sqlx::query_as::<_, LevelRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(SecurityLevel::try_from).transpose()
    }

    async fn list_levels(&self, project_id: Option<Uuid>) -> Result<Vec<SecurityLevel>, DatabaseError> {
        let sql = format!(
            r#"
            SELECT {} FROM security_level
            WHERE deleted = false AND ($1::uuid IS NULL OR project_id = $1)
            ORDER BY level ASC, title ASC
            "#,
            LEVEL_COLUMNS
        );
        let rows = sqlx::query_as::<_, LevelRow>(&sql)
            .bind(project_id)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(SecurityLevel::try_from).collect()
    }

    async fn update_level(
        &self,
        id: Uuid,
        update: &LevelUpdate,
        modified: DateTime<Utc>,
    ) -> Result<Option<SecurityLevel>, DatabaseError> {
        let sql = format!(
            r#"
            UPDATE security_level
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                level = COALESCE($4, level),
                modified = $5
            WHERE id = $1 AND deleted = false
            RETURNING {}
            "#,
            LEVEL_COLUMNS
        );
        let row = sqlx::query_as::<_, LevelRow>(&sql)
            .bind(id)
            .bind(&update.title)
            .bind(&update.description)
            .bind(update.level.map(Classification::ordinal))
            .bind(modified)
            .fetch_optional(&self.pool)
            .await?;
        row.map(SecurityLevel::try_from).transpose()
    }

    async fn remove_level(
        &self,
        id: Uuid,
        modified: DateTime<Utc>,
    ) -> Result<Option<RemovedLevel>, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            UPDATE security_level SET deleted = true, modified = $2
            WHERE id = $1 AND deleted = false
            RETURNING {}
            "#,
            LEVEL_COLUMNS
        );
        let Some(row) = sqlx::query_as::<_, LevelRow>(&sql)
            .bind(id)
            .bind(modified)
            .fetch_optional(&mut *tx)
            .await?
        else {
            tx.rollback().await?;
            return Ok(None);
        };

        let grants = sqlx::query(
            r#"
            UPDATE security_level_permission_mapping SET deleted = true
            WHERE security_level_id = $1 AND deleted = false
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(RemovedLevel {
            level: SecurityLevel::try_from(row)?,
            grants_revoked: grants.rows_affected(),
        }))
    }

    async fn insert_grant(&self, grant: &Grant) -> Result<GrantInsert, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        // Shared row lock: a concurrent remove_level waits until this commits
        let live: Option<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM security_level WHERE id = $1 AND deleted = false FOR SHARE",
        )
        .bind(grant.security_level_id)
        .fetch_optional(&mut *tx)
        .await?;

        if live.is_none() {
            tx.rollback().await?;
            return Ok(GrantInsert::LevelMissing);
        }

        // The partial unique indexes turn a duplicate active grant into a no-op insert
        let fields = grant.recipient.into_fields();
        let inserted = sqlx::query(
            r#"
            INSERT INTO security_level_permission_mapping
                (id, security_level_id, user_id, team_id, project_role_id, created, deleted)
            VALUES ($1, $2, $3, $4, $5, $6, false)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(grant.id)
        .bind(grant.security_level_id)
        .bind(fields.user_id)
        .bind(fields.team_id)
        .bind(fields.project_role_id)
        .bind(grant.created)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        if inserted.rows_affected() == 0 {
            Ok(GrantInsert::Duplicate)
        } else {
            Ok(GrantInsert::Inserted)
        }
    }

    async fn revoke_grants(
        &self,
        security_level_id: Uuid,
        recipient: &RecipientRef,
    ) -> Result<u64, DatabaseError> {
        // column() only yields fixed identifiers
        let sql = format!(
            r#"
            UPDATE security_level_permission_mapping SET deleted = true
            WHERE security_level_id = $1 AND {} = $2 AND deleted = false
            "#,
            recipient.column()
        );
        let result = sqlx::query(&sql)
            .bind(security_level_id)
            .bind(recipient.id())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn active_grants(&self, security_level_id: Uuid) -> Result<Vec<Grant>, DatabaseError> {
        let sql = format!(
            r#"
            SELECT {} FROM security_level_permission_mapping
            WHERE security_level_id = $1 AND deleted = false
            ORDER BY created ASC
            "#,
            GRANT_COLUMNS
        );
        let rows = sqlx::query_as::<_, GrantRow>(&sql)
            .bind(security_level_id)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Grant::try_from).collect()
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
