use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::DatabaseError;
use crate::security::model::{Grant, LevelUpdate, RecipientRef, RecordState, SecurityLevel};

/// Outcome of an atomic check-then-insert of a grant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantInsert {
    Inserted,
    /// An active grant for the same (level, recipient) already exists
    Duplicate,
    /// The level is missing or tombstoned
    LevelMissing,
}

/// A level tombstoned together with its grants
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedLevel {
    pub level: SecurityLevel,
    pub grants_revoked: u64,
}

/// Persistence for security levels and their grants.
///
/// Every read excludes tombstoned rows. `insert_grant` and `remove_level` are
/// atomic: the duplicate check cannot race the insert, and a level is never
/// removed without its grants.
#[async_trait]
pub trait SecurityStore: Send + Sync {
    async fn insert_level(&self, level: &SecurityLevel) -> Result<(), DatabaseError>;

    async fn find_level(&self, id: Uuid) -> Result<Option<SecurityLevel>, DatabaseError>;

    /// Active levels ordered by (level, title) ascending
    async fn list_levels(&self, project_id: Option<Uuid>) -> Result<Vec<SecurityLevel>, DatabaseError>;

    async fn update_level(
        &self,
        id: Uuid,
        update: &LevelUpdate,
        modified: DateTime<Utc>,
    ) -> Result<Option<SecurityLevel>, DatabaseError>;

    async fn remove_level(
        &self,
        id: Uuid,
        modified: DateTime<Utc>,
    ) -> Result<Option<RemovedLevel>, DatabaseError>;

    async fn insert_grant(&self, grant: &Grant) -> Result<GrantInsert, DatabaseError>;

    /// Tombstone the active grant(s) for exactly this (level, recipient); returns the count
    async fn revoke_grants(
        &self,
        security_level_id: Uuid,
        recipient: &RecipientRef,
    ) -> Result<u64, DatabaseError>;

    async fn active_grants(&self, security_level_id: Uuid) -> Result<Vec<Grant>, DatabaseError>;

    async fn ping(&self) -> Result<(), DatabaseError>;
}

#[derive(Default)]
struct Tables {
    levels: HashMap<Uuid, SecurityLevel>,
    grants: Vec<Grant>,
}

/// In-process store. A single lock guards both tables, so multi-step
/// operations observe and mutate them atomically.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total grant rows, tombstoned included
    pub async fn grant_rows(&self) -> usize {
        self.tables.read().await.grants.len()
    }
}

fn active_level(tables: &Tables, id: Uuid) -> Option<&SecurityLevel> {
    tables.levels.get(&id).filter(|l| l.state.is_active())
}

#[async_trait]
impl SecurityStore for MemoryStore {
    async fn insert_level(&self, level: &SecurityLevel) -> Result<(), DatabaseError> {
        let mut tables = self.tables.write().await;
        if tables.levels.contains_key(&level.id) {
            return Err(DatabaseError::QueryError(format!(
                "duplicate security_level id {}",
                level.id
            )));
        }
        tables.levels.insert(level.id, level.clone());
        Ok(())
    }

    async fn find_level(&self, id: Uuid) -> Result<Option<SecurityLevel>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(active_level(&tables, id).cloned())
    }

    async fn list_levels(&self, project_id: Option<Uuid>) -> Result<Vec<SecurityLevel>, DatabaseError> {
        let tables = self.tables.read().await;
        let mut levels: Vec<SecurityLevel> = tables
            .levels
            .values()
            .filter(|l| l.state.is_active())
            .filter(|l| project_id.map_or(true, |p| l.project_id == p))
            .cloned()
            .collect();
        levels.sort_by(|a, b| a.level.cmp(&b.level).then_with(|| a.title.cmp(&b.title)));
        Ok(levels)
    }

    async fn update_level(
        &self,
        id: Uuid,
        update: &LevelUpdate,
        modified: DateTime<Utc>,
    ) -> Result<Option<SecurityLevel>, DatabaseError> {
        let mut tables = self.tables.write().await;
        match tables.levels.get_mut(&id).filter(|l| l.state.is_active()) {
            Some(level) => {
                update.apply(level, modified);
                Ok(Some(level.clone()))
            }
            None => Ok(None),
        }
    }

    async fn remove_level(
        &self,
        id: Uuid,
        modified: DateTime<Utc>,
    ) -> Result<Option<RemovedLevel>, DatabaseError> {
        let mut tables = self.tables.write().await;
        let level = match tables.levels.get_mut(&id).filter(|l| l.state.is_active()) {
            Some(level) => {
                level.state = RecordState::Removed;
                level.modified = modified;
                level.clone()
            }
            None => return Ok(None),
        };

        let mut grants_revoked = 0;
        for grant in tables
            .grants
            .iter_mut()
            .filter(|g| g.security_level_id == id && g.is_active())
        {
            grant.state = RecordState::Removed;
            grants_revoked += 1;
        }

        Ok(Some(RemovedLevel { level, grants_revoked }))
    }

    async fn insert_grant(&self, grant: &Grant) -> Result<GrantInsert, DatabaseError> {
        let mut tables = self.tables.write().await;
        if active_level(&tables, grant.security_level_id).is_none() {
            return Ok(GrantInsert::LevelMissing);
        }
        let duplicate = tables.grants.iter().any(|g| {
            g.is_active()
                && g.security_level_id == grant.security_level_id
                && g.recipient == grant.recipient
        });
        if duplicate {
            return Ok(GrantInsert::Duplicate);
        }
        tables.grants.push(grant.clone());
        Ok(GrantInsert::Inserted)
    }

    async fn revoke_grants(
        &self,
        security_level_id: Uuid,
        recipient: &RecipientRef,
    ) -> Result<u64, DatabaseError> {
        let mut tables = self.tables.write().await;
        let mut revoked = 0;
        for grant in tables.grants.iter_mut().filter(|g| {
            g.is_active() && g.security_level_id == security_level_id && g.recipient == *recipient
        }) {
            grant.state = RecordState::Removed;
            revoked += 1;
        }
        Ok(revoked)
    }

    async fn active_grants(&self, security_level_id: Uuid) -> Result<Vec<Grant>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .grants
            .iter()
            .filter(|g| g.is_active() && g.security_level_id == security_level_id)
            .cloned()
            .collect())
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}
