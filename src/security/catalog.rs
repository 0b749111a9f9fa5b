use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::security::directory::ProjectDirectory;
use crate::security::error::SecurityError;
use crate::security::model::{
    Classification, LevelChanges, LevelDraft, LevelUpdate, RecordState, SecurityLevel,
};
use crate::security::store::{RemovedLevel, SecurityStore};

/// Owns security-level records: create, read, list, modify, remove (with grant cascade)
pub struct SecurityLevelCatalog {
    store: Arc<dyn SecurityStore>,
    projects: Arc<dyn ProjectDirectory>,
}

impl SecurityLevelCatalog {
    pub fn new(store: Arc<dyn SecurityStore>, projects: Arc<dyn ProjectDirectory>) -> Self {
        Self { store, projects }
    }

    pub async fn create(&self, draft: LevelDraft) -> Result<SecurityLevel, SecurityError> {
        let title = draft.title.trim();
        if title.is_empty() {
            return Err(SecurityError::missing("title"));
        }
        let level = Classification::try_from(draft.level)?;

        if !self.projects.project_exists(draft.project_id).await? {
            return Err(SecurityError::not_found("Project not found"));
        }

        let now = Utc::now();
        let record = SecurityLevel {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: draft.description,
            project_id: draft.project_id,
            level,
            created: now,
            modified: now,
            state: RecordState::Active,
        };
        self.store.insert_level(&record).await?;
        Ok(record)
    }

    pub async fn read(&self, id: Uuid) -> Result<SecurityLevel, SecurityError> {
        self.store
            .find_level(id)
            .await?
            .ok_or_else(|| SecurityError::not_found("Security level not found"))
    }

    pub async fn list(&self, project_id: Option<Uuid>) -> Result<Vec<SecurityLevel>, SecurityError> {
        Ok(self.store.list_levels(project_id).await?)
    }

    pub async fn modify(&self, id: Uuid, changes: LevelChanges) -> Result<SecurityLevel, SecurityError> {
        let update = validate_changes(changes)?;
        self.store
            .update_level(id, &update, Utc::now())
            .await?
            .ok_or_else(|| SecurityError::not_found("Security level not found"))
    }

    /// Tombstones the level and, in the same unit of work, every grant on it
    pub async fn remove(&self, id: Uuid) -> Result<RemovedLevel, SecurityError> {
        self.store
            .remove_level(id, Utc::now())
            .await?
            .ok_or_else(|| SecurityError::not_found("Security level not found"))
    }
}

fn validate_changes(changes: LevelChanges) -> Result<LevelUpdate, SecurityError> {
    if changes.is_empty() {
        return Err(SecurityError::MissingData("No fields to update".to_string()));
    }
    let level = changes.level.map(Classification::try_from).transpose()?;
    Ok(LevelUpdate {
        title: changes.title.map(|t| t.trim().to_string()),
        description: changes.description,
        level,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::directory::StaticDirectory;
    use crate::security::store::MemoryStore;

    async fn catalog() -> (SecurityLevelCatalog, Uuid) {
        let directory = Arc::new(StaticDirectory::new());
        let project = Uuid::new_v4();
        directory.add_project(project).await;
        (
            SecurityLevelCatalog::new(Arc::new(MemoryStore::new()), directory),
            project,
        )
    }

    fn draft(project_id: Uuid, title: &str, level: i64) -> LevelDraft {
        LevelDraft {
            title: title.to_string(),
            project_id,
            level,
            description: None,
        }
    }

    #[tokio::test]
    async fn create_returns_record_with_fresh_id() {
        let (catalog, project) = catalog().await;
        let created = catalog.create(draft(project, "Confidential", 3)).await.unwrap();
        assert_eq!(created.level, Classification::Confidential);
        assert_eq!(created.created, created.modified);
        assert_eq!(catalog.read(created.id).await.unwrap(), created);
    }

    #[tokio::test]
    async fn create_rejects_out_of_range_levels() {
        let (catalog, project) = catalog().await;
        for bad in [-1, 6, 100] {
            let err = catalog.create(draft(project, "Bad", bad)).await.unwrap_err();
            assert!(matches!(err, SecurityError::InvalidData(_)), "level {}", bad);
        }
        assert!(catalog.list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_requires_live_project() {
        let (catalog, _) = catalog().await;
        let err = catalog.create(draft(Uuid::new_v4(), "Orphan", 1)).await.unwrap_err();
        assert!(matches!(err, SecurityError::NotFound(_)));
    }

    #[tokio::test]
    async fn create_requires_title() {
        let (catalog, project) = catalog().await;
        let err = catalog.create(draft(project, "   ", 1)).await.unwrap_err();
        assert!(matches!(err, SecurityError::MissingData(_)));
    }

    #[tokio::test]
    async fn modify_needs_at_least_one_field() {
        let (catalog, project) = catalog().await;
        let created = catalog.create(draft(project, "Internal", 2)).await.unwrap();
        let err = catalog.modify(created.id, LevelChanges::default()).await.unwrap_err();
        assert!(matches!(err, SecurityError::MissingData(_)));
    }

    #[tokio::test]
    async fn modify_rejects_bad_level_and_leaves_record_unchanged() {
        let (catalog, project) = catalog().await;
        let created = catalog.create(draft(project, "Internal", 2)).await.unwrap();
        let changes = LevelChanges {
            title: Some("Renamed".to_string()),
            level: Some(6),
            ..Default::default()
        };
        let err = catalog.modify(created.id, changes).await.unwrap_err();
        assert!(matches!(err, SecurityError::InvalidData(_)));
        assert_eq!(catalog.read(created.id).await.unwrap(), created);
    }

    #[tokio::test]
    async fn modify_applies_partial_update() {
        let (catalog, project) = catalog().await;
        let created = catalog.create(draft(project, "Internal", 2)).await.unwrap();
        let changes = LevelChanges {
            description: Some("staff only".to_string()),
            level: Some(4),
            ..Default::default()
        };
        let updated = catalog.modify(created.id, changes).await.unwrap();
        assert_eq!(updated.title, "Internal");
        assert_eq!(updated.description.as_deref(), Some("staff only"));
        assert_eq!(updated.level, Classification::Restricted);
        assert!(updated.modified >= created.modified);
    }

    #[tokio::test]
    async fn modify_trims_title() {
        let (catalog, project) = catalog().await;
        let created = catalog.create(draft(project, "Internal", 2)).await.unwrap();
        let changes = LevelChanges { title: Some("  Staff only ".to_string()), ..Default::default() };
        let updated = catalog.modify(created.id, changes).await.unwrap();
        assert_eq!(updated.title, "Staff only");
    }

    #[tokio::test]
    async fn modify_unknown_level_is_not_found() {
        let (catalog, _) = catalog().await;
        let changes = LevelChanges { level: Some(1), ..Default::default() };
        let err = catalog.modify(Uuid::new_v4(), changes).await.unwrap_err();
        assert!(matches!(err, SecurityError::NotFound(_)));
    }

    #[tokio::test]
    async fn removed_level_disappears_from_read_and_list() {
        let (catalog, project) = catalog().await;
        let created = catalog.create(draft(project, "Secret", 5)).await.unwrap();
        catalog.remove(created.id).await.unwrap();

        assert!(matches!(catalog.read(created.id).await, Err(SecurityError::NotFound(_))));
        assert!(catalog.list(Some(project)).await.unwrap().is_empty());
        assert!(matches!(catalog.remove(created.id).await, Err(SecurityError::NotFound(_))));
    }

    #[tokio::test]
    async fn project_filter_is_subset_of_full_list() {
        let directory = Arc::new(StaticDirectory::new());
        let (p1, p2) = (Uuid::new_v4(), Uuid::new_v4());
        directory.add_project(p1).await;
        directory.add_project(p2).await;
        let catalog = SecurityLevelCatalog::new(Arc::new(MemoryStore::new()), directory);

        catalog.create(draft(p1, "Secret", 5)).await.unwrap();
        catalog.create(draft(p2, "Public", 1)).await.unwrap();
        catalog.create(draft(p1, "Alpha", 1)).await.unwrap();
        catalog.create(draft(p1, "Beta", 1)).await.unwrap();

        let all: Vec<SecurityLevel> = catalog
            .list(None)
            .await
            .unwrap()
            .into_iter()
            .filter(|l| l.project_id == p1)
            .collect();
        let filtered = catalog.list(Some(p1)).await.unwrap();
        assert_eq!(filtered, all);

        let titles: Vec<&str> = filtered.iter().map(|l| l.title.as_str()).collect();
        assert_eq!(titles, vec!["Alpha", "Beta", "Secret"]);
    }
}
