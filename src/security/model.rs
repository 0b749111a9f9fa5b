use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use uuid::Uuid;

use super::error::SecurityError;
use super::payload::{self, Payload};

/// Ordinal sensitivity of a security level (0 = None ... 5 = Secret).
///
/// Levels are not hierarchical: access to one level says nothing about any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i16")]
pub enum Classification {
    None,
    Public,
    Internal,
    Confidential,
    Restricted,
    Secret,
}

impl Classification {
    pub const MIN: i64 = 0;
    pub const MAX: i64 = 5;

    pub fn ordinal(self) -> i16 {
        match self {
            Classification::None => 0,
            Classification::Public => 1,
            Classification::Internal => 2,
            Classification::Confidential => 3,
            Classification::Restricted => 4,
            Classification::Secret => 5,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Classification::None => "None",
            Classification::Public => "Public",
            Classification::Internal => "Internal",
            Classification::Confidential => "Confidential",
            Classification::Restricted => "Restricted",
            Classification::Secret => "Secret",
        }
    }
}

impl TryFrom<i64> for Classification {
    type Error = SecurityError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Classification::None),
            1 => Ok(Classification::Public),
            2 => Ok(Classification::Internal),
            3 => Ok(Classification::Confidential),
            4 => Ok(Classification::Restricted),
            5 => Ok(Classification::Secret),
            other => Err(SecurityError::invalid(format!(
                "Invalid security level {} (must be {}-{})",
                other,
                Classification::MIN,
                Classification::MAX
            ))),
        }
    }
}

impl From<Classification> for i16 {
    fn from(value: Classification) -> Self {
        value.ordinal()
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.ordinal(), self.label())
    }
}

/// Tombstone state shared by levels and grants. Removed is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordState {
    Active,
    Removed,
}

impl RecordState {
    pub fn from_deleted(deleted: bool) -> Self {
        if deleted {
            RecordState::Removed
        } else {
            RecordState::Active
        }
    }

    pub fn is_active(self) -> bool {
        self == RecordState::Active
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityLevel {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub project_id: Uuid,
    pub level: Classification,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    #[serde(skip)]
    pub state: RecordState,
}

/// Unvalidated input for a new security level
#[derive(Debug, Clone, PartialEq)]
pub struct LevelDraft {
    pub title: String,
    pub project_id: Uuid,
    pub level: i64,
    pub description: Option<String>,
}

impl LevelDraft {
    pub fn from_payload(data: &Payload) -> Result<Self, SecurityError> {
        Ok(Self {
            title: payload::required_string(data, "title")?,
            project_id: payload::required_uuid(data, "projectId")?,
            level: payload::required_integer(data, "level")?,
            description: payload::optional_string(data, "description")?,
        })
    }
}

/// Unvalidated partial update of a security level
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LevelChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub level: Option<i64>,
}

impl LevelChanges {
    pub fn from_payload(data: &Payload) -> Result<Self, SecurityError> {
        Ok(Self {
            // An empty title is ignored rather than blanking the record
            title: payload::optional_string(data, "title")?.filter(|t| !t.trim().is_empty()),
            description: payload::optional_string(data, "description")?,
            level: payload::optional_integer(data, "level")?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.level.is_none()
    }
}

/// Validated partial update handed to the store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LevelUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub level: Option<Classification>,
}

impl LevelUpdate {
    pub fn apply(&self, level: &mut SecurityLevel, modified: DateTime<Utc>) {
        if let Some(title) = &self.title {
            level.title = title.clone();
        }
        if let Some(description) = &self.description {
            level.description = Some(description.clone());
        }
        if let Some(classification) = self.level {
            level.level = classification;
        }
        level.modified = modified;
    }
}

/// The single principal a grant is issued to.
///
/// Only constructible from raw fields through `TryFrom<RecipientFields>`, which
/// rejects zero or several populated kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecipientRef {
    User(Uuid),
    Team(Uuid),
    ProjectRole(Uuid),
}

impl RecipientRef {
    pub fn id(&self) -> Uuid {
        match self {
            RecipientRef::User(id) | RecipientRef::Team(id) | RecipientRef::ProjectRole(id) => *id,
        }
    }

    /// Payload field carrying this recipient kind
    pub fn field(&self) -> &'static str {
        match self {
            RecipientRef::User(_) => "userId",
            RecipientRef::Team(_) => "teamId",
            RecipientRef::ProjectRole(_) => "projectRoleId",
        }
    }

    /// Storage column carrying this recipient kind
    pub fn column(&self) -> &'static str {
        match self {
            RecipientRef::User(_) => "user_id",
            RecipientRef::Team(_) => "team_id",
            RecipientRef::ProjectRole(_) => "project_role_id",
        }
    }

    pub fn team_id(&self) -> Option<Uuid> {
        match self {
            RecipientRef::Team(id) => Some(*id),
            _ => None,
        }
    }

    pub fn project_role_id(&self) -> Option<Uuid> {
        match self {
            RecipientRef::ProjectRole(id) => Some(*id),
            _ => None,
        }
    }

    /// Spread into the (user, team, project role) nullable column triple
    pub fn into_fields(self) -> RecipientFields {
        let mut fields = RecipientFields::default();
        match self {
            RecipientRef::User(id) => fields.user_id = Some(id),
            RecipientRef::Team(id) => fields.team_id = Some(id),
            RecipientRef::ProjectRole(id) => fields.project_role_id = Some(id),
        }
        fields
    }
}

impl Serialize for RecipientRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.field(), &self.id())?;
        map.end()
    }
}

/// Raw recipient fields as they arrive on the wire or come back from storage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecipientFields {
    pub user_id: Option<Uuid>,
    pub team_id: Option<Uuid>,
    pub project_role_id: Option<Uuid>,
}

impl RecipientFields {
    pub fn from_payload(data: &Payload) -> Result<Self, SecurityError> {
        Ok(Self {
            user_id: payload::optional_uuid(data, "userId")?,
            team_id: payload::optional_uuid(data, "teamId")?,
            project_role_id: payload::optional_uuid(data, "projectRoleId")?,
        })
    }
}

impl TryFrom<RecipientFields> for RecipientRef {
    type Error = SecurityError;

    fn try_from(fields: RecipientFields) -> Result<Self, Self::Error> {
        match (fields.user_id, fields.team_id, fields.project_role_id) {
            (Some(id), None, None) => Ok(RecipientRef::User(id)),
            (None, Some(id), None) => Ok(RecipientRef::Team(id)),
            (None, None, Some(id)) => Ok(RecipientRef::ProjectRole(id)),
            (None, None, None) => Err(SecurityError::MissingData(
                "Must specify userId, teamId, or projectRoleId".to_string(),
            )),
            _ => Err(SecurityError::InvalidData(
                "Can only specify one of userId, teamId, or projectRoleId".to_string(),
            )),
        }
    }
}

/// Permission mapping authorizing one recipient for one security level
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Grant {
    pub id: Uuid,
    pub security_level_id: Uuid,
    #[serde(flatten)]
    pub recipient: RecipientRef,
    pub created: DateTime<Utc>,
    #[serde(skip)]
    pub state: RecordState,
}

impl Grant {
    pub fn new(security_level_id: Uuid, recipient: RecipientRef) -> Self {
        Self {
            id: Uuid::new_v4(),
            security_level_id,
            recipient,
            created: Utc::now(),
            state: RecordState::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }
}

/// Kinds of record that can carry a security level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Ticket,
    Project,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Ticket => "ticket",
            EntityKind::Project => "project",
        }
    }

    /// Table holding the entity's `security_level_id` column
    pub fn table(self) -> &'static str {
        match self {
            EntityKind::Ticket => "ticket",
            EntityKind::Project => "project",
        }
    }
}

impl std::str::FromStr for EntityKind {
    type Err = SecurityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ticket" => Ok(EntityKind::Ticket),
            "project" => Ok(EntityKind::Project),
            other => Err(SecurityError::invalid(format!(
                "Unsupported entityType '{}' (expected ticket or project)",
                other
            ))),
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A ticket or project addressed by id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: Uuid,
}

impl EntityRef {
    pub fn new(kind: EntityKind, id: Uuid) -> Self {
        Self { kind, id }
    }

    pub fn from_payload(data: &Payload) -> Result<Self, SecurityError> {
        let id = payload::required_uuid(data, "entityId")?;
        let kind = payload::required_string(data, "entityType")?.parse()?;
        Ok(Self { kind, id })
    }
}

/// What an entity lookup found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityMarking {
    /// No such live entity
    Missing,
    /// Entity exists with no security level; open to everyone
    Unrestricted,
    Level(Uuid),
}
