/// Shared types used across the codebase

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Actions served by the command envelope (`POST /do`).
/// Wire identifiers are the camelCase names used in the request `action` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    #[serde(rename = "securityLevelCreate")]
    Create,
    #[serde(rename = "securityLevelRead")]
    Read,
    #[serde(rename = "securityLevelList")]
    List,
    #[serde(rename = "securityLevelModify")]
    Modify,
    #[serde(rename = "securityLevelRemove")]
    Remove,
    #[serde(rename = "securityLevelGrant")]
    Grant,
    #[serde(rename = "securityLevelRevoke")]
    Revoke,
    #[serde(rename = "securityLevelCheck")]
    Check,
    #[serde(rename = "securityLevelCheckEntity")]
    CheckEntity,
}

impl Action {
    pub const ALL: [Action; 9] = [
        Action::Create,
        Action::Read,
        Action::List,
        Action::Modify,
        Action::Remove,
        Action::Grant,
        Action::Revoke,
        Action::Check,
        Action::CheckEntity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "securityLevelCreate",
            Action::Read => "securityLevelRead",
            Action::List => "securityLevelList",
            Action::Modify => "securityLevelModify",
            Action::Remove => "securityLevelRemove",
            Action::Grant => "securityLevelGrant",
            Action::Revoke => "securityLevelRevoke",
            Action::Check => "securityLevelCheck",
            Action::CheckEntity => "securityLevelCheckEntity",
        }
    }

    /// Capability the permission gate must grant before the action runs.
    /// Read-side actions are open to any authenticated caller.
    pub fn required_permission(&self) -> Option<PermissionAction> {
        match self {
            Action::Create => Some(PermissionAction::Create),
            Action::Modify | Action::Grant | Action::Revoke => Some(PermissionAction::Update),
            Action::Remove => Some(PermissionAction::Delete),
            Action::Read | Action::List | Action::Check | Action::CheckEntity => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .iter()
            .copied()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| format!("Unknown action '{}'", s))
    }
}

/// Permission values understood by the external permission service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermissionAction {
    Read,
    Create,
    Update,
    Delete,
}

impl PermissionAction {
    pub fn value(&self) -> u8 {
        match self {
            PermissionAction::Read => 1,
            PermissionAction::Create => 2,
            PermissionAction::Update => 3,
            PermissionAction::Delete => 5,
        }
    }
}

impl Serialize for PermissionAction {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.value())
    }
}
