// handlers/protected/security_level.rs - the securityLevel* actions
//
// Each handler hands the raw `data` object to SecurityService and shapes the
// success payload. Errors convert to ApiError via `?`.

use serde::Serialize;
use uuid::Uuid;

use crate::auth::Actor;
use crate::middleware::{ApiResponse, ApiResult};
use crate::security::payload::Payload;
use crate::security::{
    AccessDecision, EntityAccessDecision, RecipientRef, SecurityLevel, SecurityService,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelList {
    pub security_levels: Vec<SecurityLevel>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelModified {
    pub updated: bool,
    pub security_level_id: Uuid,
    pub security_level: SecurityLevel,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelRemoved {
    pub removed: bool,
    pub security_level_id: Uuid,
    pub grants_revoked: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessGranted {
    pub granted: bool,
    pub mapping_id: Uuid,
    pub security_level_id: Uuid,
    #[serde(flatten)]
    pub recipient: RecipientRef,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessRevoked {
    pub revoked: bool,
    pub security_level_id: Uuid,
    #[serde(flatten)]
    pub recipient: RecipientRef,
    pub count: u64,
}

/// securityLevelCreate - 201 with the new record
pub async fn create(service: &SecurityService, actor: &Actor, data: &Payload) -> ApiResult<SecurityLevel> {
    let level = service.create(actor, data).await?;
    Ok(ApiResponse::created(level))
}

/// securityLevelRead
pub async fn read(service: &SecurityService, actor: &Actor, data: &Payload) -> ApiResult<SecurityLevel> {
    Ok(ApiResponse::success(service.read(actor, data).await?))
}

/// securityLevelList - optional `projectId` filter, ordered by (level, title)
pub async fn list(service: &SecurityService, actor: &Actor, data: &Payload) -> ApiResult<LevelList> {
    let security_levels = service.list(actor, data).await?;
    Ok(ApiResponse::success(LevelList {
        count: security_levels.len(),
        security_levels,
    }))
}

/// securityLevelModify
pub async fn modify(service: &SecurityService, actor: &Actor, data: &Payload) -> ApiResult<LevelModified> {
    let level = service.modify(actor, data).await?;
    Ok(ApiResponse::success(LevelModified {
        updated: true,
        security_level_id: level.id,
        security_level: level,
    }))
}

/// securityLevelRemove - also revokes every grant on the level
pub async fn remove(service: &SecurityService, actor: &Actor, data: &Payload) -> ApiResult<LevelRemoved> {
    let removed = service.remove(actor, data).await?;
    Ok(ApiResponse::success(LevelRemoved {
        removed: true,
        security_level_id: removed.level.id,
        grants_revoked: removed.grants_revoked,
    }))
}

/// securityLevelGrant - 201
pub async fn grant(service: &SecurityService, actor: &Actor, data: &Payload) -> ApiResult<AccessGranted> {
    let grant = service.grant(actor, data).await?;
    Ok(ApiResponse::created(AccessGranted {
        granted: true,
        mapping_id: grant.id,
        security_level_id: grant.security_level_id,
        recipient: grant.recipient,
    }))
}

/// securityLevelRevoke
pub async fn revoke(service: &SecurityService, actor: &Actor, data: &Payload) -> ApiResult<AccessRevoked> {
    let revocation = service.revoke(actor, data).await?;
    Ok(ApiResponse::success(AccessRevoked {
        revoked: true,
        security_level_id: revocation.security_level_id,
        recipient: revocation.recipient,
        count: revocation.count,
    }))
}

/// securityLevelCheck
pub async fn check(service: &SecurityService, actor: &Actor, data: &Payload) -> ApiResult<AccessDecision> {
    Ok(ApiResponse::success(service.check(actor, data).await?))
}

/// securityLevelCheckEntity - `entityType` is ticket or project
pub async fn check_entity(
    service: &SecurityService,
    actor: &Actor,
    data: &Payload,
) -> ApiResult<EntityAccessDecision> {
    Ok(ApiResponse::success(service.check_entity(actor, data).await?))
}
