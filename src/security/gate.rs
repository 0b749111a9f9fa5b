//! Capability checks consulted before any mutating security-level call.
//!
//! Every gate fails closed: an error from the gate is never read as an allow.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::auth::{AccessLevel, Actor};
use crate::types::PermissionAction;

pub const SECURITY_LEVEL_RESOURCE: &str = "security_level";

#[derive(Debug, Error)]
pub enum GateError {
    #[error("permission service unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("permission service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("permission service response could not be decoded: {0}")]
    Decode(String),
}

/// A (resource, action) pair the actor must hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Capability {
    pub resource: &'static str,
    pub action: PermissionAction,
}

impl Capability {
    pub fn security_level(action: PermissionAction) -> Self {
        Self {
            resource: SECURITY_LEVEL_RESOURCE,
            action,
        }
    }
}

#[async_trait]
pub trait PermissionGate: Send + Sync {
    async fn authorize(&self, actor: &Actor, capability: Capability) -> Result<bool, GateError>;
}

#[derive(Debug, Serialize)]
struct CheckRequest<'a> {
    username: &'a str,
    context: &'a str,
    required_level: PermissionAction,
}

#[derive(Debug, Deserialize)]
struct CheckResponse {
    allowed: bool,
    #[serde(default)]
    reason: Option<String>,
}

/// Delegates to an external permission service over HTTP
#[derive(Debug, Clone)]
pub struct HttpPermissionGate {
    client: reqwest::Client,
    check_url: String,
}

impl HttpPermissionGate {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, GateError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            check_url: format!("{}/check", base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl PermissionGate for HttpPermissionGate {
    async fn authorize(&self, actor: &Actor, capability: Capability) -> Result<bool, GateError> {
        let request = CheckRequest {
            username: &actor.username,
            context: capability.resource,
            required_level: capability.action,
        };

        let response = self.client.post(&self.check_url).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GateError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let decision: CheckResponse = response
            .json()
            .await
            .map_err(|e| GateError::Decode(e.to_string()))?;

        if !decision.allowed {
            tracing::debug!(
                "Permission service denied {} {:?} for {}: {}",
                capability.resource,
                capability.action,
                actor.username,
                decision.reason.as_deref().unwrap_or("no reason given")
            );
        }
        Ok(decision.allowed)
    }
}

/// Decides from the `access` claim alone; used when no permission service is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessClaimGate;

#[async_trait]
impl PermissionGate for AccessClaimGate {
    async fn authorize(&self, actor: &Actor, capability: Capability) -> Result<bool, GateError> {
        Ok(match actor.access {
            AccessLevel::Root | AccessLevel::Full => true,
            AccessLevel::Edit => capability.action == PermissionAction::Update,
            AccessLevel::Read | AccessLevel::Deny => capability.action == PermissionAction::Read,
        })
    }
}
