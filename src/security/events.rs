use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::types::Action;

/// Change notification published after a successful mutation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityEvent {
    pub action: Action,
    pub security_level_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<Uuid>,
    pub actor: String,
    pub payload: Value,
    pub at: DateTime<Utc>,
}

impl SecurityEvent {
    pub fn new(action: Action, security_level_id: Uuid, actor: &str, payload: Value) -> Self {
        Self {
            action,
            security_level_id,
            project_id: None,
            actor: actor.to_string(),
            payload,
            at: Utc::now(),
        }
    }

    pub fn in_project(mut self, project_id: Uuid) -> Self {
        self.project_id = Some(project_id);
        self
    }
}

/// Fire-and-forget sink; delivery never affects the caller's result
pub trait EventNotifier: Send + Sync {
    fn notify(&self, event: SecurityEvent);
}

/// Fan-out over a tokio broadcast channel
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    sender: broadcast::Sender<SecurityEvent>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SecurityEvent> {
        self.sender.subscribe()
    }
}

impl EventNotifier for BroadcastNotifier {
    fn notify(&self, event: SecurityEvent) {
        let action = event.action;
        if self.sender.send(event).is_err() {
            tracing::debug!("No subscribers for {} event", action);
        }
    }
}
