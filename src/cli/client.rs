use serde_json::{json, Value};
use std::time::Duration;

use crate::security::payload::Payload;
use crate::types::Action;

/// Error envelope returned by the server
#[derive(Debug, thiserror::Error)]
#[error("{code}: {message}")]
pub struct RemoteError {
    pub status: u16,
    pub code: String,
    pub message: String,
}

/// Thin HTTP client for the `POST /do` command envelope
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: String, token: Option<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { http, base_url, token })
    }

    /// Send one action; returns the `data` of a success envelope
    pub async fn execute(&self, action: Action, data: Payload) -> anyhow::Result<Value> {
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("No token: pass --token, set CLEARANCE_TOKEN, or run `clearance token --save`"))?;

        let response = self
            .http
            .post(format!("{}/do", self.base_url))
            .bearer_auth(token)
            .json(&json!({ "action": action.as_str(), "data": data }))
            .send()
            .await?;

        let status = response.status().as_u16();
        let body: Value = response.json().await?;
        unwrap_envelope(status, body)
    }

    pub async fn health(&self) -> anyhow::Result<Value> {
        let response = self
            .http
            .get(format!("{}/health", self.base_url))
            .timeout(Duration::from_secs(5))
            .send()
            .await?;
        let status = response.status().as_u16();
        unwrap_envelope(status, response.json().await?)
    }
}

fn unwrap_envelope(status: u16, mut body: Value) -> anyhow::Result<Value> {
    if body.get("success").and_then(Value::as_bool) == Some(true) {
        return Ok(body.get_mut("data").map(Value::take).unwrap_or(Value::Null));
    }
    let field = |key: &str| body.get(key).and_then(Value::as_str).unwrap_or_default().to_string();
    Err(RemoteError {
        status,
        code: field("code"),
        message: field("message"),
    }
    .into())
}
