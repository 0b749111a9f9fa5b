#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use clearance_api::auth::{AccessLevel, TokenCodec};
use clearance_api::handlers::{router, AppState};
use clearance_api::security::{
    AccessClaimGate, BroadcastNotifier, MemoryStore, SecurityService, StaticDirectory,
};

pub const TEST_SECRET: &str = "integration-test-secret";

/// In-process app over MemoryStore + StaticDirectory
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub directory: Arc<StaticDirectory>,
    pub notifier: Arc<BroadcastNotifier>,
    pub codec: TokenCodec,
    /// A live project seeded for convenience
    pub project: Uuid,
}

/// A caller with a signed token
pub struct Caller {
    pub user_id: Uuid,
    pub token: String,
}

pub struct Reply {
    pub status: StatusCode,
    pub body: Value,
}

impl Reply {
    pub fn code(&self) -> &str {
        self.body["code"].as_str().unwrap_or_default()
    }

    pub fn data(&self) -> &Value {
        &self.body["data"]
    }
}

impl TestApp {
    pub async fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let directory = Arc::new(StaticDirectory::new());
        let notifier = Arc::new(BroadcastNotifier::new(64));
        let project = Uuid::new_v4();
        directory.add_project(project).await;

        let service = SecurityService::new(
            store.clone(),
            directory.clone(),
            Arc::new(AccessClaimGate),
            notifier.clone(),
        );
        let codec = TokenCodec::new(TEST_SECRET, 1).expect("codec");
        let router = router(AppState::new(service, codec.clone()));

        Self { router, store, directory, notifier, codec, project }
    }

    pub fn caller(&self, access: AccessLevel) -> Caller {
        let user_id = Uuid::new_v4();
        let claims = self.codec.claims_for(user_id, "tester", "acme", access);
        let token = self.codec.issue(&claims).expect("token");
        Caller { user_id, token }
    }

    pub fn admin(&self) -> Caller {
        self.caller(AccessLevel::Full)
    }

    pub async fn send(&self, request: Request<Body>) -> Result<Reply> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).context("response body is not JSON")?
        };
        Ok(Reply { status, body })
    }

    pub async fn get(&self, uri: &str) -> Result<Reply> {
        self.send(Request::builder().uri(uri).body(Body::empty())?).await
    }

    /// POST /do with a raw body and optional bearer token
    pub async fn post_raw(&self, token: Option<&str>, body: String) -> Result<Reply> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/do")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::from(body))?).await
    }

    pub async fn act(&self, caller: &Caller, action: &str, data: Value) -> Result<Reply> {
        let body = json!({ "action": action, "data": data }).to_string();
        self.post_raw(Some(&caller.token), body).await
    }

    /// Create a level in the seeded project and return its id
    pub async fn create_level(&self, caller: &Caller, title: &str, level: i64) -> Result<Uuid> {
        let reply = self
            .act(
                caller,
                "securityLevelCreate",
                json!({ "title": title, "projectId": self.project, "level": level }),
            )
            .await?;
        anyhow::ensure!(reply.status == StatusCode::CREATED, "create failed: {}", reply.body);
        let id = reply.data()["id"].as_str().context("missing id")?;
        Ok(Uuid::parse_str(id)?)
    }

    pub async fn has_access(&self, caller: &Caller, level: Uuid, user: Uuid) -> Result<bool> {
        let reply = self
            .act(caller, "securityLevelCheck", json!({ "securityLevelId": level, "userId": user }))
            .await?;
        anyhow::ensure!(reply.status == StatusCode::OK, "check failed: {}", reply.body);
        reply.data()["hasAccess"].as_bool().context("missing hasAccess")
    }
}
