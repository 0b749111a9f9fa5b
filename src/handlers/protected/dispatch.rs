// handlers/protected/dispatch.rs - POST /do command envelope

use axum::{
    extract::{rejection::JsonRejection, Extension, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::Value;

use crate::auth::Actor;
use crate::error::ApiError;
use crate::handlers::AppState;
use crate::security::payload::Payload;
use crate::types::Action;

use super::security_level;

/// `{ "action": "<name>", "data": { ... } }`
#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    pub action: String,
    #[serde(default)]
    pub data: Value,
}

/// POST /do - route an authenticated command to its action handler
pub async fn command_post(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    body: Result<Json<CommandRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::invalid_request(format!("Invalid request body: {}", e.body_text())))?;

    let action: Action = request.action.parse().map_err(ApiError::invalid_action)?;

    let data: Payload = match request.data {
        Value::Object(map) => map,
        Value::Null => Payload::new(),
        _ => return Err(ApiError::invalid_request("data must be a JSON object")),
    };

    tracing::debug!("Dispatching {} for {}", action, actor.username);

    let service = state.service.as_ref();
    let response = match action {
        Action::Create => security_level::create(service, &actor, &data).await?.into_response(),
        Action::Read => security_level::read(service, &actor, &data).await?.into_response(),
        Action::List => security_level::list(service, &actor, &data).await?.into_response(),
        Action::Modify => security_level::modify(service, &actor, &data).await?.into_response(),
        Action::Remove => security_level::remove(service, &actor, &data).await?.into_response(),
        Action::Grant => security_level::grant(service, &actor, &data).await?.into_response(),
        Action::Revoke => security_level::revoke(service, &actor, &data).await?.into_response(),
        Action::Check => security_level::check(service, &actor, &data).await?.into_response(),
        Action::CheckEntity => security_level::check_entity(service, &actor, &data).await?.into_response(),
    };
    Ok(response)
}
