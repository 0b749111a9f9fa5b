use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::{json, Value};

use crate::handlers::AppState;
use crate::types::Action;

/// GET / - service banner
pub async fn root() -> Json<Value> {
    let actions: Vec<&str> = Action::ALL.iter().map(|a| a.as_str()).collect();

    Json(json!({
        "success": true,
        "data": {
            "name": "Clearance API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Classification-based access control for project resources",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "command": "POST /do (protected)",
            },
            "actions": actions,
        }
    }))
}

/// GET /health - pings the store; 503 when degraded
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.service.health().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": true,
                    "code": "SERVICE_UNAVAILABLE",
                    "message": "database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}
