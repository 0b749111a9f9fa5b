// HTTP API error types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::database::DatabaseError;
use crate::security::SecurityError;

/// HTTP API error carrying a stable kind code and a client-safe message
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    MissingData(String),
    InvalidData(String),
    InvalidAction(String),
    InvalidRequest(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    AlreadyExists(String),

    // 500 Internal Server Error
    PermissionService(String),
    Internal(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::MissingData(_)
            | ApiError::InvalidData(_)
            | ApiError::InvalidAction(_)
            | ApiError::InvalidRequest(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::AlreadyExists(_) => 409,
            ApiError::PermissionService(_) | ApiError::Internal(_) => 500,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::MissingData(msg)
            | ApiError::InvalidData(msg)
            | ApiError::InvalidAction(msg)
            | ApiError::InvalidRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::AlreadyExists(msg)
            | ApiError::PermissionService(msg)
            | ApiError::Internal(msg)
            | ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Stable kind code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::MissingData(_) => "MISSING_DATA",
            ApiError::InvalidData(_) => "INVALID_DATA",
            ApiError::InvalidAction(_) => "INVALID_ACTION",
            ApiError::InvalidRequest(_) => "INVALID_REQUEST",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "ENTITY_NOT_FOUND",
            ApiError::AlreadyExists(_) => "ENTITY_ALREADY_EXISTS",
            ApiError::PermissionService(_) => "PERMISSION_SERVICE_ERROR",
            ApiError::Internal(_) => "INTERNAL_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "success": false,
            "error": true,
            "code": self.error_code(),
            "message": self.message()
        })
    }
}

impl ApiError {
    pub fn invalid_action(message: impl Into<String>) -> Self {
        ApiError::InvalidAction(message.into())
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        ApiError::InvalidRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

impl From<SecurityError> for ApiError {
    fn from(err: SecurityError) -> Self {
        match err {
            SecurityError::MissingData(msg) => ApiError::MissingData(msg),
            SecurityError::InvalidData(msg) => ApiError::InvalidData(msg),
            SecurityError::Forbidden(msg) => ApiError::Forbidden(msg),
            SecurityError::NotFound(msg) => ApiError::NotFound(msg),
            SecurityError::AlreadyExists(msg) => ApiError::AlreadyExists(msg),
            SecurityError::PermissionService(e) => {
                tracing::error!("Permission service error: {}", e);
                ApiError::PermissionService("Failed to check permissions".to_string())
            }
            SecurityError::Database(e) => e.into(),
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        // Log the real error, return a generic message
        match err {
            DatabaseError::ConfigMissing(key) => {
                tracing::error!("Database configuration missing: {}", key);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            DatabaseError::Sqlx(sqlx::Error::PoolTimedOut) => {
                tracing::error!("Database pool timed out");
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            other => {
                tracing::error!("Database error: {}", other);
                ApiError::internal("An error occurred while processing your request")
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::GateError;

    #[test]
    fn security_errors_map_to_kind_codes() {
        let cases = [
            (SecurityError::missing("title"), 400, "MISSING_DATA"),
            (SecurityError::invalid("bad level"), 400, "INVALID_DATA"),
            (SecurityError::Forbidden("no".into()), 403, "FORBIDDEN"),
            (SecurityError::not_found("gone"), 404, "ENTITY_NOT_FOUND"),
            (SecurityError::AlreadyExists("dup".into()), 409, "ENTITY_ALREADY_EXISTS"),
        ];
        for (err, status, code) in cases {
            let api: ApiError = err.into();
            assert_eq!(api.status_code(), status);
            assert_eq!(api.error_code(), code);
        }
    }

    #[test]
    fn gate_failure_is_a_server_error_without_details() {
        let err = SecurityError::PermissionService(GateError::Status {
            status: 502,
            body: "upstream stack trace".to_string(),
        });
        let api: ApiError = err.into();
        assert_eq!(api.status_code(), 500);
        assert_eq!(api.error_code(), "PERMISSION_SERVICE_ERROR");
        assert!(!api.message().contains("stack trace"));
    }

    #[test]
    fn database_errors_are_opaque() {
        let api: ApiError = DatabaseError::QueryError("syntax error near SELECT".into()).into();
        assert_eq!(api.error_code(), "INTERNAL_ERROR");
        assert!(!api.message().contains("SELECT"));
    }

    #[test]
    fn error_body_carries_envelope_flags() {
        let body = ApiError::invalid_action("Unknown action 'x'").to_json();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], true);
        assert_eq!(body["code"], "INVALID_ACTION");
    }
}
