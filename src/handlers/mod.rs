// handlers/mod.rs - two-tier handler layout
//
// Public (no auth) → Protected (bearer JWT, produces the Actor)
pub mod protected;
pub mod public;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::auth::TokenCodec;
use crate::middleware::jwt_auth_middleware;
use crate::security::SecurityService;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SecurityService>,
    pub codec: Arc<TokenCodec>,
}

impl AppState {
    pub fn new(service: SecurityService, codec: TokenCodec) -> Self {
        Self {
            service: Arc::new(service),
            codec: Arc::new(codec),
        }
    }
}

/// Full router: public routes plus the authenticated command endpoint
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/do", post(protected::command_post))
        .route_layer(from_fn_with_state(state.codec.clone(), jwt_auth_middleware));

    Router::new()
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .merge(protected)
        .with_state(state)
}
