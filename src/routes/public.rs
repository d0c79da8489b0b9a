use crate::{AppState, auth::Permission, handlers};
use axum::{
    Router,
    http::Method,
    routing::{get, post},
};

use super::RouteGroup;

/// Public Access Rules
///
/// Endpoints reachable without a token. The course catalogue is readable by anyone
/// and the whole `/authentication` family must stay open, otherwise nobody could
/// obtain a token in the first place.
pub fn groups() -> Vec<RouteGroup> {
    vec![
        RouteGroup {
            permission: Permission::Public,
            methods: vec![Method::GET],
            patterns: vec!["/courses/**", "/health", "/swagger-ui/**", "/api-docs/**"],
        },
        RouteGroup {
            permission: Permission::Public,
            methods: vec![Method::POST],
            patterns: vec!["/authentication/**"],
        },
    ]
}

/// Public Router Module
///
/// Handlers served by this crate under the public rules above.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers. Returns "ok" immediately.
        .route("/health", get(|| async { "ok" }))
        // POST /authentication/login
        // Exchanges email and password for a signed access token.
        .route("/authentication/login", post(handlers::login))
}
