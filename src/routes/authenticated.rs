use crate::{AppState, auth::Permission, handlers};
use axum::{Router, http::Method, routing::get};

use super::RouteGroup;

/// Resource families any signed-in role may read and create.
const RESOURCES: [&str; 5] = [
    "/students/**",
    "/professors/**",
    "/study-classes/**",
    "/manage/**",
    "/subscriptions/**",
];

/// Authenticated Access Rules
///
/// `GET` and `POST` on the core resources require a valid token with either role.
/// Anything not listed anywhere in the table also lands on this tier by default.
pub fn groups() -> Vec<RouteGroup> {
    vec![RouteGroup {
        permission: Permission::User,
        methods: vec![Method::GET, Method::POST],
        patterns: RESOURCES.to_vec(),
    }]
}

/// Authenticated Router Module
///
/// Handlers that rely on a `Principal` having been attached by the authentication
/// layer.
pub fn authenticated_routes() -> Router<AppState> {
    Router::new()
        // GET /manage/me
        // Echoes the identity carried by the caller's token.
        .route("/manage/me", get(handlers::get_me))
}
