use crate::auth::Permission;
use axum::http::Method;

use super::RouteGroup;

/// Resource families whose modifications are reserved for administrators.
const RESOURCES: [&str; 5] = [
    "/students/**",
    "/professors/**",
    "/study-classes/**",
    "/manage/**",
    "/subscriptions/**",
];

/// Admin Access Rules
///
/// `PUT` and `DELETE` on the core resources (including subscription changes) need
/// the `ADMIN` role. A `USER` token reaching these routes is answered with 403.
pub fn groups() -> Vec<RouteGroup> {
    vec![RouteGroup {
        permission: Permission::Admin,
        methods: vec![Method::PUT, Method::DELETE],
        patterns: RESOURCES.to_vec(),
    }]
}
