use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;

use crate::error::ErrorResponse;

/// Role
///
/// The role granted to an account and carried in its token's `role` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "USER" => Ok(Role::User),
            "ADMIN" => Ok(Role::Admin),
            _ => Err(format!("unknown role: {}", s)),
        }
    }
}

/// Permission
///
/// Minimum tier a route demands. The derived ordering is the tier ordering:
/// `Public < User < Admin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Permission {
    Public,
    User,
    Admin,
}

impl Permission {
    /// Whether a principal holding `role` meets this requirement.
    pub fn is_satisfied_by(self, role: Role) -> bool {
        match self {
            Permission::Public => true,
            Permission::User => matches!(role, Role::User | Role::Admin),
            Permission::Admin => role == Role::Admin,
        }
    }
}

/// Principal
///
/// The authenticated identity of one request. Built by the authentication layer from
/// a validated token and stored in the request extensions; it lives exactly as long
/// as the request does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Principal {
    pub subject_id: i64,
    pub display_name: String,
    pub role: Role,
}

/// Decision
///
/// Outcome of checking a principal against a route's permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// No principal on a protected route (401).
    DenyUnauthenticated,
    /// Principal present but its role is insufficient (403).
    DenyForbidden,
}

/// AuthorizationError
///
/// The two ways authorization can refuse a request. Deterministic, never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthorizationError {
    #[error("Authentication is required to access this resource.")]
    Unauthenticated,
    #[error("You do not have permission to access this resource.")]
    Forbidden,
}

impl AuthorizationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthorizationError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AuthorizationError::Forbidden => StatusCode::FORBIDDEN,
        }
    }
}

impl Decision {
    /// Converts the decision into a `Result` so callers can `?` on it.
    pub fn into_result(self) -> Result<(), AuthorizationError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::DenyUnauthenticated => Err(AuthorizationError::Unauthenticated),
            Decision::DenyForbidden => Err(AuthorizationError::Forbidden),
        }
    }
}

/// decide
///
/// Pure authorization check. Public routes always pass; any other route needs a
/// principal, and that principal's role must satisfy the requirement.
pub fn decide(principal: Option<&Principal>, required: Permission) -> Decision {
    if required == Permission::Public {
        return Decision::Allow;
    }

    match principal {
        None => Decision::DenyUnauthenticated,
        Some(p) if required.is_satisfied_by(p.role) => Decision::Allow,
        Some(_) => Decision::DenyForbidden,
    }
}

/// Principal Extractor Implementation
///
/// Lets handlers take `Principal` as an argument. The value is read from the request
/// extensions populated by the authentication middleware; nothing is re-validated
/// here. A handler mounted outside the security layers therefore always rejects
/// with 401 instead of seeing a stale or forged identity.
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = ErrorResponse;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Principal>().cloned().ok_or_else(|| {
            ErrorResponse::new(
                AuthorizationError::Unauthenticated.status_code(),
                &parts.method,
                parts.uri.path(),
                AuthorizationError::Unauthenticated.to_string(),
            )
        })
    }
}
