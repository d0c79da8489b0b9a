use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::auth::Role;

// --- Account Record ---

/// UserAccount
///
/// A login-capable account as returned by the user lookup collaborator. Only the
/// fields the login entry point needs; the password is the stored hash, never the
/// plain text, and the struct is deliberately not serializable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserAccount {
    pub id: i64,
    pub name: String,
    /// Unique account identifier used to log in.
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

// --- Request Payloads (Input Schemas) ---

/// LoginRequest
///
/// Input payload for `POST /authentication/login`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

// --- Response Payloads ---

/// TokenResponse
///
/// Returned after a successful login. `token` goes into the `Authorization: Bearer`
/// header of subsequent requests.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TokenResponse {
    pub token: String,
    pub user_id: i64,
    pub name: String,
    pub role: Role,
}
