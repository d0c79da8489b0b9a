use std::collections::BTreeMap;

use crate::{
    AppState,
    auth::Principal,
    error::{ApiError, ErrorResponse},
    models::{LoginRequest, TokenResponse},
};
use axum::{
    Json,
    extract::State,
    http::{Method, Uri},
};

// --- Handlers ---

/// login
///
/// [Public Route] Exchanges email and password for an access token.
///
/// *Flow*: validate the payload, look the account up by email, verify the password
/// against the stored hash, then sign a token carrying id, name and role. Unknown
/// email and wrong password produce the same 401 so accounts cannot be probed.
#[utoipa::path(
    post,
    path = "/authentication/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 422, description = "Invalid payload", body = ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ErrorResponse> {
    authenticate_login(&state, payload)
        .await
        .map(Json)
        .map_err(|e| e.to_response(&method, uri.path()))
}

async fn authenticate_login(
    state: &AppState,
    payload: LoginRequest,
) -> Result<TokenResponse, ApiError> {
    validate_login(&payload)?;

    let account = state
        .repo
        .find_by_email(payload.email.trim())
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    // bcrypt is deliberately slow; keep it off the async worker threads.
    let passwords = state.passwords.clone();
    let hash = account.password_hash.clone();
    let verified = tokio::task::spawn_blocking(move || passwords.verify(&payload.password, &hash))
        .await
        .map_err(|e| ApiError::internal(format!("password verification task failed: {e}")))?;

    if !verified {
        tracing::info!(account_id = account.id, "login rejected: wrong password");
        return Err(ApiError::InvalidCredentials);
    }

    let token = state
        .codec
        .issue_for(&account)
        .map_err(|e| ApiError::internal(format!("token signing failed: {e}")))?;

    tracing::info!(account_id = account.id, role = %account.role, "access token issued");

    Ok(TokenResponse {
        token,
        user_id: account.id,
        name: account.name,
        role: account.role,
    })
}

/// Field checks for the login payload, reported together in `fieldErrors`.
fn validate_login(payload: &LoginRequest) -> Result<(), ApiError> {
    let mut errors = BTreeMap::new();

    let email = payload.email.trim();
    if email.is_empty() {
        errors.insert("email".to_string(), "Email is required".to_string());
    } else if !looks_like_email(email) {
        errors.insert("email".to_string(), "Email should be valid".to_string());
    }

    if payload.password.trim().is_empty() {
        errors.insert("password".to_string(), "Password is required".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(errors))
    }
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}

/// get_me
///
/// [Authenticated Route] Returns the identity carried by the caller's token.
#[utoipa::path(
    get,
    path = "/manage/me",
    responses(
        (status = 200, description = "Current principal", body = Principal),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    )
)]
pub async fn get_me(principal: Principal) -> Json<Principal> {
    Json(principal)
}
