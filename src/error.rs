use std::collections::BTreeMap;

use axum::{
    Json,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;

use crate::{auth::AuthorizationError, repository::RepositoryError, token::TokenError};

/// ErrorResponse
///
/// The single JSON body used for every rejected request: token failures, missing
/// credentials, insufficient role, validation errors and unexpected failures alike.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ErrorResponse {
    #[ts(type = "string")]
    pub timestamp: DateTime<Utc>,
    /// Numeric HTTP status.
    pub status: u16,
    /// Status name, e.g. `UNAUTHORIZED`.
    pub error: String,
    pub method: String,
    pub path: String,
    /// Per-field validation messages. Omitted for authentication failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_errors: Option<BTreeMap<String, String>>,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(
        status: StatusCode,
        method: &Method,
        path: &str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            status: status.as_u16(),
            error: status_name(status),
            method: method.to_string(),
            path: path.to_string(),
            field_errors: None,
            message: message.into(),
        }
    }

    pub fn with_field_errors(mut self, field_errors: BTreeMap<String, String>) -> Self {
        self.field_errors = Some(field_errors);
        self
    }

    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self)).into_response()
    }
}

/// `UNPROCESSABLE_ENTITY` style names from the canonical reason phrase.
fn status_name(status: StatusCode) -> String {
    status
        .canonical_reason()
        .unwrap_or("UNKNOWN")
        .to_uppercase()
        .replace([' ', '-'], "_")
}

/// ApiError
///
/// Everything the security layer and the login entry point can fail with. Rendered
/// through [`ErrorResponse`] once the request method and path are known.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Authorization(#[from] AuthorizationError),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Validation failed")]
    Validation(BTreeMap<String, String>),

    #[error("Internal server error")]
    Internal(String),
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl ApiError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Token(_) | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Authorization(e) => e.status_code(),
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// to_response
    ///
    /// Builds the error body for the request identified by `method` and `path`.
    /// Internal details are logged, never sent to the client.
    pub fn to_response(self, method: &Method, path: &str) -> ErrorResponse {
        let status = self.status_code();
        match self {
            Self::Internal(detail) => {
                tracing::error!(%method, path, "internal error: {}", detail);
                ErrorResponse::new(status, method, path, "Internal server error")
            }
            Self::Validation(fields) => {
                ErrorResponse::new(status, method, path, "Validation failed")
                    .with_field_errors(fields)
            }
            other => ErrorResponse::new(status, method, path, other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_names() {
        assert_eq!(status_name(StatusCode::UNAUTHORIZED), "UNAUTHORIZED");
        assert_eq!(status_name(StatusCode::FORBIDDEN), "FORBIDDEN");
        assert_eq!(
            status_name(StatusCode::UNPROCESSABLE_ENTITY),
            "UNPROCESSABLE_ENTITY"
        );
    }

    #[test]
    fn test_token_error_keeps_specific_message() {
        let body = ApiError::from(TokenError::Expired).to_response(&Method::GET, "/students");
        assert_eq!(body.status, 401);
        assert_eq!(body.error, "UNAUTHORIZED");
        assert_eq!(body.message, "Token has expired");
        assert_eq!(body.method, "GET");
        assert_eq!(body.path, "/students");
        assert!(body.field_errors.is_none());
    }

    #[test]
    fn test_forbidden_maps_to_403() {
        let body = ApiError::from(AuthorizationError::Forbidden)
            .to_response(&Method::DELETE, "/students/5");
        assert_eq!(body.status, 403);
        assert_eq!(body.error, "FORBIDDEN");
    }

    #[test]
    fn test_field_errors_omitted_when_absent() {
        let body = ErrorResponse::new(StatusCode::UNAUTHORIZED, &Method::GET, "/x", "nope");
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("fieldErrors").is_none());
        assert_eq!(json["status"], 401);
    }

    #[test]
    fn test_internal_error_hides_detail() {
        let body = ApiError::internal("connection refused on 10.0.0.3")
            .to_response(&Method::POST, "/authentication/login");
        assert_eq!(body.status, 500);
        assert_eq!(body.message, "Internal server error");
    }
}
