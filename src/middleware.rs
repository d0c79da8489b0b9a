use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{
    TableState, TokenState,
    auth::{Principal, decide},
    error::ApiError,
    token::{TokenCodec, TokenError},
};

/// Literal scheme prefix of the `Authorization` header, trailing space included.
pub const BEARER_PREFIX: &str = "Bearer ";

/// Authentication
///
/// Terminal states of the per-request authentication step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authentication {
    /// No bearer credentials were presented; the request continues anonymously.
    Anonymous,
    /// A valid token was presented.
    Authenticated(Principal),
    /// A bearer token was presented but failed validation.
    Rejected(TokenError),
}

/// authenticate_headers
///
/// Resolves the request's identity from its headers alone. A missing header or any
/// scheme other than `Bearer ` is anonymous; everything after the prefix goes to
/// the codec unmodified. A bearer value that is not valid UTF-8 cannot be a token
/// and is rejected as malformed.
pub fn authenticate_headers(headers: &HeaderMap, codec: &TokenCodec) -> Authentication {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.as_bytes().strip_prefix(BEARER_PREFIX.as_bytes()));

    let Some(raw) = bearer else {
        return Authentication::Anonymous;
    };

    let Ok(token) = std::str::from_utf8(raw) else {
        return Authentication::Rejected(TokenError::Malformed);
    };

    match codec.validate(token) {
        Ok(principal) => Authentication::Authenticated(principal),
        Err(err) => Authentication::Rejected(err),
    }
}

/// authenticate
///
/// Outer security middleware. Any `Principal` already present in the extensions
/// is discarded first, so only a token validated here can ever be seen
/// downstream. A rejected token ends the request with a 401 naming the exact
/// failure; the business handler is never called.
pub async fn authenticate(
    State(codec): State<TokenState>,
    mut request: Request,
    next: Next,
) -> Response {
    request.extensions_mut().remove::<Principal>();

    match authenticate_headers(request.headers(), &codec) {
        Authentication::Anonymous => {
            tracing::debug!("no bearer token, continuing anonymously");
        }
        Authentication::Authenticated(principal) => {
            tracing::debug!(
                subject_id = principal.subject_id,
                role = %principal.role,
                "request authenticated"
            );
            request.extensions_mut().insert(principal);
        }
        Authentication::Rejected(err) => {
            tracing::warn!(reason = %err, "bearer token rejected");
            return ApiError::from(err)
                .to_response(request.method(), request.uri().path())
                .into_response();
        }
    }

    next.run(request).await
}

/// authorize
///
/// Inner security middleware. Looks up the permission the route requires and
/// checks the principal (if any) left by [`authenticate`]. Denials are answered
/// here with 401 or 403.
pub async fn authorize(
    State(table): State<TableState>,
    request: Request,
    next: Next,
) -> Response {
    let required = table.required_permission(request.method(), request.uri().path());
    let decision = decide(request.extensions().get::<Principal>(), required);

    if let Err(err) = decision.into_result() {
        tracing::warn!(
            method = %request.method(),
            path = request.uri().path(),
            ?required,
            "request denied: {}",
            err
        );
        return ApiError::from(err)
            .to_response(request.method(), request.uri().path())
            .into_response();
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use axum::http::HeaderValue;

    fn codec() -> TokenCodec {
        TokenCodec::new(b"middleware-test-secret-0123456789abcdef", 3600).unwrap()
    }

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_missing_header_is_anonymous() {
        assert_eq!(
            authenticate_headers(&HeaderMap::new(), &codec()),
            Authentication::Anonymous
        );
    }

    #[test]
    fn test_other_scheme_is_anonymous() {
        assert_eq!(
            authenticate_headers(&headers_with("Basic dXNlcjpwYXNz"), &codec()),
            Authentication::Anonymous
        );
        // The prefix is case- and space-sensitive.
        assert_eq!(
            authenticate_headers(&headers_with("bearer abc"), &codec()),
            Authentication::Anonymous
        );
    }

    #[test]
    fn test_valid_bearer_token() {
        let codec = codec();
        let token = codec.issue(5, "Eve", Role::User, 60).unwrap();
        let outcome = authenticate_headers(&headers_with(&format!("Bearer {token}")), &codec);

        match outcome {
            Authentication::Authenticated(p) => {
                assert_eq!(p.subject_id, 5);
                assert_eq!(p.role, Role::User);
            }
            other => panic!("expected authenticated, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_bearer_is_rejected() {
        assert_eq!(
            authenticate_headers(&headers_with("Bearer "), &codec()),
            Authentication::Rejected(TokenError::Empty)
        );
    }

    #[test]
    fn test_non_utf8_bearer_is_malformed() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_bytes(b"Bearer \xff\xfe\x80token").unwrap(),
        );

        assert_eq!(
            authenticate_headers(&headers, &codec()),
            Authentication::Rejected(TokenError::Malformed)
        );
    }

    #[test]
    fn test_non_ascii_other_scheme_is_anonymous() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_bytes(b"Basic \xff\xfe").unwrap(),
        );

        assert_eq!(
            authenticate_headers(&headers, &codec()),
            Authentication::Anonymous
        );
    }

    #[test]
    fn test_garbage_bearer_is_rejected() {
        assert_eq!(
            authenticate_headers(&headers_with("Bearer not-a-token"), &codec()),
            Authentication::Rejected(TokenError::Malformed)
        );
    }
}
