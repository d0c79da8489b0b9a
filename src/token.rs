use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    errors::{self, ErrorKind},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    auth::{Principal, Role},
    models::UserAccount,
};

/// Minimum length of the HMAC signing secret, in bytes (256 bits).
pub const MIN_SECRET_LEN: usize = 32;

/// Claims
///
/// The JSON payload carried inside every access token. Field names are the wire
/// format consumed by clients and must not change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the account id, stringified.
    pub sub: String,
    /// Display name of the account holder.
    pub name: String,
    /// Role granted to the bearer (`USER` or `ADMIN`).
    pub role: Role,
    /// Issued At (iat), epoch seconds.
    pub iat: i64,
    /// Expiration Time (exp), epoch seconds. The token is valid while `now < exp`.
    pub exp: i64,
}

/// TokenError
///
/// Every way a presented token can fail validation. The kinds are kept distinct all
/// the way to the 401 response so the client learns *why* it was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("Token has expired")]
    Expired,
    #[error("Invalid token signature")]
    BadSignature,
    #[error("Malformed JWT token")]
    Malformed,
    #[error("Unsupported JWT token")]
    UnsupportedAlgorithm,
    #[error("Token is missing or empty")]
    Empty,
}

/// ConfigError
///
/// Raised while building the codec at startup. Never produced per request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("JWT secret must be at least {MIN_SECRET_LEN} bytes, got {0}")]
    SecretTooShort(usize),
    #[error("token time-to-live must be positive, got {0}")]
    InvalidTtl(i64),
}

/// TokenCodec
///
/// Issues and validates HS256-signed access tokens. Holds nothing but the derived
/// keys and the TTL, so one instance is built at startup and shared read-only
/// (behind an `Arc` in `AppState`) by every request task.
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl_seconds: i64,
}

impl TokenCodec {
    /// new
    ///
    /// Builds the codec from the raw secret bytes and the default access token
    /// lifetime. Rejects secrets shorter than [`MIN_SECRET_LEN`].
    pub fn new(secret: &[u8], ttl_seconds: i64) -> Result<Self, ConfigError> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::SecretTooShort(secret.len()));
        }
        if ttl_seconds <= 0 {
            return Err(ConfigError::InvalidTtl(ttl_seconds));
        }

        // Only HS256 is accepted. Expiry is checked by hand in `validate_at` so the
        // comparison is strict (`now < exp`) and has no leeway.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["sub", "exp"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl_seconds,
        })
    }

    /// Default lifetime applied by [`TokenCodec::issue_for`].
    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    /// issue
    ///
    /// Signs a token for the given identity, valid for `ttl_seconds` from now.
    pub fn issue(
        &self,
        subject_id: i64,
        display_name: &str,
        role: Role,
        ttl_seconds: i64,
    ) -> errors::Result<String> {
        self.issue_at(subject_id, display_name, role, ttl_seconds, Utc::now().timestamp())
    }

    /// issue_for
    ///
    /// Login convenience: issues a token for a stored account using the configured TTL.
    pub fn issue_for(&self, account: &UserAccount) -> errors::Result<String> {
        self.issue(account.id, &account.name, account.role, self.ttl_seconds)
    }

    /// issue_at
    ///
    /// Same as [`TokenCodec::issue`] with an explicit clock. Identical inputs always
    /// produce a byte-identical token.
    pub fn issue_at(
        &self,
        subject_id: i64,
        display_name: &str,
        role: Role,
        ttl_seconds: i64,
        now: i64,
    ) -> errors::Result<String> {
        let claims = Claims {
            sub: subject_id.to_string(),
            name: display_name.to_string(),
            role,
            iat: now,
            exp: now.saturating_add(ttl_seconds),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
    }

    /// validate
    ///
    /// Verifies the signature and expiry of `token` against the current time and
    /// returns the principal it carries.
    pub fn validate(&self, token: &str) -> Result<Principal, TokenError> {
        self.validate_at(token, Utc::now().timestamp())
    }

    /// validate_at
    ///
    /// Validation with an explicit clock. Check order: blank input, structure and
    /// algorithm, signature, claim shape, then expiry. A token whose signature does
    /// not verify is never reported as expired.
    pub fn validate_at(&self, token: &str, now: i64) -> Result<Principal, TokenError> {
        if token.trim().is_empty() {
            return Err(TokenError::Empty);
        }

        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| classify(e.kind(), token))?;
        let claims = data.claims;

        let subject_id = claims
            .sub
            .parse::<i64>()
            .map_err(|_| TokenError::Malformed)?;

        if now >= claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(Principal {
            subject_id,
            display_name: claims.name,
            role: claims.role,
        })
    }

    /// validate_boolean
    ///
    /// Non-failing fast path for callers that treat every failure the same way.
    pub fn validate_boolean(&self, token: &str) -> bool {
        self.validate(token).is_ok()
    }
}

/// Maps a `jsonwebtoken` failure onto the public error taxonomy. Key and crypto
/// provider failures count as a bad signature.
fn classify(kind: &ErrorKind, token: &str) -> TokenError {
    match kind {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        ErrorKind::InvalidSignature
        | ErrorKind::InvalidKeyFormat => TokenError::BadSignature,
        ErrorKind::InvalidAlgorithm
        | ErrorKind::InvalidAlgorithmName
        | ErrorKind::MissingAlgorithm => TokenError::UnsupportedAlgorithm,
        ErrorKind::Base64(_) | ErrorKind::Json(_) => classify_segments(token),
        _ => TokenError::Malformed,
    }
}

/// classify_segments
///
/// `jsonwebtoken` reports an unknown `alg` (such as `none`) as a JSON error and an
/// undecodable signature as a base64 error. Both are located by inspecting the
/// segments directly: a readable header naming any algorithm other than HS256 is
/// unsupported, and a signature segment that is not valid base64url is a bad
/// signature. Anything else is malformed.
fn classify_segments(token: &str) -> TokenError {
    let mut segments = token.split('.');
    let (Some(header), Some(_claims), Some(signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return TokenError::Malformed;
    };

    let Some(header) = URL_SAFE_NO_PAD
        .decode(header)
        .ok()
        .and_then(|bytes| serde_json::from_slice::<serde_json::Value>(&bytes).ok())
        .filter(serde_json::Value::is_object)
    else {
        return TokenError::Malformed;
    };

    match header.get("alg").and_then(|alg| alg.as_str()) {
        Some("HS256") => {}
        Some(_) | None => return TokenError::UnsupportedAlgorithm,
    }

    if URL_SAFE_NO_PAD.decode(signature).is_err() {
        return TokenError::BadSignature;
    }

    TokenError::Malformed
}
