use std::sync::Arc;

use thiserror::Error;

#[derive(Debug, Error)]
#[error("password hashing failed: {0}")]
pub struct HashError(#[from] bcrypt::BcryptError);

/// PasswordVerifier
///
/// The opaque hash/verify capability used by the login entry point. The hashing
/// scheme itself is not part of the security layer.
pub trait PasswordVerifier: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, HashError>;

    /// `false` on mismatch and on a hash that cannot be parsed.
    fn verify(&self, password: &str, hash: &str) -> bool;
}

pub type PasswordState = Arc<dyn PasswordVerifier>;

/// BcryptPasswordVerifier
///
/// bcrypt with a configurable cost. Tests use a low cost to stay fast.
#[derive(Debug, Clone, Copy)]
pub struct BcryptPasswordVerifier {
    cost: u32,
}

impl BcryptPasswordVerifier {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptPasswordVerifier {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

impl PasswordVerifier for BcryptPasswordVerifier {
    fn hash(&self, password: &str) -> Result<String, HashError> {
        Ok(bcrypt::hash(password, self.cost)?)
    }

    fn verify(&self, password: &str, hash: &str) -> bool {
        match bcrypt::verify(password, hash) {
            Ok(matches) => matches,
            Err(e) => {
                tracing::warn!("stored password hash could not be verified: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let verifier = BcryptPasswordVerifier::new(4);
        let hash = verifier.hash("s3cret").unwrap();
        assert!(verifier.verify("s3cret", &hash));
        assert!(!verifier.verify("wrong", &hash));
    }

    #[test]
    fn test_garbage_hash_does_not_verify() {
        let verifier = BcryptPasswordVerifier::new(4);
        assert!(!verifier.verify("s3cret", "not-a-bcrypt-hash"));
    }
}
