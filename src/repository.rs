use crate::{auth::Role, models::UserAccount};
use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};
use thiserror::Error;

/// RepositoryError
///
/// Failures of the account store. Surfaced to clients as a plain 500.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("stored account {id} has unknown role {role:?}")]
    InvalidRole { id: i64, role: String },
}

/// UserRepository Trait
///
/// The user lookup capability consumed by the login entry point. Persistence of
/// accounts (registration, listing) belongs to the business layer, not here.
///
/// **Send + Sync + async_trait** make `Arc<dyn UserRepository>` shareable across
/// Axum's task boundaries.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Finds an account by its unique email address.
    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, RepositoryError>;
}

/// RepositoryState
///
/// The concrete type used to share the account lookup across the application state.
pub type RepositoryState = Arc<dyn UserRepository>;

/// Row shape of the `user_app` table. `role` is stored as text.
#[derive(FromRow)]
struct UserRow {
    id: i64,
    name: String,
    email: String,
    password: String,
    role: String,
}

impl TryFrom<UserRow> for UserAccount {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = row
            .role
            .parse::<Role>()
            .map_err(|_| RepositoryError::InvalidRole {
                id: row.id,
                role: row.role.clone(),
            })?;

        Ok(UserAccount {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password,
            role,
        })
    }
}

/// PostgresUserRepository
///
/// The production implementation, backed by the `user_app` table.
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, password, role
            FROM user_app
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserAccount::try_from).transpose()
    }
}

/// InMemoryUserRepository
///
/// A map-backed store used by the test suite and by local runs without Postgres.
#[derive(Default)]
pub struct InMemoryUserRepository {
    accounts: RwLock<HashMap<String, UserAccount>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the account keyed by its email.
    pub fn insert(&self, account: UserAccount) {
        let mut accounts = self
            .accounts
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        accounts.insert(account.email.clone(), account);
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, RepositoryError> {
        let accounts = self
            .accounts
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(accounts.get(email).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_lookup() {
        let repo = InMemoryUserRepository::new();
        repo.insert(UserAccount {
            id: 1,
            name: "Admin".into(),
            email: "admin@school.edu".into(),
            password_hash: "hash".into(),
            role: Role::Admin,
        });

        let found = repo.find_by_email("admin@school.edu").await.unwrap();
        assert_eq!(found.map(|a| a.role), Some(Role::Admin));
        assert!(repo.find_by_email("nobody@school.edu").await.unwrap().is_none());
    }

    #[test]
    fn test_row_with_unknown_role_is_rejected() {
        let row = UserRow {
            id: 4,
            name: "x".into(),
            email: "x@y.z".into(),
            password: "h".into(),
            role: "SUPERUSER".into(),
        };
        assert!(matches!(
            UserAccount::try_from(row),
            Err(RepositoryError::InvalidRole { id: 4, .. })
        ));
    }
}
