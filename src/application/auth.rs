//! Account registration and credential checks.

use std::sync::Arc;

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use thiserror::Error;
use tracing::{info, warn};

use crate::application::repos::{RepoError, UsersRepo};
use crate::domain::users::{NewUser, UserRecord};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Username and password are required")]
    MissingCredentials,
    #[error("Username already exists")]
    UsernameTaken,
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UsersRepo>,
}

impl AuthService {
    pub fn new(users: Arc<dyn UsersRepo>) -> Self {
        Self { users }
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<UserRecord, AuthError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        if self.users.find_user_by_username(username).await?.is_some() {
            return Err(AuthError::UsernameTaken);
        }

        let password_hash = hash_password(password.to_string()).await?;
        let user = self
            .users
            .create_user(NewUser {
                username: username.to_string(),
                password_hash,
            })
            .await
            .map_err(|err| match err {
                RepoError::Duplicate { .. } => AuthError::UsernameTaken,
                other => AuthError::Repo(other),
            })?;

        info!(
            target = "rxlens::auth",
            op = "register",
            user_id = user.id,
            "user registered"
        );
        Ok(user)
    }

    /// Check a username/password pair. Unknown users and wrong passwords
    /// produce the same error.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<UserRecord, AuthError> {
        let Some(user) = self.users.find_user_by_username(username.trim()).await? else {
            warn!(target = "rxlens::auth", op = "login", "unknown username");
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password(password.to_string(), user.password_hash.clone()).await? {
            warn!(
                target = "rxlens::auth",
                op = "login",
                user_id = user.id,
                "password mismatch"
            );
            return Err(AuthError::InvalidCredentials);
        }

        info!(
            target = "rxlens::auth",
            op = "login",
            user_id = user.id,
            "user signed in"
        );
        Ok(user)
    }

    pub async fn find_user(&self, id: i64) -> Result<Option<UserRecord>, AuthError> {
        Ok(self.users.find_user_by_id(id).await?)
    }
}

async fn hash_password(password: String) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|err| AuthError::Hashing(err.to_string()))
    })
    .await
    .map_err(|err| AuthError::Hashing(err.to_string()))?
}

async fn verify_password(password: String, stored: String) -> Result<bool, AuthError> {
    tokio::task::spawn_blocking(move || {
        let parsed =
            PasswordHash::new(&stored).map_err(|err| AuthError::Hashing(err.to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .map_err(|err| AuthError::Hashing(err.to_string()))?
}
