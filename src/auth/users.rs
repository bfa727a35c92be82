//! Identity store seam and password verification.

use std::collections::HashMap;
use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::User;
use crate::error::{AppError, AuthError};
use crate::Result;

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find(&self, user_id: Uuid) -> Result<Option<User>>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::InternalError(format!("Password hashing failed: {}", e)))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AppError::InternalError(format!("Invalid password hash format: {}", e)))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AppError::InternalError(format!("Password verification failed: {}", e))),
    }
}

/// Looks the user up by email and checks the password.
///
/// Unknown emails and wrong passwords are indistinguishable to the caller.
pub async fn authenticate(
    users: &dyn UserDirectory,
    email: &str,
    password: &str,
) -> Result<User> {
    let user = users
        .find_by_email(email)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    if !verify_password(password, &user.password_hash)? {
        return Err(AuthError::InvalidCredentials.into());
    }

    Ok(user)
}

#[derive(Default)]
pub struct MemoryUserDirectory {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, email: &str, name: &str, password: &str, is_admin: bool) -> Result<User> {
        if password.is_empty() {
            return Err(AppError::ValidationError("password must not be empty".into()));
        }
        let user = User::new(email, name, &hash_password(password)?, is_admin);

        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(AppError::ValidationError(format!("email already registered: {}", user.email)));
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn find(&self, user_id: Uuid) -> Result<Option<User>> {
        Ok(self.users.read().await.get(&user_id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = email.trim().to_lowercase();
        Ok(self.users.read().await.values().find(|u| u.email == email).cloned())
    }
}
