//! Current refresh-token id per user.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::Result;

/// Tracks the single valid refresh `token_id` for each user.
///
/// Every method is atomic per `user_id`.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Overwrites the current id, invalidating every earlier refresh token.
    async fn set_current(&self, user_id: Uuid, token_id: &str) -> Result<()>;

    async fn get_current(&self, user_id: Uuid) -> Result<Option<String>>;

    /// Replaces `expected` with `next` only if `expected` is still current.
    async fn compare_and_set(&self, user_id: Uuid, expected: &str, next: &str) -> Result<bool>;

    async fn revoke(&self, user_id: Uuid) -> Result<()>;
}

#[derive(Default)]
pub struct MemorySessionStore {
    current: Arc<RwLock<HashMap<Uuid, String>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn set_current(&self, user_id: Uuid, token_id: &str) -> Result<()> {
        self.current.write().await.insert(user_id, token_id.to_string());
        Ok(())
    }

    async fn get_current(&self, user_id: Uuid) -> Result<Option<String>> {
        Ok(self.current.read().await.get(&user_id).cloned())
    }

    async fn compare_and_set(&self, user_id: Uuid, expected: &str, next: &str) -> Result<bool> {
        let mut current = self.current.write().await;
        match current.get_mut(&user_id) {
            Some(token_id) if token_id == expected => {
                *token_id = next.to_string();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn revoke(&self, user_id: Uuid) -> Result<()> {
        if self.current.write().await.remove(&user_id).is_some() {
            info!("Revoked refresh session for user {}", user_id);
        }
        Ok(())
    }
}
