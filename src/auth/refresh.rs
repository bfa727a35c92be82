//! Exchanging a refresh token for a new access token.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::session::SessionStore;
use super::token::{IssuedToken, TokenCodec, TokenKind};
use super::users::UserDirectory;
use crate::error::AuthError;
use crate::retry::with_storage_retry;
use crate::Result;

#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub access_token: IssuedToken,
    /// Set when refresh tokens rotate on use.
    pub refresh_token: Option<IssuedToken>,
}

pub struct RefreshFlow {
    tokens: Arc<TokenCodec>,
    sessions: Arc<dyn SessionStore>,
    users: Arc<dyn UserDirectory>,
    rotate: bool,
}

impl RefreshFlow {
    pub fn new(
        tokens: Arc<TokenCodec>,
        sessions: Arc<dyn SessionStore>,
        users: Arc<dyn UserDirectory>,
        rotate: bool,
    ) -> Self {
        Self { tokens, sessions, users, rotate }
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshOutcome> {
        self.refresh_at(refresh_token, Utc::now()).await
    }

    pub async fn refresh_at(&self, refresh_token: &str, now: DateTime<Utc>) -> Result<RefreshOutcome> {
        let claims = self.tokens.verify_at(refresh_token, TokenKind::Refresh, now)?;
        let user_id = claims.user_id();
        let presented = claims.jti.ok_or(AuthError::MalformedToken)?;

        let current = with_storage_retry("session lookup", || self.sessions.get_current(user_id)).await?;
        if current.as_deref() != Some(presented.as_str()) {
            warn!("Rejected superseded refresh token for user {}", user_id);
            return Err(AuthError::RevokedToken.into());
        }

        // Admin flag comes from the identity store, never from the client.
        let user = with_storage_retry("user lookup", || self.users.find(user_id))
            .await?
            .ok_or(AuthError::UnknownUser)?;

        let access_token = self.tokens.issue_access_at(&user, now)?;

        let refresh_token = if self.rotate {
            let (issued, next_id) = self.tokens.issue_refresh_at(&user, now)?;
            let rotated = with_storage_retry("session rotation", || {
                self.sessions.compare_and_set(user_id, &presented, &next_id)
            })
            .await?;
            if !rotated {
                warn!("Lost refresh rotation race for user {}", user_id);
                return Err(AuthError::RevokedToken.into());
            }
            Some(issued)
        } else {
            None
        };

        info!("Refreshed access token for user {}", user_id);
        Ok(RefreshOutcome { access_token, refresh_token })
    }
}
