//! One-time room credentials for accepted attempts.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::attempts::AttemptLedger;
use crate::config::RoomConfig;
use crate::db::RoomCredentialRecord;
use crate::error::{AppError, AttemptError, RoomError};
use crate::Result;

const ROOM_PREFIX: &str = "interview-";

/// Storage for issued credentials, written only by [`RoomCredentialIssuer`].
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Atomic create-if-absent. Returns `false` if the submission already has
    /// a credential, revoked or not.
    async fn insert_if_absent(&self, record: &RoomCredentialRecord) -> Result<bool>;

    async fn get(&self, submission_id: Uuid) -> Result<Option<RoomCredentialRecord>>;

    async fn mark_revoked(&self, submission_id: Uuid, at: DateTime<Utc>) -> Result<()>;
}

#[derive(Default)]
pub struct MemoryCredentialStore {
    records: Arc<RwLock<HashMap<Uuid, RoomCredentialRecord>>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn insert_if_absent(&self, record: &RoomCredentialRecord) -> Result<bool> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.submission_id) {
            return Ok(false);
        }
        records.insert(record.submission_id, record.clone());
        Ok(true)
    }

    async fn get(&self, submission_id: Uuid) -> Result<Option<RoomCredentialRecord>> {
        Ok(self.records.read().await.get(&submission_id).cloned())
    }

    async fn mark_revoked(&self, submission_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        if let Some(record) = self.records.write().await.get_mut(&submission_id) {
            record.revoked_at.get_or_insert(at);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VideoGrant {
    pub room: String,
    pub room_join: bool,
    pub can_publish: bool,
    pub can_subscribe: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinClaims {
    pub iss: String,
    pub sub: String,
    pub name: String,
    pub jti: String,
    pub nbf: i64,
    pub exp: i64,
    pub video: VideoGrant,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomCredential {
    pub room_name: String,
    pub join_token: String,
    pub submission_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub server_url: String,
}

pub fn room_name_for(submission_id: Uuid) -> String {
    format!("{}{}", ROOM_PREFIX, submission_id.simple())
}

pub fn submission_for_room(room_name: &str) -> Option<Uuid> {
    let id = room_name.strip_prefix(ROOM_PREFIX)?;
    let submission_id = Uuid::try_parse(id).ok()?;
    // Only the canonical form maps back, keeping the mapping one-to-one.
    (room_name_for(submission_id) == room_name).then_some(submission_id)
}

pub struct RoomCredentialIssuer {
    ledger: Arc<dyn AttemptLedger>,
    store: Arc<dyn CredentialStore>,
    api_key: String,
    server_url: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    max_duration: Duration,
}

impl RoomCredentialIssuer {
    pub fn new(
        config: &RoomConfig,
        ledger: Arc<dyn AttemptLedger>,
        store: Arc<dyn CredentialStore>,
    ) -> Result<Self> {
        if config.api_secret.is_empty() || config.api_key.is_empty() {
            return Err(AppError::ConfigError("room.api_key and room.api_secret are required".into()));
        }
        if config.max_duration_minutes <= 0 {
            return Err(AppError::ConfigError("room.max_duration_minutes must be positive".into()));
        }

        Ok(Self {
            ledger,
            store,
            api_key: config.api_key.clone(),
            server_url: config.server_url.clone(),
            encoding_key: EncodingKey::from_secret(config.api_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.api_secret.as_bytes()),
            max_duration: Duration::minutes(config.max_duration_minutes),
        })
    }

    /// Mints the one and only credential for `submission_id`.
    pub async fn issue_for(&self, submission_id: Uuid, participant_name: &str) -> Result<RoomCredential> {
        self.issue_for_at(submission_id, participant_name, Utc::now()).await
    }

    /// Already issued wins over every other refusal, completed attempts included.
    pub async fn issue_for_at(
        &self,
        submission_id: Uuid,
        participant_name: &str,
        now: DateTime<Utc>,
    ) -> Result<RoomCredential> {
        let attempt = self
            .ledger
            .find(submission_id)
            .await?
            .ok_or(AttemptError::UnknownSubmission)?;
        if self.store.get(submission_id).await?.is_some() {
            return Err(RoomError::AlreadyIssued.into());
        }
        if attempt.completed {
            return Err(AttemptError::AlreadyCompleted.into());
        }

        let room_name = room_name_for(submission_id);
        let expires_at = now + self.max_duration;
        let claims = JoinClaims {
            iss: self.api_key.clone(),
            sub: attempt.user_id.to_string(),
            name: participant_name.to_string(),
            jti: submission_id.to_string(),
            nbf: now.timestamp(),
            exp: expires_at.timestamp(),
            video: VideoGrant {
                room: room_name.clone(),
                room_join: true,
                can_publish: true,
                can_subscribe: true,
            },
        };
        let join_token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;

        let record = RoomCredentialRecord {
            submission_id,
            room_name: room_name.clone(),
            issued_at: now,
            expires_at,
            revoked_at: None,
        };
        if !self.store.insert_if_absent(&record).await? {
            warn!("Room credential already issued for submission {}", submission_id);
            return Err(RoomError::AlreadyIssued.into());
        }

        info!("Issued room credential for submission {} (room {})", submission_id, room_name);
        Ok(RoomCredential {
            room_name,
            join_token,
            submission_id,
            expires_at,
            server_url: self.server_url.clone(),
        })
    }

    /// No-op for unissued or already revoked credentials.
    pub async fn revoke(&self, submission_id: Uuid) -> Result<()> {
        self.store.mark_revoked(submission_id, Utc::now()).await?;
        info!("Room credential for submission {} revoked", submission_id);
        Ok(())
    }

    /// Checks a presented join token against signature, expiry and revocation.
    pub async fn verify_join(&self, join_token: &str) -> Result<JoinClaims> {
        self.verify_join_at(join_token, Utc::now()).await
    }

    /// A join token is expired once `now` reaches `exp`.
    pub async fn verify_join_at(&self, join_token: &str, now: DateTime<Utc>) -> Result<JoinClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_issuer(&[&self.api_key]);
        let claims = decode::<JoinClaims>(join_token, &self.decoding_key, &validation)
            .map_err(|_| RoomError::InvalidJoinToken)?
            .claims;
        if now.timestamp() >= claims.exp {
            return Err(RoomError::InvalidJoinToken.into());
        }

        let submission_id =
            submission_for_room(&claims.video.room).ok_or(RoomError::InvalidJoinToken)?;
        match self.store.get(submission_id).await? {
            Some(record) if record.is_revoked() => Err(RoomError::CredentialRevoked.into()),
            Some(_) => Ok(claims),
            None => Err(RoomError::InvalidJoinToken.into()),
        }
    }
}
