use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: &str, display_name: &str, password_hash: &str, is_admin: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.trim().to_lowercase(),
            display_name: display_name.to_string(),
            password_hash: password_hash.to_string(),
            is_admin,
            created_at: Utc::now(),
        }
    }
}

/// One try at a campaign. Never deleted; only `completed` changes.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq, Eq)]
pub struct AttemptRecord {
    pub submission_id: Uuid,
    pub user_id: Uuid,
    pub campaign_id: String,
    pub created_at: DateTime<Utc>,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

impl AttemptRecord {
    pub fn new(user_id: Uuid, campaign_id: &str) -> Self {
        Self {
            submission_id: Uuid::new_v4(),
            user_id,
            campaign_id: campaign_id.to_string(),
            created_at: Utc::now(),
            completed: false,
            completed_at: None,
        }
    }
}

/// Bookkeeping for an issued room credential. The join token itself is
/// handed to the caller once and never stored.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RoomCredentialRecord {
    pub submission_id: Uuid,
    pub room_name: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl RoomCredentialRecord {
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }
}
