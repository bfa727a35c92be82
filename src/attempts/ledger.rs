//! Per (user, campaign) attempt accounting.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

use super::campaigns::CampaignPolicy;
use crate::db::AttemptRecord;
use crate::error::AttemptError;
use crate::Result;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AttemptStatus {
    pub total: u32,
    pub completed: u32,
    pub max: u32,
    pub can_submit: bool,
}

/// Decides whether one more attempt may be created on top of `existing`.
pub fn admit(policy: &CampaignPolicy, existing: &[AttemptRecord]) -> std::result::Result<(), AttemptError> {
    if existing.len() as u32 >= policy.max_attempts {
        return Err(AttemptError::MaxAttemptsReached);
    }
    if !policy.allow_retake_after_completion && existing.iter().any(|r| r.completed) {
        return Err(AttemptError::AlreadyCompleted);
    }
    Ok(())
}

pub fn summarize(policy: &CampaignPolicy, existing: &[AttemptRecord]) -> AttemptStatus {
    AttemptStatus {
        total: existing.len() as u32,
        completed: existing.iter().filter(|r| r.completed).count() as u32,
        max: policy.max_attempts,
        can_submit: admit(policy, existing).is_ok(),
    }
}

/// Sole writer of attempt records.
///
/// `try_start_attempt` is a single atomic check-then-create per
/// `(user_id, campaign_id)`; at most `max_attempts` records ever exist.
#[async_trait]
pub trait AttemptLedger: Send + Sync {
    async fn try_start_attempt(&self, user_id: Uuid, policy: &CampaignPolicy) -> Result<AttemptRecord>;

    /// Idempotent. Fails only for unknown submissions.
    async fn mark_completed(&self, submission_id: Uuid) -> Result<AttemptRecord>;

    async fn find(&self, submission_id: Uuid) -> Result<Option<AttemptRecord>>;

    async fn list(&self, user_id: Uuid, campaign_id: &str) -> Result<Vec<AttemptRecord>>;

    async fn status(&self, user_id: Uuid, policy: &CampaignPolicy) -> Result<AttemptStatus> {
        let records = self.list(user_id, &policy.campaign_id).await?;
        Ok(summarize(policy, &records))
    }
}

type LedgerKey = (Uuid, String);
type Slot = Arc<Mutex<Vec<AttemptRecord>>>;

/// In-process ledger with one lock per `(user_id, campaign_id)`.
#[derive(Default)]
pub struct MemoryAttemptLedger {
    slots: RwLock<HashMap<LedgerKey, Slot>>,
    by_submission: RwLock<HashMap<Uuid, LedgerKey>>,
}

impl MemoryAttemptLedger {
    pub fn new() -> Self {
        Self::default()
    }

    async fn slot(&self, key: &LedgerKey) -> Slot {
        if let Some(slot) = self.slots.read().await.get(key) {
            return slot.clone();
        }
        self.slots.write().await.entry(key.clone()).or_default().clone()
    }

    async fn existing_slot(&self, submission_id: Uuid) -> Option<Slot> {
        let key = self.by_submission.read().await.get(&submission_id).cloned()?;
        self.slots.read().await.get(&key).cloned()
    }
}

#[async_trait]
impl AttemptLedger for MemoryAttemptLedger {
    async fn try_start_attempt(&self, user_id: Uuid, policy: &CampaignPolicy) -> Result<AttemptRecord> {
        let key = (user_id, policy.campaign_id.clone());
        let slot = self.slot(&key).await;
        let mut records = slot.lock().await;

        if let Err(denied) = admit(policy, &records) {
            warn!("Attempt denied for user {} on campaign {}: {}", user_id, policy.campaign_id, denied);
            return Err(denied.into());
        }

        let record = AttemptRecord::new(user_id, &policy.campaign_id);
        records.push(record.clone());
        self.by_submission.write().await.insert(record.submission_id, key);

        info!(
            "Started attempt {} ({}/{}) for user {} on campaign {}",
            record.submission_id,
            records.len(),
            policy.max_attempts,
            user_id,
            policy.campaign_id
        );
        Ok(record)
    }

    async fn mark_completed(&self, submission_id: Uuid) -> Result<AttemptRecord> {
        let slot = self
            .existing_slot(submission_id)
            .await
            .ok_or(AttemptError::UnknownSubmission)?;
        let mut records = slot.lock().await;
        let record = records
            .iter_mut()
            .find(|r| r.submission_id == submission_id)
            .ok_or(AttemptError::UnknownSubmission)?;

        if !record.completed {
            record.completed = true;
            record.completed_at = Some(Utc::now());
            info!("Attempt {} completed", submission_id);
        }
        Ok(record.clone())
    }

    async fn find(&self, submission_id: Uuid) -> Result<Option<AttemptRecord>> {
        let Some(slot) = self.existing_slot(submission_id).await else {
            return Ok(None);
        };
        let records = slot.lock().await;
        Ok(records.iter().find(|r| r.submission_id == submission_id).cloned())
    }

    async fn list(&self, user_id: Uuid, campaign_id: &str) -> Result<Vec<AttemptRecord>> {
        let key = (user_id, campaign_id.to_string());
        let slot = self.slots.read().await.get(&key).cloned();
        match slot {
            Some(slot) => Ok(slot.lock().await.clone()),
            None => Ok(Vec::new()),
        }
    }
}
