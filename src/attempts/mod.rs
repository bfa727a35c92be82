//! Submission attempts: policy, ledger and HTTP handlers.

pub mod campaigns;
pub mod handlers;
pub mod ledger;

pub use campaigns::{CampaignPolicies, CampaignPolicy};
pub use ledger::{AttemptLedger, AttemptStatus, MemoryAttemptLedger};
