use std::collections::HashMap;

use serde::Serialize;

use crate::config::AttemptsConfig;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CampaignPolicy {
    pub campaign_id: String,
    pub max_attempts: u32,
    pub allow_retake_after_completion: bool,
}

impl CampaignPolicy {
    pub fn new(campaign_id: &str, max_attempts: u32) -> Self {
        Self {
            campaign_id: campaign_id.to_string(),
            max_attempts,
            allow_retake_after_completion: false,
        }
    }

    pub fn allowing_retake(mut self) -> Self {
        self.allow_retake_after_completion = true;
        self
    }
}

/// Read-only view over the campaign store's attempt policies.
#[derive(Debug, Clone)]
pub struct CampaignPolicies {
    default_max_attempts: u32,
    default_allow_retake: bool,
    overrides: HashMap<String, CampaignPolicy>,
}

impl CampaignPolicies {
    pub fn new(config: &AttemptsConfig) -> Self {
        let overrides = config
            .campaigns
            .iter()
            .map(|(id, o)| {
                let policy = CampaignPolicy {
                    campaign_id: id.clone(),
                    max_attempts: o.max_attempts,
                    allow_retake_after_completion: o
                        .allow_retake_after_completion
                        .unwrap_or(config.allow_retake_after_completion),
                };
                (id.clone(), policy)
            })
            .collect();

        Self {
            default_max_attempts: config.default_max_attempts,
            default_allow_retake: config.allow_retake_after_completion,
            overrides,
        }
    }

    pub fn policy(&self, campaign_id: &str) -> CampaignPolicy {
        self.overrides.get(campaign_id).cloned().unwrap_or_else(|| CampaignPolicy {
            campaign_id: campaign_id.to_string(),
            max_attempts: self.default_max_attempts,
            allow_retake_after_completion: self.default_allow_retake,
        })
    }
}
