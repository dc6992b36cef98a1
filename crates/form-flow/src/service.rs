use std::time::Duration;

use async_trait::async_trait;
use form_spec::OptionItem;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ServiceError;
use crate::payload::SubmissionPayload;

/// Remote option lists a screen can populate at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OptionCategory {
    MaritalStatus,
    EducationLevels,
    EmploymentSectors,
}

impl OptionCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionCategory::MaritalStatus => "marital-status",
            OptionCategory::EducationLevels => "education-levels",
            OptionCategory::EmploymentSectors => "employment-sectors",
        }
    }
}

/// Backend the flow talks to.
#[async_trait]
pub trait AccountService: Send + Sync {
    /// Submits the aggregated answers. `Ok(false)` means the backend declined.
    async fn submit(&self, payload: &SubmissionPayload) -> Result<bool, ServiceError>;

    async fn fetch_options(&self, category: OptionCategory) -> Result<Vec<OptionItem>, ServiceError>;
}

/// In-process backend with fixed option lists that accepts every submission.
#[derive(Debug, Clone, Default)]
pub struct MockAccountService {
    latency: Duration,
}

impl MockAccountService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulated network delay applied to every call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl AccountService for MockAccountService {
    async fn submit(&self, payload: &SubmissionPayload) -> Result<bool, ServiceError> {
        info!(screens = payload.len(), "submitting account creation data");
        self.simulate_latency().await;
        let pretty = payload
            .to_json_pretty()
            .map_err(|err| ServiceError::Decode(err.to_string()))?;
        info!(payload = %pretty, "account creation submitted");
        Ok(true)
    }

    async fn fetch_options(&self, category: OptionCategory) -> Result<Vec<OptionItem>, ServiceError> {
        info!(category = category.as_str(), "fetching options");
        self.simulate_latency().await;
        let options = match category {
            OptionCategory::MaritalStatus => vec![
                OptionItem::new("married", "Married"),
                OptionItem::new("single", "Single"),
                OptionItem::new("divorced", "Divorced"),
                OptionItem::new("widowed", "Widowed"),
            ],
            OptionCategory::EducationLevels => vec![
                OptionItem::new("high_school", "High School"),
                OptionItem::new("bachelors", "Bachelor's Degree"),
                OptionItem::new("masters", "Master's Degree"),
                OptionItem::new("doctorate", "Doctorate"),
                OptionItem::new("other", "Other"),
            ],
            OptionCategory::EmploymentSectors => vec![
                OptionItem::new("public_sector", "Public sector"),
                OptionItem::new("private_sector", "Private sector"),
                OptionItem::new("self_employed", "Self-employed"),
            ],
        };
        info!(category = category.as_str(), count = options.len(), "options received");
        Ok(options)
    }
}
