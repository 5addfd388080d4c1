//! Configuration types for the extractor and the batch queue.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the analysis extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Name of the system prompt in the prompt store.
    pub system_prompt_name: String,

    /// Name of the user prompt template in the prompt store.
    ///
    /// Placeholders: `{response_text}`, `{company_name}`, `{competitors}`.
    pub user_prompt_name: String,

    /// Upper bound on one completion round trip.
    ///
    /// Expiry is reported as an upstream failure. Default: 60s.
    pub timeout: Duration,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            system_prompt_name: "analysis_system".to_string(),
            user_prompt_name: "analysis_user".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

impl ExtractorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the prompt names to fetch.
    pub fn with_prompt_names(
        mut self,
        system: impl Into<String>,
        user: impl Into<String>,
    ) -> Self {
        self.system_prompt_name = system.into();
        self.user_prompt_name = user.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Both prompt names, system first.
    pub fn prompt_names(&self) -> [&str; 2] {
        [&self.system_prompt_name, &self.user_prompt_name]
    }
}

/// Configuration for the batch queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Responses fetched and processed per batch.
    ///
    /// The primary backpressure control on the completion service.
    pub batch_size: usize,

    /// Total attempts allowed per response, first attempt included.
    pub retry_limit: u32,

    /// Extractions in flight at once within a batch.
    ///
    /// Default: 1 (strictly sequential, ascending id order).
    pub concurrency: usize,

    /// Delay before a retry pass resubmits failed units.
    pub retry_backoff: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            retry_limit: 3,
            concurrency: 1,
            retry_backoff: Duration::from_secs(2),
        }
    }
}

impl QueueConfig {
    /// Create a config; zero values are raised to one.
    pub fn new(batch_size: usize, retry_limit: u32) -> Self {
        Self {
            batch_size: batch_size.max(1),
            retry_limit: retry_limit.max(1),
            ..Default::default()
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }
}
