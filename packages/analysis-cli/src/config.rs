use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use citation_analysis::{ExtractorConfig, QueueConfig};

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub analysis_model: String,
    pub batch_size: usize,
    pub retry_limit: u32,
    pub retry_passes: u32,
    pub retry_backoff_ms: u64,
    pub concurrency: usize,
    pub completion_timeout_secs: u64,
    pub completion_rate_per_second: u32,
    pub domain_tables_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            openai_api_key: non_empty(env::var("OPENAI_API_KEY").ok()),
            openai_base_url: non_empty(env::var("OPENAI_BASE_URL").ok()),
            analysis_model: env::var("ANALYSIS_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            batch_size: env::var("BATCH_SIZE")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("BATCH_SIZE must be a valid number")?,
            retry_limit: env::var("RETRY_LIMIT")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .context("RETRY_LIMIT must be a valid number")?,
            retry_passes: env::var("RETRY_PASSES")
                .unwrap_or_else(|_| "1".to_string())
                .parse()
                .context("RETRY_PASSES must be a valid number")?,
            retry_backoff_ms: env::var("RETRY_BACKOFF_MS")
                .unwrap_or_else(|_| "2000".to_string())
                .parse()
                .context("RETRY_BACKOFF_MS must be a valid number")?,
            concurrency: env::var("ANALYSIS_CONCURRENCY")
                .unwrap_or_else(|_| "1".to_string())
                .parse()
                .context("ANALYSIS_CONCURRENCY must be a valid number")?,
            completion_timeout_secs: env::var("COMPLETION_TIMEOUT_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .context("COMPLETION_TIMEOUT_SECS must be a valid number")?,
            completion_rate_per_second: env::var("COMPLETION_RATE_PER_SECOND")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .context("COMPLETION_RATE_PER_SECOND must be a valid number")?,
            domain_tables_path: env::var("DOMAIN_TABLES_PATH").ok().map(PathBuf::from),
        })
    }

    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig::new(self.batch_size, self.retry_limit)
            .with_concurrency(self.concurrency)
            .with_retry_backoff(Duration::from_millis(self.retry_backoff_ms))
    }

    pub fn extractor_config(&self) -> ExtractorConfig {
        ExtractorConfig::default().with_timeout(Duration::from_secs(self.completion_timeout_secs))
    }
}

/// Treat a blank variable (`OPENAI_BASE_URL=` in `.env`) as unset.
fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_values_are_unset() {
        assert_eq!(non_empty(None), None);
        assert_eq!(non_empty(Some(String::new())), None);
        assert_eq!(non_empty(Some("   ".into())), None);
        assert_eq!(
            non_empty(Some(" http://localhost:8080/v1 ".into())),
            Some("http://localhost:8080/v1".to_string())
        );
    }
}
