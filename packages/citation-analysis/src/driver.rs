//! Queue driver entrypoint.
//!
//! Accepts either a range request or a single-item request, runs the initial
//! pass plus the configured number of retry passes, and always returns stats
//! unless the whole run is misconfigured.
//!
//! ```json
//! {"batchSize": 10, "retryLimit": 3, "startId": 100, "endId": 250, "companyId": 7}
//! {"responseId": 101, "companyId": 7}
//! ```

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::classifier::SourceClassifier;
use crate::error::QueueResult;
use crate::queue::{AnalysisQueue, QueueStats};
use crate::traits::completion::CompletionService;
use crate::traits::store::AnalysisStore;
use crate::types::{AnalysisRecord, CompanyId, ExtractorConfig, QueueConfig, ResponseId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DriverRequest {
    #[serde(rename_all = "camelCase")]
    Range {
        #[serde(default)]
        batch_size: Option<usize>,
        #[serde(default)]
        retry_limit: Option<u32>,
        start_id: ResponseId,
        end_id: ResponseId,
        company_id: CompanyId,
    },
    #[serde(rename_all = "camelCase")]
    Single {
        response_id: ResponseId,
        company_id: CompanyId,
    },
}

impl DriverRequest {
    pub fn range(start_id: ResponseId, end_id: ResponseId, company_id: CompanyId) -> Self {
        DriverRequest::Range {
            batch_size: None,
            retry_limit: None,
            start_id,
            end_id,
            company_id,
        }
    }

    pub fn single(response_id: ResponseId, company_id: CompanyId) -> Self {
        DriverRequest::Single {
            response_id,
            company_id,
        }
    }

    /// Queue config with the request's overrides applied.
    fn queue_config(&self, base: &QueueConfig) -> QueueConfig {
        match self {
            DriverRequest::Range {
                batch_size,
                retry_limit,
                ..
            } => QueueConfig {
                batch_size: batch_size.unwrap_or(base.batch_size).max(1),
                retry_limit: retry_limit.unwrap_or(base.retry_limit).max(1),
                ..base.clone()
            },
            DriverRequest::Single { .. } => base.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DriverOptions {
    pub queue: QueueConfig,
    pub extractor: ExtractorConfig,
    pub classifier: SourceClassifier,
    /// Retry passes run after the initial pass
    pub retry_passes: u32,
    pub cancel: CancellationToken,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            queue: QueueConfig::default(),
            extractor: ExtractorConfig::default(),
            classifier: SourceClassifier::default(),
            retry_passes: 1,
            cancel: CancellationToken::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverResponse {
    pub stats: QueueStats,
    /// Single-item mode only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<AnalysisRecord>,
}

/// Run one driver request to completion.
pub async fn run<S, C>(
    store: Arc<S>,
    completion: C,
    request: &DriverRequest,
    options: &DriverOptions,
) -> QueueResult<DriverResponse>
where
    S: AnalysisStore,
    C: CompletionService,
{
    let queue = AnalysisQueue::new(store, completion, request.queue_config(&options.queue))
        .with_extractor_config(options.extractor.clone())
        .with_classifier(options.classifier.clone())
        .with_cancellation(options.cancel.clone());

    let mut record = match request {
        DriverRequest::Range {
            start_id,
            end_id,
            company_id,
            ..
        } => {
            queue.process_queue(*start_id, *end_id, *company_id).await?;
            None
        }
        DriverRequest::Single {
            response_id,
            company_id,
        } => queue.process_single(*response_id, *company_id).await?.record,
    };

    for pass in 1..=options.retry_passes {
        if options.cancel.is_cancelled() || queue.get_queue_stats().await.retryable() == 0 {
            break;
        }

        info!(pass, "Starting retry pass");
        let (_, records) = queue.retry_failed_with_records().await?;
        if record.is_none() && matches!(request, DriverRequest::Single { .. }) {
            record = records.into_iter().next();
        }
    }

    Ok(DriverResponse {
        stats: queue.get_queue_stats().await,
        record,
    })
}
