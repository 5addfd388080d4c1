//! The batch queue.
//!
//! ```text
//! process_queue(start, end, company)
//!     │
//!     ├─► preflight prompts (abort only if none are usable)
//!     ├─► page unprocessed ids, batch_size at a time, ascending
//!     │       └─► per unit: extract ─► upsert record ─► succeeded | failed
//!     └─► stats for the units this call started
//!
//! retry_failed()
//!     └─► backoff ─► re-run failed units with attempts < retry_limit
//! ```
//!
//! Persisted record existence is the checkpoint: an interrupted range can be
//! re-run and only unprocessed responses are fetched again.

use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, instrument, warn, Instrument};

use super::stats::QueueStats;
use super::work_unit::{WorkStatus, WorkUnit};
use crate::classifier::SourceClassifier;
use crate::error::{ExtractionFailure, QueueError, QueueResult, StoreError};
use crate::pipeline::Extractor;
use crate::traits::completion::CompletionService;
use crate::traits::store::AnalysisStore;
use crate::types::{
    AnalysisRecord, CompanyId, CompanyProfile, ExtractorConfig, FailureAudit, IdRange,
    QueueConfig, Response, ResponseId,
};

/// Result of single-item mode.
#[derive(Debug, Clone, PartialEq)]
pub struct SingleOutcome {
    pub stats: QueueStats,
    /// Set when the response was analysed by this call
    pub record: Option<AnalysisRecord>,
}

struct TrackedUnit {
    unit: WorkUnit,
    response: Response,
    company: Arc<CompanyProfile>,
    /// Held by a running pass; other passes must not touch the unit
    claimed: bool,
}

/// Batch orchestrator over one store and one completion service.
///
/// Two queues must not be pointed at overlapping id ranges at the same time.
pub struct AnalysisQueue<S: AnalysisStore, C: CompletionService> {
    store: Arc<S>,
    extractor: Extractor<S, C>,
    config: QueueConfig,
    units: RwLock<BTreeMap<ResponseId, TrackedUnit>>,
    cancel: CancellationToken,
}

impl<S: AnalysisStore, C: CompletionService> AnalysisQueue<S, C> {
    pub fn new(store: Arc<S>, completion: C, config: QueueConfig) -> Self {
        Self {
            extractor: Extractor::new(Arc::clone(&store), completion),
            store,
            config,
            units: RwLock::new(BTreeMap::new()),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_extractor_config(mut self, config: ExtractorConfig) -> Self {
        self.extractor = self.extractor.with_config(config);
        self
    }

    pub fn with_classifier(mut self, classifier: SourceClassifier) -> Self {
        self.extractor = self.extractor.with_classifier(classifier);
        self
    }

    /// Stop starting new units once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    pub fn extractor(&self) -> &Extractor<S, C> {
        &self.extractor
    }

    /// Analyse every unprocessed response of `company_id` with an id in
    /// `start..=end`.
    ///
    /// Returns stats for the units started by this call. Per-item failures
    /// are recorded on their units and never abort the range.
    #[instrument(skip(self), fields(batch_size = self.config.batch_size))]
    pub async fn process_queue(
        &self,
        start: ResponseId,
        end: ResponseId,
        company_id: CompanyId,
    ) -> QueueResult<QueueStats> {
        let (stats, _) = self.process_range(IdRange::new(start, end), company_id).await?;
        Ok(stats)
    }

    /// Single-item mode: analyse one response if it is still unprocessed.
    #[instrument(skip(self))]
    pub async fn process_single(
        &self,
        response_id: ResponseId,
        company_id: CompanyId,
    ) -> QueueResult<SingleOutcome> {
        let (stats, mut records) = self
            .process_range(IdRange::single(response_id), company_id)
            .await?;

        Ok(SingleOutcome {
            stats,
            record: records.pop(),
        })
    }

    /// Re-run every failed unit that still has attempts left.
    ///
    /// Waits `retry_backoff` first. Returns stats for the units resubmitted.
    #[instrument(skip(self))]
    pub async fn retry_failed(&self) -> QueueResult<QueueStats> {
        let (stats, _) = self.retry_failed_with_records().await?;
        Ok(stats)
    }

    /// Like [`retry_failed`](Self::retry_failed), also returning the records
    /// written by the pass.
    pub async fn retry_failed_with_records(
        &self,
    ) -> QueueResult<(QueueStats, Vec<AnalysisRecord>)> {
        let ids = self.claim_retryable().await;
        if ids.is_empty() {
            debug!("No failed units eligible for retry");
            return Ok((QueueStats::default(), Vec::new()));
        }

        let outcome = self.run_retry_pass(&ids).await;
        self.release(&ids).await;
        outcome
    }

    async fn run_retry_pass(
        &self,
        ids: &[ResponseId],
    ) -> QueueResult<(QueueStats, Vec<AnalysisRecord>)> {
        if !self.config.retry_backoff.is_zero() {
            debug!(
                backoff_ms = self.config.retry_backoff.as_millis() as u64,
                "Backing off before retry pass"
            );
            tokio::select! {
                _ = tokio::time::sleep(self.config.retry_backoff) => {}
                _ = self.cancel.cancelled() => {
                    info!("Retry pass cancelled during backoff");
                    return Ok((QueueStats::default(), Vec::new()));
                }
            }
        }

        self.preflight().await?;

        info!(count = ids.len(), "Retrying failed units");
        let records = self.run_units(ids).await;

        let stats = self.stats_for(ids).await;
        info!(
            succeeded = stats.succeeded,
            failed = stats.failed,
            permanently_failed = stats.permanently_failed,
            "Retry pass complete"
        );
        Ok((stats, records))
    }

    /// Counts over every unit this queue has seen.
    pub async fn get_queue_stats(&self) -> QueueStats {
        let units = self.units.read().await;
        QueueStats::from_units(units.values().map(|t| &t.unit), self.config.retry_limit)
    }

    /// Snapshot of all tracked units, ascending by response id.
    pub async fn work_units(&self) -> Vec<WorkUnit> {
        self.units
            .read()
            .await
            .values()
            .map(|t| t.unit.clone())
            .collect()
    }

    async fn process_range(
        &self,
        range: IdRange,
        company_id: CompanyId,
    ) -> QueueResult<(QueueStats, Vec<AnalysisRecord>)> {
        if range.is_empty() {
            return Err(QueueError::InvalidRange {
                start: range.start,
                end: range.end,
            });
        }

        let company = self
            .store
            .get_company_profile(company_id)
            .await?
            .ok_or(QueueError::CompanyNotFound { company_id })?;
        let company = Arc::new(company);

        self.preflight().await?;

        let mut started = Vec::new();
        let mut records = Vec::new();
        let mut cursor = range.start;
        let mut batch_no = 0usize;

        loop {
            if self.cancel.is_cancelled() {
                info!(cursor, "Queue cancelled, not fetching further batches");
                break;
            }

            let batch = self
                .store
                .list_unprocessed_responses(
                    company_id,
                    IdRange::new(cursor, range.end),
                    self.config.batch_size,
                )
                .await?;

            let Some(last_id) = batch.last().map(|r| r.id) else {
                break;
            };
            batch_no += 1;

            let ids = self.track(batch, &company).await;
            let span = info_span!("batch", batch = batch_no, first = cursor, last = last_id, size = ids.len());
            async {
                debug!("Processing batch");
                records.extend(self.run_units(&ids).await);
            }
            .instrument(span)
            .await;
            self.release(&ids).await;
            started.extend(ids);

            if last_id >= range.end {
                break;
            }
            cursor = last_id + 1;
        }

        let stats = self.stats_for(&started).await;
        info!(
            company_id,
            start = range.start,
            end = range.end,
            batches = batch_no,
            total = stats.total,
            succeeded = stats.succeeded,
            failed = stats.failed,
            "Range processed"
        );
        Ok((stats, records))
    }

    /// Abort when no prompt is usable. A partial set is left to fail per unit.
    async fn preflight(&self) -> QueueResult<()> {
        match self.extractor.load_prompts().await {
            Ok(_) => Ok(()),
            Err(ExtractionFailure::Configuration { missing })
                if missing.len() >= self.extractor.config().prompt_names().len() =>
            {
                error!(missing = ?missing, "No analysis prompts available");
                Err(QueueError::Configuration { missing })
            }
            Err(ExtractionFailure::Configuration { missing }) => {
                warn!(missing = ?missing, "Prompt set incomplete, units will fail");
                Ok(())
            }
            Err(ExtractionFailure::Storage(message)) => {
                Err(QueueError::Store(StoreError::Database(message)))
            }
            Err(other) => {
                warn!(error = %other, "Unexpected preflight failure");
                Ok(())
            }
        }
    }

    /// Register fetched responses as pending units claimed by the caller.
    ///
    /// Units claimed by another running pass, or already past `Pending`, are
    /// left alone. An unclaimed pending unit (left behind by a cancelled
    /// pass) is claimed again. Returns the ids to run, in fetch order.
    async fn track(&self, batch: Vec<Response>, company: &Arc<CompanyProfile>) -> Vec<ResponseId> {
        let mut units = self.units.write().await;
        let mut ids = Vec::with_capacity(batch.len());

        for response in batch {
            let id = response.id;
            if let Some(existing) = units.get(&id) {
                if existing.claimed || existing.unit.status != WorkStatus::Pending {
                    debug!(response_id = id, status = ?existing.unit.status, "Already tracked, skipping");
                    continue;
                }
            }

            units.insert(
                id,
                TrackedUnit {
                    unit: WorkUnit::new(id),
                    response,
                    company: Arc::clone(company),
                    claimed: true,
                },
            );
            ids.push(id);
        }

        ids
    }

    /// Claim every unclaimed failed unit that still has attempts left.
    async fn claim_retryable(&self) -> Vec<ResponseId> {
        let retry_limit = self.config.retry_limit;
        let mut units = self.units.write().await;

        units
            .values_mut()
            .filter(|t| !t.claimed && t.unit.can_retry(retry_limit))
            .map(|t| {
                t.claimed = true;
                t.unit.response_id
            })
            .collect()
    }

    async fn release(&self, ids: &[ResponseId]) {
        let mut units = self.units.write().await;
        for id in ids {
            if let Some(tracked) = units.get_mut(id) {
                tracked.claimed = false;
            }
        }
    }

    /// Run units with at most `concurrency` in flight, starting in id order.
    async fn run_units(&self, ids: &[ResponseId]) -> Vec<AnalysisRecord> {
        stream::iter(ids.iter().copied())
            .map(|id| self.run_unit(id))
            .buffered(self.config.concurrency.max(1))
            .filter_map(|record| async move { record })
            .collect()
            .await
    }

    async fn run_unit(&self, id: ResponseId) -> Option<AnalysisRecord> {
        if self.cancel.is_cancelled() {
            return None;
        }

        let (response, company, attempt) = {
            let mut units = self.units.write().await;
            let tracked = units.get_mut(&id)?;
            if !tracked.unit.can_start(self.config.retry_limit) {
                debug!(response_id = id, status = ?tracked.unit.status, "Unit not startable, skipping");
                return None;
            }
            tracked.unit.start();
            (
                tracked.response.clone(),
                Arc::clone(&tracked.company),
                tracked.unit.attempts,
            )
        };

        let span = info_span!("work_unit", response_id = id, attempt);
        let outcome = async {
            let record = self.extractor.extract(&response, &company).await?;
            self.store.upsert_analysis_record(&record).await?;
            Ok::<_, ExtractionFailure>(record)
        }
        .instrument(span)
        .await;

        match outcome {
            Ok(record) => {
                if let Some(tracked) = self.units.write().await.get_mut(&id) {
                    tracked.unit.succeed();
                }
                debug!(response_id = id, attempt, "Unit succeeded");
                Some(record)
            }
            Err(failure) => {
                self.record_unit_failure(id, company.id, failure).await;
                None
            }
        }
    }

    async fn record_unit_failure(
        &self,
        id: ResponseId,
        company_id: CompanyId,
        failure: ExtractionFailure,
    ) {
        let kind = failure.kind();
        let message = failure.to_string();

        let audit = {
            let mut units = self.units.write().await;
            let Some(tracked) = units.get_mut(&id) else {
                return;
            };
            tracked.unit.fail(kind, message.clone());

            if tracked.unit.is_terminal(self.config.retry_limit) {
                Some(FailureAudit {
                    response_id: id,
                    company_id,
                    attempts: tracked.unit.attempts,
                    kind,
                    error: message.clone(),
                    failed_at: Utc::now(),
                })
            } else {
                None
            }
        };

        match audit {
            Some(audit) => {
                error!(
                    response_id = id,
                    attempts = audit.attempts,
                    kind = %kind,
                    error = %message,
                    "Unit permanently failed"
                );
                if let Err(e) = self.store.record_failure(&audit).await {
                    warn!(response_id = id, error = %e, "Failed to persist failure audit");
                }
            }
            None => {
                warn!(response_id = id, kind = %kind, error = %message, "Unit failed, will retry");
            }
        }
    }

    async fn stats_for(&self, ids: &[ResponseId]) -> QueueStats {
        let units = self.units.read().await;
        QueueStats::from_units(
            ids.iter().filter_map(|id| units.get(id)).map(|t| &t.unit),
            self.config.retry_limit,
        )
    }
}
