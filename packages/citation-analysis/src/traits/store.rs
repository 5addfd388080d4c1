//! Storage traits for responses, analysis records and prompts.
//!
//! The storage layer is split into focused traits:
//! - `ResponseSource`: pending responses and company profiles
//! - `AnalysisSink`: analysis records and failure audits
//! - `PromptStore`: prompt templates by name
//! - `AnalysisStore`: composite trait combining all three

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::types::{
    AnalysisRecord, CompanyId, CompanyProfile, FailureAudit, IdRange, Prompt, Response,
};

/// Read side for raw responses.
#[async_trait]
pub trait ResponseSource: Send + Sync {
    /// List responses for `company_id` with ids in `range` that have no
    /// analysis record yet.
    ///
    /// Results are sorted by ascending id and capped at `limit`.
    async fn list_unprocessed_responses(
        &self,
        company_id: CompanyId,
        range: IdRange,
        limit: usize,
    ) -> StoreResult<Vec<Response>>;

    /// Get the name and competitor list for a company.
    async fn get_company_profile(&self, company_id: CompanyId)
        -> StoreResult<Option<CompanyProfile>>;
}

/// Write side for analysis output.
#[async_trait]
pub trait AnalysisSink: Send + Sync {
    /// Insert or overwrite the record for `record.response_id`.
    ///
    /// Last writer wins; records are never merged.
    async fn upsert_analysis_record(&self, record: &AnalysisRecord) -> StoreResult<()>;

    /// Persist an audit row for a permanently failed response.
    async fn record_failure(&self, audit: &FailureAudit) -> StoreResult<()>;

    /// All analysed responses for a company, ascending by response id.
    async fn list_analyzed(
        &self,
        company_id: CompanyId,
    ) -> StoreResult<Vec<(Response, AnalysisRecord)>>;
}

/// Prompt template storage.
#[async_trait]
pub trait PromptStore: Send + Sync {
    /// Fetch prompts by name. Unknown names are simply absent from the result.
    async fn get_prompts_by_name(&self, names: &[&str]) -> StoreResult<Vec<Prompt>>;
}

/// Composite storage trait used by the queue.
pub trait AnalysisStore: ResponseSource + AnalysisSink + PromptStore {}

// Blanket implementation: anything implementing all three traits is an AnalysisStore
impl<T: ResponseSource + AnalysisSink + PromptStore> AnalysisStore for T {}
