//! In-memory storage implementation for testing and development.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::traits::store::{AnalysisSink, PromptStore, ResponseSource};
use crate::types::{
    AnalysisRecord, CompanyId, CompanyProfile, FailureAudit, IdRange, Prompt, Response, ResponseId,
};

/// In-memory storage for responses, companies, prompts and analysis output.
///
/// Useful for testing and development. Not suitable for production
/// as data is lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    responses: RwLock<BTreeMap<ResponseId, Response>>,
    companies: RwLock<HashMap<CompanyId, CompanyProfile>>,
    prompts: RwLock<Vec<Prompt>>,
    records: RwLock<BTreeMap<ResponseId, AnalysisRecord>>,
    failures: RwLock<Vec<FailureAudit>>,

    /// Response ids whose record writes are rejected
    failing_writes: RwLock<HashSet<ResponseId>>,

    /// Total successful upserts, including overwrites
    upserts: AtomicUsize,
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_response(&self, response: Response) {
        self.responses.write().await.insert(response.id, response);
    }

    pub async fn insert_company(&self, company: CompanyProfile) {
        self.companies.write().await.insert(company.id, company);
    }

    /// Add a prompt. A prompt with the same name and version is replaced.
    pub async fn insert_prompt(&self, prompt: Prompt) {
        let mut prompts = self.prompts.write().await;
        prompts.retain(|p| !(p.name == prompt.name && p.version == prompt.version));
        prompts.push(prompt);
    }

    /// Remove every version of a prompt.
    pub async fn remove_prompt(&self, name: &str) {
        self.prompts.write().await.retain(|p| p.name != name);
    }

    /// Reject record writes for `response_id` until cleared.
    pub async fn fail_writes_for(&self, response_id: ResponseId) {
        self.failing_writes.write().await.insert(response_id);
    }

    pub async fn clear_failing_writes(&self) {
        self.failing_writes.write().await.clear();
    }

    pub async fn record(&self, response_id: ResponseId) -> Option<AnalysisRecord> {
        self.records.read().await.get(&response_id).cloned()
    }

    /// All stored records, ascending by response id.
    pub async fn records(&self) -> Vec<AnalysisRecord> {
        self.records.read().await.values().cloned().collect()
    }

    pub async fn record_count(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn failures(&self) -> Vec<FailureAudit> {
        self.failures.read().await.clone()
    }

    /// Number of successful record writes, overwrites included.
    pub fn upsert_count(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResponseSource for MemoryStore {
    async fn list_unprocessed_responses(
        &self,
        company_id: CompanyId,
        range: IdRange,
        limit: usize,
    ) -> StoreResult<Vec<Response>> {
        if range.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let responses = self.responses.read().await;
        let records = self.records.read().await;

        Ok(responses
            .range(range.start..=range.end)
            .map(|(_, r)| r)
            .filter(|r| r.company_id == company_id && !records.contains_key(&r.id))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn get_company_profile(
        &self,
        company_id: CompanyId,
    ) -> StoreResult<Option<CompanyProfile>> {
        Ok(self.companies.read().await.get(&company_id).cloned())
    }
}

#[async_trait]
impl AnalysisSink for MemoryStore {
    async fn upsert_analysis_record(&self, record: &AnalysisRecord) -> StoreResult<()> {
        if self.failing_writes.read().await.contains(&record.response_id) {
            return Err(StoreError::Database(format!(
                "write rejected for response {}",
                record.response_id
            )));
        }

        self.records
            .write()
            .await
            .insert(record.response_id, record.clone());
        self.upserts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn record_failure(&self, audit: &FailureAudit) -> StoreResult<()> {
        self.failures.write().await.push(audit.clone());
        Ok(())
    }

    async fn list_analyzed(
        &self,
        company_id: CompanyId,
    ) -> StoreResult<Vec<(Response, AnalysisRecord)>> {
        let responses = self.responses.read().await;
        let records = self.records.read().await;

        Ok(records
            .values()
            .filter_map(|record| {
                responses
                    .get(&record.response_id)
                    .filter(|r| r.company_id == company_id)
                    .map(|r| (r.clone(), record.clone()))
            })
            .collect())
    }
}

#[async_trait]
impl PromptStore for MemoryStore {
    async fn get_prompts_by_name(&self, names: &[&str]) -> StoreResult<Vec<Prompt>> {
        Ok(self
            .prompts
            .read()
            .await
            .iter()
            .filter(|p| names.contains(&p.name.as_str()))
            .cloned()
            .collect())
    }
}
