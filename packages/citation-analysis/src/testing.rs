//! Testing utilities including mock implementations.
//!
//! These are useful for testing applications that use the analysis library
//! without making real completion calls.

use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::error::CompletionError;
use crate::pipeline::prompts::default_prompts;
use crate::stores::MemoryStore;
use crate::traits::completion::CompletionService;
use crate::types::{CompanyProfile, ExtractorConfig, Response};

/// A scripted completion service.
///
/// Answers are chosen in this order:
/// 1. the first marker rule whose marker appears in the user prompt
/// 2. the next queued answer
/// 3. the default answer, if one is set
///
/// Otherwise the call fails with an API error. Clones share state, so a test
/// can keep a handle after moving the mock into a queue.
#[derive(Clone, Default)]
pub struct MockCompletion {
    queued: Arc<Mutex<VecDeque<Result<String, CompletionError>>>>,

    /// (marker, answer) pairs, not consumed
    rules: Arc<Mutex<Vec<(String, Result<String, CompletionError>)>>>,

    default: Option<String>,

    /// Artificial latency per call
    delay: Option<Duration>,

    /// Call tracking for assertions
    calls: Arc<Mutex<Vec<MockCompletionCall>>>,
}

/// Record of a call made to the mock completion service.
#[derive(Debug, Clone)]
pub struct MockCompletionCall {
    pub system_prompt: String,
    pub user_prompt: String,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every unscripted call with `text`.
    pub fn with_default_text(mut self, text: impl Into<String>) -> Self {
        self.default = Some(text.into());
        self
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Answer `text` whenever the user prompt contains `marker`.
    pub fn with_rule(self, marker: impl Into<String>, text: impl Into<String>) -> Self {
        lock(&self.rules).push((marker.into(), Ok(text.into())));
        self
    }

    /// Fail with `error` whenever the user prompt contains `marker`.
    pub fn with_failure_rule(self, marker: impl Into<String>, error: CompletionError) -> Self {
        lock(&self.rules).push((marker.into(), Err(error)));
        self
    }

    /// Queue a one-shot text answer.
    pub fn push_text(&self, text: impl Into<String>) {
        lock(&self.queued).push_back(Ok(text.into()));
    }

    /// Queue a one-shot failure.
    pub fn push_error(&self, error: CompletionError) {
        lock(&self.queued).push_back(Err(error));
    }

    /// Get all calls made to this mock.
    pub fn calls(&self) -> Vec<MockCompletionCall> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Number of calls whose user prompt contained `marker`.
    pub fn calls_containing(&self, marker: &str) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|c| c.user_prompt.contains(marker))
            .count()
    }

    fn answer_for(&self, user_prompt: &str) -> Result<String, CompletionError> {
        if let Some((_, answer)) = lock(&self.rules)
            .iter()
            .find(|(marker, _)| user_prompt.contains(marker.as_str()))
        {
            return answer.clone();
        }

        if let Some(answer) = lock(&self.queued).pop_front() {
            return answer;
        }

        match &self.default {
            Some(text) => Ok(text.clone()),
            None => Err(CompletionError::Api("no scripted completion".into())),
        }
    }
}

#[async_trait]
impl CompletionService for MockCompletion {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, CompletionError> {
        lock(&self.calls).push(MockCompletionCall {
            system_prompt: system_prompt.to_string(),
            user_prompt: user_prompt.to_string(),
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.answer_for(user_prompt)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// A schema-valid completion payload.
pub fn analysis_payload(company_mentioned: bool, ranking_position: Option<i64>) -> String {
    json!({
        "companyMentioned": company_mentioned,
        "mentionedCompanies": if company_mentioned { vec!["Acme", "Beta"] } else { vec!["Beta"] },
        "rankList": ranking_position.map(|_| "1. Acme\n2. Beta"),
        "rankingPosition": ranking_position,
        "sentimentScore": if company_mentioned { Some(0.5) } else { None },
    })
    .to_string()
}

/// Builder for a seeded [`MemoryStore`].
pub struct TestScenario {
    company: CompanyProfile,
    responses: Vec<Response>,
    with_prompts: bool,
}

impl TestScenario {
    /// Company 1, "Acme", competing with "Beta", default prompts seeded.
    pub fn new() -> Self {
        Self {
            company: CompanyProfile::new(1, "Acme").with_competitors(["Beta"]),
            responses: Vec::new(),
            with_prompts: true,
        }
    }

    pub fn company(&self) -> &CompanyProfile {
        &self.company
    }

    /// Add responses for the scenario company, text `response {id}`.
    pub fn with_responses(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
        let company_id = self.company.id;
        self.responses.extend(
            ids.into_iter()
                .map(|id| Response::new(id, company_id, "chatgpt", format!("response {id}"))),
        );
        self
    }

    pub fn with_response(mut self, response: Response) -> Self {
        self.responses.push(response);
        self
    }

    pub fn without_prompts(mut self) -> Self {
        self.with_prompts = false;
        self
    }

    pub async fn build(self) -> Arc<MemoryStore> {
        let store = MemoryStore::new();
        store.insert_company(self.company).await;
        for response in self.responses {
            store.insert_response(response).await;
        }
        if self.with_prompts {
            let config = ExtractorConfig::default();
            let [system, user] = config.prompt_names();
            for prompt in default_prompts(system, user) {
                store.insert_prompt(prompt).await;
            }
        }
        Arc::new(store)
    }
}

impl Default for TestScenario {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rules_take_precedence_over_queue() {
        let mock = MockCompletion::new()
            .with_rule("response 2", "ruled")
            .with_default_text("default");
        mock.push_text("queued");

        assert_eq!(mock.complete("s", "response 2").await.unwrap(), "ruled");
        assert_eq!(mock.complete("s", "response 1").await.unwrap(), "queued");
        assert_eq!(mock.complete("s", "response 1").await.unwrap(), "default");
        assert_eq!(mock.call_count(), 3);
        assert_eq!(mock.calls_containing("response 2"), 1);
    }

    #[tokio::test]
    async fn test_unscripted_call_fails() {
        let mock = MockCompletion::new();
        assert!(matches!(
            mock.complete("s", "u").await,
            Err(CompletionError::Api(_))
        ));
    }

    #[test]
    fn test_analysis_payload_is_valid() {
        let payload = crate::pipeline::parse_analysis_payload(&analysis_payload(true, Some(1)))
            .unwrap();
        assert!(payload.company_mentioned);
        assert_eq!(payload.ranking_position, Some(1));

        let payload = crate::pipeline::parse_analysis_payload(&analysis_payload(false, None))
            .unwrap();
        assert_eq!(payload.rank_list, None);
    }
}
