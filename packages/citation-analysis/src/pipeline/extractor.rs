//! The Analysis Extractor: one raw response in, one structured judgement out.

use std::sync::Arc;

use tracing::{debug, warn};

use super::payload::parse_analysis_payload;
use super::prompts::format_user_prompt;
use crate::classifier::SourceClassifier;
use crate::error::{CompletionError, ExtractionFailure};
use crate::traits::completion::CompletionService;
use crate::traits::store::PromptStore;
use crate::types::{AnalysisRecord, CompanyProfile, ExtractorConfig, Prompt, Response};

/// Outcome of one extraction call.
pub type ExtractionResult = Result<AnalysisRecord, ExtractionFailure>;

/// The active system/user prompt pair.
#[derive(Debug, Clone)]
pub struct PromptPair {
    pub system: Prompt,
    pub user: Prompt,
}

/// Turns a [`Response`] into an [`AnalysisRecord`].
///
/// Prompts are fetched on every call so edits in the store take effect
/// without a restart.
pub struct Extractor<P: PromptStore + ?Sized, C: CompletionService> {
    prompts: Arc<P>,
    completion: C,
    classifier: SourceClassifier,
    config: ExtractorConfig,
}

impl<P: PromptStore + ?Sized, C: CompletionService> Extractor<P, C> {
    pub fn new(prompts: Arc<P>, completion: C) -> Self {
        Self {
            prompts,
            completion,
            classifier: SourceClassifier::default(),
            config: ExtractorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ExtractorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_classifier(mut self, classifier: SourceClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    pub fn completion(&self) -> &C {
        &self.completion
    }

    /// Fetch the active prompt pair.
    ///
    /// Missing or inactive prompts are reported together in a single
    /// `Configuration` failure. When a name has several active versions the
    /// highest wins.
    pub async fn load_prompts(&self) -> Result<PromptPair, ExtractionFailure> {
        let names = self.config.prompt_names();
        let fetched = self.prompts.get_prompts_by_name(&names).await?;

        let pick = |name: &str| {
            fetched
                .iter()
                .filter(|p| p.name == name && p.is_active)
                .max_by_key(|p| p.version)
                .cloned()
        };

        match (pick(names[0]), pick(names[1])) {
            (Some(system), Some(user)) => Ok(PromptPair { system, user }),
            (system, user) => {
                let mut missing = Vec::new();
                if system.is_none() {
                    missing.push(names[0].to_string());
                }
                if user.is_none() {
                    missing.push(names[1].to_string());
                }
                Err(ExtractionFailure::Configuration { missing })
            }
        }
    }

    /// Analyse one response for `company`.
    pub async fn extract(&self, response: &Response, company: &CompanyProfile) -> ExtractionResult {
        let prompts = self.load_prompts().await?;
        self.extract_with(&prompts, response, company).await
    }

    /// Analyse one response with an already-loaded prompt pair.
    pub async fn extract_with(
        &self,
        prompts: &PromptPair,
        response: &Response,
        company: &CompanyProfile,
    ) -> ExtractionResult {
        let user_prompt = format_user_prompt(
            &prompts.user.content,
            &response.text,
            &company.name,
            &company.competitors,
        );

        let raw = self.complete(&prompts.system.content, &user_prompt).await?;

        let payload = parse_analysis_payload(&raw).map_err(|e| {
            warn!(response_id = response.id, error = %e, "Completion payload failed validation");
            e
        })?;

        let citations =
            self.classifier
                .classify_all(&response.citations, &company.name, &company.competitors);

        debug!(
            response_id = response.id,
            company_mentioned = payload.company_mentioned,
            ranking_position = ?payload.ranking_position,
            citations = citations.len(),
            "Extracted analysis"
        );

        Ok(payload.into_record(response.id, citations))
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String, CompletionError> {
        let timeout = self.config.timeout;
        match tokio::time::timeout(timeout, self.completion.complete(system, user)).await {
            Ok(Ok(text)) if text.trim().is_empty() => Err(CompletionError::EmptyResponse),
            Ok(result) => result,
            Err(_) => Err(CompletionError::Timeout {
                seconds: timeout.as_secs(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FailureKind, ValidationError};
    use crate::stores::MemoryStore;
    use crate::traits::completion::MockCompletionService;
    use crate::types::{FeaturePresence, SourceType};
    use std::time::Duration;

    const PAYLOAD: &str = r#"{
        "companyMentioned": true,
        "mentionedCompanies": ["Beta", "Acme"],
        "rankList": "1. Beta\n2. Acme",
        "rankingPosition": 2,
        "sentimentScore": 0.4,
        "solutionAnalysis": {"hasFeature": "YES"}
    }"#;

    async fn store_with_prompts() -> Arc<MemoryStore> {
        let store = MemoryStore::new();
        store.insert_prompt(Prompt::new("analysis_system", "SYSTEM")).await;
        store
            .insert_prompt(Prompt::new(
                "analysis_user",
                "Company={company_name}\nCompetitors={competitors}\nText={response_text}",
            ))
            .await;
        Arc::new(store)
    }

    fn acme() -> CompanyProfile {
        CompanyProfile::new(1, "Acme").with_competitors(["Beta"])
    }

    fn response() -> Response {
        Response::new(7, 1, "chatgpt", "Best CRMs: Beta, then Acme.")
            .with_citations(["https://acme.com/blog", "https://reddit.com/r/crm", "https://beta.io"])
    }

    #[tokio::test]
    async fn test_extract_mirrors_payload_and_classifies() {
        let mut mock = MockCompletionService::new();
        mock.expect_complete()
            .withf(|system, user| {
                system.starts_with("SYSTEM")
                    && user.contains("Company=Acme")
                    && user.contains("Competitors=Beta")
                    && user.contains("Text=Best CRMs: Beta, then Acme.")
            })
            .times(1)
            .returning(|_, _| Ok(PAYLOAD.to_string()));

        let extractor = Extractor::new(store_with_prompts().await, mock);
        let record = extractor.extract(&response(), &acme()).await.unwrap();

        assert_eq!(record.response_id, 7);
        assert!(record.company_mentioned);
        assert_eq!(record.mentioned_companies, vec!["Beta", "Acme"]);
        assert_eq!(record.rank_list.as_deref(), Some("1. Beta\n2. Acme"));
        assert_eq!(record.ranking_position, Some(2));
        assert_eq!(record.sentiment_score, Some(0.4));
        assert_eq!(
            record.solution_analysis.map(|s| s.has_feature),
            Some(FeaturePresence::Yes)
        );

        let types: Vec<_> = record.classified_citations.iter().map(|c| c.source_type).collect();
        assert_eq!(
            types,
            vec![SourceType::Owned, SourceType::Ugc, SourceType::Competitor]
        );
    }

    #[tokio::test]
    async fn test_missing_prompt_is_configuration_failure() {
        let store = MemoryStore::new();
        store.insert_prompt(Prompt::new("analysis_system", "SYSTEM")).await;
        store
            .insert_prompt(Prompt::new("analysis_user", "{response_text}").inactive())
            .await;

        let mut mock = MockCompletionService::new();
        mock.expect_complete().never();

        let extractor = Extractor::new(Arc::new(store), mock);
        let err = extractor.extract(&response(), &acme()).await.unwrap_err();

        assert_eq!(err.kind(), FailureKind::Configuration);
        match err {
            ExtractionFailure::Configuration { missing } => {
                assert_eq!(missing, vec!["analysis_user".to_string()])
            }
            other => panic!("unexpected failure: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_highest_active_version_wins() {
        let store = MemoryStore::new();
        store.insert_prompt(Prompt::new("analysis_system", "OLD").with_version(1)).await;
        store.insert_prompt(Prompt::new("analysis_system", "NEW").with_version(2)).await;
        store
            .insert_prompt(Prompt::new("analysis_system", "DRAFT").with_version(3).inactive())
            .await;
        store.insert_prompt(Prompt::new("analysis_user", "{response_text}")).await;

        let mock = MockCompletionService::new();
        let extractor = Extractor::new(Arc::new(store), mock);
        let pair = extractor.load_prompts().await.unwrap();
        assert_eq!(pair.system.content, "NEW");
    }

    #[tokio::test]
    async fn test_upstream_error_is_upstream_failure() {
        let mut mock = MockCompletionService::new();
        mock.expect_complete()
            .returning(|_, _| Err(CompletionError::Transport("connection reset".into())));

        let extractor = Extractor::new(store_with_prompts().await, mock);
        let err = extractor.extract(&response(), &acme()).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Upstream);
    }

    #[tokio::test]
    async fn test_blank_completion_is_upstream_failure() {
        let mut mock = MockCompletionService::new();
        mock.expect_complete().returning(|_, _| Ok("   ".to_string()));

        let extractor = Extractor::new(store_with_prompts().await, mock);
        let err = extractor.extract(&response(), &acme()).await.unwrap_err();
        assert!(matches!(
            err,
            ExtractionFailure::Upstream(CompletionError::EmptyResponse)
        ));
    }

    #[tokio::test]
    async fn test_malformed_payload_is_validation_failure() {
        let mut mock = MockCompletionService::new();
        mock.expect_complete().returning(|_, _| {
            Ok(r#"{"companyMentioned": true, "mentionedCompanies": [], "rankList": null, "rankingPosition": "2"}"#.to_string())
        });

        let extractor = Extractor::new(store_with_prompts().await, mock);
        let err = extractor.extract(&response(), &acme()).await.unwrap_err();
        assert!(matches!(
            err,
            ExtractionFailure::Validation(ValidationError::WrongType {
                field: "rankingPosition",
                ..
            })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_maps_to_upstream() {
        let store = store_with_prompts().await;
        let slow = crate::testing::MockCompletion::new().with_delay(Duration::from_secs(120));
        slow.push_text(PAYLOAD);

        let extractor = Extractor::new(store, slow)
            .with_config(ExtractorConfig::default().with_timeout(Duration::from_secs(5)));
        let err = extractor.extract(&response(), &acme()).await.unwrap_err();

        assert!(matches!(
            err,
            ExtractionFailure::Upstream(CompletionError::Timeout { seconds: 5 })
        ));
    }
}
