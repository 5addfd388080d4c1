//! AI Answer-Engine Response Analysis
//!
//! Turns raw answers from AI answer engines (ChatGPT, Perplexity, Gemini, ...)
//! into structured competitive-intelligence records for one company.
//!
//! # Design Philosophy
//!
//! - The model reports what it saw; citation classification is deterministic
//! - Persisted records are the only checkpoint
//! - One bad response never aborts a range
//! - Library handles mechanics, the binary handles wiring
//!
//! # Usage
//!
//! ```rust,ignore
//! use citation_analysis::{AnalysisQueue, MemoryStore, QueueConfig};
//! use citation_analysis::testing::MockCompletion;
//!
//! let store = Arc::new(MemoryStore::new());
//! let queue = AnalysisQueue::new(store, MockCompletion::new(), QueueConfig::default());
//!
//! let stats = queue.process_queue(100, 250, 7).await?;
//! let retried = queue.retry_failed().await?;
//! ```
//!
//! # Modules
//!
//! - [`classifier`] - Citation URL to OWNED / EARNED / UGC / COMPETITOR
//! - [`pipeline`] - Prompt loading, completion call, payload validation
//! - [`queue`] - Batch orchestration with bounded retry
//! - [`driver`] - Request-level entrypoint (range or single item)
//! - [`stores`] - Storage implementations (MemoryStore, PostgresStore)
//! - [`reporting`] - Aggregates over analysed responses
//! - [`testing`] - Mock implementations for testing

pub mod classifier;
pub mod driver;
pub mod error;
pub mod pipeline;
pub mod queue;
pub mod reporting;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

#[cfg(feature = "openai")]
pub mod ai;

// Re-export core types at crate root
pub use error::{
    CompletionError, ExtractionFailure, FailureKind, QueueError, QueueResult, StoreError,
    StoreResult, ValidationError,
};
pub use traits::{
    completion::{CompletionService, RateLimitedCompletion},
    store::{AnalysisSink, AnalysisStore, PromptStore, ResponseSource},
};
pub use types::{
    AnalysisRecord, ClassifiedCitation, CompanyId, CompanyProfile, ExtractorConfig,
    FailureAudit, FeaturePresence, IdRange, Prompt, QueueConfig, Response, ResponseId,
    SolutionAnalysis, SourceType,
};

pub use classifier::{classify, DomainTables, SourceClassifier};
pub use driver::{DriverOptions, DriverRequest, DriverResponse};
pub use pipeline::{ExtractionResult, Extractor};
pub use queue::{AnalysisQueue, QueueStats, SingleOutcome, WorkStatus, WorkUnit};
pub use reporting::{daily_sentiment, summarize, summarize_by_engine, AnalysisSummary, DailySentiment};
pub use stores::MemoryStore;

#[cfg(feature = "postgres")]
pub use stores::PostgresStore;

#[cfg(feature = "openai")]
pub use ai::OpenAICompletion;
