//! Data types shared by the classifier, extractor and queue.

pub mod analysis;
pub mod config;
pub mod prompt;
pub mod response;

pub use analysis::{
    AnalysisRecord, ClassifiedCitation, FailureAudit, FeaturePresence, SolutionAnalysis,
    SourceType,
};
pub use config::{ExtractorConfig, QueueConfig};
pub use prompt::Prompt;
pub use response::{CompanyId, CompanyProfile, IdRange, Response, ResponseId};
