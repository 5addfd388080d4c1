//! Analysis pipeline.
//!
//! - Prompt templates and placeholder filling
//! - Payload parsing with strict shape validation
//! - The [`Extractor`], which runs one response through the completion
//!   service and the source classifier

pub mod extractor;
pub mod payload;
pub mod prompts;

pub use extractor::{ExtractionResult, Extractor, PromptPair};
pub use payload::{parse_analysis_payload, validate_payload, AnalysisPayload};
pub use prompts::{
    default_prompts, format_user_prompt, ANALYSIS_SYSTEM_PROMPT, ANALYSIS_USER_PROMPT,
};
