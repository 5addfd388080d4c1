//! Completion service implementations.
//!
//! Requires the `openai` feature.

pub mod openai;

pub use openai::OpenAICompletion;
