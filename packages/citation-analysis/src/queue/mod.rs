//! Batch queue / orchestrator.
//!
//! Owns the work-unit lifecycle, the retry policy and aggregate statistics.

pub mod orchestrator;
pub mod stats;
pub mod work_unit;

pub use orchestrator::{AnalysisQueue, SingleOutcome};
pub use stats::QueueStats;
pub use work_unit::{WorkStatus, WorkUnit};
