//! Aggregate queue statistics.

use serde::{Deserialize, Serialize};

use super::work_unit::{WorkStatus, WorkUnit};

/// Counts over a set of work units.
///
/// `failed` includes the units counted in `permanently_failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub pending: usize,
    pub in_flight: usize,
    pub permanently_failed: usize,
}

impl QueueStats {
    pub fn from_units<'a>(units: impl IntoIterator<Item = &'a WorkUnit>, retry_limit: u32) -> Self {
        units.into_iter().fold(Self::default(), |mut stats, unit| {
            stats.total += 1;
            match unit.status {
                WorkStatus::Pending => stats.pending += 1,
                WorkStatus::Processing => stats.in_flight += 1,
                WorkStatus::Succeeded => stats.succeeded += 1,
                WorkStatus::Failed => {
                    stats.failed += 1;
                    if unit.is_terminal(retry_limit) {
                        stats.permanently_failed += 1;
                    }
                }
            }
            stats
        })
    }

    /// Failed units still eligible for a retry pass.
    pub fn retryable(&self) -> usize {
        self.failed - self.permanently_failed
    }
}
