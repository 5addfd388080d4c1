//! Per-response unit of work.

use serde::{Deserialize, Serialize};

use crate::error::FailureKind;
use crate::types::ResponseId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkStatus {
    #[default]
    Pending,
    Processing,
    Succeeded,
    Failed,
}

/// Queue-internal state for one response.
///
/// `pending → processing → {succeeded | failed}`, and `failed → processing`
/// again through a retry pass while attempts remain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkUnit {
    pub response_id: ResponseId,
    pub status: WorkStatus,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub last_failure: Option<FailureKind>,
}

impl WorkUnit {
    pub fn new(response_id: ResponseId) -> Self {
        Self {
            response_id,
            status: WorkStatus::Pending,
            attempts: 0,
            last_error: None,
            last_failure: None,
        }
    }

    /// Move to `Processing` and count the attempt.
    pub fn start(&mut self) {
        self.status = WorkStatus::Processing;
        self.attempts += 1;
    }

    pub fn succeed(&mut self) {
        self.status = WorkStatus::Succeeded;
        self.last_error = None;
        self.last_failure = None;
    }

    pub fn fail(&mut self, kind: FailureKind, error: impl Into<String>) {
        self.status = WorkStatus::Failed;
        self.last_error = Some(error.into());
        self.last_failure = Some(kind);
    }

    /// Failed with no way back: a non-retryable kind, or attempts used up.
    pub fn is_terminal(&self, retry_limit: u32) -> bool {
        self.status == WorkStatus::Failed
            && (self.attempts >= retry_limit
                || !self.last_failure.is_some_and(|kind| kind.is_retryable()))
    }

    /// Whether `start` is a legal transition: a fresh unit, or a failed one
    /// with attempts left.
    pub fn can_start(&self, retry_limit: u32) -> bool {
        match self.status {
            WorkStatus::Pending => true,
            WorkStatus::Failed => self.can_retry(retry_limit),
            WorkStatus::Processing | WorkStatus::Succeeded => false,
        }
    }

    /// Eligible for the next retry pass.
    pub fn can_retry(&self, retry_limit: u32) -> bool {
        self.status == WorkStatus::Failed && !self.is_terminal(retry_limit)
    }
}
