//! Completion service trait.
//!
//! The completion service is a black box: system + user prompt in, one text
//! payload out. It guarantees nothing about structure; callers own parsing
//! and validation.

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::error::CompletionError;

/// A text-in/text-out language model endpoint.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Submit a prompt pair and read back a single text payload.
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, CompletionError>;

    /// Short name for logging.
    fn name(&self) -> &str;
}

#[async_trait]
impl<T: CompletionService + ?Sized> CompletionService for Arc<T> {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, CompletionError> {
        (**self).complete(system_prompt, user_prompt).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

type DefaultRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// A completion service wrapper that enforces a request rate.
///
/// The completion service is shared by every work unit; this keeps a worker
/// pool from tripping upstream throttling.
pub struct RateLimitedCompletion<C: CompletionService> {
    inner: C,
    limiter: Arc<DefaultRateLimiter>,
}

impl<C: CompletionService> RateLimitedCompletion<C> {
    /// Wrap `inner` with a sustained limit of `requests_per_second`.
    ///
    /// A zero rate is treated as one request per second.
    pub fn new(inner: C, requests_per_second: u32) -> Self {
        let quota = Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN));
        Self::with_quota(inner, quota)
    }

    /// Wrap with a sustained rate and a burst allowance.
    pub fn with_burst(inner: C, requests_per_second: u32, burst: u32) -> Self {
        let quota = Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN))
            .allow_burst(NonZeroU32::new(burst).unwrap_or(NonZeroU32::MIN));
        Self::with_quota(inner, quota)
    }

    pub fn with_quota(inner: C, quota: Quota) -> Self {
        Self {
            inner,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

#[async_trait]
impl<C: CompletionService> CompletionService for RateLimitedCompletion<C> {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, CompletionError> {
        self.limiter.until_ready().await;
        self.inner.complete(system_prompt, user_prompt).await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
