//! Throttled provider — spaces out calls to a wrapped provider.

use async_trait::async_trait;
use ponder_core::error::ProviderError;
use ponder_core::provider::*;
use std::sync::Arc;
use tracing::info;

use crate::rate_limit::RateLimiter;

/// A provider that waits on a [`RateLimiter`] before every completion.
///
/// Every component that talks to the LLM (the agent loop and the
/// decomposition tool) shares one instance, so the interval holds across
/// all of them.
pub struct ThrottledProvider {
    inner: Arc<dyn Provider>,
    limiter: Arc<RateLimiter>,
}

impl ThrottledProvider {
    pub fn new(inner: Arc<dyn Provider>, limiter: Arc<RateLimiter>) -> Self {
        Self { inner, limiter }
    }
}

#[async_trait]
impl Provider for ThrottledProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let waited = self.limiter.throttle().await;
        if !waited.is_zero() {
            info!(
                provider = %self.inner.name(),
                waited_secs = waited.as_secs_f64(),
                "Waited for rate limit"
            );
        }
        self.inner.complete(request).await
    }
}
