//! LLM provider implementations for Ponder.
//!
//! [`OpenAiCompatProvider`] talks to the completion endpoint.
//! [`ThrottledProvider`] wraps any provider so that consecutive calls are
//! spaced by a minimum interval, enforced by a [`RateLimiter`].

pub mod openai_compat;
pub mod rate_limit;
pub mod throttle;

pub use openai_compat::OpenAiCompatProvider;
pub use rate_limit::{
    Clock, FileTimestampStore, MemoryTimestampStore, RateLimiter, SystemClock, TimestampStore,
};
pub use throttle::ThrottledProvider;

use std::sync::Arc;
use std::time::Duration;

use ponder_config::AppConfig;
use ponder_core::provider::Provider;

/// Build the throttled completion provider described by `config`.
///
/// The rate limiter persists its last-call timestamp when
/// `rate_limit.state_path` is set, otherwise it is scoped to this process.
pub fn build_from_config(config: &AppConfig) -> Arc<dyn Provider> {
    let inner = OpenAiCompatProvider::new(
        "openai",
        &config.api_url,
        config.api_key.clone().unwrap_or_default(),
    );

    let store: Box<dyn TimestampStore> = match &config.rate_limit.state_path {
        Some(path) => Box::new(FileTimestampStore::new(path.clone())),
        None => Box::new(MemoryTimestampStore::new()),
    };
    let limiter = RateLimiter::new(
        Duration::from_secs(config.rate_limit.min_interval_secs),
        Arc::new(SystemClock),
        store,
    );

    Arc::new(ThrottledProvider::new(Arc::new(inner), Arc::new(limiter)))
}
