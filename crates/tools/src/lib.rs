//! Built-in tool implementations for Ponder.
//!
//! Three tools are advertised to the model, in this order:
//! - `Expert` — asks the model itself for an answer outline
//! - `Calculator` — restricted arithmetic evaluation
//! - `Search` — one-shot SerpAPI lookup

pub mod calculator;
pub mod decomposition;
pub mod search;

use ponder_config::AppConfig;
use ponder_core::provider::Provider;
use ponder_core::tool::ToolRegistry;
use std::sync::Arc;

pub use calculator::CalculatorTool;
pub use decomposition::DecompositionTool;
pub use search::SearchTool;

/// Create the default tool registry.
///
/// `provider` backs the `Expert` tool; pass the same (throttled) provider
/// the agent uses so its calls count against the same rate limit.
pub fn default_registry(provider: Arc<dyn Provider>, config: &AppConfig) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(DecompositionTool::new(
        provider,
        config.model.clone(),
        config.temperature,
    )));
    registry.register(Box::new(CalculatorTool));
    registry.register(Box::new(SearchTool::from_config(&config.search)));
    registry
}
