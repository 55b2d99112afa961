//! The ReAct question-answering loop for Ponder.
//!
//! For each question the agent:
//!
//! 1. **Composes** a prompt (history + system template + transcript)
//! 2. **Sends** it to the LLM, stopping at `Observation:`
//! 3. **Parses** the reply into a final answer, a tool action, or a thought
//! 4. **If an action**: runs the tool, appends the observation, loops to 2
//! 5. **If a final answer**: records the exchange in history and returns
//!
//! The loop is capped at a configurable number of model calls.

pub mod prompt;
pub mod react;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use prompt::{DEFAULT_TEMPLATE, PromptComposer};
pub use react::{ReactAgent, ReactAnswer};
