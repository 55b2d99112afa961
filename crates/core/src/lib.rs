//! # Ponder Core
//!
//! Domain types, traits, and error definitions for the Ponder agent.
//! This crate has **no I/O** — it defines the domain model that the
//! provider, memory, tool and agent crates implement against.
//!
//! ## Design Philosophy
//!
//! Every seam the agent loop talks through is a trait here:
//! - [`Provider`] — the LLM completion service
//! - [`Tool`] — a named capability the model can invoke by text
//!
//! The reply parser lives here too: it is pure text processing shared by
//! the agent loop and tools that post-process model output.
//!
//! Implementations live in their respective crates, so tests can swap in
//! scripted providers and stub tools.

pub mod error;
pub mod message;
pub mod parser;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, HistoryError, ProviderError, Result, ToolError};
pub use message::{ConversationTurn, Message, Role};
pub use parser::{ParsedReply, Step};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
pub use tool::{Tool, ToolRegistry};
