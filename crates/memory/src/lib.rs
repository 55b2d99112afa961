//! Conversation history for Ponder.
//!
//! Question/answer turns accumulate across questions in one process (or in
//! a JSONL file) and are trimmed from the oldest end to stay under a token
//! budget.

pub mod file_store;
pub mod history;
pub mod token;

pub use file_store::HistoryFile;
pub use history::{ConversationHistory, DEFAULT_TOKEN_BUDGET};
pub use token::{estimate_tokens, proportional_tokens};
