//! Token-budgeted conversation history.
//!
//! Completed question/answer exchanges are kept so later questions can see
//! earlier ones. When the summed token counts reach the budget, the oldest
//! turns are dropped until the total falls back under it. Trimming is
//! destructive: evicted turns are gone.

use ponder_core::error::HistoryError;
use ponder_core::message::{ConversationTurn, Message, Role};
use tracing::{debug, info, warn};

use crate::file_store::HistoryFile;
use crate::token::estimate_tokens;

/// Default token budget for retained history.
pub const DEFAULT_TOKEN_BUDGET: u32 = 4096;

/// Ordered, oldest-first record of completed exchanges.
#[derive(Debug)]
pub struct ConversationHistory {
    turns: Vec<ConversationTurn>,
    token_budget: u32,
    file: Option<HistoryFile>,
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_BUDGET)
    }
}

impl ConversationHistory {
    /// An empty in-memory history.
    pub fn new(token_budget: u32) -> Self {
        Self {
            turns: Vec::new(),
            token_budget,
            file: None,
        }
    }

    /// A history backed by a JSONL file.
    ///
    /// Existing turns are loaded (and trimmed to the budget); every
    /// [`record_exchange`](Self::record_exchange) rewrites the file. When
    /// the file exists but cannot be read, the session runs in memory only
    /// and the file is left alone.
    pub fn with_file(token_budget: u32, file: HistoryFile) -> Self {
        let (turns, file) = match file.load() {
            Ok(turns) => (turns, Some(file)),
            Err(e) => {
                warn!(error = %e, "History file unreadable; not persisting this session");
                (Vec::new(), None)
            }
        };
        let turns = turns
            .into_iter()
            .filter(|t| !t.content.trim().is_empty())
            .collect();
        let mut history = Self {
            turns,
            token_budget,
            file,
        };
        history.trim();
        history
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Tokens charged to a turn: its recorded count, or the heuristic
    /// estimate when none was recorded.
    fn turn_tokens(turn: &ConversationTurn) -> u64 {
        turn.tokens
            .map(u64::from)
            .unwrap_or_else(|| u64::from(estimate_tokens(&turn.content)))
    }

    /// Sum of token counts across all retained turns.
    pub fn total_tokens(&self) -> u64 {
        self.turns.iter().map(Self::turn_tokens).sum()
    }

    /// Append one turn at the newest end. Does not trim.
    pub fn append(&mut self, turn: ConversationTurn) -> Result<(), HistoryError> {
        if turn.content.trim().is_empty() {
            return Err(HistoryError::InvalidTurn(format!(
                "{} turn has empty content",
                turn.role
            )));
        }
        self.turns.push(turn);
        Ok(())
    }

    /// Evict oldest turns while the total is at or above the budget.
    ///
    /// Returns the number of turns removed. A no-op when already under
    /// budget.
    pub fn trim(&mut self) -> usize {
        let budget = u64::from(self.token_budget);
        let mut total = self.total_tokens();
        let mut evict = 0;

        while evict < self.turns.len() && total >= budget {
            total -= Self::turn_tokens(&self.turns[evict]);
            evict += 1;
        }

        if evict > 0 {
            self.turns.drain(..evict);
            info!(
                removed = evict,
                remaining_tokens = total,
                budget = self.token_budget,
                "Trimmed conversation history"
            );
        }
        evict
    }

    /// Record a finished exchange: user question then assistant answer,
    /// trim to budget, and persist when file-backed.
    ///
    /// Persistence failures are logged and do not fail the exchange.
    pub fn record_exchange(
        &mut self,
        question: &str,
        question_tokens: u32,
        answer: &str,
        answer_tokens: u32,
    ) -> Result<(), HistoryError> {
        let user = ConversationTurn::new(Role::User, question, Some(question_tokens));
        let assistant = ConversationTurn::new(Role::Assistant, answer, Some(answer_tokens));

        // Validate both before touching the list so a bad answer doesn't
        // leave a dangling question.
        for turn in [&user, &assistant] {
            if turn.content.trim().is_empty() {
                return Err(HistoryError::InvalidTurn(format!(
                    "{} turn has empty content",
                    turn.role
                )));
            }
        }

        self.append(user)?;
        self.append(assistant)?;
        self.trim();

        debug!(
            turns = self.turns.len(),
            total_tokens = self.total_tokens(),
            "Recorded exchange"
        );

        if let Err(e) = self.persist() {
            warn!(error = %e, "Failed to persist conversation history");
        }
        Ok(())
    }

    /// Write the current turns to the backing file, if any.
    pub fn persist(&self) -> Result<(), HistoryError> {
        match &self.file {
            Some(file) => file.save(&self.turns),
            None => Ok(()),
        }
    }

    /// Turns as provider messages, oldest first.
    pub fn as_messages(&self) -> Vec<Message> {
        self.turns.iter().map(ConversationTurn::to_message).collect()
    }
}
