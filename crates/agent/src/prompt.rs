//! Prompt composition.
//!
//! Every reasoning call sends the same shape of request:
//!
//! ```text
//! [history turns...]            (when history injection is on)
//! system: Knowledge cutoff: ... Current date: ...
//!         <template with ${tools} replaced by the tool list>
//! user:   <the running transcript>
//! ```

use chrono::NaiveDate;
use ponder_core::error::Error;
use ponder_core::message::Message;
use ponder_core::tool::ToolRegistry;
use std::path::Path;
use tracing::{debug, warn};

/// Placeholder replaced by [`ToolRegistry::describe_all`].
pub const TOOLS_PLACEHOLDER: &str = "${tools}";

/// Knowledge-cutoff note used when none is configured.
pub const DEFAULT_KNOWLEDGE_CUTOFF: &str = "2021-09-01";

/// Built-in instructions defining the marker vocabulary.
pub const DEFAULT_TEMPLATE: &str = "\
Answer the following questions as best you can. You have access to the following tools:

${tools}

Use the following format:

Question: the input question you must answer
Thought: you should always think about what to do
Action: the action to take, should be exactly one of the tool names listed above
Action Input: the input to the action
Observation: the result of the action
... (this Thought/Action/Action Input/Observation can repeat N times)
Thought: I now know the final answer
Final Answer: the final answer to the original input question

Only write one Action per reply and stop after Action Input. Never write the Observation yourself.
If you can answer without a tool, go straight to Final Answer.

Begin!";

/// Builds the message list for each reasoning call.
#[derive(Debug, Clone)]
pub struct PromptComposer {
    template: String,
    knowledge_cutoff: String,
}

impl Default for PromptComposer {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATE, DEFAULT_KNOWLEDGE_CUTOFF)
    }
}

impl PromptComposer {
    pub fn new(template: impl Into<String>, knowledge_cutoff: impl Into<String>) -> Self {
        let template = template.into();
        if !template.contains(TOOLS_PLACEHOLDER) {
            warn!("Prompt template has no ${{tools}} placeholder; tools will not be described");
        }
        Self {
            template,
            knowledge_cutoff: knowledge_cutoff.into(),
        }
    }

    /// Load the template from a text file.
    pub fn from_file(path: &Path, knowledge_cutoff: impl Into<String>) -> Result<Self, Error> {
        let template = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("Failed to read prompt template {}: {e}", path.display()),
        })?;
        debug!(path = %path.display(), "Loaded prompt template");
        Ok(Self::new(template, knowledge_cutoff))
    }

    /// The system message: date header plus the template with tool
    /// descriptions substituted in.
    pub fn system_prompt(&self, tools: &ToolRegistry, today: NaiveDate) -> String {
        format!(
            "Knowledge cutoff: {} Current date: {}.\n{}",
            self.knowledge_cutoff,
            today.format("%Y-%m-%d"),
            self.template
                .replace(TOOLS_PLACEHOLDER, &tools.describe_all())
        )
    }

    /// Full message list for one reasoning call.
    pub fn compose(
        &self,
        tools: &ToolRegistry,
        history: Vec<Message>,
        transcript: &str,
        today: NaiveDate,
    ) -> Vec<Message> {
        let mut messages = history;
        messages.push(Message::system(self.system_prompt(tools, today)));
        messages.push(Message::user(transcript));
        messages
    }
}
