//! ReAct pattern — Thought → Action → Observation loop.
//!
//! The agent keeps a plain-text transcript for one question:
//!
//! ```text
//! Question: What is 12 * 8?
//! Thought:
//! I should multiply.
//! Action: Calculator
//! Action Input: 12 * 8
//! Observation: 96
//! Thought:
//! ```
//!
//! Each iteration sends the transcript to the model, parses the reply into a
//! [`Step`], and either runs the named tool and appends its observation,
//! appends a bare thought, or finishes. The loop ends on a final answer, on
//! a provider or fatal tool error, or after `max_iterations` model calls.

use chrono::{Local, NaiveDate};
use ponder_core::error::{Error, HistoryError};
use ponder_core::parser::{self, ACTION, ACTION_INPUT, OBSERVATION, Step};
use ponder_core::provider::{Provider, ProviderRequest, Usage};
use ponder_core::tool::ToolRegistry;
use ponder_memory::{ConversationHistory, estimate_tokens, proportional_tokens};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::prompt::PromptComposer;

/// Answer returned when the iteration cap is hit before any reasoning text.
pub const NO_ANSWER_NOTICE: &str =
    "I reached the maximum number of reasoning steps without finding a final answer.";

/// Default cap on model calls per question.
pub const DEFAULT_MAX_ITERATIONS: u32 = 10;

/// The ReAct agent.
pub struct ReactAgent {
    /// LLM provider.
    provider: Arc<dyn Provider>,
    /// Model name.
    model: String,
    /// Temperature.
    temperature: f32,
    /// Tool registry.
    tools: Arc<ToolRegistry>,
    /// System prompt builder.
    composer: PromptComposer,
    /// Maximum reasoning iterations.
    max_iterations: u32,
    /// Whether earlier exchanges are sent with every call.
    inject_history: bool,
    /// Fixed "current date" for the prompt; today when unset.
    date: Option<NaiveDate>,
}

/// The result of answering one question.
#[derive(Debug, Clone, PartialEq)]
pub struct ReactAnswer {
    /// The final answer text (or best partial answer).
    pub answer: String,
    /// Tools invoked, in call order.
    pub tools_used: Vec<String>,
    /// Number of model calls made.
    pub iterations: u32,
    /// False when the iteration cap was hit before a final answer.
    pub complete: bool,
}

impl ReactAnswer {
    /// `assistant[Tool1][Tool2]: answer`
    pub fn formatted(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ReactAnswer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("assistant")?;
        for tool in &self.tools_used {
            write!(f, "[{tool}]")?;
        }
        write!(f, ": {}", self.answer)
    }
}

impl ReactAgent {
    /// Create a new ReAct agent.
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        temperature: f32,
        tools: Arc<ToolRegistry>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature,
            tools,
            composer: PromptComposer::default(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            inject_history: true,
            date: None,
        }
    }

    /// Create an agent from the loaded configuration.
    pub fn from_config(
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        config: &ponder_config::AppConfig,
        composer: PromptComposer,
    ) -> Self {
        Self::new(provider, config.model.clone(), config.temperature, tools)
            .with_composer(composer)
            .with_max_iterations(config.agent.max_iterations)
            .with_history_injection(config.agent.inject_history)
    }

    /// Set the prompt composer.
    pub fn with_composer(mut self, composer: PromptComposer) -> Self {
        self.composer = composer;
        self
    }

    /// Set the maximum number of model calls per question.
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max.max(1);
        self
    }

    /// Enable or disable sending earlier exchanges with each call.
    pub fn with_history_injection(mut self, enabled: bool) -> Self {
        self.inject_history = enabled;
        self
    }

    /// Pin the date shown in the system prompt.
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Answer one question.
    ///
    /// On a final answer the question and answer are appended to `history`
    /// and the history is trimmed. A capped run returns the best partial
    /// answer with `complete == false` and leaves `history` untouched.
    pub async fn run(
        &self,
        question: &str,
        history: &mut ConversationHistory,
    ) -> Result<ReactAnswer, Error> {
        let question = question.trim();
        if question.is_empty() {
            return Err(HistoryError::InvalidTurn("question is empty".into()).into());
        }

        let today = self.date.unwrap_or_else(|| Local::now().date_naive());
        let mut transcript = format!("Question: {question}\nThought:");
        let mut tools_used: Vec<String> = Vec::new();
        let mut last_thought: Option<String> = None;

        info!(model = %self.model, max_iter = self.max_iterations, "ReAct loop starting");

        for iteration in 1..=self.max_iterations {
            debug!(iteration, "ReAct iteration");

            // ── Build LLM request ──
            let prior = if self.inject_history {
                history.as_messages()
            } else {
                Vec::new()
            };
            let messages = self.composer.compose(&self.tools, prior, &transcript, today);
            let request = ProviderRequest::new(self.model.clone(), messages)
                .with_temperature(self.temperature)
                .with_stop([OBSERVATION]);

            // ── Call LLM ──
            let response = self.provider.complete(request).await?;
            let reply = parser::normalize(&response.content);
            let parsed = parser::parse(&reply, |name| self.tools.contains(name));

            let thought = thought_text(&parsed.text);
            if !thought.is_empty() {
                last_thought = Some(thought);
            }

            match parsed.step {
                Step::FinalAnswer(answer) => {
                    self.finalize(question, &answer, &reply, response.usage, history)?;
                    info!(
                        iterations = iteration,
                        tool_calls = tools_used.len(),
                        "ReAct loop completed"
                    );
                    return Ok(ReactAnswer {
                        answer,
                        tools_used,
                        iterations: iteration,
                        complete: true,
                    });
                }
                Step::Action { tool, input } => {
                    transcript.push('\n');
                    transcript.push_str(&parsed.text);
                    tools_used.push(tool.clone());

                    let observation = match self.tools.execute(&tool, &input).await {
                        Ok(output) => output,
                        Err(e) if e.is_fatal() => {
                            warn!(tool = %tool, error = %e, "Tool failed, aborting question");
                            return Err(e.into());
                        }
                        Err(e) => {
                            debug!(tool = %tool, error = %e, "Tool error reported to model");
                            format!("Error: {e}")
                        }
                    };
                    debug!(tool = %tool, observation = %observation, "Observation");

                    transcript.push_str(&format!("\n{OBSERVATION} {observation}\nThought: "));
                }
                Step::Thought => {
                    if let Some(name) = parser::extract_field(&parsed.text, ACTION) {
                        warn!(tool = %name, "Unknown action, continuing as a thought");
                    }
                    transcript.push('\n');
                    transcript.push_str(&parsed.text);
                }
            }
            transcript = parser::normalize(&transcript);
        }

        warn!("ReAct: max iterations reached ({})", self.max_iterations);

        Ok(ReactAnswer {
            answer: last_thought.unwrap_or_else(|| NO_ANSWER_NOTICE.to_string()),
            tools_used,
            iterations: self.max_iterations,
            complete: false,
        })
    }

    /// Write the finished exchange to history.
    fn finalize(
        &self,
        question: &str,
        answer: &str,
        reply: &str,
        usage: Option<Usage>,
        history: &mut ConversationHistory,
    ) -> Result<(), Error> {
        if answer.is_empty() {
            warn!("Model gave an empty final answer; not recording it in history");
            return Ok(());
        }

        let question_tokens = estimate_tokens(question);
        let answer_tokens = match usage {
            Some(usage) => proportional_tokens(usage.completion_tokens, answer, reply),
            None => estimate_tokens(answer),
        };
        history.record_exchange(question, question_tokens, answer, answer_tokens)?;
        Ok(())
    }
}

/// The reasoning part of a reply: everything but the action lines, with a
/// leading `Thought:` label removed.
fn thought_text(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.starts_with(ACTION) && !line.starts_with(ACTION_INPUT))
        .map(|line| line.strip_prefix("Thought:").unwrap_or(line).trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

// ── Tests ─────────────────────────────────────────────────────────────────
