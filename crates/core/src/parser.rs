//! Parsing of free-form ReAct replies.
//!
//! The model answers in a loose line-oriented format:
//!
//! ```text
//! Thought: I should multiply these.
//! Action: Calculator
//! Action Input: 12 * 8
//! ```
//!
//! or, once it is done, `Final Answer: 96`. [`parse`] turns one reply into a
//! [`ParsedReply`] in a single pass, so the agent loop only ever matches on
//! a [`Step`].

/// Marker introducing the tool name.
pub const ACTION: &str = "Action:";
/// Marker introducing the tool input.
pub const ACTION_INPUT: &str = "Action Input:";
/// Marker introducing the final answer.
pub const FINAL_ANSWER: &str = "Final Answer:";
/// Marker introducing a tool result.
pub const OBSERVATION: &str = "Observation:";
/// Older spelling of [`OBSERVATION`], still emitted by some prompts.
pub const ACTION_RESULT: &str = "Action Result:";

/// Return the remainder of the first line that begins with `marker`.
///
/// The marker must sit at the very start of the line. Later lines carrying
/// the same marker are not consulted.
pub fn extract_field<'a>(text: &'a str, marker: &str) -> Option<&'a str> {
    text.lines().find_map(|line| line.strip_prefix(marker))
}

/// Drop blank and whitespace-only lines, keeping the rest in order.
pub fn normalize(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Everything before the first occurrence of `marker`, or all of `text`
/// when the marker is absent.
pub fn split_at_marker<'a>(text: &'a str, marker: &str) -> &'a str {
    match text.find(marker) {
        Some(idx) => &text[..idx],
        None => text,
    }
}

/// What the agent should do next with a reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// The model is done.
    FinalAnswer(String),
    /// The model asked for a registered tool.
    Action { tool: String, input: String },
    /// Neither: keep reasoning.
    Thought,
}

/// One model reply, cleaned up and classified.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedReply {
    /// Normalized reply text with any fabricated tool output cut off. This
    /// is what gets appended to the transcript.
    pub text: String,
    pub step: Step,
}

/// Classify a model reply.
///
/// When the reply names a tool for which `is_known` holds, it is first cut
/// at the earliest `Observation:` / `Action Result:` marker, discarding
/// anything the model invented in place of the real tool result. Then, in
/// order:
///
/// 1. `Final Answer:` present: the text after its last occurrence, trimmed.
/// 2. A known tool was named: an action step, with `Action Input:` (empty
///    when absent).
/// 3. Otherwise a bare thought. Unknown tool names land here too.
pub fn parse(reply: &str, is_known: impl Fn(&str) -> bool) -> ParsedReply {
    let text = normalize(reply);
    let tool = extract_field(&text, ACTION)
        .map(str::trim)
        .filter(|name| is_known(name))
        .map(str::to_string);

    let text = match &tool {
        Some(_) => normalize(split_at_marker(
            split_at_marker(&text, OBSERVATION),
            ACTION_RESULT,
        )),
        None => text,
    };

    if let Some(idx) = text.rfind(FINAL_ANSWER) {
        let answer = text[idx + FINAL_ANSWER.len()..].trim().to_string();
        return ParsedReply {
            text,
            step: Step::FinalAnswer(answer),
        };
    }

    let step = match tool {
        Some(tool) => Step::Action {
            input: extract_field(&text, ACTION_INPUT)
                .map(str::trim)
                .unwrap_or_default()
                .to_string(),
            tool,
        },
        None => Step::Thought,
    };

    ParsedReply { text, step }
}
