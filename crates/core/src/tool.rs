//! Tool trait — the abstraction over agent capabilities.
//!
//! Tools are what the model asks for by name in an `Action:` line. Every
//! tool takes one line of free text and answers with text.

use crate::error::ToolError;
use async_trait::async_trait;
use tracing::warn;

/// The core Tool trait.
///
/// Each tool (calculator, search, expert) implements this trait. Tools are
/// registered in the [`ToolRegistry`] under their [`name`](Tool::name),
/// which is the exact identifier the prompt advertises.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "Calculator").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// Execute the tool with the model's `Action Input:` text.
    async fn execute(&self, input: &str) -> std::result::Result<String, ToolError>;
}

/// An ordered registry of available tools.
///
/// The agent loop uses this to:
/// 1. Describe every tool in the system prompt, in registration order
/// 2. Resolve the tool named by the model's `Action:` line
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Register a tool.
    ///
    /// A tool with the same name replaces the earlier one in place, so the
    /// description order is unchanged.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        match self.tools.iter().position(|t| t.name() == tool.name()) {
            Some(idx) => {
                warn!(tool = %tool.name(), "Tool name already registered, replacing");
                self.tools[idx] = tool;
            }
            None => self.tools.push(tool),
        }
    }

    /// Get a tool by its exact name.
    pub fn resolve(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    /// Whether a tool with this exact name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    /// One `name: description` line per tool, in registration order.
    pub fn describe_all(&self) -> String {
        self.tools
            .iter()
            .map(|t| format!("{}: {}", t.name(), t.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Execute a tool by name.
    pub async fn execute(&self, name: &str, input: &str) -> std::result::Result<String, ToolError> {
        let tool = self
            .resolve(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        tool.execute(input).await
    }

    /// List all registered tool names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
