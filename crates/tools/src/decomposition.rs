//! Expert tool — asks the model for an answer skeleton.
//!
//! Instead of prose, the model returns a short numbered outline (3-10
//! points of 3-5 words) that the main reasoning loop can then work
//! through, one search or calculation at a time.

use async_trait::async_trait;
use ponder_core::error::ToolError;
use ponder_core::message::Message;
use ponder_core::parser::normalize;
use ponder_core::provider::{Provider, ProviderRequest};
use ponder_core::tool::Tool;
use std::sync::Arc;
use tracing::debug;

const SKELETON_INSTRUCTION: &str = "You are an organizer. Do not answer the question in full. \
Reply only with the skeleton of an answer: a list of points numbered 1, 2, 3, etc. \
Each point should be very short, only 3-5 words. The skeleton should have 3-10 points.";

pub struct DecompositionTool {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
}

impl DecompositionTool {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, temperature: f32) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature,
        }
    }
}

#[async_trait]
impl Tool for DecompositionTool {
    fn name(&self) -> &str {
        "Expert"
    }

    fn description(&self) -> &str {
        "Useful for answering questions and completing tasks. You're organizer responsible only \
         giving the skeleton (not the full content) for answering the question. Provide to input \
         of this tool a Question with a Skeleton in a list of points (numbered 1, 2, 3, etc.) to \
         answer the question. Instead of writing a full sentence, each skeleton point should be \
         very short, only 3-5 words. Generally, the skeleton should have 3-10 points."
    }

    async fn execute(&self, input: &str) -> Result<String, ToolError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ToolError::InvalidArguments(
                "Expert needs a question to outline".into(),
            ));
        }

        debug!(input = %input, "Requesting skeleton");

        let request = ProviderRequest::new(
            self.model.clone(),
            vec![Message::system(SKELETON_INSTRUCTION), Message::user(input)],
        )
        .with_temperature(self.temperature);

        let response = self
            .provider
            .complete(request)
            .await
            .map_err(|e| ToolError::Transport {
                tool_name: "Expert".into(),
                reason: e.to_string(),
            })?;

        let skeleton = normalize(&response.content);
        debug!(skeleton = %skeleton, "Skeleton received");
        Ok(skeleton)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ponder_core::error::ProviderError;
    use ponder_core::message::Role;
    use ponder_core::provider::ProviderResponse;
    use std::sync::Mutex;

    /// Records requests and answers with a fixed reply or error.
    struct StubProvider {
        reply: Result<String, ProviderError>,
        seen: Mutex<Vec<ProviderRequest>>,
    }

    impl StubProvider {
        fn replying(reply: Result<String, ProviderError>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Provider for StubProvider {
        fn name(&self) -> &str {
            "stub"
        }

        async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            self.seen.lock().unwrap().push(request);
            self.reply.clone().map(|content| ProviderResponse {
                content,
                usage: None,
                model: "stub-model".into(),
            })
        }
    }

    #[tokio::test]
    async fn returns_normalized_skeleton() {
        let provider = StubProvider::replying(Ok(
            "1. Define photosynthesis\n\n2. Light reactions\n   \n3. Calvin cycle\n".into(),
        ));
        let tool = DecompositionTool::new(provider.clone(), "gpt-3.5-turbo", 0.7);

        let out = tool.execute("How does photosynthesis work?").await.unwrap();
        assert_eq!(
            out,
            "1. Define photosynthesis\n2. Light reactions\n3. Calvin cycle"
        );

        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].model, "gpt-3.5-turbo");
        assert_eq!(seen[0].messages[0].role, Role::System);
        assert!(seen[0].messages[0].content.contains("skeleton"));
        assert_eq!(seen[0].messages[1].content, "How does photosynthesis work?");
    }

    #[tokio::test]
    async fn provider_failure_is_fatal() {
        let provider = StubProvider::replying(Err(ProviderError::Network("reset".into())));
        let tool = DecompositionTool::new(provider, "m", 0.7);

        let err = tool.execute("anything").await.unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("Expert"));
    }

    #[tokio::test]
    async fn empty_input_skips_the_model() {
        let provider = StubProvider::replying(Ok("unused".into()));
        let tool = DecompositionTool::new(provider.clone(), "m", 0.7);

        assert!(tool.execute("  ").await.is_err());
        assert!(provider.seen.lock().unwrap().is_empty());
    }
}
