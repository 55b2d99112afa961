//! `ponder` / `ponder ask` — interactive loop or single question.

use ponder_agent::{PromptComposer, ReactAgent};
use ponder_config::AppConfig;
use ponder_memory::{ConversationHistory, HistoryFile};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::debug;

pub async fn run(
    question: Option<String>,
    config_path: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &config_path {
        Some(path) => AppConfig::load_with_env(path, |key| std::env::var(key).ok()),
        None => AppConfig::load(),
    }
    .map_err(|e| format!("Failed to load config: {e}"))?;

    // Check for API key early — give a clear error
    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    OPENAI_API_KEY=sk-...     (OpenAI or compatible endpoint)");
        eprintln!("    PONDER_API_KEY=sk-...     (takes precedence)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let (agent, mut history) = build(&config)?;

    match question {
        Some(q) => {
            let answer = agent.run(&q, &mut history).await?;
            println!("{answer}");
        }
        None => {
            let stdin = BufReader::new(tokio::io::stdin());
            repl(
                &agent,
                &mut history,
                stdin,
                &mut std::io::stdout(),
                &mut std::io::stderr(),
            )
            .await?;
        }
    }

    Ok(())
}

/// Wire provider, tools, prompt and history from config.
fn build(
    config: &AppConfig,
) -> Result<(ReactAgent, ConversationHistory), Box<dyn std::error::Error>> {
    let provider = ponder_providers::build_from_config(config);
    let tools = Arc::new(ponder_tools::default_registry(provider.clone(), config));

    let composer = match &config.agent.prompt_template {
        Some(path) => PromptComposer::from_file(path, config.agent.knowledge_cutoff.clone())?,
        None => PromptComposer::new(
            ponder_agent::DEFAULT_TEMPLATE,
            config.agent.knowledge_cutoff.clone(),
        ),
    };

    let agent = ReactAgent::from_config(provider, tools, config, composer);

    let history = match &config.history.path {
        Some(path) => {
            ConversationHistory::with_file(config.history.token_budget, HistoryFile::new(path))
        }
        None => ConversationHistory::new(config.history.token_budget),
    };

    debug!(
        model = %config.model,
        tools = ?agent.tools().names(),
        history_turns = history.len(),
        "Agent ready"
    );

    Ok((agent, history))
}

/// Read questions line by line until EOF or an exit word, printing one
/// answer line per question. Failures are printed and the loop continues.
pub async fn repl<R, W, E>(
    agent: &ReactAgent,
    history: &mut ConversationHistory,
    input: R,
    out: &mut W,
    err: &mut E,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
    E: Write,
{
    let mut lines = input.lines();

    loop {
        write!(out, "user: ")?;
        out.flush()?;

        let Some(line) = lines.next_line().await? else {
            writeln!(out)?;
            break;
        };

        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if matches!(question, "exit" | "quit" | "/exit" | "/quit" | ":q") {
            break;
        }

        match agent.run(question, history).await {
            Ok(answer) => writeln!(out, "{answer}")?,
            Err(e) => writeln!(err, "error: {e}")?,
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ponder_core::error::ProviderError;
    use ponder_core::provider::{Provider, ProviderRequest, ProviderResponse};
    use ponder_core::tool::ToolRegistry;
    use std::sync::Mutex;

    struct Scripted(Mutex<Vec<Result<String, ProviderError>>>);

    #[async_trait]
    impl Provider for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, _: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            let next = self.0.lock().unwrap().remove(0);
            next.map(|content| ProviderResponse {
                content,
                usage: None,
                model: "m".into(),
            })
        }
    }

    fn agent(replies: Vec<Result<String, ProviderError>>) -> ReactAgent {
        let mut tools = ToolRegistry::new();
        tools.register(Box::new(ponder_tools::CalculatorTool));
        ReactAgent::new(
            Arc::new(Scripted(Mutex::new(replies))),
            "m",
            0.7,
            Arc::new(tools),
        )
    }

    #[tokio::test]
    async fn answers_each_line_until_exit() {
        let agent = agent(vec![
            Ok("Action: Calculator\nAction Input: 12 * 8".into()),
            Ok("Final Answer: 96".into()),
            Ok("Final Answer: Paris".into()),
        ]);
        let mut history = ConversationHistory::default();
        let input: &[u8] = b"What is 12 * 8?\n\nCapital of France?\nexit\nignored\n";
        let (mut out, mut err) = (Vec::new(), Vec::new());

        repl(&agent, &mut history, input, &mut out, &mut err)
            .await
            .unwrap();

        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("user: assistant[Calculator]: 96\n"));
        assert!(out.contains("user: assistant: Paris\n"));
        assert!(err.is_empty());
        assert_eq!(history.len(), 4);
    }

    #[tokio::test]
    async fn errors_are_reported_and_loop_continues() {
        let agent = agent(vec![
            Err(ProviderError::Network("connection reset".into())),
            Ok("Final Answer: ok".into()),
        ]);
        let mut history = ConversationHistory::default();
        let input: &[u8] = b"first\nsecond\n";
        let (mut out, mut err) = (Vec::new(), Vec::new());

        repl(&agent, &mut history, input, &mut out, &mut err)
            .await
            .unwrap();

        let err = String::from_utf8(err).unwrap();
        assert!(err.starts_with("error: "));
        assert!(err.contains("connection reset"));
        assert!(String::from_utf8(out).unwrap().contains("assistant: ok"));
    }

    #[test]
    fn build_wires_history_file_and_template() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("prompt.txt");
        std::fs::write(&template, "Tools:\n${tools}").unwrap();

        let mut config = AppConfig::default();
        config.api_key = Some("sk-test".into());
        config.agent.prompt_template = Some(template);
        config.history.path = Some(dir.path().join("history.jsonl"));
        config.rate_limit.state_path = Some(dir.path().join("last_call.json"));

        let (agent, history) = build(&config).unwrap();
        assert_eq!(agent.tools().names(), vec!["Expert", "Calculator", "Search"]);
        assert!(history.is_empty());
    }

    #[test]
    fn build_rejects_missing_template() {
        let mut config = AppConfig::default();
        config.agent.prompt_template = Some(PathBuf::from("/nonexistent/prompt.txt"));
        assert!(build(&config).is_err());
    }
}
