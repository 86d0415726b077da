use std::time::Duration;

use anyhow::Result;
use tokio::process::Command;

use super::prompts::TRANSLATOR_SYSTEM_PROMPT;

const TRANSLATE_TIMEOUT: Duration = Duration::from_secs(30);

/// Translates natural language into CLI commands by shelling out to an
/// external coding-agent binary in single-turn print mode.
pub struct AgentInterpreter {
    binary: String,
    temperature: f64,
}

impl AgentInterpreter {
    pub fn new(binary: impl Into<String>, temperature: f64) -> Self {
        Self {
            binary: binary.into(),
            temperature,
        }
    }

    /// Ask the agent for the CLI command matching a query. Falls back to a
    /// basic search when the agent is unavailable or returns nothing.
    pub async fn interpret(&self, query: &str, previous_command: Option<&str>) -> Result<String> {
        let prompt = build_prompt(query, previous_command);

        let invocation = Command::new(&self.binary)
            .arg("-p")
            .arg(&prompt)
            .arg("--system-prompt")
            .arg(TRANSLATOR_SYSTEM_PROMPT)
            .arg("--max-turns")
            .arg("1")
            .arg("--temperature")
            .arg(self.temperature.to_string())
            .output();

        let output = match tokio::time::timeout(TRANSLATE_TIMEOUT, invocation).await {
            Ok(Ok(output)) => output,
            Ok(Err(error)) => {
                tracing::warn!(%error, binary = %self.binary, "agent invocation failed");
                return Ok(fallback_command(query));
            }
            Err(_) => {
                tracing::warn!(binary = %self.binary, "agent translation timed out");
                return Ok(fallback_command(query));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!(stderr = %stderr.trim(), "agent exited with an error");
            return Ok(fallback_command(query));
        }

        let command = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if command.is_empty() {
            return Ok(fallback_command(query));
        }

        Ok(command)
    }
}

fn build_prompt(query: &str, previous_command: Option<&str>) -> String {
    match previous_command {
        Some(previous) => format!(
            "Previous command: {}\n\nNatural language query: {}",
            previous, query
        ),
        None => format!("Natural language query: {}", query),
    }
}

fn fallback_command(query: &str) -> String {
    format!("mnemon search \"{}\"", query.replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_carries_previous_command_for_context() {
        let prompt = build_prompt("and from last week?", Some("mnemon search \"auth\""));
        assert!(prompt.starts_with("Previous command: mnemon search \"auth\""));
        assert!(prompt.ends_with("Natural language query: and from last week?"));

        let bare = build_prompt("find components", None);
        assert_eq!(bare, "Natural language query: find components");
    }

    #[test]
    fn fallback_is_a_quoted_basic_search() {
        assert_eq!(
            fallback_command("find auth components"),
            "mnemon search \"find auth components\""
        );
        assert_eq!(
            fallback_command("say \"hi\""),
            "mnemon search \"say \\\"hi\\\"\""
        );
    }

    #[tokio::test]
    async fn missing_agent_binary_falls_back_to_search() {
        let interpreter = AgentInterpreter::new("mnemon-no-such-agent-binary", 0.2);
        let command = interpreter.interpret("find things", None).await.unwrap();
        assert_eq!(command, "mnemon search \"find things\"");
    }
}
