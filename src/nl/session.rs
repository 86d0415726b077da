use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::executor::CommandExecutor;
use super::interpreter::AgentInterpreter;
use crate::config::Config;

const HISTORY_LIMIT: usize = 500;
const HISTORY_DISPLAY: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub query: String,
    pub command: String,
    pub success: bool,
}

/// A natural-language query session: translation, execution, and a
/// persisted history of what was asked and what ran.
pub struct QuerySession {
    interpreter: AgentInterpreter,
    executor: CommandExecutor,
    history_file: PathBuf,
    last_command: Option<String>,
}

impl QuerySession {
    pub fn new(config: &Config, temperature: f64) -> Self {
        Self::with_history_file(default_history_file(), &config.agent_bin, temperature)
    }

    pub fn with_history_file(
        history_file: PathBuf,
        agent_bin: &str,
        temperature: f64,
    ) -> Self {
        Self {
            interpreter: AgentInterpreter::new(agent_bin, temperature),
            executor: CommandExecutor::new(),
            history_file,
            last_command: None,
        }
    }

    /// Translate and execute one query. Returns `(command, success, output)`.
    pub async fn process_query(&mut self, query: &str, dry_run: bool) -> Result<(String, bool, String)> {
        let command = self
            .interpreter
            .interpret(query, self.last_command.as_deref())
            .await?;

        let (success, output) = self.executor.execute(&command, dry_run).await?;

        self.last_command = Some(command.clone());
        if let Err(error) = self.append_history(query, &command, success) {
            tracing::warn!(%error, "failed to record query history");
        }

        Ok((command, success, output))
    }

    pub fn show_history(&self) -> String {
        let entries = self.load_history();
        if entries.is_empty() {
            return "No query history found.".to_string();
        }

        let start = entries.len().saturating_sub(HISTORY_DISPLAY);
        let mut output = Vec::new();
        for entry in &entries[start..] {
            output.push(format!(
                "{} - {}",
                entry.timestamp.format("%Y-%m-%d %H:%M"),
                entry.query
            ));
            output.push(format!("  → {}", entry.command));
            if !entry.success {
                output.push("  ✗ Failed".to_string());
            }
            output.push(String::new());
        }
        output.join("\n")
    }

    pub fn clear_history(&self) -> Result<()> {
        if self.history_file.exists() {
            std::fs::remove_file(&self.history_file).with_context(|| {
                format!("failed to remove {}", self.history_file.display())
            })?;
        }
        Ok(())
    }

    /// A corrupt or missing history file is treated as empty rather than
    /// blocking the query itself.
    fn load_history(&self) -> Vec<HistoryEntry> {
        std::fs::read_to_string(&self.history_file)
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default()
    }

    fn append_history(&self, query: &str, command: &str, success: bool) -> Result<()> {
        if let Some(parent) = self.history_file.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let mut entries = self.load_history();
        entries.push(HistoryEntry {
            timestamp: Utc::now(),
            query: query.to_string(),
            command: command.to_string(),
            success,
        });

        if entries.len() > HISTORY_LIMIT {
            entries.drain(..entries.len() - HISTORY_LIMIT);
        }

        let raw = serde_json::to_string_pretty(&entries)?;
        std::fs::write(&self.history_file, raw)
            .with_context(|| format!("failed to write {}", self.history_file.display()))?;
        Ok(())
    }
}

fn default_history_file() -> PathBuf {
    if let Ok(path) = std::env::var("MNEMON_HISTORY_FILE") {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".mnemon")
        .join("query_history.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::tempdir;

    fn session_at(dir: &Path) -> QuerySession {
        QuerySession::with_history_file(dir.join("history.json"), "agent", 0.2)
    }

    #[test]
    fn history_appends_and_shows_recent_entries() {
        let dir = tempdir().unwrap();
        let session = session_at(dir.path());

        session.append_history("find auth", "mnemon search \"auth\"", true).unwrap();
        session
            .append_history("get stats", "mnemon maintenance stats", false)
            .unwrap();

        let shown = session.show_history();
        assert!(shown.contains("find auth"));
        assert!(shown.contains("→ mnemon search \"auth\""));
        assert!(shown.contains("get stats"));
        assert!(shown.contains("✗ Failed"));
    }

    #[test]
    fn history_is_capped() {
        let dir = tempdir().unwrap();
        let session = session_at(dir.path());

        for i in 0..(HISTORY_LIMIT + 5) {
            session
                .append_history(&format!("query {i}"), "mnemon search \"x\"", true)
                .unwrap();
        }

        let entries = session.load_history();
        assert_eq!(entries.len(), HISTORY_LIMIT);
        // The oldest entries were dropped
        assert_eq!(entries[0].query, "query 5");
    }

    #[test]
    fn corrupt_history_is_treated_as_empty() {
        let dir = tempdir().unwrap();
        let session = session_at(dir.path());

        std::fs::write(dir.path().join("history.json"), "not json").unwrap();
        assert!(session.load_history().is_empty());
        assert_eq!(session.show_history(), "No query history found.");

        // Appending after corruption starts a fresh history
        session.append_history("q", "mnemon search \"q\"", true).unwrap();
        assert_eq!(session.load_history().len(), 1);
    }

    #[test]
    fn clear_history_removes_the_file() {
        let dir = tempdir().unwrap();
        let session = session_at(dir.path());

        session.append_history("q", "mnemon search \"q\"", true).unwrap();
        session.clear_history().unwrap();
        assert!(!dir.path().join("history.json").exists());

        // Clearing twice is fine
        session.clear_history().unwrap();
    }
}
