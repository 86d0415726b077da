use std::time::Duration;

use anyhow::{bail, Result};
use tokio::process::Command;

const EXEC_TIMEOUT: Duration = Duration::from_secs(30);

/// Command prefixes the executor will run. Everything else — in
/// particular destructive maintenance operations — is refused.
const SAFE_PREFIXES: [&str; 5] = [
    "mnemon search",
    "mnemon episodes get",
    "mnemon maintenance stats",
    "mnemon maintenance export",
    "mnemon maintenance build-communities",
];

/// Executes translated CLI commands by re-invoking the current binary.
#[derive(Default)]
pub struct CommandExecutor;

impl CommandExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Run a translated command. Returns `(success, output)`; refusals and
    /// subprocess failures are reported through the tuple, not as errors.
    pub async fn execute(&self, command: &str, dry_run: bool) -> Result<(bool, String)> {
        if !is_safe_command(command) {
            return Ok((false, format!("Command not allowed: {}", command)));
        }

        if dry_run {
            return Ok((true, format!("[DRY RUN] Would execute: {}", command)));
        }

        let tokens = match split_command(command) {
            Ok(tokens) if tokens.len() > 1 => tokens,
            Ok(_) => return Ok((false, format!("Command not allowed: {}", command))),
            Err(error) => return Ok((false, error.to_string())),
        };

        // Re-invoke this binary rather than trusting PATH lookup
        let exe = std::env::current_exe()?;
        let invocation = Command::new(exe).args(&tokens[1..]).output();

        match tokio::time::timeout(EXEC_TIMEOUT, invocation).await {
            Err(_) => Ok((false, "Command timed out after 30 seconds".to_string())),
            Ok(Err(error)) => Ok((false, format!("Error executing command: {}", error))),
            Ok(Ok(output)) => {
                if output.status.success() {
                    Ok((true, String::from_utf8_lossy(&output.stdout).into_owned()))
                } else {
                    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                    let message = if stderr.is_empty() {
                        format!(
                            "Command failed with exit code {}",
                            output.status.code().unwrap_or(-1)
                        )
                    } else {
                        stderr
                    };
                    Ok((false, message))
                }
            }
        }
    }
}

fn is_safe_command(command: &str) -> bool {
    SAFE_PREFIXES
        .iter()
        .any(|prefix| command.starts_with(prefix))
}

/// Split a command line into tokens with shell-style quoting: single
/// quotes are literal, double quotes allow escaped quotes, backslash
/// escapes the next character outside quotes.
pub fn split_command(input: &str) -> Result<Vec<String>> {
    #[derive(PartialEq)]
    enum State {
        Normal,
        Single,
        Double,
    }

    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut has_token = false;
    let mut state = State::Normal;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match state {
            State::Normal => match c {
                ' ' | '\t' | '\n' => {
                    if has_token {
                        tokens.push(std::mem::take(&mut current));
                        has_token = false;
                    }
                }
                '\'' => {
                    state = State::Single;
                    has_token = true;
                }
                '"' => {
                    state = State::Double;
                    has_token = true;
                }
                '\\' => {
                    if let Some(next) = chars.next() {
                        current.push(next);
                        has_token = true;
                    }
                }
                other => {
                    current.push(other);
                    has_token = true;
                }
            },
            State::Single => match c {
                '\'' => state = State::Normal,
                other => current.push(other),
            },
            State::Double => match c {
                '"' => state = State::Normal,
                '\\' => match chars.next() {
                    Some('"') => current.push('"'),
                    Some('\\') => current.push('\\'),
                    Some(other) => {
                        current.push('\\');
                        current.push(other);
                    }
                    None => {}
                },
                other => current.push(other),
            },
        }
    }

    if state != State::Normal {
        bail!("Unbalanced quotes in command: {}", input);
    }
    if has_token {
        tokens.push(current);
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_quoted_arguments() {
        let tokens = split_command(r#"mnemon search "user service" -n 20"#).unwrap();
        assert_eq!(tokens, vec!["mnemon", "search", "user service", "-n", "20"]);
    }

    #[test]
    fn single_quotes_are_literal() {
        let tokens = split_command(r#"mnemon search 'a "quoted" word'"#).unwrap();
        assert_eq!(tokens, vec!["mnemon", "search", r#"a "quoted" word"#]);
    }

    #[test]
    fn escaped_quote_inside_double_quotes() {
        let tokens = split_command(r#"mnemon search "say \"hi\"""#).unwrap();
        assert_eq!(tokens, vec!["mnemon", "search", r#"say "hi""#]);
    }

    #[test]
    fn empty_quoted_argument_survives() {
        let tokens = split_command(r#"mnemon search "" --order newest"#).unwrap();
        assert_eq!(tokens, vec!["mnemon", "search", "", "--order", "newest"]);
    }

    #[test]
    fn unbalanced_quotes_are_rejected() {
        assert!(split_command(r#"mnemon search "unterminated"#).is_err());
        assert!(split_command("mnemon search 'unterminated").is_err());
    }

    #[test]
    fn allowlist_covers_read_only_commands() {
        assert!(is_safe_command("mnemon search \"auth\""));
        assert!(is_safe_command("mnemon episodes get --last-n 20"));
        assert!(is_safe_command("mnemon maintenance stats"));
        assert!(!is_safe_command("mnemon maintenance clear --confirm"));
        assert!(!is_safe_command("mnemon episodes add \"x\" \"y\""));
        assert!(!is_safe_command("rm -rf /"));
    }

    #[tokio::test]
    async fn disallowed_commands_are_refused() {
        let executor = CommandExecutor::new();
        let (success, output) = executor
            .execute("mnemon maintenance clear --confirm", false)
            .await
            .unwrap();
        assert!(!success);
        assert!(output.contains("Command not allowed"));
    }

    #[tokio::test]
    async fn dry_run_reports_without_executing() {
        let executor = CommandExecutor::new();
        let (success, output) = executor
            .execute("mnemon search \"auth\"", true)
            .await
            .unwrap();
        assert!(success);
        assert!(output.contains("[DRY RUN] Would execute: mnemon search \"auth\""));
    }
}
