use anyhow::{bail, Result};

/// Runtime configuration resolved from environment variables.
///
/// The CLI owns no storage of its own: every invocation talks to the
/// knowledge graph service and, for raw maintenance queries, directly to the
/// backing graph database over its HTTP transaction endpoint.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the knowledge graph service
    pub service_url: String,
    /// Base URL of the graph database HTTP endpoint
    pub neo4j_uri: String,
    pub neo4j_user: String,
    pub neo4j_password: String,
    pub neo4j_database: String,
    /// Binary invoked to translate natural language into CLI commands
    pub agent_bin: String,
    /// Present when natural language queries are enabled
    pub anthropic_api_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let neo4j_password = match std::env::var("NEO4J_PASSWORD") {
            Ok(value) if !value.is_empty() => value,
            _ => bail!("NEO4J_PASSWORD environment variable is required"),
        };

        Ok(Self {
            service_url: env_or("MNEMON_SERVICE_URL", "http://localhost:8000"),
            neo4j_uri: env_or("NEO4J_URI", "http://localhost:7474"),
            neo4j_user: env_or("NEO4J_USER", "neo4j"),
            neo4j_password,
            neo4j_database: env_or("NEO4J_DATABASE", "neo4j"),
            agent_bin: env_or("MNEMON_AGENT_BIN", "claude"),
            anthropic_api_key: std::env::var("ANTHROPIC_API_KEY")
                .ok()
                .filter(|key| !key.is_empty()),
        })
    }
}

fn env_or(name: &str, default: &str) -> String {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => value,
        _ => default.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Environment-variable tests mutate process state, so they run in a
    // single test to avoid interference between parallel test threads.
    #[test]
    fn from_env_applies_defaults_and_requires_password() {
        std::env::remove_var("NEO4J_PASSWORD");
        std::env::remove_var("MNEMON_SERVICE_URL");
        std::env::remove_var("NEO4J_URI");

        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains("NEO4J_PASSWORD"));

        std::env::set_var("NEO4J_PASSWORD", "secret");
        let config = Config::from_env().unwrap();
        assert_eq!(config.neo4j_uri, "http://localhost:7474");
        assert_eq!(config.neo4j_user, "neo4j");
        assert_eq!(config.service_url, "http://localhost:8000");
        assert_eq!(config.agent_bin, "claude");

        std::env::remove_var("NEO4J_PASSWORD");
    }
}
