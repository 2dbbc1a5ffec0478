//! Environment-sourced configuration
//!
//! Read once at startup, immutable afterwards. Every knob has a documented
//! default; unparseable numeric values fall back to the default rather than
//! aborting.

/// Runtime configuration for the agent shell.
///
/// | env var                    | default                                   |
/// |----------------------------|-------------------------------------------|
/// | `ANTHROPIC_API_KEY`        | (required)                                |
/// | `TALOS_API_URL`            | `https://api.anthropic.com/v1/messages`   |
/// | `TALOS_MODEL`              | `claude-sonnet-4-20250514`                |
/// | `TALOS_MAX_TOKENS`         | `8192`                                    |
/// | `TALOS_MAX_SEARCH_RESULTS` | `50`                                      |
/// | `TALOS_MAX_FILE_BYTES`     | `262144`                                  |
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub api_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub max_search_results: usize,
    pub max_file_bytes: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("ANTHROPIC_API_KEY is not set")]
    MissingApiKey,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        Ok(Self {
            api_key,
            api_url: env_or("TALOS_API_URL", "https://api.anthropic.com/v1/messages"),
            model: env_or("TALOS_MODEL", "claude-sonnet-4-20250514"),
            max_tokens: parse_or(std::env::var("TALOS_MAX_TOKENS").ok(), 8192),
            max_search_results: parse_or(std::env::var("TALOS_MAX_SEARCH_RESULTS").ok(), 50),
            max_file_bytes: parse_or(std::env::var("TALOS_MAX_FILE_BYTES").ok(), 256 * 1024),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}
