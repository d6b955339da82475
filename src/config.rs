//! Configuration resolution for scholar-sync
//!
//! Layered resolution with compiled defaults → TOML file → environment
//! variables; command-line overrides are applied on top by the binary.
//! Retry counts, backoff, delay bounds, and the proxy are all configuration
//! values rather than separate code paths.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

/// Author profile tracked when nothing else is configured
pub const DEFAULT_AUTHOR_ID: &str = "6gRlYHAAAAAJ";

const DEFAULT_OUTPUT_PATH: &str = "scholar-stats.json";
const DEFAULT_PROFILE_BASE_URL: &str = "https://scholar.google.com";
const DEFAULT_CONFIG_FILE: &str = "scholar-sync.toml";

/// Runtime configuration for one update run
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Profile identifier of the tracked author
    pub author_id: String,
    /// Path of the JSON snapshot consumed by the site
    pub output_path: PathBuf,
    /// Base URL of the scholarly-bridge API. When unset, the structured
    /// source is skipped entirely at startup.
    pub api_base_url: Option<String>,
    /// Base URL the profile page is fetched from
    pub profile_base_url: String,
    /// Proxy used for the opportunistic CI-sandbox mitigation
    pub proxy_url: Option<String>,
    /// Fetch attempts per source
    pub max_attempts: u32,
    /// Linear backoff unit between attempts, in seconds
    pub backoff_unit_secs: u64,
    /// Lower bound of the randomized startup delay, in seconds
    pub delay_min_secs: u64,
    /// Upper bound of the randomized startup delay; zero disables the delay
    pub delay_max_secs: u64,
    /// Per-request HTTP timeout, in seconds
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            author_id: DEFAULT_AUTHOR_ID.to_string(),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            api_base_url: None,
            profile_base_url: DEFAULT_PROFILE_BASE_URL.to_string(),
            proxy_url: None,
            max_attempts: 2,
            backoff_unit_secs: 5,
            delay_min_secs: 1,
            delay_max_secs: 3,
            request_timeout_secs: 10,
        }
    }
}

impl Config {
    /// Resolve configuration: defaults, then the TOML file (explicit path, or
    /// `scholar-sync.toml` in the working directory if present), then
    /// environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(explicit) => Self::from_file(explicit)?,
            None => {
                let candidate = PathBuf::from(DEFAULT_CONFIG_FILE);
                if candidate.exists() {
                    Self::from_file(&candidate)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("read {} failed: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("parse {} failed: {}", path.display(), e)))
    }

    /// Environment variables override file values.
    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("SCHOLAR_SYNC_AUTHOR_ID") {
            if !v.trim().is_empty() {
                self.author_id = v;
            }
        }
        if let Ok(v) = std::env::var("SCHOLAR_SYNC_OUTPUT") {
            if !v.trim().is_empty() {
                self.output_path = PathBuf::from(v);
            }
        }
        if let Ok(v) = std::env::var("SCHOLAR_SYNC_API_BASE_URL") {
            if !v.trim().is_empty() {
                self.api_base_url = Some(v);
            }
        }
        if let Ok(v) = std::env::var("SCHOLAR_SYNC_PROXY_URL") {
            if !v.trim().is_empty() {
                self.proxy_url = Some(v);
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.author_id.trim().is_empty() {
            return Err(Error::Config("author_id must not be empty".to_string()));
        }
        if self.max_attempts == 0 {
            return Err(Error::Config("max_attempts must be at least 1".to_string()));
        }
        if self.delay_min_secs > self.delay_max_secs {
            return Err(Error::Config(format!(
                "delay_min_secs ({}) exceeds delay_max_secs ({})",
                self.delay_min_secs, self.delay_max_secs
            )));
        }
        Ok(())
    }

    /// True when this process runs inside an automated CI sandbox, where
    /// the target is likelier to deny by IP. Used only to decide whether the
    /// structured source should fall back to its proxy.
    pub fn in_ci_sandbox() -> bool {
        let truthy = |name: &str| {
            std::env::var(name)
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false)
        };
        truthy("GITHUB_ACTIONS") || truthy("CI")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.author_id, DEFAULT_AUTHOR_ID);
        assert!(config.api_base_url.is_none());
        assert_eq!(config.output_path, PathBuf::from("scholar-stats.json"));
    }

    #[test]
    fn partial_toml_keeps_defaults_for_missing_keys() {
        let config: Config = toml::from_str(
            r#"
            author_id = "AbCdEfGhIjKl"
            max_attempts = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.author_id, "AbCdEfGhIjKl");
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.backoff_unit_secs, 5);
        assert_eq!(config.profile_base_url, DEFAULT_PROFILE_BASE_URL);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let parsed: std::result::Result<Config, _> = toml::from_str("retry_count = 4\n");
        assert!(parsed.is_err());
    }

    #[test]
    fn validation_rejects_inverted_delay_bounds() {
        let config = Config {
            delay_min_secs: 5,
            delay_max_secs: 2,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
