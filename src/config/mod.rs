use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("missing required setting: {0}")]
    Missing(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub valkey: ValkeyConfig,
    #[serde(default)]
    pub poller: PollerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Feed REST API base URL
    #[serde(default = "default_feed_url")]
    pub base_url: String,
    /// Only report matches from this competition id (unset = all competitions)
    #[serde(default)]
    pub competition_id: Option<String>,
    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    /// Incoming-webhook URL for match commentary - loaded from env PITCHSIDE_WEBHOOK_URL
    #[serde(default)]
    pub url: String,
    /// Optional operator webhook for diagnostics and heartbeats - env PITCHSIDE_DEBUG_WEBHOOK_URL
    #[serde(default)]
    pub debug_url: Option<String>,
    /// Seconds between heartbeat pings on the debug webhook
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValkeyConfig {
    #[serde(default = "default_valkey_url")]
    pub url: String,
    /// Key namespace, so staging and live can share one Valkey
    #[serde(default = "default_valkey_prefix")]
    pub prefix: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollerConfig {
    /// Seconds between reconciliation passes
    #[serde(default = "default_poll_interval")]
    pub interval_secs: u64,
    /// Matches reconciled concurrently within one pass
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_matches: usize,
    /// Competitions covered by the daily digest binary
    #[serde(default)]
    pub digest_competitions: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_feed_url() -> String {
    "https://api.fifa.com/api/v1".to_string()
}
fn default_request_timeout() -> u64 {
    10
}
fn default_heartbeat_interval() -> u64 {
    3600
}
fn default_valkey_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}
fn default_valkey_prefix() -> String {
    "pitchside".to_string()
}
fn default_poll_interval() -> u64 {
    60
}
fn default_max_concurrent() -> usize {
    4
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: default_feed_url(),
            competition_id: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            debug_url: None,
            heartbeat_interval_secs: default_heartbeat_interval(),
        }
    }
}

impl Default for ValkeyConfig {
    fn default() -> Self {
        Self {
            url: default_valkey_url(),
            prefix: default_valkey_prefix(),
        }
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_poll_interval(),
            max_concurrent_matches: default_max_concurrent(),
            digest_competitions: Vec::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Config {
    /// Load config from a TOML file, then overlay environment variables for secrets.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;
        config.overlay_env();
        Ok(config)
    }

    /// Load a default config with env-only settings (no file needed).
    pub fn from_env() -> Self {
        let mut config = Config {
            feed: FeedConfig {
                base_url: std::env::var("PITCHSIDE_FEED_URL")
                    .unwrap_or_else(|_| default_feed_url()),
                competition_id: std::env::var("PITCHSIDE_COMPETITION_ID").ok(),
                request_timeout_secs: default_request_timeout(),
            },
            webhook: WebhookConfig::default(),
            valkey: ValkeyConfig {
                url: std::env::var("PITCHSIDE_VALKEY_URL")
                    .unwrap_or_else(|_| default_valkey_url()),
                prefix: default_valkey_prefix(),
            },
            poller: PollerConfig::default(),
            logging: LoggingConfig::default(),
        };
        config.overlay_env();
        config
    }

    /// Webhook URLs never live in the config file.
    fn overlay_env(&mut self) {
        if let Ok(url) = std::env::var("PITCHSIDE_WEBHOOK_URL") {
            self.webhook.url = url;
        }
        if let Ok(url) = std::env::var("PITCHSIDE_DEBUG_WEBHOOK_URL") {
            self.webhook.debug_url = Some(url);
        }
    }

    pub fn has_webhook(&self) -> bool {
        !self.webhook.url.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_file_gets_defaults() {
        let config: Config = toml::from_str(
            r#"
            [feed]
            competition_id = "17"
            "#,
        )
        .unwrap();
        assert_eq!(config.feed.base_url, "https://api.fifa.com/api/v1");
        assert_eq!(config.feed.competition_id.as_deref(), Some("17"));
        assert_eq!(config.poller.interval_secs, 60);
        assert_eq!(config.valkey.prefix, "pitchside");
        assert!(!config.logging.json);
    }

    #[test]
    fn test_empty_file_is_valid() {
        let config: Config = toml::from_str("").unwrap();
        assert!(!config.has_webhook());
        assert_eq!(config.poller.max_concurrent_matches, 4);
    }
}
