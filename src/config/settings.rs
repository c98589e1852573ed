//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// Server identity settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Resource subscription settings.
    #[serde(default)]
    pub subscriptions: SubscriptionConfig,

    /// Tool execution settings.
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Caller identity settings.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.subscriptions.watch_interval_secs == 0 {
            return Err(ConfigError::ValidationError {
                message: "subscriptions.watch_interval_secs must be greater than zero".to_string(),
            });
        }
        if self.subscriptions.channel_capacity == 0 {
            return Err(ConfigError::ValidationError {
                message: "subscriptions.channel_capacity must be greater than zero".to_string(),
            });
        }
        if self.tools.timeout_secs == Some(0) {
            return Err(ConfigError::ValidationError {
                message: "tools.timeout_secs must be greater than zero when set".to_string(),
            });
        }
        if self.auth.default_client_id.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "auth.default_client_id cannot be empty".to_string(),
            });
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        let level = self.logging.level.to_lowercase();
        if !valid_levels.contains(&level.as_str()) {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                    self.logging.level
                ),
            });
        }
        Ok(())
    }
}

/// Server identity reported from `initialize`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Server name in `serverInfo`.
    #[serde(default = "default_server_name")]
    pub name: String,

    /// Usage instructions returned to the client.
    #[serde(default = "default_instructions")]
    pub instructions: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            instructions: default_instructions(),
        }
    }
}

fn default_server_name() -> String {
    crate::mcp::protocol::SERVER_NAME.to_string()
}

fn default_instructions() -> String {
    "Educational content catalogue. Use the search tools to find teaching materials, \
     get_material_detail for metadata and generate_lesson_plan to draft a 5E lesson outline. \
     Curriculum outlines and knowledge graphs are available as resources."
        .to_string()
}

/// Resource subscription configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubscriptionConfig {
    /// Seconds between periodic `notifications/resources/updated` pushes.
    /// Default: 300
    #[serde(default = "default_watch_interval")]
    pub watch_interval_secs: u64,

    /// Buffered notifications per subscriber before new ones are dropped.
    /// Default: 10
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl SubscriptionConfig {
    /// Returns the watch interval as a [`Duration`].
    #[must_use]
    pub const fn watch_interval(&self) -> Duration {
        Duration::from_secs(self.watch_interval_secs)
    }
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            watch_interval_secs: default_watch_interval(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

const fn default_watch_interval() -> u64 {
    300
}

const fn default_channel_capacity() -> usize {
    10
}

/// Tool execution configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolsConfig {
    /// Upper bound on a single tool call, in seconds. Unset means no limit.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl ToolsConfig {
    /// Returns the timeout as a [`Duration`], if configured.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Caller identity configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// API key to user id mapping.
    #[serde(default)]
    pub api_keys: HashMap<String, String>,

    /// Client id used for subscriptions when the transport supplies none.
    #[serde(default = "default_client_id")]
    pub default_client_id: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            api_keys: HashMap::new(),
            default_client_id: default_client_id(),
        }
    }
}

fn default_client_id() -> String {
    "default-client".to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}
