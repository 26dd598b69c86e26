//! Configuration types for the router watcher
//!
//! This module defines all configuration structures used throughout the crate.
//! A [`WatchConfig`] is built once at startup and passed by reference; nothing
//! reads configuration from ambient global state.

use crate::dispatch::DispatchMode;
use crate::template::DEFAULT_TEMPLATE;
use crate::tracker::ScanPolicy;
use serde::{Deserialize, Serialize};

/// Default router address for the JNAP source
pub const DEFAULT_ROUTER_URL: &str = "http://192.168.1.1";

/// Main watcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Router device source configuration
    pub source: SourceConfig,

    /// Notification sinks, in dispatch order
    #[serde(default)]
    pub sinks: Vec<SinkConfig>,

    /// Notification template
    #[serde(default = "default_template")]
    pub notification_template: String,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl WatchConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            source: SourceConfig::default(),
            sinks: Vec::new(),
            notification_template: default_template(),
            engine: EngineConfig::default(),
        }
    }

    /// Validate the configuration
    ///
    /// Every listed sink must be complete; an incomplete one is an error, not
    /// skipped. The template itself is validated when it is compiled by the
    /// engine.
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.source.validate()?;
        for sink in &self.sinks {
            sink.validate()?;
        }
        self.engine.validate()?;

        Ok(())
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Device source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Linksys JNAP router
    Jnap {
        /// Router base URL (e.g., "http://192.168.1.1")
        url: String,
    },

    /// Custom device source
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl SourceConfig {
    /// Validate the source configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            SourceConfig::Jnap { url } => {
                if url.is_empty() {
                    return Err(crate::Error::config("JNAP router URL cannot be empty"));
                }
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err(crate::Error::config(format!(
                        "JNAP router URL must use http or https: {}",
                        url
                    )));
                }
                Ok(())
            }
            SourceConfig::Custom { factory, .. } => {
                if factory.is_empty() {
                    return Err(crate::Error::config("Custom source factory cannot be empty"));
                }
                Ok(())
            }
        }
    }

    /// Get the source type name
    pub fn type_name(&self) -> &str {
        match self {
            SourceConfig::Jnap { .. } => "jnap",
            SourceConfig::Custom { factory, .. } => factory,
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::Jnap {
            url: DEFAULT_ROUTER_URL.to_string(),
        }
    }
}

/// Notification sink configuration
///
/// A listed sink must carry all of its credentials; [`SinkConfig::validate`]
/// rejects a partial one. Callers that take credentials piecemeal decide what
/// to list: `routerwatchd` leaves a service out when none of its variables are
/// set, and also leaves out (with a warning) a Pushover pair with only one half
/// set, so that pair never reaches validation.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SinkConfig {
    /// Local executable run with (hostname, connected, ip, mac)
    Script {
        /// Path of the executable
        path: String,
    },

    /// Pushover (https://pushover.net)
    ///
    /// Both fields are required; an empty one fails validation.
    Pushover {
        /// Application API token
        app_token: String,
        /// User key
        user_key: String,
    },

    /// Pushbullet (https://www.pushbullet.com)
    Pushbullet {
        /// Access token
        access_token: String,
    },

    /// Notify My Android
    Nma {
        /// API key
        api_key: String,
    },

    /// Custom sink
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl SinkConfig {
    /// Validate the sink configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            SinkConfig::Script { path } => {
                if path.is_empty() {
                    return Err(crate::Error::config("Script path cannot be empty"));
                }
                Ok(())
            }
            SinkConfig::Pushover {
                app_token,
                user_key,
            } => {
                if app_token.is_empty() || user_key.is_empty() {
                    return Err(crate::Error::config(
                        "Pushover needs both an application token and a user key",
                    ));
                }
                Ok(())
            }
            SinkConfig::Pushbullet { access_token } => {
                if access_token.is_empty() {
                    return Err(crate::Error::config("Pushbullet access token cannot be empty"));
                }
                Ok(())
            }
            SinkConfig::Nma { api_key } => {
                if api_key.is_empty() {
                    return Err(crate::Error::config("Notify My Android API key cannot be empty"));
                }
                Ok(())
            }
            SinkConfig::Custom { factory, .. } => {
                if factory.is_empty() {
                    return Err(crate::Error::config("Custom sink factory cannot be empty"));
                }
                Ok(())
            }
        }
    }

    /// Get the sink type name
    pub fn type_name(&self) -> &str {
        match self {
            SinkConfig::Script { .. } => "script",
            SinkConfig::Pushover { .. } => "pushover",
            SinkConfig::Pushbullet { .. } => "pushbullet",
            SinkConfig::Nma { .. } => "nma",
            SinkConfig::Custom { factory, .. } => factory,
        }
    }
}

// Credentials never reach the logs
impl std::fmt::Debug for SinkConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkConfig::Script { path } => f.debug_struct("Script").field("path", path).finish(),
            SinkConfig::Pushover { .. } => f
                .debug_struct("Pushover")
                .field("app_token", &"<REDACTED>")
                .field("user_key", &"<REDACTED>")
                .finish(),
            SinkConfig::Pushbullet { .. } => f
                .debug_struct("Pushbullet")
                .field("access_token", &"<REDACTED>")
                .finish(),
            SinkConfig::Nma { .. } => f
                .debug_struct("Nma")
                .field("api_key", &"<REDACTED>")
                .finish(),
            SinkConfig::Custom { factory, .. } => f
                .debug_struct("Custom")
                .field("factory", factory)
                .finish_non_exhaustive(),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Seconds to sleep between polls
    #[serde(default = "default_update_interval_secs")]
    pub update_interval_secs: u64,

    /// How far one diff pass scans a snapshot
    #[serde(default)]
    pub scan_policy: ScanPolicy,

    /// What a sink failure does to the rest of a dispatch
    #[serde(default)]
    pub dispatch_mode: DispatchMode,
}

impl EngineConfig {
    /// Validate the engine configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.update_interval_secs == 0 {
            return Err(crate::Error::config("Update interval must be > 0 seconds"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            update_interval_secs: default_update_interval_secs(),
            scan_policy: ScanPolicy::default(),
            dispatch_mode: DispatchMode::default(),
        }
    }
}

fn default_template() -> String {
    DEFAULT_TEMPLATE.to_string()
}

fn default_update_interval_secs() -> u64 {
    1
}
