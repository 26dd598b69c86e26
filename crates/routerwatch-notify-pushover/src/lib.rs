// # Pushover Notification Sink
//
// Delivers the rendered notification through the Pushover messages API.
//
// ## Behavior
//
// - One HTTP request per notification, no retries
// - HTTP timeout configured (30 seconds)
// - Transport errors and non-2xx replies are returned as sink errors
//
// ## Security Requirements
//
// - The application token and user key NEVER appear in logs
// - The sink is only built when both credentials are present
//
// ## API Reference
//
// ```http
// POST https://api.pushover.net/1/messages.json
// Content-Type: application/x-www-form-urlencoded
//
// token=<app token>&user=<user key>&message=<text>
// ```

use async_trait::async_trait;
use routerwatch_core::config::SinkConfig;
use routerwatch_core::traits::{NotificationEvent, NotificationSink, NotificationSinkFactory};
use routerwatch_core::{Error, Result};
use serde::Serialize;
use std::time::Duration;

/// Pushover messages endpoint
pub const PUSHOVER_API_URL: &str = "https://api.pushover.net/1/messages.json";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Pushover sink
///
/// The Debug implementation does NOT expose the credentials.
pub struct PushoverSink {
    /// Application API token
    /// ⚠️ NEVER log this value
    app_token: String,

    /// User or group key
    /// ⚠️ NEVER log this value
    user_key: String,

    /// Messages endpoint
    endpoint: String,

    client: reqwest::Client,
}

impl std::fmt::Debug for PushoverSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushoverSink")
            .field("app_token", &"<REDACTED>")
            .field("user_key", &"<REDACTED>")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Form body of one message
#[derive(Debug, Serialize)]
struct PushoverMessage<'a> {
    token: &'a str,
    user: &'a str,
    message: &'a str,
}

impl PushoverSink {
    /// Create a Pushover sink
    ///
    /// # Parameters
    ///
    /// - `app_token`: Application API token
    /// - `user_key`: User (or group) key to deliver to
    pub fn new(app_token: impl Into<String>, user_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self::with_client(app_token, user_key, client)
    }

    /// Create a sink that uses a preconfigured HTTP client
    pub fn with_client(
        app_token: impl Into<String>,
        user_key: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            app_token: app_token.into(),
            user_key: user_key.into(),
            endpoint: PUSHOVER_API_URL.to_string(),
            client,
        }
    }

    /// Send to a different messages endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn form<'a>(&'a self, message: &'a str) -> PushoverMessage<'a> {
        PushoverMessage {
            token: &self.app_token,
            user: &self.user_key,
            message,
        }
    }
}

#[async_trait]
impl NotificationSink for PushoverSink {
    async fn notify(&self, message: &str, _event: &NotificationEvent) -> Result<()> {
        tracing::debug!("Submitting Pushover message ({} bytes)", message.len());

        let response = self
            .client
            .post(&self.endpoint)
            .form(&self.form(message))
            .send()
            .await
            .map_err(|e| Error::sink("pushover", format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());

            return match status.as_u16() {
                400 => Err(Error::sink(
                    "pushover",
                    format!("Message rejected (check token and user key): {}", error_text),
                )),
                429 => Err(Error::sink(
                    "pushover",
                    format!("Monthly message limit reached. Status: {}", status),
                )),
                _ => Err(Error::sink(
                    "pushover",
                    format!("Submission failed: {} - {}", status, error_text),
                )),
            };
        }

        Ok(())
    }

    fn sink_name(&self) -> &'static str {
        "pushover"
    }
}

/// Factory for creating Pushover sinks
pub struct PushoverFactory;

impl NotificationSinkFactory for PushoverFactory {
    fn create(&self, config: &SinkConfig) -> Result<Box<dyn NotificationSink>> {
        match config {
            SinkConfig::Pushover {
                app_token,
                user_key,
            } => {
                config.validate()?;
                Ok(Box::new(PushoverSink::new(app_token.clone(), user_key.clone())))
            }
            _ => Err(Error::config("Invalid config for Pushover sink")),
        }
    }
}

/// Register the Pushover sink with a registry
pub fn register(registry: &routerwatch_core::PluginRegistry) {
    registry.register_sink("pushover", Box::new(PushoverFactory));
}
