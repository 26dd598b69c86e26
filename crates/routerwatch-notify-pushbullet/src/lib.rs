// # Pushbullet Notification Sink
//
// Delivers the rendered notification as a Pushbullet note titled "Router".
//
// ## Behavior
//
// - One HTTP request per notification, no retries
// - HTTP timeout configured (30 seconds)
// - Transport errors and non-2xx replies are returned as sink errors
//
// ## API Reference
//
// ```http
// POST https://api.pushbullet.com/v2/pushes
// Access-Token: <token>
// Content-Type: application/json
//
// {"type": "note", "title": "Router", "body": "<text>"}
// ```

use async_trait::async_trait;
use routerwatch_core::config::SinkConfig;
use routerwatch_core::traits::{NotificationEvent, NotificationSink, NotificationSinkFactory};
use routerwatch_core::{Error, Result};
use serde::Serialize;
use std::time::Duration;

/// Pushbullet pushes endpoint
pub const PUSHBULLET_API_URL: &str = "https://api.pushbullet.com/v2/pushes";

/// Title of every note
const NOTE_TITLE: &str = "Router";

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Pushbullet sink
pub struct PushbulletSink {
    /// ⚠️ NEVER log this value
    access_token: String,
    endpoint: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for PushbulletSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushbulletSink")
            .field("access_token", &"<REDACTED>")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// A note push
#[derive(Debug, Serialize)]
struct Note<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    title: &'static str,
    body: &'a str,
}

impl<'a> Note<'a> {
    fn new(body: &'a str) -> Self {
        Self {
            kind: "note",
            title: NOTE_TITLE,
            body,
        }
    }
}

impl PushbulletSink {
    pub fn new(access_token: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self::with_client(access_token, client)
    }

    pub fn with_client(access_token: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            access_token: access_token.into(),
            endpoint: PUSHBULLET_API_URL.to_string(),
            client,
        }
    }

    /// Send to a different pushes endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl NotificationSink for PushbulletSink {
    async fn notify(&self, message: &str, _event: &NotificationEvent) -> Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Access-Token", &self.access_token)
            .json(&Note::new(message))
            .send()
            .await
            .map_err(|e| Error::sink("pushbullet", format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());

            return match status.as_u16() {
                401 | 403 => Err(Error::sink(
                    "pushbullet",
                    format!("Authentication failed: invalid access token. Status: {}", status),
                )),
                429 => Err(Error::sink(
                    "pushbullet",
                    format!("Rate limit exceeded. Status: {}", status),
                )),
                _ => Err(Error::sink(
                    "pushbullet",
                    format!("Push failed: {} - {}", status, error_text),
                )),
            };
        }

        tracing::debug!("Pushbullet note created");
        Ok(())
    }

    fn sink_name(&self) -> &'static str {
        "pushbullet"
    }
}

/// Factory for creating Pushbullet sinks
pub struct PushbulletFactory;

impl NotificationSinkFactory for PushbulletFactory {
    fn create(&self, config: &SinkConfig) -> Result<Box<dyn NotificationSink>> {
        match config {
            SinkConfig::Pushbullet { access_token } => {
                config.validate()?;
                Ok(Box::new(PushbulletSink::new(access_token.clone())))
            }
            _ => Err(Error::config("Invalid config for Pushbullet sink")),
        }
    }
}

/// Register the Pushbullet sink with a registry
pub fn register(registry: &routerwatch_core::PluginRegistry) {
    registry.register_sink("pushbullet", Box::new(PushbulletFactory));
}
