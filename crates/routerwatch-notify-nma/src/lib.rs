// # Notify My Android Sink
//
// Delivers the rendered notification through the Notify My Android public
// API, as application "Router".
//
// ## Behavior
//
// - One HTTP request per notification, no retries
// - HTTP timeout configured (30 seconds)
// - Transport errors, non-2xx replies and `<error>` replies are sink errors
//
// ## API Reference
//
// ```http
// POST https://www.notifymyandroid.com/publicapi/notify
// Content-Type: application/x-www-form-urlencoded
//
// apikey=<key>&application=Router&event=<event>&description=<text>
// ```
//
// The service answers with a small XML document, either
// `<nma><success code="200" .../></nma>` or
// `<nma><error code="401">...</error></nma>`.

use async_trait::async_trait;
use routerwatch_core::config::SinkConfig;
use routerwatch_core::traits::{NotificationEvent, NotificationSink, NotificationSinkFactory};
use routerwatch_core::{Error, Result};
use serde::Serialize;
use std::time::Duration;

/// Notify My Android notify endpoint
pub const NMA_API_URL: &str = "https://www.notifymyandroid.com/publicapi/notify";

const APPLICATION: &str = "Router";

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Notify My Android sink
pub struct NmaSink {
    /// ⚠️ NEVER log this value
    api_key: String,
    endpoint: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for NmaSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NmaSink")
            .field("api_key", &"<REDACTED>")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct NmaNotification<'a> {
    apikey: &'a str,
    application: &'static str,
    event: &'static str,
    description: &'a str,
}

/// Short event line shown above the description
fn event_title(event: &NotificationEvent) -> &'static str {
    if event.connected {
        "Device connected"
    } else {
        "Device disconnected"
    }
}

/// Extract the error text from an NMA reply, if it reports one
///
/// Only an element named exactly `error` counts, so `<errors>` or an
/// attribute value containing `<error` is not a rejection.
fn reply_error(body: &str) -> Option<&str> {
    let mut from = 0;
    let rest = loop {
        let start = from + body[from..].find("<error")?;
        let after = &body[start + "<error".len()..];
        match after.chars().next() {
            Some(c) if c.is_whitespace() || c == '>' || c == '/' => break &body[start..],
            None => return Some(""),
            _ => from = start + "<error".len(),
        }
    };

    let Some(open) = rest.find('>') else {
        return Some("");
    };
    // <error code="..."/>
    if rest[..open].ends_with('/') {
        return Some("");
    }

    let inner = &rest[open + 1..];
    let text = inner.find("</error>").map_or(inner, |end| &inner[..end]);
    Some(text.trim())
}

impl NmaSink {
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self::with_client(api_key, client)
    }

    pub fn with_client(api_key: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: NMA_API_URL.to_string(),
            client,
        }
    }

    /// Send to a different notify endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn form<'a>(&'a self, message: &'a str, event: &NotificationEvent) -> NmaNotification<'a> {
        NmaNotification {
            apikey: &self.api_key,
            application: APPLICATION,
            event: event_title(event),
            description: message,
        }
    }
}

#[async_trait]
impl NotificationSink for NmaSink {
    async fn notify(&self, message: &str, event: &NotificationEvent) -> Result<()> {
        tracing::debug!("Sending NMA notification \"{}\"", event_title(event));

        let response = self
            .client
            .post(&self.endpoint)
            .form(&self.form(message, event))
            .send()
            .await
            .map_err(|e| Error::sink("nma", format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read response".to_string());

        if !status.is_success() {
            return Err(Error::sink(
                "nma",
                format!("Notification failed: {} - {}", status, body),
            ));
        }

        if let Some(reason) = reply_error(&body) {
            return Err(Error::sink("nma", format!("Notification rejected: {}", reason)));
        }

        Ok(())
    }

    fn sink_name(&self) -> &'static str {
        "nma"
    }
}

/// Factory for creating Notify My Android sinks
pub struct NmaFactory;

impl NotificationSinkFactory for NmaFactory {
    fn create(&self, config: &SinkConfig) -> Result<Box<dyn NotificationSink>> {
        match config {
            SinkConfig::Nma { api_key } => {
                config.validate()?;
                Ok(Box::new(NmaSink::new(api_key.clone())))
            }
            _ => Err(Error::config("Invalid config for Notify My Android sink")),
        }
    }
}

/// Register the Notify My Android sink with a registry
pub fn register(registry: &routerwatch_core::PluginRegistry) {
    registry.register_sink("nma", Box::new(NmaFactory));
}
