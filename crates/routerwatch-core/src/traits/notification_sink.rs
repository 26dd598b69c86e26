// # Notification Sink Trait
//
// Defines the interface for delivering one rendered notification.
//
// ## Implementations
//
// - Local script: `routerwatch_core::sinks::ScriptSink`
// - Pushover: `routerwatch-notify-pushover` crate
// - Pushbullet: `routerwatch-notify-pushbullet` crate
// - Notify My Android: `routerwatch-notify-nma` crate
//
// ## Usage
//
// ```rust,ignore
// use routerwatch_core::{NotificationEvent, NotificationSink};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let sink = /* NotificationSink implementation */;
//     let event = NotificationEvent::connected("laptop", "10.0.0.5", "AA:BB:CC:DD:EE:FF");
//
//     sink.notify("laptop connected.", &event).await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A single connect or disconnect transition
///
/// Built by the tracker, rendered by the template, then dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub hostname: String,
    pub connected: bool,
    /// Empty on disconnect
    pub ip: String,
    /// Empty on disconnect
    pub mac: String,
}

impl NotificationEvent {
    /// A device joined the network
    pub fn connected(
        hostname: impl Into<String>,
        ip: impl Into<String>,
        mac: impl Into<String>,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            connected: true,
            ip: ip.into(),
            mac: mac.into(),
        }
    }

    /// A device left the network; only the hostname is carried
    pub fn disconnected(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            connected: false,
            ip: String::new(),
            mac: String::new(),
        }
    }

    /// The fixed event sent by the self-test mode
    pub fn self_test() -> Self {
        Self::connected("Router", "192.168.1.1", "AA:BB:CC:DD:EE:FF")
    }
}

/// Trait for notification sink implementations
///
/// A sink is one delivery channel. It receives the already-rendered message
/// plus the structured event (the script sink passes the fields as
/// positional arguments; push services only use the message).
///
/// # Contract
///
/// - **Single-shot**: one delivery attempt per call, no retries
/// - **Isolated**: no knowledge of other sinks or of the tracker
/// - **Honest**: any transport failure or rejection is returned as an error;
///   the dispatcher decides whether it is fatal
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver one notification
    ///
    /// # Parameters
    ///
    /// - `message`: The rendered notification text
    /// - `event`: The transition the message was rendered from
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Delivered
    /// - `Err(Error)`: Delivery failed
    async fn notify(&self, message: &str, event: &NotificationEvent) -> Result<(), crate::Error>;

    /// Get the sink name (for logging/debugging)
    ///
    /// # Returns
    ///
    /// A static string identifying the sink (e.g., "script", "pushover")
    fn sink_name(&self) -> &'static str;
}

/// Helper trait for constructing sinks from configuration
pub trait NotificationSinkFactory: Send + Sync {
    /// Create a NotificationSink instance from configuration
    ///
    /// # Parameters
    ///
    /// - `config`: Configuration specific to this sink
    ///
    /// # Returns
    ///
    /// A boxed NotificationSink trait object
    fn create(
        &self,
        config: &crate::config::SinkConfig,
    ) -> Result<Box<dyn NotificationSink>, crate::Error>;
}
