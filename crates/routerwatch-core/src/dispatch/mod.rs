//! Notification fan-out
//!
//! The [`Dispatcher`] hands one rendered message to every configured sink in
//! list order. Adding a service means adding a sink; the dispatch loop itself
//! never changes.

use crate::error::Result;
use crate::traits::{NotificationEvent, NotificationSink};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

/// What a failing sink does to the rest of a dispatch call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Abort the call at the first failure and return it
    #[default]
    FailFast,

    /// Log each failure and still attempt the remaining sinks
    LogAndContinue,
}

/// Ordered set of notification sinks
pub struct Dispatcher {
    sinks: Vec<Box<dyn NotificationSink>>,
    mode: DispatchMode,
}

impl Dispatcher {
    /// Create a dispatcher over `sinks`, attempted in the given order
    pub fn new(sinks: Vec<Box<dyn NotificationSink>>, mode: DispatchMode) -> Self {
        Self { sinks, mode }
    }

    /// Number of configured sinks
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    /// Names of the configured sinks, in dispatch order
    pub fn sink_names(&self) -> Vec<&'static str> {
        self.sinks.iter().map(|sink| sink.sink_name()).collect()
    }

    /// Deliver one message to every sink
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Every sink was attempted (and, in `FailFast` mode, succeeded)
    /// - `Err(Error)`: The first sink failure, in `FailFast` mode
    pub async fn dispatch(&self, message: &str, event: &NotificationEvent) -> Result<()> {
        for sink in &self.sinks {
            debug!("Dispatching to {}: {}", sink.sink_name(), message);

            if let Err(e) = sink.notify(message, event).await {
                match self.mode {
                    DispatchMode::FailFast => return Err(e),
                    DispatchMode::LogAndContinue => {
                        error!("Sink {} failed, continuing: {}", sink.sink_name(), e);
                    }
                }
            }
        }

        Ok(())
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("sinks", &self.sink_names())
            .field("mode", &self.mode)
            .finish()
    }
}
