// # Script Sink
//
// Runs a local executable for every notification.
//
// ## Invocation
//
// ```text
// <path> <hostname> <connected> <ip> <mac>
// ```
//
// - `connected` is the literal `true` or `false`
// - `ip` and `mac` are empty strings on disconnect
// - The child inherits stdin, stdout and stderr
//
// The rendered message is not passed; scripts format their own output from
// the positional arguments.
//
// ## Failure
//
// A launch failure or a non-zero exit status is returned as a sink error.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use crate::config::SinkConfig;
use crate::traits::{NotificationEvent, NotificationSink, NotificationSinkFactory};
use crate::{Error, Result};

/// Sink that executes a local script per notification
#[derive(Debug, Clone)]
pub struct ScriptSink {
    path: PathBuf,
}

impl ScriptSink {
    /// Create a script sink for the executable at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Positional arguments for one event
    fn arguments(event: &NotificationEvent) -> [&str; 4] {
        [
            event.hostname.as_str(),
            if event.connected { "true" } else { "false" },
            event.ip.as_str(),
            event.mac.as_str(),
        ]
    }
}

#[async_trait]
impl NotificationSink for ScriptSink {
    async fn notify(&self, _message: &str, event: &NotificationEvent) -> Result<()> {
        tracing::debug!(
            "Running {} for {} (connected={})",
            self.path.display(),
            event.hostname,
            event.connected
        );

        let status = Command::new(&self.path)
            .args(Self::arguments(event))
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| {
                Error::sink(
                    "script",
                    format!("failed to launch {}: {}", self.path.display(), e),
                )
            })?;

        if !status.success() {
            return Err(Error::sink(
                "script",
                format!("{} exited with {}", self.path.display(), status),
            ));
        }

        Ok(())
    }

    fn sink_name(&self) -> &'static str {
        "script"
    }
}

/// Factory for creating script sinks
pub struct ScriptSinkFactory;

impl NotificationSinkFactory for ScriptSinkFactory {
    fn create(&self, config: &SinkConfig) -> Result<Box<dyn NotificationSink>> {
        match config {
            SinkConfig::Script { path } => {
                if path.is_empty() {
                    return Err(Error::config("Script path is required"));
                }
                Ok(Box::new(ScriptSink::new(path)))
            }
            _ => Err(Error::config("Invalid config for script sink")),
        }
    }
}
