//! Core watch engine
//!
//! The WatchEngine is responsible for:
//! - Seeding the connected set from a startup snapshot
//! - Polling the DeviceSource on a fixed interval
//! - Diffing each new revision via the ConnectionTracker
//! - Rendering and dispatching one notification per transition
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐
//! │ DeviceSource │─── Snapshot ───┐
//! └──────────────┘                │
//!                                 ▼
//!                        ┌──────────────┐
//!                        │ WatchEngine  │
//!                        └──────────────┘
//!                                 │
//!         ┌───────────────────────┼───────────────────────┐
//!         │                       │                       │
//!         ▼                       ▼                       ▼
//! ┌───────────────────┐  ┌──────────────────┐   ┌──────────────┐
//! │ ConnectionTracker │  │ NotificationTemp.│   │  Dispatcher  │
//! │ (diff)            │  │ (render)         │   │  (fan-out)   │
//! └───────────────────┘  └──────────────────┘   └──────────────┘
//! ```
//!
//! ## Cycle
//!
//! 1. Sleep for the update interval
//! 2. Fetch with the last processed revision
//! 3. Same revision → nothing to do
//! 4. Otherwise diff, then render and dispatch each event in order
//!
//! Every error ends the loop; a process supervisor is expected to restart.

use crate::config::WatchConfig;
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::template::NotificationTemplate;
use crate::tracker::ConnectionTracker;
use crate::traits::{DeviceSource, NotificationEvent, Revision};
use std::time::Duration;
use tracing::{debug, info};

/// Core watch engine
///
/// The engine owns every piece of mutable state (the tracker) and runs
/// fetch, diff, render and dispatch sequentially on one task. There is no
/// locking and no concurrency inside a cycle.
///
/// ## Lifecycle
///
/// 1. Create with [`WatchEngine::new()`] (compiles the template)
/// 2. Start with [`WatchEngine::run()`]
/// 3. `run()` only returns on error
pub struct WatchEngine {
    /// Router client
    source: Box<dyn DeviceSource>,

    /// Connected-set state
    tracker: ConnectionTracker,

    /// Compiled notification template
    template: NotificationTemplate,

    /// Sink fan-out
    dispatcher: Dispatcher,

    /// Sleep between polls
    update_interval: Duration,
}

impl WatchEngine {
    /// Create a new watch engine
    ///
    /// # Parameters
    ///
    /// - `source`: Device source implementation
    /// - `dispatcher`: Configured sinks
    /// - `config`: Watcher configuration
    ///
    /// # Errors
    ///
    /// Fails on invalid configuration or a malformed template, before any
    /// request reaches the router.
    pub fn new(
        source: Box<dyn DeviceSource>,
        dispatcher: Dispatcher,
        config: &WatchConfig,
    ) -> Result<Self> {
        config.validate()?;
        let template = NotificationTemplate::compile(&config.notification_template)?;

        Ok(Self {
            source,
            tracker: ConnectionTracker::new(config.engine.scan_policy),
            template,
            dispatcher,
            update_interval: Duration::from_secs(config.engine.update_interval_secs),
        })
    }

    /// Connection tracker state
    pub fn tracker(&self) -> &ConnectionTracker {
        &self.tracker
    }

    /// Run the engine
    ///
    /// Seeds the tracker from an unconditional fetch, then polls forever.
    ///
    /// # Returns
    ///
    /// Only returns with the first fetch or dispatch error.
    pub async fn run(&mut self) -> Result<()> {
        self.seed().await?;

        info!(
            "Watching {} every {:?} with {} sink(s)",
            self.source.source_name(),
            self.update_interval,
            self.dispatcher.len()
        );

        loop {
            tokio::time::sleep(self.update_interval).await;
            self.poll_once().await?;
        }
    }

    /// Fetch the full device list and seed the connected set
    ///
    /// Devices already online are recorded without any notification.
    pub async fn seed(&mut self) -> Result<()> {
        let snapshot = self.source.fetch(Revision::INITIAL).await?;
        self.tracker.seed(&snapshot);

        info!(
            "Initial revision {}: {} device(s), {} connected",
            snapshot.revision,
            snapshot.devices.len(),
            self.tracker.connected().len()
        );

        Ok(())
    }

    /// Run one fetch → diff → render → dispatch cycle
    ///
    /// # Returns
    ///
    /// The number of notifications dispatched.
    pub async fn poll_once(&mut self) -> Result<usize> {
        let snapshot = self.source.fetch(self.tracker.revision()).await?;
        let events = self.tracker.diff(&snapshot);

        for event in &events {
            self.notify(event).await?;
        }

        if !events.is_empty() {
            debug!("Dispatched {} notification(s)", events.len());
        }

        Ok(events.len())
    }

    async fn notify(&self, event: &NotificationEvent) -> Result<()> {
        let message = self.template.render(event);
        info!("{}", message);
        self.dispatcher.dispatch(&message, event).await
    }
}

/// Dispatch the fixed self-test notification once
///
/// Renders [`NotificationEvent::self_test`] through `template` and sends it
/// to every sink, without touching the router.
pub async fn send_test_notification(
    template: &NotificationTemplate,
    dispatcher: &Dispatcher,
) -> Result<()> {
    let event = NotificationEvent::self_test();
    let message = template.render(&event);

    info!(
        "Sending test notification to {} sink(s): {}",
        dispatcher.len(),
        message
    );
    dispatcher.dispatch(&message, &event).await
}
