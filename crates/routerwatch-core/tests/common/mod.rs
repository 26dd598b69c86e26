//! Test doubles and common utilities for contract tests
//!
//! This module provides minimal test doubles that record how the engine
//! drives its collaborators without talking to a router or a push service.

#![allow(dead_code)]

use routerwatch_core::error::{Error, Result};
use routerwatch_core::traits::{
    Connection, Device, DeviceSource, NotificationEvent, NotificationSink, Revision, Snapshot,
};
use routerwatch_core::{DispatchMode, Dispatcher, WatchConfig};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// A device source that replays a fixed list of fetch results
///
/// Once the list is exhausted every fetch fails, which ends `run()`.
pub struct ScriptedSource {
    responses: Mutex<VecDeque<Result<Snapshot>>>,
    fetches: Arc<Mutex<Vec<FetchRecord>>>,
}

/// What the engine asked for, and when
#[derive(Debug, Clone, Copy)]
pub struct FetchRecord {
    pub since: Revision,
    pub at: tokio::time::Instant,
}

impl ScriptedSource {
    pub fn new(responses: Vec<Result<Snapshot>>) -> (Self, Arc<Mutex<Vec<FetchRecord>>>) {
        let fetches = Arc::new(Mutex::new(Vec::new()));
        let source = Self {
            responses: Mutex::new(responses.into()),
            fetches: fetches.clone(),
        };
        (source, fetches)
    }

    /// Replay snapshots only
    pub fn snapshots(snapshots: Vec<Snapshot>) -> (Self, Arc<Mutex<Vec<FetchRecord>>>) {
        Self::new(snapshots.into_iter().map(Ok).collect())
    }
}

#[async_trait::async_trait]
impl DeviceSource for ScriptedSource {
    async fn fetch(&self, since: Revision) -> Result<Snapshot> {
        self.fetches.lock().unwrap().push(FetchRecord {
            since,
            at: tokio::time::Instant::now(),
        });

        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::device_source("router unreachable")))
    }

    fn source_name(&self) -> &'static str {
        "scripted"
    }
}

/// One notification as a sink received it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub sink: &'static str,
    pub message: String,
    pub event: NotificationEvent,
}

pub type DeliveryLog = Arc<Mutex<Vec<Delivery>>>;

pub fn delivery_log() -> DeliveryLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// A sink that records every delivery into a shared log
pub struct RecordingSink {
    name: &'static str,
    log: DeliveryLog,
}

impl RecordingSink {
    pub fn new(name: &'static str, log: &DeliveryLog) -> Self {
        Self {
            name,
            log: Arc::clone(log),
        }
    }
}

#[async_trait::async_trait]
impl NotificationSink for RecordingSink {
    async fn notify(&self, message: &str, event: &NotificationEvent) -> Result<()> {
        self.log.lock().unwrap().push(Delivery {
            sink: self.name,
            message: message.to_string(),
            event: event.clone(),
        });
        Ok(())
    }

    fn sink_name(&self) -> &'static str {
        self.name
    }
}

/// A sink that records the attempt and then rejects it
pub struct FailingSink {
    name: &'static str,
    log: DeliveryLog,
}

impl FailingSink {
    pub fn new(name: &'static str, log: &DeliveryLog) -> Self {
        Self {
            name,
            log: Arc::clone(log),
        }
    }
}

#[async_trait::async_trait]
impl NotificationSink for FailingSink {
    async fn notify(&self, message: &str, event: &NotificationEvent) -> Result<()> {
        self.log.lock().unwrap().push(Delivery {
            sink: self.name,
            message: message.to_string(),
            event: event.clone(),
        });
        Err(Error::sink(self.name, "HTTP 500"))
    }

    fn sink_name(&self) -> &'static str {
        self.name
    }
}

/// A dispatcher with one recording sink
pub fn recording_dispatcher(log: &DeliveryLog) -> Dispatcher {
    Dispatcher::new(
        vec![Box::new(RecordingSink::new("recorder", log))],
        DispatchMode::FailFast,
    )
}

/// A connected device with one known MAC
pub fn online(id: &str, hostname: &str, ip: &str, mac: &str) -> Device {
    Device::new(id, hostname)
        .with_mac(mac)
        .with_connection(Connection::new(ip, mac))
}

/// A device the router knows about but which has no connection
pub fn offline(id: &str, hostname: &str, mac: &str) -> Device {
    Device::new(id, hostname).with_mac(mac)
}

pub fn snapshot(revision: u64, devices: Vec<Device>) -> Snapshot {
    Snapshot::new(Revision(revision), devices)
}

/// Messages in delivery order
pub fn messages(log: &DeliveryLog) -> Vec<String> {
    log.lock()
        .unwrap()
        .iter()
        .map(|delivery| delivery.message.clone())
        .collect()
}

/// Default configuration for engine tests
pub fn minimal_config() -> WatchConfig {
    WatchConfig::default()
}
