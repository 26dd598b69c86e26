//! Connection-state tracking
//!
//! The [`ConnectionTracker`] owns the set of device identifiers currently
//! believed connected plus the last revision it processed. Each new snapshot
//! is diffed against that set to produce connect and disconnect events.
//!
//! ## Per-device state machine
//!
//! ```text
//!            connected, not in set
//!   Absent ─────────────────────────▶ Present     (connect event)
//!          ◀─────────────────────────
//!            disconnected, in set                 (disconnect event)
//! ```
//!
//! Self-transitions are no-ops. There is no terminal state.

use crate::traits::{Device, NotificationEvent, Revision, Snapshot};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info};

/// How far a single diff pass scans the snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanPolicy {
    /// Stop scanning right after the first connect transition
    ///
    /// Disconnects seen before that device are still reported. Devices listed
    /// after it are not examined until a later revision. At most one connect
    /// event is produced per pass.
    #[default]
    StopAfterFirstConnect,

    /// Examine every device and report every transition in one pass
    ReportAll,
}

/// Identifiers of devices currently believed connected
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectedSet {
    ids: HashSet<String>,
}

impl ConnectedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    fn insert(&mut self, id: &str) -> bool {
        self.ids.insert(id.to_string())
    }

    fn remove(&mut self, id: &str) -> bool {
        self.ids.remove(id)
    }
}

impl<S: Into<String>> FromIterator<S> for ConnectedSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Connected-set diffing between successive snapshots
///
/// Owned by a single poll loop; all methods take `&mut self` and nothing is
/// shared.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    revision: Revision,
    connected: ConnectedSet,
    policy: ScanPolicy,
}

impl ConnectionTracker {
    /// Create an empty tracker at [`Revision::INITIAL`]
    pub fn new(policy: ScanPolicy) -> Self {
        Self {
            revision: Revision::INITIAL,
            connected: ConnectedSet::new(),
            policy,
        }
    }

    /// Create a tracker from a known revision and connected set
    pub fn with_state(revision: Revision, connected: ConnectedSet, policy: ScanPolicy) -> Self {
        Self {
            revision,
            connected,
            policy,
        }
    }

    /// Last revision processed
    pub fn revision(&self) -> Revision {
        self.revision
    }

    /// Devices currently believed connected
    pub fn connected(&self) -> &ConnectedSet {
        &self.connected
    }

    pub fn policy(&self) -> ScanPolicy {
        self.policy
    }

    /// Initialise from the startup snapshot without producing events
    ///
    /// Every device the router lists with at least one connection is marked
    /// connected, so devices already online at startup are never announced.
    pub fn seed(&mut self, snapshot: &Snapshot) {
        self.revision = snapshot.revision;
        self.connected = snapshot
            .devices
            .iter()
            .filter(|device| device.has_connections())
            .map(|device| device.id.clone())
            .collect();

        debug!(
            "Seeded tracker at revision {} with {} connected device(s)",
            self.revision,
            self.connected.len()
        );
    }

    /// Diff a freshly fetched snapshot against the connected set
    ///
    /// Returns the transitions in snapshot order. When the snapshot's revision
    /// equals the last processed revision nothing is examined and no events
    /// are returned; otherwise the revision is advanced even if no device
    /// changed state.
    pub fn diff(&mut self, snapshot: &Snapshot) -> Vec<NotificationEvent> {
        if snapshot.revision == self.revision {
            debug!("Revision {} unchanged, skipping diff", self.revision);
            return Vec::new();
        }

        debug!(
            "Revision {} -> {} ({} device(s) listed)",
            self.revision,
            snapshot.revision,
            snapshot.devices.len()
        );
        self.revision = snapshot.revision;

        let mut events = Vec::new();
        for device in &snapshot.devices {
            match self.transition(device) {
                Some(event) if event.connected => {
                    events.push(event);
                    if self.policy == ScanPolicy::StopAfterFirstConnect {
                        break;
                    }
                }
                Some(event) => events.push(event),
                None => {}
            }
        }

        events
    }

    /// Apply one device's state to the set, returning its transition if any
    fn transition(&mut self, device: &Device) -> Option<NotificationEvent> {
        if !device.is_connected() {
            if self.connected.remove(&device.id) {
                info!("Device {} ({}) disconnected", device.hostname, device.id);
                return Some(NotificationEvent::disconnected(&device.hostname));
            }
            return None;
        }

        if self.connected.insert(&device.id) {
            info!(
                "Device {} ({}) connected at {}",
                device.hostname,
                device.id,
                device.primary_ip()
            );
            return Some(NotificationEvent::connected(
                &device.hostname,
                device.primary_ip(),
                device.primary_mac(),
            ));
        }

        None
    }
}
