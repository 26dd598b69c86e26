// # Device Source Trait
//
// Defines the interface for querying a router's attached-device list.
//
// ## Implementations
//
// - Linksys JNAP: `routerwatch-source-jnap` crate
// - Future: other router families exposing a revisioned device list
//
// ## Usage
//
// ```rust,ignore
// use routerwatch_core::{DeviceSource, Revision};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let source = /* DeviceSource implementation */;
//
//     // Everything the router knows about
//     let snapshot = source.fetch(Revision::INITIAL).await?;
//
//     // Only what changed since then (same revision = nothing new)
//     let next = source.fetch(snapshot.revision).await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Opaque freshness token for a device snapshot
///
/// Equal revisions mean the router has nothing new to report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(pub u64);

impl Revision {
    /// Revision used for the startup fetch ("send me everything")
    pub const INITIAL: Revision = Revision(0);
}

impl std::fmt::Display for Revision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One active network connection of a device
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    /// IP address assigned on this connection (may be empty)
    pub ip: String,
    /// Hardware address the router saw on this connection
    pub mac: String,
}

impl Connection {
    pub fn new(ip: impl Into<String>, mac: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            mac: mac.into(),
        }
    }
}

/// A device known to the router
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Stable identifier, unique per physical device
    pub id: String,
    /// Display hostname
    pub hostname: String,
    /// Known hardware addresses, in the router's order
    pub known_macs: Vec<String>,
    /// Active connections, in the router's order
    pub connections: Vec<Connection>,
}

impl Device {
    /// Create a device with no connections
    pub fn new(id: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            hostname: hostname.into(),
            known_macs: Vec::new(),
            connections: Vec::new(),
        }
    }

    /// Add a known hardware address
    pub fn with_mac(mut self, mac: impl Into<String>) -> Self {
        self.known_macs.push(mac.into());
        self
    }

    /// Add an active connection
    pub fn with_connection(mut self, connection: Connection) -> Self {
        self.connections.push(connection);
        self
    }

    /// Whether the device counts as connected
    ///
    /// A device with no connections, or whose first connection has no IP
    /// address, is disconnected.
    pub fn is_connected(&self) -> bool {
        self.connections
            .first()
            .is_some_and(|connection| !connection.ip.is_empty())
    }

    /// Whether the router lists any connection at all (used for seeding)
    pub fn has_connections(&self) -> bool {
        !self.connections.is_empty()
    }

    /// IP address of the first connection, or empty
    pub fn primary_ip(&self) -> &str {
        self.connections
            .first()
            .map(|connection| connection.ip.as_str())
            .unwrap_or("")
    }

    /// First known hardware address
    ///
    /// Falls back to the first connection's address when the router lists no
    /// known addresses, and to the empty string when it has neither.
    pub fn primary_mac(&self) -> &str {
        self.known_macs
            .first()
            .map(String::as_str)
            .or_else(|| self.connections.first().map(|connection| connection.mac.as_str()))
            .unwrap_or("")
    }
}

/// All devices the router reported at one revision
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Revision the router tagged this listing with
    pub revision: Revision,
    /// Devices in the router's order
    pub devices: Vec<Device>,
}

impl Snapshot {
    pub fn new(revision: Revision, devices: Vec<Device>) -> Self {
        Self { revision, devices }
    }
}

/// Trait for device source implementations
///
/// A device source is the router client. The engine calls [`fetch`] once at
/// startup with [`Revision::INITIAL`] and then once per poll cycle with the
/// last revision it has seen.
///
/// # Contract
///
/// - An unchanged revision is a valid "no new data" answer, never an error
/// - Calling `fetch` at any rate must be safe (no side effects on the router)
/// - No retry logic: return the error, the engine decides what to do with it
///
/// [`fetch`]: DeviceSource::fetch
#[async_trait]
pub trait DeviceSource: Send + Sync {
    /// Fetch the device list
    ///
    /// # Parameters
    ///
    /// - `since`: The last revision the caller has processed
    ///
    /// # Returns
    ///
    /// - `Ok(Snapshot)`: The router's current revision and device listing
    /// - `Err(Error)`: If the router could not be queried
    async fn fetch(&self, since: Revision) -> Result<Snapshot, crate::Error>;

    /// Get the source name (for logging/debugging)
    fn source_name(&self) -> &'static str;
}

/// Helper trait for constructing device sources from configuration
pub trait DeviceSourceFactory: Send + Sync {
    /// Create a DeviceSource instance from configuration
    fn create(
        &self,
        config: &crate::config::SourceConfig,
    ) -> Result<Box<dyn DeviceSource>, crate::Error>;
}
