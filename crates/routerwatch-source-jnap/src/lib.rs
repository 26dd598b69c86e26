// # Linksys JNAP Device Source
//
// This crate provides a `DeviceSource` for Linksys routers that expose the
// JNAP device-list action.
//
// ## Behavior
//
// - One HTTP request per `fetch()` call
// - No retries, no backoff: a failed fetch is returned to the engine
// - HTTP timeout configured (30 seconds)
// - Unchanged revisions are a normal reply, not an error
//
// ## Protocol
//
// ```http
// POST {router}/JNAP/
// X-JNAP-Action: http://linksys.com/jnap/devicelist/GetDevices
// Content-Type: application/json
//
// {"sinceRevision": 42}
// ```
//
// Reply:
//
// ```json
// {
//   "result": "OK",
//   "output": {
//     "revision": 43,
//     "devices": [
//       {
//         "deviceID": "8a3c...",
//         "friendlyName": "laptop",
//         "knownMACAddresses": ["AA:BB:CC:DD:EE:FF"],
//         "connections": [{"macAddress": "AA:BB:CC:DD:EE:FF", "ipAddress": "192.168.1.50"}]
//       }
//     ]
//   }
// }
// ```
//
// With `sinceRevision` 0 the router lists every device it knows. Otherwise
// it lists only the devices that changed since that revision.

use async_trait::async_trait;
use routerwatch_core::config::SourceConfig;
use routerwatch_core::traits::{
    Connection, Device, DeviceSource, DeviceSourceFactory, Revision, Snapshot,
};
use routerwatch_core::{Error, Result};
use serde::Deserialize;
use std::time::Duration;

/// JNAP action that lists attached devices
pub const GET_DEVICES_ACTION: &str = "http://linksys.com/jnap/devicelist/GetDevices";

/// Default HTTP timeout for router requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Successful JNAP result code
const RESULT_OK: &str = "OK";

/// JNAP device-list client
#[derive(Debug)]
pub struct JnapDeviceSource {
    /// Full JNAP endpoint (`{router}/JNAP/`)
    endpoint: String,

    /// HTTP client for router requests
    client: reqwest::Client,
}

impl JnapDeviceSource {
    /// Create a source for the router at `router_url`
    ///
    /// # Parameters
    ///
    /// - `router_url`: Router base URL, e.g. `http://192.168.1.1`
    pub fn new(router_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self::with_client(router_url, client)
    }

    /// Create a source that uses a preconfigured HTTP client
    pub fn with_client(router_url: &str, client: reqwest::Client) -> Self {
        Self {
            endpoint: endpoint(router_url),
            client,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl DeviceSource for JnapDeviceSource {
    async fn fetch(&self, since: Revision) -> Result<Snapshot> {
        tracing::debug!("Fetching devices from {} since revision {}", self.endpoint, since);

        let response = self
            .client
            .post(&self.endpoint)
            .header("X-JNAP-Action", GET_DEVICES_ACTION)
            .json(&request_body(since))
            .send()
            .await
            .map_err(|e| Error::device_source(format!("JNAP request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::device_source(format!("Failed to read JNAP response: {}", e)))?;

        if !status.is_success() {
            return Err(Error::device_source(format!(
                "Router returned HTTP {}: {}",
                status, body
            )));
        }

        let snapshot = parse_response(&body)?;
        tracing::trace!(
            "Revision {} lists {} device(s)",
            snapshot.revision,
            snapshot.devices.len()
        );
        Ok(snapshot)
    }

    fn source_name(&self) -> &'static str {
        "jnap"
    }
}

/// JNAP endpoint for a router base URL
fn endpoint(router_url: &str) -> String {
    format!("{}/JNAP/", router_url.trim_end_matches('/'))
}

/// Request payload for a device-list fetch
pub fn request_body(since: Revision) -> serde_json::Value {
    serde_json::json!({ "sinceRevision": since.0 })
}

/// Parse a GetDevices reply into a snapshot
///
/// # Errors
///
/// - The body is not valid JSON or lacks the expected fields
/// - `result` is anything other than `OK`
pub fn parse_response(body: &str) -> Result<Snapshot> {
    let reply: JnapReply = serde_json::from_str(body)
        .map_err(|e| Error::device_source(format!("Invalid JNAP response: {}", e)))?;

    if reply.result != RESULT_OK {
        return Err(Error::device_source(format!(
            "Router rejected GetDevices: {}",
            reply.result
        )));
    }

    let output = reply
        .output
        .ok_or_else(|| Error::device_source("JNAP response has no output"))?;

    Ok(Snapshot::new(
        Revision(output.revision),
        output.devices.into_iter().map(Device::from).collect(),
    ))
}

#[derive(Debug, Deserialize)]
struct JnapReply {
    result: String,
    #[serde(default)]
    output: Option<DeviceList>,
}

#[derive(Debug, Deserialize)]
struct DeviceList {
    revision: u64,
    #[serde(default)]
    devices: Vec<JnapDevice>,
}

#[derive(Debug, Deserialize)]
struct JnapDevice {
    #[serde(rename = "deviceID")]
    device_id: String,
    #[serde(rename = "friendlyName", default)]
    friendly_name: String,
    #[serde(rename = "knownMACAddresses", default)]
    known_mac_addresses: Vec<String>,
    #[serde(default)]
    connections: Vec<JnapConnection>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JnapConnection {
    #[serde(default)]
    mac_address: String,
    #[serde(default)]
    ip_address: String,
}

impl From<JnapDevice> for Device {
    fn from(device: JnapDevice) -> Self {
        Device {
            id: device.device_id,
            hostname: device.friendly_name,
            known_macs: device.known_mac_addresses,
            connections: device
                .connections
                .into_iter()
                .map(|c| Connection::new(c.ip_address, c.mac_address))
                .collect(),
        }
    }
}

/// Factory for creating JNAP sources
pub struct JnapFactory;

impl DeviceSourceFactory for JnapFactory {
    fn create(&self, config: &SourceConfig) -> Result<Box<dyn DeviceSource>> {
        match config {
            SourceConfig::Jnap { url } => {
                config.validate()?;
                Ok(Box::new(JnapDeviceSource::new(url)))
            }
            _ => Err(Error::config("Invalid config for JNAP source")),
        }
    }
}

/// Register the JNAP source with a registry
///
/// # Example
///
/// ```rust
/// use routerwatch_core::PluginRegistry;
///
/// let registry = PluginRegistry::with_builtin();
/// routerwatch_source_jnap::register(&registry);
/// assert!(registry.has_source("jnap"));
/// ```
pub fn register(registry: &routerwatch_core::PluginRegistry) {
    registry.register_source("jnap", Box::new(JnapFactory));
}
