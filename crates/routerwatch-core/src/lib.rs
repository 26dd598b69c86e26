// # routerwatch-core
//
// Core library for the router connection watcher.
//
// ## Architecture Overview
//
// This library watches a router's attached-device list and notifies on
// connect/disconnect transitions:
// - **DeviceSource**: Trait for fetching revision-tagged device snapshots
// - **NotificationSink**: Trait for delivering a rendered notification
// - **ConnectionTracker**: Connected-set diffing between snapshots
// - **NotificationTemplate**: Compiled user template for messages
// - **Dispatcher**: Ordered fan-out of one message to every sink
// - **WatchEngine**: The poll loop (fetch → diff → render → dispatch)
// - **PluginRegistry**: Plugin-based registry for sources and sinks
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from router and push-service clients
// 2. **Single Owner**: The engine owns all mutable state; no locking in the loop
// 3. **Plugin-Based**: Sinks are registered dynamically, no hard-coded if-else
// 4. **Library-First**: All core functionality can be used as a library
// 5. **Fail Loud**: Errors propagate to one top-level handler; a supervisor restarts

pub mod traits;
pub mod tracker;
pub mod template;
pub mod dispatch;
pub mod sinks;
pub mod engine;
pub mod registry;
pub mod config;
pub mod error;

// Re-export core types for convenience
pub use traits::{DeviceSource, NotificationSink};
pub use traits::{Connection, Device, NotificationEvent, Revision, Snapshot};
pub use tracker::{ConnectedSet, ConnectionTracker, ScanPolicy};
pub use template::{NotificationTemplate, DEFAULT_TEMPLATE};
pub use dispatch::{DispatchMode, Dispatcher};
pub use engine::{WatchEngine, send_test_notification};
pub use registry::PluginRegistry;
pub use config::{EngineConfig, SinkConfig, SourceConfig, WatchConfig};
pub use error::{Error, Result};
pub use sinks::ScriptSink;
