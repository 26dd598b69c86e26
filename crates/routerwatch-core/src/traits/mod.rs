//! Core traits for the router watcher
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`DeviceSource`]: Fetch revision-tagged device snapshots from a router
//! - [`NotificationSink`]: Deliver a rendered notification to one channel

pub mod device_source;
pub mod notification_sink;

pub use device_source::{Connection, Device, DeviceSource, DeviceSourceFactory, Revision, Snapshot};
pub use notification_sink::{NotificationEvent, NotificationSink, NotificationSinkFactory};
