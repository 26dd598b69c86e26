// # Built-in Notification Sinks
//
// This module provides the sinks that need no third-party API. Push-service
// sinks live in their own `routerwatch-notify-*` crates.

pub mod script;

pub use script::{ScriptSink, ScriptSinkFactory};
