//! Plugin-based source and sink registry
//!
//! The registry allows device sources and notification sinks to be
//! registered dynamically at runtime, avoiding hardcoded if-else chains.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use routerwatch_core::registry::PluginRegistry;
//!
//! // Registry with the built-in script sink
//! let registry = PluginRegistry::with_builtin();
//!
//! // Plugin crates register themselves
//! routerwatch_notify_pushover::register(&registry);
//! routerwatch_source_jnap::register(&registry);
//!
//! // Build everything from config
//! let source = registry.create_source(&config.source)?;
//! let dispatcher = registry.build_dispatcher(&config.sinks, config.engine.dispatch_mode)?;
//! ```

use crate::config::{SinkConfig, SourceConfig};
use crate::dispatch::{DispatchMode, Dispatcher};
use crate::error::{Error, Result};
use crate::sinks::ScriptSinkFactory;
use crate::traits::{DeviceSource, DeviceSourceFactory, NotificationSink, NotificationSinkFactory};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Registry for plugin-based source and sink creation
///
/// The registry maintains maps of type names to factory objects,
/// allowing dynamic instantiation based on configuration.
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct PluginRegistry {
    /// Registered device source factories
    sources: RwLock<HashMap<String, Box<dyn DeviceSourceFactory>>>,

    /// Registered notification sink factories
    sinks: RwLock<HashMap<String, Box<dyn NotificationSinkFactory>>>,
}

impl PluginRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in sinks already registered
    pub fn with_builtin() -> Self {
        let registry = Self::new();
        registry.register_sink("script", Box::new(ScriptSinkFactory));
        registry
    }

    /// Register a device source factory
    ///
    /// # Parameters
    ///
    /// - `name`: Source type name (e.g., "jnap")
    /// - `factory`: Factory object for creating source instances
    pub fn register_source(&self, name: impl Into<String>, factory: Box<dyn DeviceSourceFactory>) {
        let mut sources = self.sources.write().unwrap_or_else(PoisonError::into_inner);
        sources.insert(name.into(), factory);
    }

    /// Register a notification sink factory
    ///
    /// # Parameters
    ///
    /// - `name`: Sink type name (e.g., "pushover", "script")
    /// - `factory`: Factory object for creating sink instances
    pub fn register_sink(&self, name: impl Into<String>, factory: Box<dyn NotificationSinkFactory>) {
        let mut sinks = self.sinks.write().unwrap_or_else(PoisonError::into_inner);
        sinks.insert(name.into(), factory);
    }

    /// Create a device source from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn DeviceSource>)`: Created source instance
    /// - `Err(Error)`: If the source type is not registered or creation fails
    pub fn create_source(&self, config: &SourceConfig) -> Result<Box<dyn DeviceSource>> {
        let source_type = config.type_name();
        let sources = self.sources.read().unwrap_or_else(PoisonError::into_inner);

        let factory = sources
            .get(source_type)
            .ok_or_else(|| Error::config(format!("Unknown source type: {}", source_type)))?;

        factory.create(config)
    }

    /// Create a notification sink from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn NotificationSink>)`: Created sink instance
    /// - `Err(Error)`: If the sink type is not registered or creation fails
    pub fn create_sink(&self, config: &SinkConfig) -> Result<Box<dyn NotificationSink>> {
        let sink_type = config.type_name();
        let sinks = self.sinks.read().unwrap_or_else(PoisonError::into_inner);

        let factory = sinks
            .get(sink_type)
            .ok_or_else(|| Error::config(format!("Unknown sink type: {}", sink_type)))?;

        factory.create(config)
    }

    /// Create every configured sink, in order, behind one dispatcher
    pub fn build_dispatcher(&self, configs: &[SinkConfig], mode: DispatchMode) -> Result<Dispatcher> {
        let sinks = configs
            .iter()
            .map(|config| self.create_sink(config))
            .collect::<Result<Vec<_>>>()?;

        Ok(Dispatcher::new(sinks, mode))
    }

    /// List all registered source types
    pub fn list_sources(&self) -> Vec<String> {
        let sources = self.sources.read().unwrap_or_else(PoisonError::into_inner);
        sources.keys().cloned().collect()
    }

    /// List all registered sink types
    pub fn list_sinks(&self) -> Vec<String> {
        let sinks = self.sinks.read().unwrap_or_else(PoisonError::into_inner);
        sinks.keys().cloned().collect()
    }

    /// Check if a source type is registered
    pub fn has_source(&self, name: &str) -> bool {
        let sources = self.sources.read().unwrap_or_else(PoisonError::into_inner);
        sources.contains_key(name)
    }

    /// Check if a sink type is registered
    pub fn has_sink(&self, name: &str) -> bool {
        let sinks = self.sinks.read().unwrap_or_else(PoisonError::into_inner);
        sinks.contains_key(name)
    }
}
