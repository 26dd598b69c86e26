// # routerwatchd - Router Connection Watcher Daemon
//
// The routerwatchd daemon is a thin integration layer. It is responsible for:
// 1. Reading configuration from environment variables
// 2. Registering the router source and notification sinks
// 3. Either sending one test notification, or running the watch engine
//
// All watching, diffing and rendering lives in routerwatch-core.
//
// ## Configuration
//
// All configuration is done via environment variables. Empty values count
// as unset.
//
// ### Router
// - `ROUTERWATCH_ROUTER_URL`: JNAP router base URL (default http://192.168.1.1)
// - `ROUTERWATCH_UPDATE_INTERVAL`: Poll interval in seconds, 1-3600 (default 1)
//
// ### Notifications
// - `ROUTERWATCH_NOTIFICATION`: Notification template
// - `ROUTERWATCH_SHELL_SCRIPT`: Script run with (hostname, connected, ip, mac)
// - `ROUTERWATCH_PUSHOVER_APP` / `ROUTERWATCH_PUSHOVER_USER`: Pushover credentials
// - `ROUTERWATCH_PUSHBULLET`: Pushbullet access token
// - `ROUTERWATCH_NMA`: Notify My Android API key
//
// ### Behavior
// - `ROUTERWATCH_TEST_NOTIFICATION`: `true` sends one test notification and exits
// - `ROUTERWATCH_SCAN_POLICY`: `first-connect` (default) or `all`
// - `ROUTERWATCH_SINK_FAILURES`: `fatal` (default) or `log`
// - `ROUTERWATCH_LOG_LEVEL`: trace, debug, info, warn, error (default info)
//
// ## Example
//
// ```bash
// export ROUTERWATCH_PUSHBULLET=o.your_token
// export ROUTERWATCH_NOTIFICATION='{{.Hostname}} {{if .Connected}}joined ({{.IP}}){{else}}left{{end}}'
//
// routerwatchd
// ```

use anyhow::Result;
use routerwatch_core::config::DEFAULT_ROUTER_URL;
use routerwatch_core::{
    DispatchMode, EngineConfig, NotificationTemplate, PluginRegistry, ScanPolicy, SinkConfig,
    SourceConfig, WatchConfig, WatchEngine, DEFAULT_TEMPLATE,
};
use std::env;
use std::process::ExitCode;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown (self-test delivered)
/// - 1: Configuration or startup error
/// - 2: Runtime error (router or sink failure)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RouterwatchExitCode {
    CleanShutdown = 0,
    ConfigError = 1,
    RuntimeError = 2,
}

impl From<RouterwatchExitCode> for ExitCode {
    fn from(code: RouterwatchExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
///
/// Credentials are held here, so this type deliberately has no Debug impl.
struct Config {
    test_notification: bool,
    update_interval: u64,
    notification_template: String,
    shell_script: Option<String>,
    pushover_app: Option<String>,
    pushover_user: Option<String>,
    pushbullet_token: Option<String>,
    nma_key: Option<String>,
    router_url: String,
    scan_policy: ScanPolicy,
    dispatch_mode: DispatchMode,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup
    ///
    /// Empty or whitespace-only values are treated as unset.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let test_notification = match value("ROUTERWATCH_TEST_NOTIFICATION") {
            Some(raw) => parse_bool("ROUTERWATCH_TEST_NOTIFICATION", &raw)?,
            None => false,
        };

        let update_interval = match value("ROUTERWATCH_UPDATE_INTERVAL") {
            Some(raw) => raw.trim().parse().map_err(|_| {
                anyhow::anyhow!(
                    "ROUTERWATCH_UPDATE_INTERVAL must be a whole number of seconds. Got: {}",
                    raw
                )
            })?,
            None => 1,
        };

        let scan_policy = match value("ROUTERWATCH_SCAN_POLICY").as_deref().map(str::trim) {
            None | Some("first-connect") => ScanPolicy::StopAfterFirstConnect,
            Some("all") => ScanPolicy::ReportAll,
            Some(other) => anyhow::bail!(
                "ROUTERWATCH_SCAN_POLICY '{}' is not valid. Valid policies: first-connect, all",
                other
            ),
        };

        let dispatch_mode = match value("ROUTERWATCH_SINK_FAILURES").as_deref().map(str::trim) {
            None | Some("fatal") => DispatchMode::FailFast,
            Some("log") => DispatchMode::LogAndContinue,
            Some(other) => anyhow::bail!(
                "ROUTERWATCH_SINK_FAILURES '{}' is not valid. Valid modes: fatal, log",
                other
            ),
        };

        Ok(Self {
            test_notification,
            update_interval,
            notification_template: value("ROUTERWATCH_NOTIFICATION")
                .unwrap_or_else(|| DEFAULT_TEMPLATE.to_string()),
            shell_script: value("ROUTERWATCH_SHELL_SCRIPT"),
            pushover_app: value("ROUTERWATCH_PUSHOVER_APP"),
            pushover_user: value("ROUTERWATCH_PUSHOVER_USER"),
            pushbullet_token: value("ROUTERWATCH_PUSHBULLET"),
            nma_key: value("ROUTERWATCH_NMA"),
            router_url: value("ROUTERWATCH_ROUTER_URL")
                .unwrap_or_else(|| DEFAULT_ROUTER_URL.to_string()),
            scan_policy,
            dispatch_mode,
            log_level: value("ROUTERWATCH_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    ///
    /// Checks numeric ranges, the router URL scheme, the log level, and that
    /// the notification template compiles.
    fn validate(&self) -> Result<()> {
        if !(1..=3600).contains(&self.update_interval) {
            anyhow::bail!(
                "ROUTERWATCH_UPDATE_INTERVAL must be between 1 and 3600 seconds. Got: {}",
                self.update_interval
            );
        }

        if !self.router_url.starts_with("http://") && !self.router_url.starts_with("https://") {
            anyhow::bail!(
                "ROUTERWATCH_ROUTER_URL must use HTTP or HTTPS scheme. Got: {}",
                self.router_url
            );
        }

        if let Err(e) = NotificationTemplate::compile(&self.notification_template) {
            anyhow::bail!("ROUTERWATCH_NOTIFICATION is not a valid template: {}", e);
        }

        parse_log_level(&self.log_level)?;

        Ok(())
    }

    /// Sink configurations in dispatch order
    ///
    /// Order is fixed: script, Pushover, Pushbullet, Notify My Android.
    /// A service without credentials is left out.
    fn sink_configs(&self) -> Vec<SinkConfig> {
        let mut sinks = Vec::new();

        if let Some(path) = &self.shell_script {
            sinks.push(SinkConfig::Script { path: path.clone() });
        }

        match (&self.pushover_app, &self.pushover_user) {
            (Some(app_token), Some(user_key)) => sinks.push(SinkConfig::Pushover {
                app_token: app_token.clone(),
                user_key: user_key.clone(),
            }),
            (None, None) => {}
            _ => warn!(
                "Pushover needs both ROUTERWATCH_PUSHOVER_APP and ROUTERWATCH_PUSHOVER_USER; skipping"
            ),
        }

        if let Some(access_token) = &self.pushbullet_token {
            sinks.push(SinkConfig::Pushbullet {
                access_token: access_token.clone(),
            });
        }

        if let Some(api_key) = &self.nma_key {
            sinks.push(SinkConfig::Nma {
                api_key: api_key.clone(),
            });
        }

        sinks
    }

    /// Library configuration for the watch engine
    fn watch_config(&self) -> WatchConfig {
        WatchConfig {
            source: SourceConfig::Jnap {
                url: self.router_url.clone(),
            },
            sinks: self.sink_configs(),
            notification_template: self.notification_template.clone(),
            engine: EngineConfig {
                update_interval_secs: self.update_interval,
                scan_policy: self.scan_policy,
                dispatch_mode: self.dispatch_mode,
            },
        }
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => anyhow::bail!("{} must be true or false. Got: {}", key, raw),
    }
}

fn parse_log_level(level: &str) -> Result<Level> {
    match level.trim().to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "ROUTERWATCH_LOG_LEVEL '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            level
        ),
    }
}

/// Registry with every plugin compiled into this binary
fn plugin_registry() -> PluginRegistry {
    let registry = PluginRegistry::with_builtin();

    #[cfg(feature = "jnap")]
    routerwatch_source_jnap::register(&registry);

    #[cfg(feature = "pushover")]
    routerwatch_notify_pushover::register(&registry);

    #[cfg(feature = "pushbullet")]
    routerwatch_notify_pushbullet::register(&registry);

    #[cfg(feature = "nma")]
    routerwatch_notify_nma::register(&registry);

    registry
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return RouterwatchExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return RouterwatchExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = parse_log_level(&config.log_level).unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return RouterwatchExitCode::ConfigError.into();
    }

    info!("Starting routerwatchd");

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return RouterwatchExitCode::RuntimeError.into();
        }
    };

    rt.block_on(run_daemon(config)).into()
}

/// Build the components and run the selected mode
async fn run_daemon(config: Config) -> RouterwatchExitCode {
    let registry = plugin_registry();
    let watch_config = config.watch_config();

    let dispatcher = match registry.build_dispatcher(
        &watch_config.sinks,
        watch_config.engine.dispatch_mode,
    ) {
        Ok(dispatcher) => dispatcher,
        Err(e) => {
            error!("Failed to configure notification sinks: {}", e);
            return RouterwatchExitCode::ConfigError;
        }
    };

    if dispatcher.is_empty() {
        warn!("No notification sinks configured; transitions will only be logged");
    } else {
        info!("Notification sinks: {}", dispatcher.sink_names().join(", "));
    }

    if config.test_notification {
        let template = match NotificationTemplate::compile(&watch_config.notification_template) {
            Ok(template) => template,
            Err(e) => {
                error!("{}", e);
                return RouterwatchExitCode::ConfigError;
            }
        };

        return match routerwatch_core::send_test_notification(&template, &dispatcher).await {
            Ok(()) => {
                info!("Test notification sent");
                RouterwatchExitCode::CleanShutdown
            }
            Err(e) => {
                error!("Test notification failed: {}", e);
                RouterwatchExitCode::RuntimeError
            }
        };
    }

    let source = match registry.create_source(&watch_config.source) {
        Ok(source) => source,
        Err(e) => {
            error!("Failed to configure router source: {}", e);
            return RouterwatchExitCode::ConfigError;
        }
    };

    let mut engine = match WatchEngine::new(source, dispatcher, &watch_config) {
        Ok(engine) => engine,
        Err(e) => {
            error!("Failed to start watch engine: {}", e);
            return RouterwatchExitCode::ConfigError;
        }
    };

    info!("Watching {}", config.router_url);

    match engine.run().await {
        Ok(()) => RouterwatchExitCode::CleanShutdown,
        Err(e) => {
            error!("Daemon error: {}", e);
            RouterwatchExitCode::RuntimeError
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();

        assert!(!config.test_notification);
        assert_eq!(config.update_interval, 1);
        assert_eq!(config.notification_template, DEFAULT_TEMPLATE);
        assert_eq!(config.router_url, "http://192.168.1.1");
        assert_eq!(config.scan_policy, ScanPolicy::StopAfterFirstConnect);
        assert_eq!(config.dispatch_mode, DispatchMode::FailFast);
        assert_eq!(config.log_level, "info");
        assert!(config.sink_configs().is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_values_are_unset() {
        let config = config_from(&[
            ("ROUTERWATCH_UPDATE_INTERVAL", ""),
            ("ROUTERWATCH_NOTIFICATION", ""),
            ("ROUTERWATCH_SHELL_SCRIPT", "  "),
            ("ROUTERWATCH_PUSHBULLET", ""),
        ])
        .unwrap();

        assert_eq!(config.update_interval, 1);
        assert_eq!(config.notification_template, DEFAULT_TEMPLATE);
        assert!(config.sink_configs().is_empty());
    }

    #[test]
    fn test_sinks_in_fixed_order() {
        let config = config_from(&[
            ("ROUTERWATCH_NMA", "nma-key"),
            ("ROUTERWATCH_PUSHBULLET", "o.token"),
            ("ROUTERWATCH_PUSHOVER_USER", "user"),
            ("ROUTERWATCH_PUSHOVER_APP", "app"),
            ("ROUTERWATCH_SHELL_SCRIPT", "/usr/local/bin/on-change"),
        ])
        .unwrap();

        let names: Vec<String> = config
            .sink_configs()
            .iter()
            .map(|sink| sink.type_name().to_string())
            .collect();
        assert_eq!(names, vec!["script", "pushover", "pushbullet", "nma"]);
    }

    #[test]
    fn test_half_configured_pushover_is_skipped() {
        let config = config_from(&[("ROUTERWATCH_PUSHOVER_APP", "app")]).unwrap();
        assert!(config.sink_configs().is_empty());

        let config = config_from(&[("ROUTERWATCH_PUSHOVER_USER", "user")]).unwrap();
        assert!(config.sink_configs().is_empty());

        // The skipped pair never reaches library validation
        let config = config_from(&[
            ("ROUTERWATCH_PUSHOVER_APP", "app"),
            ("ROUTERWATCH_PUSHBULLET", "o.token"),
        ])
        .unwrap();
        let watch = config.watch_config();
        assert_eq!(watch.sinks.len(), 1);
        assert_eq!(watch.sinks[0].type_name(), "pushbullet");
        assert!(watch.validate().is_ok());
    }

    #[test]
    fn test_interval_parsing_and_range() {
        let config = config_from(&[("ROUTERWATCH_UPDATE_INTERVAL", "30")]).unwrap();
        assert_eq!(config.update_interval, 30);
        assert!(config.validate().is_ok());

        assert!(config_from(&[("ROUTERWATCH_UPDATE_INTERVAL", "1.5")]).is_err());
        assert!(config_from(&[("ROUTERWATCH_UPDATE_INTERVAL", "-1")]).is_err());

        let zero = config_from(&[("ROUTERWATCH_UPDATE_INTERVAL", "0")]).unwrap();
        assert!(zero.validate().is_err());

        let huge = config_from(&[("ROUTERWATCH_UPDATE_INTERVAL", "3601")]).unwrap();
        assert!(huge.validate().is_err());
    }

    #[test]
    fn test_test_notification_flag() {
        for raw in ["true", "TRUE", "1", "yes"] {
            let config = config_from(&[("ROUTERWATCH_TEST_NOTIFICATION", raw)]).unwrap();
            assert!(config.test_notification, "{}", raw);
        }

        let config = config_from(&[("ROUTERWATCH_TEST_NOTIFICATION", "false")]).unwrap();
        assert!(!config.test_notification);

        assert!(config_from(&[("ROUTERWATCH_TEST_NOTIFICATION", "maybe")]).is_err());
    }

    #[test]
    fn test_policy_options() {
        let config = config_from(&[
            ("ROUTERWATCH_SCAN_POLICY", "all"),
            ("ROUTERWATCH_SINK_FAILURES", "log"),
        ])
        .unwrap();
        assert_eq!(config.scan_policy, ScanPolicy::ReportAll);
        assert_eq!(config.dispatch_mode, DispatchMode::LogAndContinue);

        assert!(config_from(&[("ROUTERWATCH_SCAN_POLICY", "every")]).is_err());
        assert!(config_from(&[("ROUTERWATCH_SINK_FAILURES", "ignore")]).is_err());
    }

    #[test]
    fn test_invalid_template_rejected() {
        let config = config_from(&[("ROUTERWATCH_NOTIFICATION", "{{if .Connected}}up")]).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("ROUTERWATCH_NOTIFICATION"), "{}", err);
    }

    #[test]
    fn test_invalid_router_url_rejected() {
        let config = config_from(&[("ROUTERWATCH_ROUTER_URL", "192.168.1.1")]).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let config = config_from(&[("ROUTERWATCH_LOG_LEVEL", "verbose")]).unwrap();
        assert!(config.validate().is_err());

        let config = config_from(&[("ROUTERWATCH_LOG_LEVEL", "DEBUG")]).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_watch_config() {
        let config = config_from(&[
            ("ROUTERWATCH_ROUTER_URL", "https://router.lan"),
            ("ROUTERWATCH_UPDATE_INTERVAL", "5"),
            ("ROUTERWATCH_NMA", "nma-key"),
        ])
        .unwrap();

        let watch = config.watch_config();
        assert!(watch.validate().is_ok());
        assert_eq!(watch.source.type_name(), "jnap");
        assert_eq!(watch.engine.update_interval_secs, 5);
        assert_eq!(watch.sinks.len(), 1);
    }

    #[test]
    fn test_registry_has_default_plugins() {
        let registry = plugin_registry();
        assert!(registry.has_sink("script"));

        #[cfg(feature = "jnap")]
        assert!(registry.has_source("jnap"));
        #[cfg(feature = "pushover")]
        assert!(registry.has_sink("pushover"));
        #[cfg(feature = "pushbullet")]
        assert!(registry.has_sink("pushbullet"));
        #[cfg(feature = "nma")]
        assert!(registry.has_sink("nma"));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(RouterwatchExitCode::CleanShutdown as u8, 0);
        assert_eq!(RouterwatchExitCode::ConfigError as u8, 1);
        assert_eq!(RouterwatchExitCode::RuntimeError as u8, 2);
    }

    #[tokio::test]
    async fn test_self_test_without_sinks_exits_cleanly() {
        let config = config_from(&[("ROUTERWATCH_TEST_NOTIFICATION", "true")]).unwrap();
        assert_eq!(run_daemon(config).await, RouterwatchExitCode::CleanShutdown);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_self_test_with_failing_script_is_a_runtime_error() {
        let config = config_from(&[
            ("ROUTERWATCH_TEST_NOTIFICATION", "true"),
            ("ROUTERWATCH_SHELL_SCRIPT", "false"),
        ])
        .unwrap();
        assert_eq!(run_daemon(config).await, RouterwatchExitCode::RuntimeError);
    }
}
