//! Structured logging setup for truthlens
//!
//! Console output by default, JSON lines for log shippers. `RUST_LOG`
//! replaces the built-in filter entirely when set.
//!
//! ```no_run
//! use truthlens::util::logging;
//!
//! logging::init_from_env();
//! tracing::info!(stage = "vision", "Stage started");
//! ```

use std::env;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Noisy dependencies capped at warn unless `RUST_LOG` says otherwise
const QUIET_TARGETS: &[&str] = &["h2", "hyper", "hyper_util", "reqwest", "genai"];

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum level for the `truthlens` target
    pub level: Level,

    /// Emit JSON lines instead of human-readable output
    pub use_json: bool,

    pub include_target: bool,

    /// Include file and line number information
    pub include_location: bool,

    pub include_thread_ids: bool,

    /// Log every HTTP request through tower-http at the same level
    pub trace_requests: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            use_json: false,
            include_target: true,
            include_location: false,
            include_thread_ids: false,
            trace_requests: true,
        }
    }
}

impl LoggingConfig {
    pub fn with_level(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// JSON output with full metadata, for the server behind a log collector
    pub fn production() -> Self {
        Self {
            level: Level::INFO,
            use_json: true,
            include_target: true,
            include_location: true,
            include_thread_ids: true,
            trace_requests: true,
        }
    }

    /// Builds the default filter directive string
    pub fn filter_directives(&self) -> String {
        let level = self.level.to_string().to_lowercase();
        let mut directives = vec![format!("truthlens={}", level)];
        if self.trace_requests {
            directives.push(format!("tower_http={}", level));
        }
        directives.extend(QUIET_TARGETS.iter().map(|t| format!("{}=warn", t)));
        directives.join(",")
    }
}

/// Parses a log level, falling back to INFO on unknown input
pub fn parse_level(level_str: &str) -> Level {
    match level_str.trim().to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!(
                "Invalid log level '{}', defaulting to INFO. Valid levels: trace, debug, info, warn, error",
                level_str
            );
            Level::INFO
        }
    }
}

/// Installs the global subscriber; later calls are ignored
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.filter_directives()));

        let result = if config.use_json {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(std::io::stderr)
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location)
                        .with_thread_ids(config.include_thread_ids)
                        .with_thread_names(config.include_thread_ids),
                )
                .try_init()
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location)
                        .with_thread_ids(config.include_thread_ids)
                        .with_thread_names(config.include_thread_ids),
                )
                .try_init()
        };

        if let Err(e) = result {
            eprintln!("Logging already initialized: {}", e);
        }
    });
}

/// Reads `TRUTHLENS_LOG_LEVEL` and `TRUTHLENS_LOG_JSON`
pub fn config_from_env() -> LoggingConfig {
    let level = env::var("TRUTHLENS_LOG_LEVEL")
        .map(|v| parse_level(&v))
        .unwrap_or(Level::INFO);

    let use_json = env::var("TRUTHLENS_LOG_JSON")
        .ok()
        .and_then(|v| v.trim().parse::<bool>().ok())
        .unwrap_or(false);

    if use_json {
        LoggingConfig {
            level,
            ..LoggingConfig::production()
        }
    } else {
        LoggingConfig::with_level(level)
    }
}

pub fn init_from_env() {
    init_logging(config_from_env());
}
