//! Logging setup on the tracing ecosystem.
//!
//! # Environment Variables
//!
//! - `SKILLCAP_LOG`: Filter directive (like `RUST_LOG`), e.g., `skillcap=debug`
//! - `SKILLCAP_LOG_FORMAT`: Output format for stderr: `pretty`, `json`, `compact`
//! - `SKILLCAP_LOG_DIR`: Directory for file logs (default `~/.skillcap/logs`)
//!
//! # Configuration
//!
//! Logging is configured via the `[logging]` section in `skillcap.toml`:
//!
//! ```toml
//! [logging]
//! level = "warn"
//! format = "pretty"
//!
//! [logging.file]
//! enabled = false
//! level = "debug"
//! ```
//!
//! # Example
//!
//! ```no_run
//! use skillcap_core::logging;
//!
//! let _guard = logging::init_logging(None)?;
//! # Ok::<(), skillcap_core::Error>(())
//! ```

use crate::Error;
use crate::config::{FileLoggingConfig, LoggingSettings};
use std::env;
use std::io;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Log output format for stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Pretty, human-readable output with colors (default for TTY)
    #[default]
    Pretty,
    /// JSON output (one line per event)
    Json,
    /// Compact, single-line output
    Compact,
}

impl LogFormat {
    /// All available log formats.
    pub const VALUES: &[LogFormat] = &[LogFormat::Pretty, LogFormat::Json, LogFormat::Compact];

    /// Parse a log format from a string.
    pub fn parse_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pretty" => Some(LogFormat::Pretty),
            "json" => Some(LogFormat::Json),
            "compact" => Some(LogFormat::Compact),
            _ => None,
        }
    }

    /// Get the string representation of this format.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
            LogFormat::Compact => "compact",
        }
    }
}

/// Logging configuration bridging the settings file and the subscriber.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Default log level for stderr output.
    pub level: String,
    /// Output format for stderr; `None` picks by TTY detection.
    pub format: Option<LogFormat>,
    /// File logging configuration (optional).
    pub file: Option<FileLoggingConfig>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "warn".to_string(), format: None, file: None }
    }
}

impl From<LoggingSettings> for LoggingConfig {
    fn from(settings: LoggingSettings) -> Self {
        Self {
            level: settings.level,
            format: LogFormat::parse_str(&settings.format),
            file: if settings.file.enabled { Some(settings.file) } else { None },
        }
    }
}

impl LoggingConfig {
    /// Create a new logging config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the log level.
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Set the output format.
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Enable file logging.
    pub fn with_file_logging(mut self, config: FileLoggingConfig) -> Self {
        self.file = Some(config);
        self
    }

    /// Build an EnvFilter from this config and environment variables.
    fn build_env_filter(&self) -> EnvFilter {
        let filter = env::var("SKILLCAP_LOG")
            .ok()
            .or_else(|| env::var("RUST_LOG").ok())
            .unwrap_or_else(|| self.level.clone());

        EnvFilter::try_new(&filter).unwrap_or_else(|_| EnvFilter::new("warn"))
    }

    /// Detect if stderr is a TTY for pretty formatting.
    fn is_tty() -> bool {
        atty::is(atty::Stream::Stderr)
    }

    /// Determine the appropriate format for stderr output.
    fn detect_format(&self) -> LogFormat {
        if let Ok(fmt_str) = env::var("SKILLCAP_LOG_FORMAT")
            && let Some(fmt) = LogFormat::parse_str(&fmt_str)
        {
            return fmt;
        }

        if let Some(format) = self.format {
            return format;
        }

        if Self::is_tty() { LogFormat::Pretty } else { LogFormat::Compact }
    }

    /// Get the log directory path.
    fn get_log_dir() -> Result<PathBuf, Error> {
        if let Ok(custom_dir) = env::var("SKILLCAP_LOG_DIR") {
            return Ok(PathBuf::from(custom_dir));
        }

        let home = dirs::home_dir().ok_or_else(|| Error::Logging("Could not determine home directory".to_string()))?;

        Ok(home.join(".skillcap").join("logs"))
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn stderr_layer(format: LogFormat) -> BoxedLayer {
    match format {
        LogFormat::Pretty => fmt::layer().pretty().with_writer(io::stderr).with_ansi(true).boxed(),
        LogFormat::Json => fmt::layer().json().with_writer(io::stderr).boxed(),
        LogFormat::Compact => fmt::layer().compact().with_writer(io::stderr).boxed(),
    }
}

/// Initialize the global tracing subscriber.
///
/// Sets up an environment-based filter (`SKILLCAP_LOG`, then `RUST_LOG`, then the
/// configured level), formatted stderr output and, when enabled, daily-rotated
/// JSON file logging. The returned guard flushes the file writer on drop and must
/// be held for as long as file logging should stay active.
pub fn init_logging(config: Option<LoggingConfig>) -> Result<Option<WorkerGuard>, Error> {
    let config = config.unwrap_or_default();
    let format = config.detect_format();

    let mut layers: Vec<BoxedLayer> = vec![stderr_layer(format).with_filter(config.build_env_filter()).boxed()];
    let mut guard = None;

    if let Some(file_config) = &config.file {
        let log_dir = LoggingConfig::get_log_dir()?;
        std::fs::create_dir_all(&log_dir)
            .map_err(|e| Error::Logging(format!("Failed to create log directory: {}", e)))?;

        let file_appender = tracing_appender::rolling::daily(log_dir, "skillcap.log");
        let (non_blocking, file_guard) = tracing_appender::non_blocking(file_appender);
        let file_filter = EnvFilter::try_new(&file_config.level).unwrap_or_else(|_| EnvFilter::new("debug"));
        layers.push(fmt::layer().json().with_writer(non_blocking).with_filter(file_filter).boxed());
        guard = Some(file_guard);
    }

    Registry::default()
        .with(layers)
        .try_init()
        .map_err(|e| Error::Logging(e.to_string()))?;

    Ok(guard)
}
