//! Structured logging for clinparse.
//!
//! Logging is built on `tracing`. [`init`] installs a global subscriber with an
//! `EnvFilter` (seeded from the configured level, overridable through `RUST_LOG`), the
//! configured output format and either stdout or a non-blocking file writer.


use crate::config::{LogFormat, LogLevel, LoggingConfig};
use std::path::Path;
use std::sync::OnceLock;
use time::format_description::well_known::Rfc3339;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::OffsetTime;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

/// Keeps the file writer flushing for the lifetime of the process.
static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Error type for logging operations
#[derive(Debug)]
pub enum LogError {
    /// IO error occurred
    IoError(std::io::Error),

    /// Error parsing log level
    InvalidLogLevel(String),

    /// Error in subscriber setup
    SubscriberError(Box<dyn std::error::Error + Send + Sync>),
}

impl From<std::io::Error> for LogError {
    fn from(err: std::io::Error) -> Self {
        LogError::IoError(err)
    }
}

/// Result type for logging operations
pub type Result<T> = std::result::Result<T, LogError>;

/// Initialize the logging system with the given configuration.
///
/// Calling it again once a global subscriber exists is not an error.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = build_filter(config.level)?;
    let writer = make_writer(config)?;
    let timer = OffsetTime::new(
        time::UtcOffset::current_local_offset().unwrap_or(time::UtcOffset::UTC),
        Rfc3339,
    );

    let layer: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_timer(timer)
            .with_writer(writer)
            .with_target(true)
            .with_line_number(true)
            .with_thread_ids(true)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_timer(timer)
            .with_writer(writer)
            .with_target(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_timer(timer)
            .with_writer(writer)
            .with_target(true)
            .with_line_number(true)
            .with_thread_ids(true)
            .boxed(),
        LogFormat::Default => fmt::layer()
            .with_timer(timer)
            .with_writer(writer)
            .with_target(true)
            .boxed(),
    };

    match tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .try_init()
    {
        Ok(()) => Ok(()),
        Err(e) if e.to_string().contains("already been set") => Ok(()),
        Err(e) => Err(LogError::SubscriberError(Box::new(e))),
    }
}

/// `RUST_LOG` wins over the configured level when set.
fn build_filter(level: LogLevel) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(level.to_string())
        .map_err(|e| LogError::InvalidLogLevel(format!("{}: {}", level, e)))
}

fn make_writer(config: &LoggingConfig) -> Result<BoxMakeWriter> {
    match &config.file {
        Some(path) if !config.stdout => {
            let (writer, guard) = create_non_blocking_file(path)?;
            // a second init keeps the first guard alive
            let _ = FILE_GUARD.set(guard);
            Ok(BoxMakeWriter::new(writer))
        }
        Some(_) => {
            eprintln!("Logging configured for stdout and file; writing to stdout only");
            Ok(BoxMakeWriter::new(std::io::stdout))
        }
        None if config.stdout => Ok(BoxMakeWriter::new(std::io::stdout)),
        None => Ok(BoxMakeWriter::new(std::io::sink)),
    }
}

/// Create a non-blocking file writer.
fn create_non_blocking_file(
    path: impl AsRef<Path>,
) -> Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    let path = path.as_ref();

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent)?;
    }

    let file_name = path.file_name().ok_or_else(|| {
        LogError::IoError(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("Log path has no file name: {}", path.display()),
        ))
    })?;

    let file_appender = tracing_appender::rolling::never(
        path.parent().unwrap_or_else(|| Path::new(".")),
        file_name,
    );

    Ok(tracing_appender::non_blocking(file_appender))
}

/// Parse a log level string into a LogLevel enum.
pub fn parse_log_level(level: &str) -> Result<LogLevel> {
    level
        .parse::<LogLevel>()
        .map_err(|_| LogError::InvalidLogLevel(level.to_string()))
}

/// Convert a tracing::Level to a LogLevel enum.
pub fn level_to_log_level(level: Level) -> LogLevel {
    match level {
        Level::TRACE => LogLevel::Trace,
        Level::DEBUG => LogLevel::Debug,
        Level::INFO => LogLevel::Info,
        Level::WARN => LogLevel::Warn,
        Level::ERROR => LogLevel::Error,
    }
}

impl std::fmt::Display for LogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogError::IoError(e) => write!(f, "IO error: {}", e),
            LogError::SubscriberError(e) => write!(f, "Subscriber error: {}", e),
            LogError::InvalidLogLevel(s) => write!(f, "Invalid log level: {}", s),
        }
    }
}

impl std::error::Error for LogError {}
