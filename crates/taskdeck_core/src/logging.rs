//! Rolling-file log bootstrap for embedding applications.
//!
//! # Responsibility
//! - Start the process-wide log sink exactly once, from a `LogConfig`.
//! - Capture panics into the log as single-line events.
//!
//! # Invariants
//! - A second init with the same config is a no-op; a conflicting config
//!   is refused without touching the active sink.
//! - Bootstrap never panics; every failure surfaces as `LoggingError`.

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

const LOG_BASENAME: &str = "taskdeck";
const ROTATE_AT_BYTES: u64 = 8 * 1024 * 1024;
const KEEP_ROTATED_FILES: usize = 4;
const PANIC_LINE_MAX_CHARS: usize = 160;

static ACTIVE: OnceCell<ActiveLogger> = OnceCell::new();
static PANIC_HOOK: OnceCell<()> = OnceCell::new();

struct ActiveLogger {
    config: LogConfig,
    _handle: LoggerHandle,
}

/// Verbosity of the log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Parses a user-supplied level name. `None` for anything unknown.
    pub fn parse(value: &str) -> Option<LogLevel> {
        match value.trim().to_ascii_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// Debug builds log at debug, release builds at info.
    pub fn default_for_build() -> LogLevel {
        if cfg!(debug_assertions) {
            LogLevel::Debug
        } else {
            LogLevel::Info
        }
    }
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where and how loud the process logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub level: LogLevel,
    pub directory: PathBuf,
}

impl LogConfig {
    pub fn new(level: LogLevel, directory: impl Into<PathBuf>) -> LogConfig {
        LogConfig {
            level,
            directory: directory.into(),
        }
    }
}

/// Bootstrap failures.
#[derive(Debug)]
pub enum LoggingError {
    /// The log directory must be absolute so rotation is unambiguous.
    RelativeDirectory(PathBuf),
    Io(std::io::Error),
    /// The logger backend refused to start.
    Backend(String),
    /// A sink is already active under a different config.
    AlreadyActive { active: LogConfig },
}

impl Display for LoggingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RelativeDirectory(path) => {
                write!(f, "log directory must be absolute, got `{}`", path.display())
            }
            Self::Io(error) => write!(f, "log directory not usable: {error}"),
            Self::Backend(message) => write!(f, "logger failed to start: {message}"),
            Self::AlreadyActive { active } => write!(
                f,
                "logging already active at level {} in `{}`",
                active.level,
                active.directory.display()
            ),
        }
    }
}

impl Error for LoggingError {}

impl From<std::io::Error> for LoggingError {
    fn from(error: std::io::Error) -> LoggingError {
        LoggingError::Io(error)
    }
}

/// Starts logging per `config`. Idempotent for an identical config.
pub fn init_logging(config: &LogConfig) -> Result<(), LoggingError> {
    if !config.directory.is_absolute() {
        return Err(LoggingError::RelativeDirectory(config.directory.clone()));
    }

    let active = ACTIVE.get_or_try_init(|| -> Result<ActiveLogger, LoggingError> {
        std::fs::create_dir_all(&config.directory)?;
        let handle = Logger::try_with_str(config.level.as_str())
            .map_err(|err| LoggingError::Backend(err.to_string()))?
            .log_to_file(
                FileSpec::default()
                    .directory(&config.directory)
                    .basename(LOG_BASENAME),
            )
            .rotate(
                Criterion::Size(ROTATE_AT_BYTES),
                Naming::Numbers,
                Cleanup::KeepLogFiles(KEEP_ROTATED_FILES),
            )
            .write_mode(WriteMode::BufferAndFlush)
            .append()
            .format_for_files(flexi_logger::detailed_format)
            .start()
            .map_err(|err| LoggingError::Backend(err.to_string()))?;

        install_panic_hook();
        info!(
            "event=log_open module=logging status=ok level={} dir={} version={}",
            config.level,
            config.directory.display(),
            env!("CARGO_PKG_VERSION")
        );
        Ok(ActiveLogger {
            config: config.clone(),
            _handle: handle,
        })
    })?;

    if active.config == *config {
        Ok(())
    } else {
        Err(LoggingError::AlreadyActive {
            active: active.config.clone(),
        })
    }
}

/// The active config, or `None` before init.
pub fn logging_status() -> Option<&'static LogConfig> {
    ACTIVE.get().map(|active| &active.config)
}

fn install_panic_hook() {
    if PANIC_HOOK.set(()).is_err() {
        return;
    }
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        error!(
            "event=panic_captured module=logging status=error location={} payload={}",
            location,
            panic_line(panic_info)
        );
        previous(panic_info);
    }));
}

/// Panic payloads can carry arbitrary user text; collapse them to one
/// capped line before they reach the file.
fn panic_line(info: &std::panic::PanicHookInfo<'_>) -> String {
    let payload = if let Some(message) = info.payload().downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = info.payload().downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    };
    let normalized = payload.replace(['\n', '\r'], " ");
    let mut line: String = normalized.chars().take(PANIC_LINE_MAX_CHARS).collect();
    if normalized.chars().count() > PANIC_LINE_MAX_CHARS {
        line.push_str("...");
    }
    line
}

#[cfg(test)]
mod tests {
    use super::{init_logging, logging_status, LogConfig, LogLevel, LoggingError};
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_temp_dir(suffix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time should be after unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "taskdeck-logging-{suffix}-{}-{nanos}",
            std::process::id()
        ))
    }

    #[test]
    fn level_parse_accepts_aliases_and_rejects_junk() {
        assert_eq!(LogLevel::parse("INFO"), Some(LogLevel::Info));
        assert_eq!(LogLevel::parse(" warning "), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("loud"), None);
    }

    #[test]
    fn relative_directories_are_refused() {
        let config = LogConfig::new(LogLevel::Info, "logs/dev");
        let err = init_logging(&config).expect_err("relative paths must be rejected");
        assert!(matches!(err, LoggingError::RelativeDirectory(_)));
    }

    #[test]
    fn init_is_idempotent_and_refuses_conflicts() {
        let config = LogConfig::new(LogLevel::Info, unique_temp_dir("primary"));
        init_logging(&config).expect("first init should succeed");
        init_logging(&config).expect("same config should be idempotent");

        let conflicting = LogConfig::new(LogLevel::Debug, unique_temp_dir("other"));
        let err = init_logging(&conflicting).expect_err("conflicting config should fail");
        assert!(matches!(err, LoggingError::AlreadyActive { .. }));

        assert_eq!(logging_status(), Some(&config));
    }
}
