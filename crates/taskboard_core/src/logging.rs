//! Rolling file logging for hosts embedding the board core.
//!
//! # Responsibility
//! - Install one `flexi_logger` file sink per process from [`LoggingConfig`].
//! - Route panics through the same `event=.. module=..` record shape used by
//!   the services.
//!
//! # Invariants
//! - Board content (names, comment text) is never logged; records carry ids,
//!   counts and status only.
//! - A repeated initialization must describe the active sink exactly;
//!   anything else is rejected and the active sink stays in place.

use crate::config::{LogLevel, LoggingConfig};
use flexi_logger::{
    Cleanup, Criterion, FileSpec, FlexiLoggerError, Logger, LoggerHandle, Naming, WriteMode,
};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const MAX_PANIC_PAYLOAD_CHARS: usize = 160;

static ACTIVE_SINK: OnceCell<ActiveSink> = OnceCell::new();

/// Identity of one file sink; two configs naming the same sink may share it.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SinkSpec {
    level: LogLevel,
    dir: PathBuf,
    file_basename: String,
}

struct ActiveSink {
    spec: SinkSpec,
    _handle: LoggerHandle,
}

/// Logging bootstrap errors.
#[derive(Debug)]
pub enum LoggingError {
    RelativeDirectory(PathBuf),
    CreateDirectory {
        dir: PathBuf,
        source: std::io::Error,
    },
    Backend(FlexiLoggerError),
    /// Another sink is already installed in this process.
    Conflict {
        active_level: LogLevel,
        active_dir: PathBuf,
    },
}

impl Display for LoggingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RelativeDirectory(dir) => {
                write!(f, "log directory must be absolute, got `{}`", dir.display())
            }
            Self::CreateDirectory { dir, source } => write!(
                f,
                "failed to create log directory `{}`: {source}",
                dir.display()
            ),
            Self::Backend(err) => write!(f, "failed to start logger: {err}"),
            Self::Conflict {
                active_level,
                active_dir,
            } => write!(
                f,
                "logging already writes `{active_level}` records to `{}`",
                active_dir.display()
            ),
        }
    }
}

impl Error for LoggingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CreateDirectory { source, .. } => Some(source),
            Self::Backend(err) => Some(err),
            Self::RelativeDirectory(_) | Self::Conflict { .. } => None,
        }
    }
}

/// Installs the rolling file sink described by `config`.
///
/// Returns `Ok(false)` without touching the `log` facade when `config.dir`
/// is `None`, and `Ok(true)` once the sink is active.
///
/// # Errors
/// - [`LoggingError::RelativeDirectory`] for a non-absolute directory.
/// - [`LoggingError::Conflict`] when a different sink is already active.
/// - Directory creation and backend failures.
pub fn init_logging(config: &LoggingConfig) -> Result<bool, LoggingError> {
    let Some(dir) = config.dir.as_deref() else {
        return Ok(false);
    };
    if !dir.is_absolute() {
        return Err(LoggingError::RelativeDirectory(dir.to_path_buf()));
    }

    let spec = SinkSpec {
        level: config.level,
        dir: dir.to_path_buf(),
        file_basename: config.file_basename.trim().to_string(),
    };
    let sink = ACTIVE_SINK.get_or_try_init(|| start_sink(&spec, config))?;
    if sink.spec != spec {
        return Err(LoggingError::Conflict {
            active_level: sink.spec.level,
            active_dir: sink.spec.dir.clone(),
        });
    }
    Ok(true)
}

/// Directory of the active file sink, if one was installed.
pub fn active_log_dir() -> Option<&'static Path> {
    ACTIVE_SINK.get().map(|sink| sink.spec.dir.as_path())
}

fn start_sink(spec: &SinkSpec, config: &LoggingConfig) -> Result<ActiveSink, LoggingError> {
    std::fs::create_dir_all(&spec.dir).map_err(|source| LoggingError::CreateDirectory {
        dir: spec.dir.clone(),
        source,
    })?;

    let handle = Logger::try_with_str(spec.level.as_str())
        .map_err(LoggingError::Backend)?
        .log_to_file(
            FileSpec::default()
                .directory(spec.dir.as_path())
                .basename(spec.file_basename.as_str()),
        )
        .rotate(
            Criterion::Size(config.max_file_bytes),
            Naming::Numbers,
            Cleanup::KeepLogFiles(config.max_files),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(LoggingError::Backend)?;

    install_panic_hook();
    info!(
        "event=logging_init module=logging status=ok level={} dir={} file={} version={}",
        spec.level,
        spec.dir.display(),
        spec.file_basename,
        env!("CARGO_PKG_VERSION")
    );

    Ok(ActiveSink {
        spec: spec.clone(),
        _handle: handle,
    })
}

/// Called once, from the sink initializer.
fn install_panic_hook() {
    let previous_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let payload = panic_info
            .payload()
            .downcast_ref::<&str>()
            .map(|message| (*message).to_string())
            .or_else(|| panic_info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        error!(
            "event=panic module=logging status=error location={} payload={}",
            location,
            single_line(&payload, MAX_PANIC_PAYLOAD_CHARS)
        );
        previous_hook(panic_info);
    }));
}

/// Panic payloads may quote board content: one line, capped length.
fn single_line(value: &str, max_chars: usize) -> String {
    let flattened = value.replace(['\n', '\r'], " ");
    let mut capped: String = flattened.chars().take(max_chars).collect();
    if flattened.chars().count() > max_chars {
        capped.push_str("...");
    }
    capped
}

#[cfg(test)]
mod tests {
    use super::{active_log_dir, init_logging, single_line, LoggingError};
    use crate::config::{LogLevel, LoggingConfig};
    use tempfile::TempDir;

    #[test]
    fn missing_directory_leaves_host_logger_alone() {
        assert!(!init_logging(&LoggingConfig::default()).unwrap());
    }

    #[test]
    fn relative_directory_is_rejected() {
        let config = LoggingConfig {
            dir: Some("logs/dev".into()),
            ..LoggingConfig::default()
        };
        assert!(matches!(
            init_logging(&config),
            Err(LoggingError::RelativeDirectory(_))
        ));
    }

    #[test]
    fn panic_payload_is_flattened_and_capped() {
        assert_eq!(single_line("a\nb\rc", 16), "a b c");
        assert_eq!(single_line("sprint board", 6), "sprint...");
    }

    #[test]
    fn same_sink_is_idempotent_and_other_sinks_conflict() {
        let dir = TempDir::new().unwrap();
        let other = TempDir::new().unwrap();
        let config = LoggingConfig {
            level: LogLevel::Info,
            dir: Some(dir.path().join("logs")),
            ..LoggingConfig::default()
        };

        assert!(init_logging(&config).unwrap());
        assert!(init_logging(&config).unwrap());
        assert_eq!(active_log_dir(), Some(dir.path().join("logs").as_path()));

        let louder = LoggingConfig {
            level: LogLevel::Debug,
            ..config.clone()
        };
        assert!(matches!(
            init_logging(&louder),
            Err(LoggingError::Conflict {
                active_level: LogLevel::Info,
                ..
            })
        ));

        let elsewhere = LoggingConfig {
            dir: Some(other.path().to_path_buf()),
            ..config.clone()
        };
        let err = init_logging(&elsewhere).unwrap_err();
        assert!(matches!(err, LoggingError::Conflict { ref active_dir, .. }
            if active_dir == &dir.path().join("logs")));
    }
}
