//! Core runtime configuration.
//!
//! # Responsibility
//! - Hold tunables for ordering, storage and logging in one serde-friendly
//!   shape that hosts can deserialize from their own config sources.
//!
//! # Invariants
//! - `CoreConfig::default()` always passes `validate()`.
//! - Services refuse to start with a config that fails `validate()`.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Position increment used for appends and edge inserts.
pub const DEFAULT_POSITION_GAP: f64 = 1024.0;
/// Smallest neighbour distance still split by midpoint insertion.
pub const DEFAULT_POSITION_EPSILON: f64 = 1e-6;
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_MAX_NAME_CHARS: usize = 200;
const DEFAULT_LOG_FILE_BASENAME: &str = "taskboard";
const DEFAULT_LOG_FILE_BYTES: u64 = 10 * 1024 * 1024;
const DEFAULT_LOG_FILES: usize = 5;

/// Sibling position tunables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderingConfig {
    pub gap: f64,
    pub epsilon: f64,
}

impl Default for OrderingConfig {
    fn default() -> Self {
        Self {
            gap: DEFAULT_POSITION_GAP,
            epsilon: DEFAULT_POSITION_EPSILON,
        }
    }
}

/// Severity threshold for the rolling file log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// `debug` in debug builds, `info` in release builds.
    pub fn for_build() -> Self {
        if cfg!(debug_assertions) {
            Self::Debug
        } else {
            Self::Info
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rolling file log sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    /// Absolute directory for log files; `None` leaves the `log` facade to
    /// the host.
    pub dir: Option<PathBuf>,
    pub file_basename: String,
    /// Size at which the active file is rotated.
    pub max_file_bytes: u64,
    /// Rotated files kept on disk.
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::for_build(),
            dir: None,
            file_basename: DEFAULT_LOG_FILE_BASENAME.to_string(),
            max_file_bytes: DEFAULT_LOG_FILE_BYTES,
            max_files: DEFAULT_LOG_FILES,
        }
    }
}

/// Top-level core configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub ordering: OrderingConfig,
    /// SQLite busy handler timeout.
    pub busy_timeout_ms: u64,
    /// Upper bound for workspace/board/list names and task titles.
    pub max_name_chars: usize,
    pub logging: LoggingConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            ordering: OrderingConfig::default(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            max_name_chars: DEFAULT_MAX_NAME_CHARS,
            logging: LoggingConfig::default(),
        }
    }
}

impl CoreConfig {
    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ordering = self.ordering;
        if !ordering.gap.is_finite() || ordering.gap <= 0.0 {
            return Err(ConfigError::InvalidGap(ordering.gap));
        }
        if !ordering.epsilon.is_finite()
            || ordering.epsilon <= 0.0
            || ordering.epsilon >= ordering.gap
        {
            return Err(ConfigError::InvalidEpsilon {
                epsilon: ordering.epsilon,
                gap: ordering.gap,
            });
        }
        if self.busy_timeout_ms == 0 {
            return Err(ConfigError::ZeroBusyTimeout);
        }
        if self.max_name_chars == 0 {
            return Err(ConfigError::ZeroNameLimit);
        }
        let logging = &self.logging;
        if let Some(dir) = logging.dir.as_deref() {
            if !dir.is_absolute() {
                return Err(ConfigError::RelativeLogDir(dir.to_path_buf()));
            }
        }
        let basename = logging.file_basename.trim();
        if basename.is_empty() || basename.contains(['/', '\\']) {
            return Err(ConfigError::InvalidLogBasename(logging.file_basename.clone()));
        }
        if logging.max_file_bytes == 0 || logging.max_files == 0 {
            return Err(ConfigError::ZeroLogRotation);
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    InvalidGap(f64),
    InvalidEpsilon { epsilon: f64, gap: f64 },
    ZeroBusyTimeout,
    ZeroNameLimit,
    RelativeLogDir(PathBuf),
    InvalidLogBasename(String),
    ZeroLogRotation,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidGap(gap) => write!(f, "ordering gap must be positive, got {gap}"),
            Self::InvalidEpsilon { epsilon, gap } => write!(
                f,
                "ordering epsilon must be in (0, {gap}), got {epsilon}"
            ),
            Self::ZeroBusyTimeout => write!(f, "busy_timeout_ms must be greater than zero"),
            Self::ZeroNameLimit => write!(f, "max_name_chars must be greater than zero"),
            Self::RelativeLogDir(dir) => {
                write!(f, "logging.dir must be an absolute path, got `{}`", dir.display())
            }
            Self::InvalidLogBasename(name) => {
                write!(f, "logging.file_basename `{name}` must be a plain file name")
            }
            Self::ZeroLogRotation => {
                write!(f, "logging.max_file_bytes and logging.max_files must be greater than zero")
            }
        }
    }
}

impl Error for ConfigError {}
