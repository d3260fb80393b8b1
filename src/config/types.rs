//! Core configuration types.
//! - Config holds runtime settings with sensible defaults.
//! - LogLevel represents verbosity with simple parsing helpers.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::paths;
use crate::fs_ops::DEFAULT_BUFFER_SIZE;
use crate::volumes::VolumeMount;

/// Program-defined verbosity levels exposed to users/config.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Only errors
    Quiet,
    /// Informational output (default)
    #[default]
    Normal,
    /// More info (like verbose)
    Info,
    /// Debug/trace
    Debug,
}

impl LogLevel {
    /// Parse common string names into our LogLevel (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "quiet" | "error" | "none" => Some(LogLevel::Quiet),
            "normal" => Some(LogLevel::Normal),
            "info" | "verbose" | "detailed" => Some(LogLevel::Info),
            "debug" | "trace" => Some(LogLevel::Debug),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Quiet => "quiet",
            LogLevel::Normal => "normal",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        };
        f.write_str(s)
    }
}

impl FromStr for LogLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid log level: '{s}'"))
    }
}

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite ledger of all migrations
    pub ledger_path: PathBuf,
    /// Console verbosity
    pub log_level: LogLevel,
    /// Optional path to a log file
    pub log_file: Option<PathBuf>,
    /// Letter-to-root volume mapping (merged over detected drives on Windows)
    pub volumes: Vec<VolumeMount>,
    /// Per-file copy buffer in bytes
    pub copy_buffer_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ledger_path: paths::default_ledger_path()
                .unwrap_or_else(|| PathBuf::from(super::LEDGER_FILE_NAME)),
            log_level: LogLevel::Normal,
            log_file: paths::default_log_path(),
            volumes: Vec::new(),
            copy_buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl Config {
    /// Defaults with an explicit ledger location.
    pub fn with_ledger(ledger_path: impl Into<PathBuf>) -> Self {
        Self {
            ledger_path: ledger_path.into(),
            ..Default::default()
        }
    }
}
