// Rank-tagged diagnostics on top of `env_logger`.

use std::{fmt, io::Write, str::FromStr};

use env_logger::{Builder, Target};
use log::{Level, LevelFilter};
use mpi_config::current_thread_rank;
use thiserror::Error;

/// Verbosity of the diagnostic channel, chosen at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum DebugLevel {
    /// disable all logs
    None,
    /// show only errors
    Error,
    /// show warnings and errors
    Warn,
    /// show info, warnings, and errors
    #[default]
    Info,
    Debug,
}

#[derive(Debug, Error, PartialEq)]
#[error("Unknown string `{0}` for debug level, expected none, error, warn, info or debug")]
pub struct DebugLevelError(pub String);

impl FromStr for DebugLevel {
    type Err = DebugLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "off" => Ok(Self::None),
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            _ => Err(DebugLevelError(s.to_string())),
        }
    }
}

impl fmt::Display for DebugLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
        };
        f.write_str(name)
    }
}

impl From<DebugLevel> for LevelFilter {
    fn from(level: DebugLevel) -> Self {
        match level {
            DebugLevel::None => LevelFilter::Off,
            DebugLevel::Error => LevelFilter::Error,
            DebugLevel::Warn => LevelFilter::Warn,
            DebugLevel::Info => LevelFilter::Info,
            DebugLevel::Debug => LevelFilter::Debug,
        }
    }
}

/// `[WARN][rank: 3] message`
pub fn format_line(level: Level, rank: usize, args: &fmt::Arguments) -> String {
    format!("[{level}][rank: {rank}] {args}")
}

/// Rank to tag a line with: the thread participant emitting it, or `init_rank` when the
/// calling thread is not part of a thread group (one participant per process, as under MPI).
#[inline]
pub fn line_rank(init_rank: usize) -> usize {
    current_thread_rank().unwrap_or(init_rank)
}

/// Install the process-wide logger, tagging every line with the emitting participant's rank.
///
/// Only the first call in a process takes effect.
pub fn init_logger(rank: usize, level: DebugLevel) {
    let installed = Builder::new()
        .filter_level(level.into())
        .target(Target::Stderr)
        .format(move |buf, record| {
            writeln!(
                buf,
                "{}",
                format_line(record.level(), line_rank(rank), record.args())
            )
        })
        .try_init();

    if installed.is_err() {
        log::debug!("logger already initialized");
    }
}
