use std::{
    ffi::OsString,
    fs::{self, File, OpenOptions},
    io::{self, ErrorKind, Write},
    path::{Path, PathBuf},
};

use crate::BenchmarkError;

/// Name of the log file created inside the logs directory.
pub const BENCHMARK_FILE_NAME: &str = "benchmark.log";

/// Size of the path buffer; a path must leave room for the terminator, so at most
/// `MAX_LOG_PATH_LEN - 1` bytes are accepted.
pub const MAX_LOG_PATH_LEN: usize = 1024;

/// Size of the message buffer; formatted messages of `MAX_MESSAGE_LEN` bytes or more are dropped.
pub const MAX_MESSAGE_LEN: usize = 4096;

/// Build `{logs_dir}/benchmark.log`.
pub fn benchmark_log_path(logs_dir: &Path) -> Result<PathBuf, BenchmarkError> {
    if logs_dir.as_os_str().is_empty() {
        return Err(BenchmarkError::EmptyLogsDir);
    }

    let mut path = OsString::from(logs_dir.as_os_str());
    path.push("/");
    path.push(BENCHMARK_FILE_NAME);

    if path.len() >= MAX_LOG_PATH_LEN {
        return Err(BenchmarkError::PathTooLong {
            len: path.len(),
            max: MAX_LOG_PATH_LEN - 1,
        });
    }
    Ok(PathBuf::from(path))
}

/// Delete the log of a previous run. A missing file is fine.
pub(crate) fn remove_previous_log(path: &Path) -> Result<(), BenchmarkError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(BenchmarkError::Remove {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// The shared, append-only benchmark log.
///
/// Every participant holds one, only the root writes through it.
#[derive(Debug)]
pub struct LogHandle {
    path: PathBuf,
    file: File,
}

impl LogHandle {
    /// Open (creating if needed) the log in write + append mode.
    pub(crate) fn open(path: PathBuf) -> Result<Self, BenchmarkError> {
        match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => Ok(Self { path, file }),
            Err(source) => Err(BenchmarkError::Open { path, source }),
        }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one formatted message.
    ///
    /// Messages that do not fit in `MAX_MESSAGE_LEN` bytes are dropped with a warning, nothing
    /// is written for them. Returns whether the message reached the file.
    pub(crate) fn append(&self, message: &str) -> Result<bool, BenchmarkError> {
        if message.len() >= MAX_MESSAGE_LEN {
            log::warn!(
                "[BENCHMARK] message of {} bytes exceeds the {MAX_MESSAGE_LEN} bytes buffer, dropped",
                message.len()
            );
            return Ok(false);
        }
        if message.is_empty() {
            return Ok(false);
        }

        (&self.file).write_all(message.as_bytes())?;
        Ok(true)
    }

    /// Flush everything to disk and release the file.
    pub(crate) fn close(self) -> io::Result<()> {
        self.file.sync_all()
    }
}
