use std::{io, path::PathBuf};

use thiserror::Error;

/// Fatal conditions of the benchmark recorder. Any of them aborts the whole process group.
#[derive(Debug, Error)]
pub enum BenchmarkError {
    #[error("logs directory is empty")]
    EmptyLogsDir,

    #[error("benchmark log path is {len} bytes long, at most {max} bytes are supported")]
    PathTooLong { len: usize, max: usize },

    #[error("cannot remove previous benchmark log file `{}`: {source}", .path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot open benchmark log file `{}`: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("error writing to benchmark log file: {0}")]
    Write(#[from] io::Error),
}
