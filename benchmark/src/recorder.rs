use std::path::{Path, PathBuf};

use chrono::Local;
use mpi_config::{root_info, GroupEngine};

use crate::{benchmark_log_path, log_file::remove_previous_log, BenchmarkError, LogHandle};

/// Separator framing every header block.
pub const HEADER_SEPARATOR: &str = "***";

/// Error code every participant exits with on a fatal recorder error.
pub const ABORT_ERROR_CODE: i32 = 1;

/// Everything the recorder needs, resolved by the driver before construction.
#[derive(Debug, Clone)]
pub struct BenchmarkConfig<'a, G: GroupEngine> {
    pub logs_dir: PathBuf,
    pub mpi_config: &'a G,
}

impl<'a, G: GroupEngine> BenchmarkConfig<'a, G> {
    #[inline]
    pub fn new(logs_dir: impl Into<PathBuf>, mpi_config: &'a G) -> Self {
        Self {
            logs_dir: logs_dir.into(),
            mpi_config,
        }
    }
}

/// Records the wall-clock duration of workloads run by the whole process group into a shared
/// log file.
///
/// All the methods are collective: every participant calls them, in the same order. Only the
/// root writes to the file. Fatal errors abort the whole group, so nothing is returned to the
/// caller on failure.
#[derive(Debug)]
pub struct BenchmarkRecorder<'a, G: GroupEngine> {
    mpi_config: &'a G,
    log_file: LogHandle,
}

impl<'a, G: GroupEngine> BenchmarkRecorder<'a, G> {
    /// Truncate `{logs_dir}/benchmark.log` and open it on every participant.
    pub fn init(config: &BenchmarkConfig<'a, G>) -> Self {
        let mpi_config = config.mpi_config;
        let log_file = or_abort(mpi_config, try_init(mpi_config, &config.logs_dir));

        root_info!(
            mpi_config,
            "[BENCHMARK] Output log to: {}",
            log_file.path().display()
        );

        Self::with_log_file(mpi_config, log_file)
    }

    #[inline]
    pub(crate) fn with_log_file(mpi_config: &'a G, log_file: LogHandle) -> Self {
        Self {
            mpi_config,
            log_file,
        }
    }

    /// Write the header of `name`, then time `workload` across the group.
    ///
    /// The workload receives the caller's rank and nothing else. It must not call back into the
    /// recorder, and every participant must return from it: a participant that never returns
    /// leaves its peers blocked in the next collective call.
    ///
    /// Returns the elapsed seconds measured by this participant. Only the root's measurement is
    /// written to the log.
    pub fn run(&mut self, name: &str, workload: impl FnOnce(usize)) -> f64 {
        or_abort(self.mpi_config, self.write_header(name));

        // keep the header I/O and any skew between participants out of the measurement
        self.mpi_config.barrier();

        let rank = self.mpi_config.world_rank();
        let start_time = self.mpi_config.wtime();
        workload(rank);
        let end_time = self.mpi_config.wtime();
        let elapsed = end_time - start_time;

        log::debug!("[BENCHMARK] {name} finished in {elapsed}s");
        or_abort(
            self.mpi_config,
            self.unique_log(&format!("{}\n", format_elapsed(elapsed))),
        );
        elapsed
    }

    /// Close the log. A close failure is only reported.
    pub fn finalize(self) {
        let path = self.log_file.path().to_path_buf();
        if let Err(err) = self.log_file.close() {
            log::warn!(
                "[BENCHMARK] error closing benchmark log file `{}`: {err}",
                path.display()
            );
        }
        self.mpi_config.barrier();
    }

    /// Header block:
    /// separator, start time, benchmark name, one roster line per rank, separator.
    fn write_header(&self, name: &str) -> Result<(), BenchmarkError> {
        if self.mpi_config.is_root() {
            self.unique_log(&format!("{HEADER_SEPARATOR}\n"))?;
            self.unique_log(&format!(
                "Benchmark started at: {}\n",
                format_timestamp(&Local::now())
            ))?;
            self.unique_log(&format!("Benchmark Name: {name}\n"))?;
        }

        // a single collective gather; empty on non-root participants
        let processor_names = self.mpi_config.gather_processor_names();
        for (rank, processor_name) in processor_names.iter().enumerate() {
            self.unique_log(&format!("Rank: {rank} > node: {processor_name}\n"))?;
        }

        self.unique_log(&format!("{HEADER_SEPARATOR}\n"))
    }

    /// Append a message from the root; a no-op elsewhere.
    fn unique_log(&self, message: &str) -> Result<(), BenchmarkError> {
        if self.mpi_config.is_root() {
            self.log_file.append(message)?;
        }
        Ok(())
    }
}

pub(crate) fn try_init<G: GroupEngine>(
    mpi_config: &G,
    logs_dir: &Path,
) -> Result<LogHandle, BenchmarkError> {
    let path = benchmark_log_path(logs_dir)?;

    if mpi_config.is_root() {
        remove_previous_log(&path)?;
    }
    // nobody may open before the root is done removing
    mpi_config.barrier();

    LogHandle::open(path)
}

/// `YYYY-MM-DD HH:MM:SS` in local time.
pub fn format_timestamp<Tz: chrono::TimeZone>(time: &chrono::DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    time.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Seconds with 20 fractional digits.
#[inline]
pub fn format_elapsed(seconds: f64) -> String {
    format!("{seconds:.20}")
}

/// Unwrap `result`, or report the error and abort every participant.
fn or_abort<G: GroupEngine, T>(mpi_config: &G, result: Result<T, BenchmarkError>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => {
            let rank = mpi_config.world_rank();
            if log::log_enabled!(log::Level::Error) {
                log::error!("[BENCHMARK] {err}");
            } else {
                eprintln!("[ERROR][rank: {rank}] [BENCHMARK] {err}");
            }
            mpi_config.abort(ABORT_ERROR_CODE)
        }
    }
}
