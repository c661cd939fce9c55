use std::{
    fs,
    panic::{self, AssertUnwindSafe},
    path::{Path, PathBuf},
    sync::{Mutex, Once},
};

use chrono::NaiveDate;
use log::{Level, Log, Metadata, Record};
use mpi_config::{GroupEngine, ThreadGroupConfig};

use crate::{
    benchmark_log_path, format_elapsed, format_timestamp, recorder::try_init, BenchmarkError,
    BenchmarkRecorder, LogHandle, BENCHMARK_FILE_NAME, MAX_LOG_PATH_LEN, MAX_MESSAGE_LEN,
};

/// Accepts every write, fails them all with ENOSPC, and rejects fsync.
const FULL_DEVICE: &str = "/dev/full";

/// Keeps warnings so tests can check what was reported.
struct CaptureLogger {
    lines: Mutex<Vec<String>>,
}

impl Log for CaptureLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Warn
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            self.lines
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .push(record.args().to_string());
        }
    }

    fn flush(&self) {}
}

static CAPTURE_LOGGER: CaptureLogger = CaptureLogger {
    lines: Mutex::new(vec![]),
};

fn captured_warnings() -> Vec<String> {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        log::set_logger(&CAPTURE_LOGGER).unwrap();
        log::set_max_level(log::LevelFilter::Warn);
    });
    CAPTURE_LOGGER
        .lines
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

#[test]
fn test_log_path() {
    let path = benchmark_log_path(Path::new("/tmp/logs")).unwrap();
    assert_eq!(path, Path::new("/tmp/logs/benchmark.log"));

    // the directory is used verbatim
    let path = benchmark_log_path(Path::new("relative/dir/")).unwrap();
    assert_eq!(path.as_os_str(), "relative/dir//benchmark.log");
}

#[test]
fn test_log_path_bounds() {
    assert!(matches!(
        benchmark_log_path(Path::new("")),
        Err(BenchmarkError::EmptyLogsDir)
    ));

    // "/" + file name
    let overhead = 1 + BENCHMARK_FILE_NAME.len();
    let longest_dir = "d".repeat(MAX_LOG_PATH_LEN - 1 - overhead);
    let path = benchmark_log_path(Path::new(&longest_dir)).unwrap();
    assert_eq!(path.as_os_str().len(), MAX_LOG_PATH_LEN - 1);

    let too_long_dir = "d".repeat(MAX_LOG_PATH_LEN - overhead);
    match benchmark_log_path(Path::new(&too_long_dir)) {
        Err(BenchmarkError::PathTooLong { len, max }) => {
            assert_eq!(len, MAX_LOG_PATH_LEN);
            assert_eq!(max, MAX_LOG_PATH_LEN - 1);
        }
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn test_init_without_previous_log() {
    let logs_dir = tempfile::tempdir().unwrap();
    let config = ThreadGroupConfig::single();

    let log_file = try_init(&config, logs_dir.path()).unwrap();
    assert_eq!(log_file.path(), logs_dir.path().join(BENCHMARK_FILE_NAME));
    assert!(log_file.path().exists());
    assert_eq!(fs::read_to_string(log_file.path()).unwrap(), "");
}

#[test]
fn test_init_truncates_previous_log() {
    let logs_dir = tempfile::tempdir().unwrap();
    let path = logs_dir.path().join(BENCHMARK_FILE_NAME);
    fs::write(&path, "stale content\n").unwrap();

    let config = ThreadGroupConfig::single();
    let log_file = try_init(&config, logs_dir.path()).unwrap();
    assert_eq!(fs::read_to_string(log_file.path()).unwrap(), "");
}

#[test]
fn test_init_remove_failure() {
    let logs_dir = tempfile::tempdir().unwrap();
    // a directory cannot be removed as a file
    fs::create_dir(logs_dir.path().join(BENCHMARK_FILE_NAME)).unwrap();

    let config = ThreadGroupConfig::single();
    assert!(matches!(
        try_init(&config, logs_dir.path()),
        Err(BenchmarkError::Remove { .. })
    ));
}

#[test]
fn test_init_open_failure() {
    let logs_dir = tempfile::tempdir().unwrap();
    let missing_dir = logs_dir.path().join("does/not/exist");

    let config = ThreadGroupConfig::single();
    match try_init(&config, &missing_dir) {
        Err(err @ BenchmarkError::Open { .. }) => {
            assert!(err.to_string().contains("does/not/exist/benchmark.log"));
        }
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn test_append_drops_oversized_messages() {
    let logs_dir = tempfile::tempdir().unwrap();
    let log_file = LogHandle::open(logs_dir.path().join(BENCHMARK_FILE_NAME)).unwrap();

    let fits = format!("{}\n", "a".repeat(MAX_MESSAGE_LEN - 2));
    let too_long = format!("{}\n", "b".repeat(MAX_MESSAGE_LEN - 1));
    assert_eq!(fits.len(), MAX_MESSAGE_LEN - 1);
    assert_eq!(too_long.len(), MAX_MESSAGE_LEN);

    assert!(log_file.append("first\n").unwrap());
    assert!(!log_file.append(&too_long).unwrap());
    assert!(log_file.append(&fits).unwrap());
    assert!(!log_file.append("").unwrap());
    assert!(log_file.append("last\n").unwrap());

    let path = log_file.path().to_path_buf();
    log_file.close().unwrap();

    let content = fs::read_to_string(path).unwrap();
    assert_eq!(content, format!("first\n{fits}last\n"));
}

#[test]
fn test_formats() {
    assert_eq!(format_elapsed(0.0), "0.00000000000000000000");
    assert_eq!(format_elapsed(1.5), "1.50000000000000000000");

    let time = NaiveDate::from_ymd_opt(2025, 11, 2)
        .unwrap()
        .and_hms_opt(8, 4, 5)
        .unwrap()
        .and_utc();
    assert_eq!(format_timestamp(&time), "2025-11-02 08:04:05");
}

#[test]
fn test_append_write_failure() {
    let log_file = LogHandle::open(PathBuf::from(FULL_DEVICE)).unwrap();
    match log_file.append("x\n") {
        Err(err @ BenchmarkError::Write(_)) => {
            assert!(err.to_string().starts_with("error writing to benchmark log file"));
        }
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
#[should_panic(expected = "process group aborted with error code 1")]
fn test_header_write_failure_aborts() {
    let config = ThreadGroupConfig::single();
    let log_file = LogHandle::open(PathBuf::from(FULL_DEVICE)).unwrap();
    let mut recorder = BenchmarkRecorder::with_log_file(&config, log_file);

    recorder.run("unwritable", |_| panic!("the workload must not run"));
}

#[test]
fn test_write_failure_aborts_every_participant() {
    let workloads_run = Mutex::new(0);
    let members = Mutex::new(vec![]);

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        ThreadGroupConfig::run(3, |config| {
            members.lock().unwrap().push(config.clone());
            let log_file = LogHandle::open(PathBuf::from(FULL_DEVICE)).unwrap();
            let mut recorder = BenchmarkRecorder::with_log_file(&config, log_file);
            // only the root writes, and its first header line fails
            recorder.run("unwritable", |_| *workloads_run.lock().unwrap() += 1);
        })
    }));
    assert!(outcome.is_err());

    let members = members
        .into_inner()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    assert!(!members.is_empty());
    assert!(members.iter().all(|config| config.aborted() == Some(1)));
    assert_eq!(
        *workloads_run
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()),
        0
    );
}

#[test]
fn test_close_failure_only_warns() {
    let log_file = LogHandle::open(PathBuf::from(FULL_DEVICE)).unwrap();
    assert!(log_file.close().is_err());

    captured_warnings();
    let config = ThreadGroupConfig::single();
    let log_file = LogHandle::open(PathBuf::from(FULL_DEVICE)).unwrap();
    BenchmarkRecorder::with_log_file(&config, log_file).finalize();

    // finalize returned and the group is intact
    assert_eq!(config.aborted(), None);
    config.barrier();
    assert!(captured_warnings()
        .iter()
        .any(|line| line.contains("error closing benchmark log file `/dev/full`")));
}
