use std::{env, path::PathBuf};

use benchmark::{BenchmarkConfig, BenchmarkRecorder};
use clap::Parser;
use mpi_config::{root_println, GroupEngine};
use thiserror::Error;
use utils::{
    debugger::{self, wait_for_debugger},
    logging::{init_logger, DebugLevel, DebugLevelError},
};

/// Logs directory on the cluster.
pub const HPC_LOGS_DIR_VAR: &str = "HPC_JOB_LOGS_DIR";
/// Logs directory on a workstation.
pub const LOCAL_LOGS_DIR_VAR: &str = "LOCAL_LOGS_DIR";

pub const DEFAULT_BENCHMARK_NAME: &str = "Void Application";

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct ScaffoldArgs {
    /// Read the logs directory from HPC_JOB_LOGS_DIR instead of LOCAL_LOGS_DIR
    #[arg(long)]
    pub hpc: bool,

    /// Logs directory, takes precedence over the environment
    #[arg(short, long)]
    pub logs_dir: Option<PathBuf>,

    /// Diagnostic level: none, error, warn, info, debug
    #[arg(long, env = "DEBUG_LEVEL", default_value_t = String::from("info"))]
    pub log_level: String,

    /// Benchmark name written to the log
    #[arg(short, long, default_value_t = String::from(DEFAULT_BENCHMARK_NAME))]
    pub name: String,

    /// Number of participants, simulated with threads (ignored under MPI)
    #[arg(short, long, default_value_t = 1)]
    pub threads: usize,
}

#[derive(Debug, Error, PartialEq)]
pub enum DriverError {
    #[error("no logs directory: pass --logs-dir or set {var}")]
    MissingLogsDir { var: &'static str },

    #[error(transparent)]
    InvalidLevel(#[from] DebugLevelError),
}

/// Driver settings, resolved once before the process group does anything.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverConfig {
    pub logs_dir: PathBuf,
    pub log_level: DebugLevel,
    pub wait_for_debugger: bool,
    pub benchmark_name: String,
}

impl DriverConfig {
    pub fn from_env(args: &ScaffoldArgs) -> Result<Self, DriverError> {
        Self::resolve(args, |var| env::var(var).ok())
    }

    /// `lookup` reads one environment variable.
    pub fn resolve(
        args: &ScaffoldArgs,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, DriverError> {
        let var = if args.hpc {
            HPC_LOGS_DIR_VAR
        } else {
            LOCAL_LOGS_DIR_VAR
        };
        let logs_dir = match &args.logs_dir {
            Some(dir) => dir.clone(),
            None => lookup(var)
                .filter(|dir| !dir.is_empty())
                .map(PathBuf::from)
                .ok_or(DriverError::MissingLogsDir { var })?,
        };

        Ok(Self {
            logs_dir,
            log_level: args.log_level.parse()?,
            wait_for_debugger: lookup(debugger::WAIT_FOR_DEBUGGER).is_some_and(|flag| flag == "1"),
            benchmark_name: args.name.clone(),
        })
    }
}

pub fn print_info<G: GroupEngine>(config: &DriverConfig, mpi_config: &G) {
    root_println!(mpi_config, "===============================");
    root_println!(mpi_config, "benchmark:      {}", config.benchmark_name);
    root_println!(mpi_config, "participants:   {}", mpi_config.world_size());
    root_println!(mpi_config, "logs directory: {}", config.logs_dir.display());
    root_println!(mpi_config, "debug level:    {}", config.log_level);
    root_println!(mpi_config, "===============================");
}

/// Everything a participant does between group start-up and shutdown.
/// Returns the elapsed seconds measured by this participant.
pub fn run_scaffold<G: GroupEngine>(config: &DriverConfig, mpi_config: &G) -> f64 {
    init_logger(mpi_config.world_rank(), config.log_level);
    print_info(config, mpi_config);

    wait_for_debugger(config.wait_for_debugger, mpi_config);

    let mut recorder =
        BenchmarkRecorder::init(&BenchmarkConfig::new(&config.logs_dir, mpi_config));
    let elapsed = recorder.run(&config.benchmark_name, |_rank| {
        log::info!("Hello scaffold");
    });
    recorder.finalize();

    elapsed
}
