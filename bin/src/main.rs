use std::process::exit;

use clap::Parser;
#[cfg(feature = "mpi")]
use mpi_config::MPIConfig;
#[cfg(not(feature = "mpi"))]
use mpi_config::ThreadGroupConfig;
use scaffold::driver::{run_scaffold, DriverConfig, ScaffoldArgs};

fn main() {
    let args = ScaffoldArgs::parse();

    // every participant resolves the same environment, so they all stop here together
    let config = match DriverConfig::from_env(&args) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("[ERROR] {err}");
            exit(1);
        }
    };

    #[cfg(feature = "mpi")]
    {
        let mpi_config = MPIConfig::new();
        run_scaffold(&config, &mpi_config);
        MPIConfig::finalize();
    }

    #[cfg(not(feature = "mpi"))]
    {
        ThreadGroupConfig::run(args.threads.max(1), |mpi_config| {
            run_scaffold(&config, &mpi_config)
        });
    }
}
