//! Process group toolkit
//!
//! - `GroupEngine`: the collective primitives a distributed run needs (rank/size queries,
//!   barrier, wall clock, host identity, all-to-one gather, group-wide abort)
//! - `MPIConfig`: the engine backed by an MPI world communicator (feature `mpi`)
//! - `ThreadGroupConfig`: the engine backed by threads of a single process
//!
//! The calling process must import `GroupEngine` to use the macros below.

mod definition;
#[cfg(feature = "mpi")]
mod mpi_config;
mod thread_config;

pub use definition::*;
#[cfg(feature = "mpi")]
pub use mpi_config::MPIConfig;
pub use thread_config::*;

#[doc(hidden)]
pub use log;


#[macro_export]
macro_rules! root_println {
    ($config: expr, $($arg:tt)*) => {
        if $config.is_root() {
            println!($($arg)*);
        }
    };
}

/// `log::info!` on the root participant only.
#[macro_export]
macro_rules! root_info {
    ($config: expr, $($arg:tt)*) => {
        if $config.is_root() {
            $crate::log::info!($($arg)*);
        }
    };
}
