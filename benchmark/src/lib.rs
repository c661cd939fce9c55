//! Collective benchmark recorder.
//!
//! A process group opens one shared log file, then for every benchmark writes a header (start
//! time, name, host of every rank) and the wall-clock duration of the timed workload, as seen
//! by the root:
//!
//! ```text
//! ***
//! Benchmark started at: 2025-11-02 18:04:51
//! Benchmark Name: Void Application
//! Rank: 0 > node: node-01
//! Rank: 1 > node: node-02
//! ***
//! 0.00000381300000000000
//! ```

mod errors;
mod log_file;
mod recorder;

pub use errors::*;
pub use log_file::*;
pub use recorder::*;

#[cfg(test)]
mod tests;
