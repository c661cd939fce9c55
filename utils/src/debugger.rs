//! Stall the root participant until a debugger is attached.
//!
//! Attach to the printed PID, break inside `wait_for_debugger`, and set `DEBUGGER_ATTACHED` to
//! true (or call `release_debugger`) to let the group go on.

use std::{
    sync::atomic::{AtomicBool, Ordering},
    thread,
    time::Duration,
};

use mpi_config::GroupEngine;

/// Environment variable enabling the stall when set to `1`.
pub const WAIT_FOR_DEBUGGER: &str = "WAIT_FOR_DEBUGGER";

pub const POLL_INTERVAL: Duration = Duration::from_secs(3);

pub static DEBUGGER_ATTACHED: AtomicBool = AtomicBool::new(false);

pub fn release_debugger() {
    DEBUGGER_ATTACHED.store(true, Ordering::SeqCst);
}

/// When `enabled`, the root blocks until the debugger flips the flag; everybody then meets at
/// a barrier. Does nothing (no barrier either) when disabled.
pub fn wait_for_debugger<G: GroupEngine>(enabled: bool, mpi_config: &G) {
    wait_with_interval(enabled, mpi_config, POLL_INTERVAL);
}

pub(crate) fn wait_with_interval<G: GroupEngine>(
    enabled: bool,
    mpi_config: &G,
    interval: Duration,
) {
    if !enabled {
        return;
    }

    if mpi_config.is_root() {
        println!(
            "\n*** Waiting for debugger to attach to process {} ***",
            std::process::id()
        );
        while !DEBUGGER_ATTACHED.load(Ordering::SeqCst) {
            thread::sleep(interval); // >>> put the breakpoint here <<<
        }
        DEBUGGER_ATTACHED.store(false, Ordering::SeqCst);
    }

    mpi_config.barrier();
}
