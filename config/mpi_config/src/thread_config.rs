use std::{
    cell::Cell,
    fmt::Debug,
    sync::{Arc, Condvar, Mutex, MutexGuard},
    thread,
    time::Instant,
};

use crate::GroupEngine;

/// Processor name reported by every thread participant.
pub const THREAD_PROCESSOR_NAME: &str = "localhost";

/// Error code recorded when a participant unwinds without calling `abort`.
pub const PANIC_ERROR_CODE: i32 = 101;

thread_local! {
    static THREAD_RANK: Cell<Option<usize>> = const { Cell::new(None) };
}

/// Rank of the thread participant running on the calling thread, `None` outside
/// `ThreadGroupConfig::run`.
pub fn current_thread_rank() -> Option<usize> {
    THREAD_RANK.with(|rank| rank.get())
}

/// Rendezvous state shared by all the threads of a group.
#[derive(Debug)]
struct GroupState {
    /// Number of participants that reached the current barrier
    arrived: usize,
    /// Incremented every time a barrier releases
    generation: u64,
    /// Error code of the first abort, if any
    aborted: Option<i32>,
    /// One slot per rank, written before a gather and read by the root
    slots: Vec<Vec<u8>>,
}

#[derive(Debug)]
struct SharedGroup {
    world_size: usize,
    epoch: Instant,
    state: Mutex<GroupState>,
    cvar: Condvar,
}

/// Process group made of threads inside one process.
///
/// Assumptions
/// 1. Each thread owns exactly one config, obtained from `ThreadGroupConfig::new_group`
/// 2. Collective calls are issued by all threads in the same order
/// 3. An abort from any thread terminates every thread of the group: waiters are woken up and
///    panic, as do threads entering a collective call afterwards
#[derive(Clone)]
pub struct ThreadGroupConfig {
    pub world_rank: i32,
    shared: Arc<SharedGroup>,
}

impl Debug for ThreadGroupConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadGroupConfig")
            .field("world_size", &self.shared.world_size)
            .field("world_rank", &self.world_rank)
            .finish()
    }
}

impl PartialEq for ThreadGroupConfig {
    fn eq(&self, other: &Self) -> bool {
        // equality is based on rank and group identity
        Arc::ptr_eq(&self.shared, &other.shared) && self.world_rank == other.world_rank
    }
}

impl Default for ThreadGroupConfig {
    fn default() -> Self {
        Self::single()
    }
}

impl ThreadGroupConfig {
    /// Create the configs of a group of `world_size` participants, indexed by rank.
    pub fn new_group(world_size: usize) -> Vec<Self> {
        assert!(world_size > 0, "a process group needs at least one participant");

        let shared = Arc::new(SharedGroup {
            world_size,
            epoch: Instant::now(),
            state: Mutex::new(GroupState {
                arrived: 0,
                generation: 0,
                aborted: None,
                slots: vec![vec![]; world_size],
            }),
            cvar: Condvar::new(),
        });

        (0..world_size)
            .map(|rank| Self {
                world_rank: rank as i32,
                shared: shared.clone(),
            })
            .collect()
    }

    /// A group with a single participant.
    #[inline]
    pub fn single() -> Self {
        Self::new_group(1).remove(0)
    }

    /// Run `f` on `world_size` threads, one per rank, and collect the results in rank order.
    ///
    /// Panics if any participant panics, which includes a group abort.
    pub fn run<T, F>(world_size: usize, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(ThreadGroupConfig) -> T + Sync,
    {
        let configs = Self::new_group(world_size);
        let f = &f;
        thread::scope(|s| {
            let handles = configs
                .into_iter()
                .map(|config| {
                    thread::Builder::new()
                        .name(format!("rank-{}", config.world_rank))
                        .spawn_scoped(s, move || {
                            THREAD_RANK.with(|rank| rank.set(Some(config.world_rank())));
                            let _guard = AbortOnUnwind(config.clone());
                            f(config)
                        })
                        .expect("failed to spawn participant thread")
                })
                .collect::<Vec<_>>();

            handles
                .into_iter()
                .map(|handle| match handle.join() {
                    Ok(result) => result,
                    Err(payload) => std::panic::resume_unwind(payload),
                })
                .collect()
        })
    }

    /// Returns the error code if the group has been aborted.
    pub fn aborted(&self) -> Option<i32> {
        self.lock().aborted
    }

    fn lock(&self) -> MutexGuard<'_, GroupState> {
        // poisoned by a participant panicking in `check_aborted`, which leaves the state intact
        self.shared
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn mark_aborted(&self, error_code: i32) {
        let mut state = self.lock();
        state.aborted.get_or_insert(error_code);
        self.shared.cvar.notify_all();
    }

    fn check_aborted(&self, state: &GroupState) {
        if let Some(code) = state.aborted {
            panic!(
                "rank {} terminated: process group aborted with error code {code}",
                self.world_rank
            );
        }
    }

    /// Block until every participant arrives. Returns the guard so the caller can keep
    /// working on the shared state.
    fn wait_all<'a>(&'a self, mut state: MutexGuard<'a, GroupState>) -> MutexGuard<'a, GroupState> {
        self.check_aborted(&state);

        state.arrived += 1;
        if state.arrived == self.shared.world_size {
            state.arrived = 0;
            state.generation += 1;
            self.shared.cvar.notify_all();
            return state;
        }

        let generation = state.generation;
        while state.generation == generation && state.aborted.is_none() {
            state = self
                .shared
                .cvar
                .wait(state)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
        if state.generation == generation {
            self.check_aborted(&state);
        }
        state
    }
}

impl GroupEngine for ThreadGroupConfig {
    #[inline(always)]
    fn world_size(&self) -> usize {
        self.shared.world_size
    }

    #[inline(always)]
    fn world_rank(&self) -> usize {
        self.world_rank as usize
    }

    fn barrier(&self) {
        let state = self.lock();
        drop(self.wait_all(state));
    }

    #[inline]
    fn wtime(&self) -> f64 {
        self.shared.epoch.elapsed().as_secs_f64()
    }

    #[inline]
    fn processor_name(&self) -> String {
        THREAD_PROCESSOR_NAME.to_string()
    }

    fn gather_vec(&self, local_vec: &[u8], global_vec: &mut Vec<u8>) {
        if self.is_single_process() {
            *global_vec = local_vec.to_vec();
            return;
        }

        let mut state = self.lock();
        state.slots[self.world_rank()] = local_vec.to_vec();
        state = self.wait_all(state);

        if self.is_root() {
            for slot in state.slots.iter() {
                assert_eq!(
                    slot.len(),
                    local_vec.len(),
                    "every participant must gather the same number of bytes"
                );
            }
            *global_vec = state.slots.concat();
        }

        // the root must finish reading before the slots can be reused
        drop(self.wait_all(state));
    }

    fn abort(&self, error_code: i32) -> ! {
        self.mark_aborted(error_code);
        panic!(
            "rank {} called abort: process group aborted with error code {error_code}",
            self.world_rank
        );
    }
}

/// Turns a panic inside one participant into a group abort, so the others do not wait forever
/// in their next collective call.
struct AbortOnUnwind(ThreadGroupConfig);

impl Drop for AbortOnUnwind {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.mark_aborted(PANIC_ERROR_CODE);
        }
    }
}
