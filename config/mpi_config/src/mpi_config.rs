use std::fmt::Debug;

use mpi::{
    environment::Universe,
    ffi,
    topology::{Process, SimpleCommunicator},
    traits::*,
};

use crate::GroupEngine;

static mut UNIVERSE: Option<Universe> = None;
static mut WORLD: Option<SimpleCommunicator> = None;

/// Process group backed by the MPI world communicator.
#[derive(Clone)]
pub struct MPIConfig {
    pub world: Option<&'static SimpleCommunicator>,
    pub world_size: i32,
    pub world_rank: i32,
}

impl Default for MPIConfig {
    fn default() -> Self {
        Self {
            world: None,
            world_size: 1,
            world_rank: 0,
        }
    }
}

impl Debug for MPIConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MPIConfig")
            .field("world", &self.world.map(|_| "MPI_COMM_WORLD"))
            .field("world_size", &self.world_size)
            .field("world_rank", &self.world_rank)
            .finish()
    }
}

// Note: may not be correct across communicators
impl PartialEq for MPIConfig {
    fn eq(&self, other: &Self) -> bool {
        self.world_rank == other.world_rank && self.world_size == other.world_size
    }
}

impl MPIConfig {
    // OK if already initialized, mpi::initialize() will return None
    #[allow(static_mut_refs)]
    pub fn init() {
        unsafe {
            if let Some(universe) = mpi::initialize() {
                WORLD = Some(universe.world());
                UNIVERSE = Some(universe);
            }
        }
    }

    #[inline]
    pub fn finalize() {
        unsafe { ffi::MPI_Finalize() };
    }

    #[allow(static_mut_refs)]
    pub fn new() -> Self {
        Self::init();
        let world = unsafe { WORLD.as_ref() };
        let (world_size, world_rank) = match world {
            Some(world) => (world.size(), world.rank()),
            None => (1, 0),
        };
        Self {
            world,
            world_size,
            world_rank,
        }
    }

    #[inline(always)]
    fn root_process(&self) -> Option<Process> {
        self.world
            .map(|world| world.process_at_rank(<Self as GroupEngine>::ROOT_RANK))
    }
}

impl GroupEngine for MPIConfig {
    #[inline(always)]
    fn world_size(&self) -> usize {
        self.world_size as usize
    }

    #[inline(always)]
    fn world_rank(&self) -> usize {
        self.world_rank as usize
    }

    #[inline(always)]
    fn barrier(&self) {
        if let Some(world) = self.world {
            world.barrier();
        }
    }

    #[inline(always)]
    fn wtime(&self) -> f64 {
        mpi::environment::time()
    }

    fn processor_name(&self) -> String {
        match mpi::environment::processor_name() {
            Ok(name) => name,
            Err(err) => {
                log::warn!("processor name is not valid utf-8: {err}");
                String::from("unknown")
            }
        }
    }

    fn gather_vec(&self, local_vec: &[u8], global_vec: &mut Vec<u8>) {
        let root = match self.root_process() {
            Some(root) if !self.is_single_process() => root,
            _ => {
                *global_vec = local_vec.to_vec();
                return;
            }
        };

        if self.is_root() {
            global_vec.resize(local_vec.len() * self.world_size(), 0);
            root.gather_into_root(local_vec, &mut global_vec[..]);
        } else {
            root.gather_into(local_vec);
        }
    }

    fn abort(&self, error_code: i32) -> ! {
        match self.world {
            Some(world) => world.abort(error_code),
            None => std::process::exit(error_code),
        }
    }
}

unsafe impl Send for MPIConfig {}
