// POSIX process spawner (ProcessSpawner implementation)

use crate::{posix_spawn, vfork};
use fastspawn_core::application::constants::{DEFAULT_FALLBACK_STACK_SIZE, MIN_FALLBACK_STACK_SIZE};
use fastspawn_core::port::{PreparedSpawn, ProcessSpawner};
use fastspawn_core::{ProcessHandle, Result};
use std::ffi::{CStr, CString};

/// Spawner backed by `posix_spawnp` (batched) and a vfork-style clone (fallback)
pub struct PosixSpawner {
    fallback_stack_size: usize,
}

impl PosixSpawner {
    /// Create a new spawner
    ///
    /// # Arguments
    /// * `fallback_stack_size` - Minimum stack for the fallback child (floored at 16 KiB);
    ///   larger requests get a stack sized to their argument vector
    pub fn new(fallback_stack_size: usize) -> Self {
        Self {
            fallback_stack_size: fallback_stack_size.max(MIN_FALLBACK_STACK_SIZE),
        }
    }

    pub fn fallback_stack_size(&self) -> usize {
        self.fallback_stack_size
    }
}

impl Default for PosixSpawner {
    fn default() -> Self {
        Self::new(DEFAULT_FALLBACK_STACK_SIZE)
    }
}

impl ProcessSpawner for PosixSpawner {
    fn spawn_batched(&self, spawn: &PreparedSpawn) -> Result<ProcessHandle> {
        posix_spawn::spawn(spawn)
    }

    fn spawn_fallback(&self, program: &CStr, argv: &[CString]) -> Result<ProcessHandle> {
        vfork::spawn(program, argv, self.fallback_stack_size)
    }
}
