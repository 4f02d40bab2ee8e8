// Process Spawner Port
// Abstraction over the two OS process-creation strategies

use crate::domain::{EnvironmentBuffer, FileActionPlan, ProcessHandle};
use crate::error::Result;
use std::ffi::{CStr, CString};

/// Environment handed to the batched creation syscall
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvironmentSource {
    /// Pass the process environment through as-is (no copy)
    Inherit,
    /// Pass a freshly built replacement buffer
    Replace(EnvironmentBuffer),
}

/// Fully validated, fully planned batched spawn
#[derive(Debug, Clone)]
pub struct PreparedSpawn {
    pub program: CString,
    pub argv: Vec<CString>,
    pub environment: EnvironmentSource,
    pub file_actions: FileActionPlan,
    /// Ask for copy-on-write-optimized creation where the platform offers it
    pub use_vfork_hint: bool,
}

/// Process Spawner trait
///
/// Implementations:
/// - PosixSpawner: posix_spawnp / vfork-style clone (infra-system)
/// - RecordingSpawner: records calls (tests)
pub trait ProcessSpawner: Send + Sync {
    /// Create the child with one batched syscall
    ///
    /// # Errors
    /// - SpawnError::SpawnFailed if the syscall reports failure (program missing, ...)
    fn spawn_batched(&self, spawn: &PreparedSpawn) -> Result<ProcessHandle>;

    /// Duplicate the caller and replace the duplicate's image with `program`
    ///
    /// Uses the ambient environment and applies no file actions. Returns as
    /// soon as the duplicate has exec'd or exited.
    ///
    /// # Errors
    /// - SpawnError::ResourceExhausted if duplication fails
    fn spawn_fallback(&self, program: &CStr, argv: &[CString]) -> Result<ProcessHandle>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::domain::ErrnoClass;
    use crate::error::SpawnError;
    use std::sync::{Arc, Mutex};

    /// Mock spawner behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Succeed with this pid
        Succeed(i32),
        /// Fail like the creation syscall would
        Fail(ErrnoClass, i32),
        /// Fail like a duplication failure would
        Exhausted,
    }

    /// One recorded spawner call
    #[derive(Debug, Clone)]
    pub enum SpawnCall {
        Batched(PreparedSpawn),
        Fallback { program: CString, argv: Vec<CString> },
    }

    /// Mock ProcessSpawner recording every call
    pub struct RecordingSpawner {
        behavior: Arc<Mutex<MockBehavior>>,
        calls: Arc<Mutex<Vec<SpawnCall>>>,
    }

    impl RecordingSpawner {
        pub fn new(behavior: MockBehavior) -> Self {
            Self {
                behavior: Arc::new(Mutex::new(behavior)),
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn new_success(pid: i32) -> Self {
            Self::new(MockBehavior::Succeed(pid))
        }

        pub fn new_fail(class: ErrnoClass, errno: i32) -> Self {
            Self::new(MockBehavior::Fail(class, errno))
        }

        pub fn calls(&self) -> Vec<SpawnCall> {
            self.calls.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        fn respond(&self, call: SpawnCall) -> Result<ProcessHandle> {
            let program = match &call {
                SpawnCall::Batched(spawn) => spawn.program.to_string_lossy().into_owned(),
                SpawnCall::Fallback { program, .. } => program.to_string_lossy().into_owned(),
            };
            self.calls.lock().unwrap().push(call);

            match self.behavior.lock().unwrap().clone() {
                MockBehavior::Succeed(pid) => Ok(ProcessHandle::new(pid)),
                MockBehavior::Fail(class, errno) => Err(SpawnError::SpawnFailed {
                    class,
                    errno,
                    program,
                }),
                MockBehavior::Exhausted => Err(SpawnError::ResourceExhausted(
                    "mock duplication failure".to_string(),
                )),
            }
        }
    }

    impl ProcessSpawner for RecordingSpawner {
        fn spawn_batched(&self, spawn: &PreparedSpawn) -> Result<ProcessHandle> {
            self.respond(SpawnCall::Batched(spawn.clone()))
        }

        fn spawn_fallback(&self, program: &CStr, argv: &[CString]) -> Result<ProcessHandle> {
            self.respond(SpawnCall::Fallback {
                program: program.to_owned(),
                argv: argv.to_vec(),
            })
        }
    }
}
