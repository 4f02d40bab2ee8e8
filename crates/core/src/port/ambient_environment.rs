// Ambient Environment Port
// Read-only view of the process-wide environment table

/// Accessor for the current process's inherited `NAME=VALUE` entries
///
/// Resolved at call time, never cached. Implementations must not mutate the
/// ambient table; callers must not mutate it concurrently with a read.
pub trait AmbientEnvironment: Send + Sync {
    /// Snapshot of the ambient entries as raw `NAME=VALUE` bytes
    fn entries(&self) -> Vec<Vec<u8>>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Fake ambient table with a read counter
    pub struct FakeAmbientEnvironment {
        entries: Vec<Vec<u8>>,
        reads: Arc<Mutex<usize>>,
    }

    impl FakeAmbientEnvironment {
        pub fn new<I, S>(entries: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: AsRef<[u8]>,
        {
            Self {
                entries: entries.into_iter().map(|e| e.as_ref().to_vec()).collect(),
                reads: Arc::new(Mutex::new(0)),
            }
        }

        pub fn empty() -> Self {
            Self::new(Vec::<Vec<u8>>::new())
        }

        pub fn read_count(&self) -> usize {
            *self.reads.lock().unwrap()
        }
    }

    impl AmbientEnvironment for FakeAmbientEnvironment {
        fn entries(&self) -> Vec<Vec<u8>> {
            *self.reads.lock().unwrap() += 1;
            self.entries.clone()
        }
    }
}
