// Descriptor Resolver Port
// Capability for fd references that are neither numbers nor standard channels

use std::os::fd::{AsRawFd, RawFd};

/// Object that can report its underlying descriptor number
///
/// Returning `None` (or a negative number) makes the reference unresolvable;
/// dispositions attached to it are skipped.
pub trait DescriptorResolver: Send + Sync {
    fn resolve_descriptor(&self) -> Option<RawFd>;
}

/// Adapter for any std I/O object (`File`, `TcpStream`, `OwnedFd`, ...)
///
/// # Example
/// ```text
/// let log = std::fs::File::create("/tmp/out.log")?;
/// dispositions.close(FdRef::external(IoDescriptor(log)));
/// ```
pub struct IoDescriptor<T>(pub T);

impl<T: AsRawFd + Send + Sync> DescriptorResolver for IoDescriptor<T> {
    fn resolve_descriptor(&self) -> Option<RawFd> {
        Some(self.0.as_raw_fd())
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;

    /// Resolver returning a fixed answer
    pub struct FixedDescriptor(Option<RawFd>);

    impl FixedDescriptor {
        pub fn new(fd: RawFd) -> Self {
            Self(Some(fd))
        }

        pub fn unresolvable() -> Self {
            Self(None)
        }
    }

    impl DescriptorResolver for FixedDescriptor {
        fn resolve_descriptor(&self) -> Option<RawFd> {
            self.0
        }
    }
}
