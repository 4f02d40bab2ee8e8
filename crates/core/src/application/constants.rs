// Spawn constants (No magic values)

use std::os::fd::RawFd;

/// Discard destination for the child's error channel
pub const NULL_SINK_PATH: &str = "/dev/null";

/// Descriptor redirected to the null sink after all caller closes
pub const ERROR_CHANNEL_FD: RawFd = 2;

/// Exit status of a fallback child whose program replacement failed
pub const EXEC_FAILURE_EXIT_CODE: i32 = 1;

/// Stack reserved for the fallback child continuation (64 KiB)
pub const DEFAULT_FALLBACK_STACK_SIZE: usize = 64 * 1024;

/// Smallest accepted fallback stack (16 KiB)
pub const MIN_FALLBACK_STACK_SIZE: usize = 16 * 1024;
