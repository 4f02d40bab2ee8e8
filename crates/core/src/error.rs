// Central Error Type for the Spawn Engine

use crate::domain::ErrnoClass;
use thiserror::Error;

/// Spawn-level error type
///
/// Every error raised before the creation syscall leaves no side effect behind
/// (no leaked buffers, no partially applied file actions).
///
/// A failed program replacement inside the fallback child has no variant: that
/// branch has no caller to report to and terminates with exit status 1.
#[derive(Error, Debug)]
pub enum SpawnError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("Spawn failed ({class}): {program}: errno {errno}")]
    SpawnFailed {
        class: ErrnoClass,
        errno: i32,
        program: String,
    },
}

impl SpawnError {
    /// Errno class of a failed creation syscall, if this is one
    pub fn errno_class(&self) -> Option<ErrnoClass> {
        match self {
            SpawnError::SpawnFailed { class, .. } => Some(*class),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.errno_class() == Some(ErrnoClass::NotFound)
    }
}

/// Result type alias using SpawnError
pub type Result<T> = std::result::Result<T, SpawnError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_failed_display() {
        let err = SpawnError::SpawnFailed {
            class: ErrnoClass::NotFound,
            errno: 2,
            program: "/no/such/program".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("not found"));
        assert!(msg.contains("/no/such/program"));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_errno_class_only_for_spawn_failures() {
        let err = SpawnError::InvalidArgument("bad name".to_string());
        assert!(err.errno_class().is_none());
        assert!(!err.is_not_found());

        let err = SpawnError::ResourceExhausted("clone: EAGAIN".to_string());
        assert!(err.to_string().contains("Resource exhausted"));
    }
}
