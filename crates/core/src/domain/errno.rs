// Errno classification for failed creation syscalls

use serde::{Deserialize, Serialize};

/// Coarse class of the errno reported by a failed spawn
///
/// Lets callers branch on failure kind (e.g. retry with another program
/// path vs. surface to the user) without matching raw errno numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrnoClass {
    /// ENOENT, ENOTDIR
    NotFound,
    /// EACCES, EPERM
    PermissionDenied,
    /// ENOEXEC
    ExecFormat,
    /// E2BIG
    ArgumentListTooLong,
    /// EAGAIN, ENOMEM
    ResourceLimit,
    Other,
}

impl std::fmt::Display for ErrnoClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrnoClass::NotFound => write!(f, "not found"),
            ErrnoClass::PermissionDenied => write!(f, "permission denied"),
            ErrnoClass::ExecFormat => write!(f, "exec format error"),
            ErrnoClass::ArgumentListTooLong => write!(f, "argument list too long"),
            ErrnoClass::ResourceLimit => write!(f, "resource limit"),
            ErrnoClass::Other => write!(f, "other"),
        }
    }
}
