// Errno classification (libc constants -> ErrnoClass)

use fastspawn_core::ErrnoClass;

/// Classify the errno returned by a failed creation syscall
pub fn classify(errno: i32) -> ErrnoClass {
    match errno {
        libc::ENOENT | libc::ENOTDIR => ErrnoClass::NotFound,
        libc::EACCES | libc::EPERM => ErrnoClass::PermissionDenied,
        libc::ENOEXEC => ErrnoClass::ExecFormat,
        libc::E2BIG => ErrnoClass::ArgumentListTooLong,
        libc::EAGAIN | libc::ENOMEM => ErrnoClass::ResourceLimit,
        _ => ErrnoClass::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify(libc::ENOENT), ErrnoClass::NotFound);
        assert_eq!(classify(libc::ENOTDIR), ErrnoClass::NotFound);
        assert_eq!(classify(libc::EACCES), ErrnoClass::PermissionDenied);
        assert_eq!(classify(libc::ENOEXEC), ErrnoClass::ExecFormat);
        assert_eq!(classify(libc::E2BIG), ErrnoClass::ArgumentListTooLong);
        assert_eq!(classify(libc::ENOMEM), ErrnoClass::ResourceLimit);
        assert_eq!(classify(libc::EINVAL), ErrnoClass::Other);
    }
}
