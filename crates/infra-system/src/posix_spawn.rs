// Batched strategy: file actions + attributes + one posix_spawnp call

use crate::c_string_array::CStringArray;
use crate::errno::classify;
use fastspawn_core::domain::{FileAction, FileActionPlan};
use fastspawn_core::port::{EnvironmentSource, PreparedSpawn};
use fastspawn_core::{ProcessHandle, Result, SpawnError};
use std::ffi::CString;
use std::mem::MaybeUninit;
use tracing::debug;

/// glibc's `POSIX_SPAWN_USEVFORK` (not exported by the libc crate)
#[cfg(all(target_os = "linux", target_env = "gnu"))]
const POSIX_SPAWN_USEVFORK: libc::c_short = 0x40;

/// `posix_spawn_file_actions_t` wrapper, destroyed on drop
struct FileActions {
    inner: libc::posix_spawn_file_actions_t,
    // Open paths stay alive until the spawn call has consumed them
    paths: Vec<CString>,
}

impl FileActions {
    fn new() -> Result<Self> {
        let mut inner = MaybeUninit::<libc::posix_spawn_file_actions_t>::uninit();
        // SAFETY: init writes a valid object into `inner` when it returns 0
        let rc = unsafe { libc::posix_spawn_file_actions_init(inner.as_mut_ptr()) };
        if rc != 0 {
            return Err(SpawnError::ResourceExhausted(format!(
                "posix_spawn_file_actions_init: errno {}",
                rc
            )));
        }
        Ok(Self {
            inner: unsafe { inner.assume_init() },
            paths: Vec::new(),
        })
    }

    /// Register the plan's actions
    ///
    /// Closes are best effort: one the C library rejects (an fd beyond the
    /// descriptor limit, say) is dropped from the list. Only the open
    /// actions are mandatory.
    fn apply(&mut self, plan: &FileActionPlan) -> Result<()> {
        for action in plan.actions() {
            match action {
                FileAction::Close { fd } => self.add_close(*fd),
                FileAction::Open { fd, path } => self.add_open(*fd, path)?,
            }
        }
        Ok(())
    }

    fn add_close(&mut self, fd: libc::c_int) {
        let rc = unsafe { libc::posix_spawn_file_actions_addclose(&mut self.inner, fd) };
        if rc != 0 {
            debug!(fd = fd, errno = rc, "Skipping close action rejected by the C library");
        }
    }

    fn add_open(&mut self, fd: libc::c_int, path: &str) -> Result<()> {
        let c_path = CString::new(path).map_err(|_| {
            SpawnError::InvalidArgument(format!("file action path contains NUL byte: {:?}", path))
        })?;
        let rc = unsafe {
            libc::posix_spawn_file_actions_addopen(
                &mut self.inner,
                fd,
                c_path.as_ptr(),
                libc::O_WRONLY,
                0,
            )
        };
        self.paths.push(c_path);
        check_action(rc, || format!("open({}, {})", fd, path))
    }

    fn as_ptr(&self) -> *const libc::posix_spawn_file_actions_t {
        &self.inner
    }
}

impl Drop for FileActions {
    fn drop(&mut self) {
        unsafe {
            libc::posix_spawn_file_actions_destroy(&mut self.inner);
        }
    }
}

/// `posix_spawnattr_t` wrapper, destroyed on drop
struct SpawnAttr {
    inner: libc::posix_spawnattr_t,
}

impl SpawnAttr {
    fn new() -> Result<Self> {
        let mut inner = MaybeUninit::<libc::posix_spawnattr_t>::uninit();
        // SAFETY: init writes a valid object into `inner` when it returns 0
        let rc = unsafe { libc::posix_spawnattr_init(inner.as_mut_ptr()) };
        if rc != 0 {
            return Err(SpawnError::ResourceExhausted(format!(
                "posix_spawnattr_init: errno {}",
                rc
            )));
        }
        Ok(Self {
            inner: unsafe { inner.assume_init() },
        })
    }

    /// Request vfork-style creation; returns whether the platform supports it
    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    fn request_vfork(&mut self) -> bool {
        let rc = unsafe { libc::posix_spawnattr_setflags(&mut self.inner, POSIX_SPAWN_USEVFORK) };
        rc == 0
    }

    #[cfg(not(all(target_os = "linux", target_env = "gnu")))]
    fn request_vfork(&mut self) -> bool {
        false
    }

    fn as_ptr(&self) -> *const libc::posix_spawnattr_t {
        &self.inner
    }
}

impl Drop for SpawnAttr {
    fn drop(&mut self) {
        unsafe {
            libc::posix_spawnattr_destroy(&mut self.inner);
        }
    }
}

fn check_action(rc: libc::c_int, describe: impl FnOnce() -> String) -> Result<()> {
    if rc == 0 {
        return Ok(());
    }
    Err(SpawnError::InvalidArgument(format!(
        "file action {} rejected: errno {}",
        describe(),
        rc
    )))
}

/// The process's own `environ`, passed through without copying
#[cfg(target_vendor = "apple")]
fn ambient_envp() -> *const *mut libc::c_char {
    unsafe { *libc::_NSGetEnviron() as *const *mut libc::c_char }
}

#[cfg(not(target_vendor = "apple"))]
fn ambient_envp() -> *const *mut libc::c_char {
    extern "C" {
        static environ: *const *mut libc::c_char;
    }
    unsafe { environ }
}

/// Create a child with one `posix_spawnp` call
///
/// The file-action list and attribute set are released on every path.
///
/// # Errors
/// - SpawnError::SpawnFailed when posix_spawnp returns non-zero
/// - SpawnError::ResourceExhausted if the action list or attributes cannot be set up
pub fn spawn(prepared: &PreparedSpawn) -> Result<ProcessHandle> {
    let mut actions = FileActions::new()?;
    actions.apply(&prepared.file_actions)?;

    let mut attr = SpawnAttr::new()?;
    let vfork = prepared.use_vfork_hint && attr.request_vfork();

    let argv = CStringArray::new(&prepared.argv);
    let replacement;
    let envp = match &prepared.environment {
        EnvironmentSource::Inherit => ambient_envp(),
        EnvironmentSource::Replace(buffer) => {
            replacement = CStringArray::new(buffer.entries());
            replacement.as_ptr()
        }
    };

    debug!(
        program = ?prepared.program,
        file_actions = prepared.file_actions.len(),
        vfork = vfork,
        "Calling posix_spawnp"
    );

    let mut pid: libc::pid_t = 0;
    // SAFETY: every pointer refers to a NULL-terminated array or C string that
    // outlives the call; actions and attr are initialized
    let rc = unsafe {
        libc::posix_spawnp(
            &mut pid,
            prepared.program.as_ptr(),
            actions.as_ptr(),
            attr.as_ptr(),
            argv.as_ptr(),
            envp,
        )
    };

    if rc != 0 {
        return Err(SpawnError::SpawnFailed {
            class: classify(rc),
            errno: rc,
            program: prepared.program.to_string_lossy().into_owned(),
        });
    }

    Ok(ProcessHandle::new(pid))
}
