// Fallback strategy: duplicate-then-replace with the parent suspended
//
// Between duplication and exec the child shares the parent's memory. The
// child continuation may only reset signal dispositions, call execvp or
// _exit: everything it touches (program pointer, argv array, signal mask,
// stack) is prepared before duplication.

use crate::c_string_array::CStringArray;
use fastspawn_core::application::constants::EXEC_FAILURE_EXIT_CODE;
use fastspawn_core::{ProcessHandle, Result, SpawnError};
use std::ffi::{CStr, CString};
use tracing::debug;

/// Stack execvp needs beyond the argument vector (PATH search, script fallback)
const EXEC_STACK_HEADROOM: usize = 32 * 1024;

/// Stack size for the duplicate's exec call, rounded up to whole pages
///
/// Covers the argument strings, the `argc + 2` pointer vector execvp builds
/// when it retries a file without a shebang through the shell, and the
/// PATH-search buffer. `floor` is the configured minimum.
pub fn exec_stack_size(
    program: &CStr,
    argv: &[CString],
    path_len: usize,
    floor: usize,
    page_size: usize,
) -> usize {
    let strings: usize = argv.iter().map(|arg| arg.as_bytes_with_nul().len()).sum();
    let pointers = (argv.len() + 2) * std::mem::size_of::<*const libc::c_char>();
    let search = path_len + program.to_bytes_with_nul().len() + 1;

    (strings + pointers + search + EXEC_STACK_HEADROOM)
        .max(floor)
        .next_multiple_of(page_size)
}

#[cfg(target_os = "linux")]
fn page_size() -> usize {
    // SAFETY: sysconf has no preconditions
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size > 0 {
        size as usize
    } else {
        4096
    }
}

/// Anonymous mapping used as the duplicate's stack, with a `PROT_NONE` guard
/// page at the low end; unmapped on drop
#[cfg(target_os = "linux")]
struct ChildStack {
    base: std::ptr::NonNull<libc::c_void>,
    len: usize,
    guard: usize,
}

#[cfg(target_os = "linux")]
impl ChildStack {
    fn map(size: usize, page_size: usize) -> Result<Self> {
        use nix::sys::mman::{mmap_anonymous, mprotect, MapFlags, ProtFlags};
        use std::num::NonZeroUsize;

        let len = size
            .checked_add(page_size)
            .and_then(NonZeroUsize::new)
            .ok_or_else(|| SpawnError::ResourceExhausted("child stack too large".to_string()))?;

        // SAFETY: fresh anonymous private mapping, no existing memory is aliased
        let base = unsafe {
            mmap_anonymous(
                None,
                len,
                ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
                MapFlags::MAP_PRIVATE | MapFlags::MAP_STACK,
            )
        }
        .map_err(|e| SpawnError::ResourceExhausted(format!("mmap child stack: {}", e)))?;

        let stack = Self {
            base,
            len: len.get(),
            guard: page_size,
        };

        // SAFETY: the first page lies inside the mapping created above
        unsafe { mprotect(stack.base, stack.guard, ProtFlags::PROT_NONE) }
            .map_err(|e| SpawnError::ResourceExhausted(format!("mprotect guard page: {}", e)))?;

        Ok(stack)
    }

    /// Usable region above the guard page
    fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: [base + guard, base + len) is mapped read-write and owned by self
        unsafe {
            std::slice::from_raw_parts_mut(
                self.base.as_ptr().cast::<u8>().add(self.guard),
                self.len - self.guard,
            )
        }
    }
}

#[cfg(target_os = "linux")]
impl Drop for ChildStack {
    fn drop(&mut self) {
        // SAFETY: base/len describe the mapping created in `map`
        unsafe {
            let _ = nix::sys::mman::munmap(self.base, self.len);
        }
    }
}

/// Restore default dispositions for every caught signal
///
/// Runs in the duplicate, which has its own handler table (no CLONE_SIGHAND)
/// but shares the parent's memory, so parent handlers must never fire there.
///
/// # Safety
/// Only raw `sigaction` syscalls; must run with all signals blocked.
#[cfg(target_os = "linux")]
unsafe fn reset_caught_signals() {
    let mut current: libc::sigaction = std::mem::zeroed();
    let mut default: libc::sigaction = std::mem::zeroed();
    default.sa_sigaction = libc::SIG_DFL;

    for signal in 1..libc::SIGRTMAX() + 1 {
        if libc::sigaction(signal, std::ptr::null(), &mut current) == 0
            && current.sa_sigaction != libc::SIG_DFL
            && current.sa_sigaction != libc::SIG_IGN
        {
            libc::sigaction(signal, &default, std::ptr::null_mut());
        }
    }
}

/// Duplicate the caller and exec `program` in the duplicate
///
/// Returns as soon as the duplicate has replaced its image (or exited); it
/// does not wait for the new program to run. A failed exec terminates the
/// duplicate with `EXEC_FAILURE_EXIT_CODE` and is not reported here.
///
/// All signals are blocked in the calling thread for the duration of the
/// duplication; the duplicate resets caught signals to their defaults and
/// restores the caller's mask right before exec.
///
/// # Arguments
/// * `program` - Program to execute (PATH lookup when it has no `/`)
/// * `argv` - Argument vector
/// * `min_stack_size` - Lower bound for the duplicate's stack
///
/// # Errors
/// - SpawnError::ResourceExhausted if the stack cannot be mapped, the signal
///   mask cannot be changed or duplication fails
#[cfg(target_os = "linux")]
pub fn spawn(program: &CStr, argv: &[CString], min_stack_size: usize) -> Result<ProcessHandle> {
    use nix::sched::{clone, CloneFlags};
    use nix::sys::signal::{pthread_sigmask, SigSet, SigmaskHow, Signal};
    use tracing::warn;

    let page = page_size();
    let path_len = std::env::var_os("PATH").map_or(0, |path| path.len());
    let stack_size = exec_stack_size(program, argv, path_len, min_stack_size, page);
    let mut stack = ChildStack::map(stack_size, page)?;

    let argv_array = CStringArray::new(argv);
    let program_ptr = program.as_ptr();
    let argv_ptr = argv_array.as_ptr() as *const *const libc::c_char;

    let mut saved = SigSet::empty();
    pthread_sigmask(SigmaskHow::SIG_SETMASK, Some(&SigSet::all()), Some(&mut saved))
        .map_err(|e| SpawnError::ResourceExhausted(format!("pthread_sigmask: {}", e)))?;
    let saved_mask: libc::sigset_t = *saved.as_ref();

    let child = Box::new(move || -> isize {
        // SAFETY: pointers and the saved mask were built before duplication
        // and stay valid while the parent is suspended; only syscalls run here
        unsafe {
            reset_caught_signals();
            libc::pthread_sigmask(libc::SIG_SETMASK, &saved_mask, std::ptr::null_mut());
            libc::execvp(program_ptr, argv_ptr);
            libc::_exit(EXEC_FAILURE_EXIT_CODE)
        }
    });

    debug!(program = ?program, stack_size = stack_size, "Duplicating with CLONE_VM | CLONE_VFORK");

    // SAFETY: the child runs on its own guarded stack and only execs or
    // exits; the parent is suspended until then
    let cloned = unsafe {
        clone(
            child,
            stack.as_mut_slice(),
            CloneFlags::CLONE_VM | CloneFlags::CLONE_VFORK,
            Some(Signal::SIGCHLD as i32),
        )
    };

    if let Err(e) = pthread_sigmask(SigmaskHow::SIG_SETMASK, Some(&saved), None) {
        warn!(error = %e, "Failed to restore signal mask after clone");
    }

    let pid = cloned.map_err(|e| SpawnError::ResourceExhausted(format!("clone: {}", e)))?;

    Ok(ProcessHandle::new(pid.as_raw()))
}

/// Duplicate the caller and exec `program` in the duplicate (plain fork)
///
/// # Errors
/// - SpawnError::ResourceExhausted if duplication fails
#[cfg(not(target_os = "linux"))]
pub fn spawn(program: &CStr, argv: &[CString], _min_stack_size: usize) -> Result<ProcessHandle> {
    use nix::unistd::{fork, ForkResult};

    let argv_array = CStringArray::new(argv);
    let program_ptr = program.as_ptr();
    let argv_ptr = argv_array.as_ptr() as *const *const libc::c_char;

    debug!(program = ?program, "Duplicating with fork");

    // SAFETY: the child only calls async-signal-safe execvp / _exit
    match unsafe { fork() } {
        Ok(ForkResult::Parent { child }) => Ok(ProcessHandle::new(child.as_raw())),
        Ok(ForkResult::Child) => unsafe {
            libc::execvp(program_ptr, argv_ptr);
            libc::_exit(EXEC_FAILURE_EXIT_CODE)
        },
        Err(e) => Err(SpawnError::ResourceExhausted(format!("fork: {}", e))),
    }
}
