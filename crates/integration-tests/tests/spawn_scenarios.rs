//! End-to-end spawn scenarios
//!
//! Real children through `PosixSpawner`; every test reaps what it spawns.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use fastspawn_core::port::ambient_environment::mocks::FakeAmbientEnvironment;
use fastspawn_core::port::AmbientEnvironment;
use fastspawn_core::{
    Channel, EnvironmentOverride, ErrnoClass, FdDispositions, ProcessHandle, SpawnConfig,
    SpawnEngine, SpawnError, SpawnRequest, Strategy,
};
use fastspawn_infra_system::{PosixSpawner, ProcessEnvironment};
use nix::sys::signal::{kill, Signal};
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::Pid;

fn engine(ambient: impl AmbientEnvironment + 'static) -> SpawnEngine {
    SpawnEngine::new(
        Arc::new(ambient),
        Arc::new(PosixSpawner::default()),
        SpawnConfig::default(),
    )
}

fn wait_exit_code(pid: ProcessHandle) -> i32 {
    match waitpid(Pid::from_raw(pid.pid()), None).unwrap() {
        WaitStatus::Exited(_, code) => code,
        other => panic!("unexpected wait status: {:?}", other),
    }
}

fn scratch_file(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("fastspawn_{}_{}", name, std::process::id()));
    let _ = std::fs::remove_file(&path);
    path
}

fn shell(script: &str) -> SpawnRequest {
    SpawnRequest::new("/bin/sh", ["sh", "-c", script])
}

/// Scenario 1: plain batched spawn returns a live child
#[test]
fn test_batched_echo() {
    let engine = engine(ProcessEnvironment);
    let request = SpawnRequest::new("/bin/echo", ["echo", "hi"]);

    let pid = engine.spawn(&request).unwrap();
    assert!(pid.pid() > 0);
    assert_eq!(wait_exit_code(pid), 0);
}

/// Scenario 2: an override replaces the ambient value exactly once
#[test]
fn test_override_replaces_ambient_value() {
    let out = scratch_file("override");
    let engine = engine(FakeAmbientEnvironment::new([
        "FOO=old",
        "KEEP=1",
        "PATH=/usr/bin:/bin",
    ]));

    let mut env = EnvironmentOverride::new();
    env.set("FOO", "bar");
    let script = format!("env > {}", out.display());
    let request = shell(&script).with_env(env);

    let pid = engine.spawn(&request).unwrap();
    assert_eq!(wait_exit_code(pid), 0);

    let dump = std::fs::read_to_string(&out).unwrap();
    let foo_lines: Vec<&str> = dump.lines().filter(|l| l.starts_with("FOO=")).collect();
    assert_eq!(foo_lines, vec!["FOO=bar"]);
    assert!(dump.lines().any(|l| l == "KEEP=1"));

    let _ = std::fs::remove_file(&out);
}

/// Unset names are absent from the child
#[test]
fn test_unset_removes_ambient_name() {
    let out = scratch_file("unset");
    let engine = engine(FakeAmbientEnvironment::new([
        "DROP_ME=1",
        "KEEP=1",
        "PATH=/usr/bin:/bin",
    ]));

    let mut env = EnvironmentOverride::new();
    env.unset("DROP_ME").set("ADDED", "yes");
    let script = format!("env > {}", out.display());
    let request = shell(&script).with_env(env);

    let pid = engine.spawn(&request).unwrap();
    assert_eq!(wait_exit_code(pid), 0);

    let dump = std::fs::read_to_string(&out).unwrap();
    assert!(!dump.lines().any(|l| l.starts_with("DROP_ME=")));
    assert!(dump.lines().any(|l| l == "KEEP=1"));
    assert!(dump.lines().any(|l| l == "ADDED=yes"));

    let _ = std::fs::remove_file(&out);
}

/// Scenario 3: a missing program fails synchronously with NotFound
#[test]
fn test_missing_program_not_found() {
    let engine = engine(ProcessEnvironment);
    let request = SpawnRequest::program("/nonexistent/binary");

    let err = engine.spawn(&request).unwrap_err();
    assert!(err.is_not_found());
    match err {
        SpawnError::SpawnFailed { class, program, .. } => {
            assert_eq!(class, ErrnoClass::NotFound);
            assert_eq!(program, "/nonexistent/binary");
        }
        other => panic!("expected SpawnFailed, got {:?}", other),
    }
}

/// Scenario 4: fallback returns once the child has exec'd, not when it exits
#[test]
fn test_fallback_returns_promptly() {
    let engine = engine(ProcessEnvironment);
    let request = SpawnRequest::new("sleep", ["sleep", "5"]).with_strategy(Strategy::Fallback);

    let started = Instant::now();
    let pid = engine.spawn(&request).unwrap();
    let elapsed = started.elapsed();

    assert!(pid.pid() > 0);
    assert!(
        elapsed < Duration::from_secs(2),
        "fallback blocked for {:?}",
        elapsed
    );

    kill(Pid::from_raw(pid.pid()), Signal::SIGKILL).unwrap();
    let status = waitpid(Pid::from_raw(pid.pid()), None).unwrap();
    assert!(matches!(status, WaitStatus::Signaled(_, Signal::SIGKILL, _)));
}

/// Fallback exec failure surfaces only as the child's exit status
#[test]
fn test_fallback_exec_failure_is_child_exit() {
    let engine = engine(ProcessEnvironment);
    let request = SpawnRequest::program("/nonexistent/binary").with_strategy(Strategy::Fallback);

    let pid = engine.spawn(&request).unwrap();
    assert_eq!(wait_exit_code(pid), 1);
}

/// The child's error channel is the null sink
#[cfg(target_os = "linux")]
#[test]
fn test_error_channel_is_null_sink() {
    let engine = engine(ProcessEnvironment);
    let request = shell("[ \"$(readlink /proc/$$/fd/2)\" = /dev/null ]");

    let pid = engine.spawn(&request).unwrap();
    assert_eq!(wait_exit_code(pid), 0);
}

/// A closed descriptor is absent in the child
#[cfg(target_os = "linux")]
#[test]
fn test_closed_stdout_absent_in_child() {
    let engine = engine(ProcessEnvironment);
    let mut fds = FdDispositions::new();
    fds.close(Channel::Output);
    let request = shell("[ ! -e /proc/$$/fd/1 ]").with_fd_actions(fds);

    let pid = engine.spawn(&request).unwrap();
    assert_eq!(wait_exit_code(pid), 0);
}
