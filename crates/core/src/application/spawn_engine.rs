// Spawn Engine - orchestrates environment building, fd planning and process creation

use super::config::SpawnConfig;
use super::{environment_table, file_action_plan};
use crate::domain::{EnvironmentOverride, ProcessHandle, SpawnPhase, SpawnRequest, Strategy};
use crate::error::{Result, SpawnError};
use crate::port::{AmbientEnvironment, EnvironmentSource, PreparedSpawn, ProcessSpawner};
use std::ffi::CString;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Spawn Engine
///
/// Holds no per-call state; each `spawn` call is independent and the engine
/// can be shared across threads.
pub struct SpawnEngine {
    ambient: Arc<dyn AmbientEnvironment>,
    spawner: Arc<dyn ProcessSpawner>,
    config: SpawnConfig,
}

impl SpawnEngine {
    /// Create a new spawn engine
    ///
    /// # Arguments
    /// * `ambient` - Ambient environment accessor (read only when overrides are given)
    /// * `spawner` - OS process-creation adapter
    /// * `config` - Engine configuration
    ///
    /// # Example
    /// ```text
    /// let engine = SpawnEngine::new(
    ///     Arc::new(ProcessEnvironment),
    ///     Arc::new(PosixSpawner::new(config.fallback_stack_size)),
    ///     config,
    /// );
    /// ```
    pub fn new(
        ambient: Arc<dyn AmbientEnvironment>,
        spawner: Arc<dyn ProcessSpawner>,
        config: SpawnConfig,
    ) -> Self {
        Self {
            ambient,
            spawner,
            config,
        }
    }

    pub fn config(&self) -> &SpawnConfig {
        &self.config
    }

    /// Spawn a child process with the request's strategy
    ///
    /// Blocks until creation has been attempted. Never waits on the child.
    ///
    /// # Errors
    /// - SpawnError::InvalidArgument for malformed program, argv or overrides
    /// - SpawnError::ResourceExhausted if allocation or duplication fails
    /// - SpawnError::SpawnFailed if the creation syscall reports failure
    pub fn spawn(&self, request: &SpawnRequest) -> Result<ProcessHandle> {
        let result = match request.strategy {
            Strategy::Batched => self.spawn_batched(request),
            Strategy::Fallback => self.spawn_fallback(request),
        };

        match &result {
            Ok(pid) => {
                enter_phase(request, SpawnPhase::Succeeded(*pid));
                info!(
                    program = %request.program,
                    strategy = %request.strategy,
                    pid = pid.pid(),
                    "Spawned child process"
                );
            }
            Err(e) => {
                enter_phase(request, SpawnPhase::Failed);
                warn!(
                    program = %request.program,
                    strategy = %request.strategy,
                    error = %e,
                    "Spawn failed"
                );
            }
        }

        result
    }

    fn spawn_batched(&self, request: &SpawnRequest) -> Result<ProcessHandle> {
        enter_phase(request, SpawnPhase::Building);
        if let Some(overrides) = &request.env {
            environment_table::validate_overrides(overrides)?;
        }
        let (program, argv) = command_strings(request)?;
        let environment = self.build_environment(request.env.as_ref())?;

        enter_phase(request, SpawnPhase::Planning);
        let file_actions = file_action_plan::build(&request.fd_actions);

        let prepared = PreparedSpawn {
            program,
            argv,
            environment,
            file_actions,
            use_vfork_hint: self.config.use_vfork_hint,
        };

        enter_phase(request, SpawnPhase::Executing);
        let result = self.spawner.spawn_batched(&prepared);
        // Release the owned environment buffer as soon as the syscall returns
        drop(prepared);
        result
    }

    fn spawn_fallback(&self, request: &SpawnRequest) -> Result<ProcessHandle> {
        if request.has_options() {
            warn!(
                program = %request.program,
                env_overrides = request.env.as_ref().map_or(0, EnvironmentOverride::len),
                fd_dispositions = request.fd_actions.len(),
                "Fallback strategy ignores environment overrides and fd dispositions"
            );
        }

        enter_phase(request, SpawnPhase::Building);
        let (program, argv) = command_strings(request)?;

        enter_phase(request, SpawnPhase::Executing);
        self.spawner.spawn_fallback(&program, &argv)
    }

    /// Inherit when no override was requested; otherwise build a replacement
    fn build_environment(&self, env: Option<&EnvironmentOverride>) -> Result<EnvironmentSource> {
        match env {
            Some(overrides) if !overrides.is_empty() => {
                let ambient = self.ambient.entries();
                let buffer = environment_table::build(&ambient, Some(overrides))?;
                Ok(EnvironmentSource::Replace(buffer))
            }
            _ => Ok(EnvironmentSource::Inherit),
        }
    }
}

fn enter_phase(request: &SpawnRequest, phase: SpawnPhase) {
    debug!(program = %request.program, strategy = %request.strategy, phase = %phase, "Spawn phase");
}

/// Convert program and argv into C strings
fn command_strings(request: &SpawnRequest) -> Result<(CString, Vec<CString>)> {
    if request.program.is_empty() {
        return Err(SpawnError::InvalidArgument("program is empty".to_string()));
    }
    let program = CString::new(request.program.as_str()).map_err(|_| {
        SpawnError::InvalidArgument(format!("program contains NUL byte: {:?}", request.program))
    })?;

    if request.argv.is_empty() {
        return Err(SpawnError::InvalidArgument("argv is empty".to_string()));
    }
    let argv = request
        .argv
        .iter()
        .enumerate()
        .map(|(i, arg)| {
            CString::new(arg.as_str()).map_err(|_| {
                SpawnError::InvalidArgument(format!("argv[{}] contains NUL byte", i))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok((program, argv))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Channel, ErrnoClass, FdDispositions, FileAction};
    use crate::port::ambient_environment::mocks::FakeAmbientEnvironment;
    use crate::port::process_spawner::mocks::{MockBehavior, RecordingSpawner, SpawnCall};

    fn engine(
        ambient: Arc<FakeAmbientEnvironment>,
        spawner: Arc<RecordingSpawner>,
    ) -> SpawnEngine {
        SpawnEngine::new(ambient, spawner, SpawnConfig::default())
    }

    fn batched_call(spawner: &RecordingSpawner) -> PreparedSpawn {
        match spawner.calls().pop() {
            Some(SpawnCall::Batched(prepared)) => prepared,
            other => panic!("expected batched call, got {:?}", other),
        }
    }

    #[test]
    fn test_batched_without_env_inherits() {
        let ambient = Arc::new(FakeAmbientEnvironment::new(["PATH=/bin"]));
        let spawner = Arc::new(RecordingSpawner::new_success(100));
        let engine = engine(ambient.clone(), spawner.clone());

        let pid = engine
            .spawn(&SpawnRequest::new("/bin/echo", ["echo", "hi"]))
            .unwrap();

        assert_eq!(pid.pid(), 100);
        let prepared = batched_call(&spawner);
        assert_eq!(prepared.environment, EnvironmentSource::Inherit);
        assert_eq!(prepared.program.as_bytes(), b"/bin/echo");
        assert_eq!(prepared.argv.len(), 2);
        assert!(prepared.use_vfork_hint);
        // Inherit passes the process environment through without reading it
        assert_eq!(ambient.read_count(), 0);
    }

    #[test]
    fn test_empty_override_inherits() {
        let ambient = Arc::new(FakeAmbientEnvironment::new(["PATH=/bin"]));
        let spawner = Arc::new(RecordingSpawner::new_success(1));
        let engine = engine(ambient.clone(), spawner.clone());

        let request = SpawnRequest::program("true").with_env(EnvironmentOverride::new());
        engine.spawn(&request).unwrap();

        assert_eq!(batched_call(&spawner).environment, EnvironmentSource::Inherit);
        assert_eq!(ambient.read_count(), 0);
    }

    #[test]
    fn test_batched_with_override_replaces_environment() {
        let ambient = Arc::new(FakeAmbientEnvironment::new(["PATH=/bin", "FOO=old"]));
        let spawner = Arc::new(RecordingSpawner::new_success(101));
        let engine = engine(ambient.clone(), spawner.clone());

        let mut env = EnvironmentOverride::new();
        env.set("FOO", "bar");
        engine
            .spawn(&SpawnRequest::program("/usr/bin/env").with_env(env))
            .unwrap();

        let EnvironmentSource::Replace(buffer) = batched_call(&spawner).environment else {
            panic!("expected replacement environment");
        };
        let foo_entries = buffer
            .entries()
            .iter()
            .filter(|e| e.as_bytes().starts_with(b"FOO="))
            .count();
        assert_eq!(foo_entries, 1);
        assert_eq!(buffer.get("FOO"), Some(&b"bar"[..]));
        assert_eq!(ambient.read_count(), 1);
    }

    #[test]
    fn test_file_actions_end_with_null_sink() {
        let spawner = Arc::new(RecordingSpawner::new_success(102));
        let engine = engine(Arc::new(FakeAmbientEnvironment::empty()), spawner.clone());

        let mut fds = FdDispositions::new();
        fds.close(Channel::Error).close(5);
        engine
            .spawn(&SpawnRequest::program("true").with_fd_actions(fds))
            .unwrap();

        let plan = batched_call(&spawner).file_actions;
        assert_eq!(plan.closed_fds().collect::<Vec<_>>(), vec![2, 5]);
        assert!(matches!(plan.last(), Some(FileAction::Open { fd: 2, .. })));
    }

    #[test]
    fn test_invalid_override_fails_before_spawn() {
        let ambient = Arc::new(FakeAmbientEnvironment::new(["A=1"]));
        let spawner = Arc::new(RecordingSpawner::new_success(1));
        let engine = engine(ambient.clone(), spawner.clone());

        let mut env = EnvironmentOverride::new();
        env.set("BAD=NAME", "x");
        let result = engine.spawn(&SpawnRequest::program("true").with_env(env));

        assert!(matches!(result, Err(SpawnError::InvalidArgument(_))));
        assert_eq!(spawner.call_count(), 0);
        assert_eq!(ambient.read_count(), 0);
    }

    #[test]
    fn test_invalid_command_rejected() {
        let spawner = Arc::new(RecordingSpawner::new_success(1));
        let engine = engine(Arc::new(FakeAmbientEnvironment::empty()), spawner.clone());

        let cases = vec![
            SpawnRequest::new("", ["x"]),
            SpawnRequest::new("/bin/e\0cho", ["echo"]),
            SpawnRequest::new("/bin/echo", Vec::<String>::new()),
            SpawnRequest::new("/bin/echo", ["echo", "h\0i"]),
        ];
        for request in cases {
            for strategy in [Strategy::Batched, Strategy::Fallback] {
                let result = engine.spawn(&request.clone().with_strategy(strategy));
                assert!(matches!(result, Err(SpawnError::InvalidArgument(_))));
            }
        }
        assert_eq!(spawner.call_count(), 0);
    }

    #[test]
    fn test_spawn_failure_is_typed() {
        let spawner = Arc::new(RecordingSpawner::new_fail(ErrnoClass::NotFound, 2));
        let engine = engine(Arc::new(FakeAmbientEnvironment::empty()), spawner);

        let err = engine
            .spawn(&SpawnRequest::program("/no/such/program"))
            .unwrap_err();

        assert!(err.is_not_found());
        match err {
            SpawnError::SpawnFailed { errno, program, .. } => {
                assert_eq!(errno, 2);
                assert_eq!(program, "/no/such/program");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_fallback_uses_program_and_argv_only() {
        let ambient = Arc::new(FakeAmbientEnvironment::new(["A=1"]));
        let spawner = Arc::new(RecordingSpawner::new_success(200));
        let engine = engine(ambient.clone(), spawner.clone());

        let mut env = EnvironmentOverride::new();
        env.set("IGNORED", "1");
        let mut fds = FdDispositions::new();
        fds.close(4);
        let request = SpawnRequest::new("sleep", ["sleep", "0"])
            .with_env(env)
            .with_fd_actions(fds)
            .with_strategy(Strategy::Fallback);

        let pid = engine.spawn(&request).unwrap();

        assert_eq!(pid.pid(), 200);
        match spawner.calls().pop() {
            Some(SpawnCall::Fallback { program, argv }) => {
                assert_eq!(program.as_bytes(), b"sleep");
                assert_eq!(argv.len(), 2);
            }
            other => panic!("expected fallback call, got {:?}", other),
        }
        assert_eq!(ambient.read_count(), 0);
    }

    #[test]
    fn test_fallback_duplication_failure() {
        let spawner = Arc::new(RecordingSpawner::new(MockBehavior::Exhausted));
        let engine = engine(Arc::new(FakeAmbientEnvironment::empty()), spawner);

        let result =
            engine.spawn(&SpawnRequest::program("true").with_strategy(Strategy::Fallback));
        assert!(matches!(result, Err(SpawnError::ResourceExhausted(_))));
    }

    #[test]
    fn test_vfork_hint_follows_config() {
        let spawner = Arc::new(RecordingSpawner::new_success(1));
        let config = SpawnConfig {
            use_vfork_hint: false,
            ..SpawnConfig::default()
        };
        let engine = SpawnEngine::new(
            Arc::new(FakeAmbientEnvironment::empty()),
            spawner.clone(),
            config,
        );

        engine.spawn(&SpawnRequest::program("true")).unwrap();
        assert!(!batched_call(&spawner).use_vfork_hint);
        assert!(!engine.config().use_vfork_hint);
    }

    #[test]
    fn test_engine_is_stateless_across_calls() {
        let spawner = Arc::new(RecordingSpawner::new_success(7));
        let engine = engine(Arc::new(FakeAmbientEnvironment::new(["A=1"])), spawner.clone());

        let mut env = EnvironmentOverride::new();
        env.set("B", "2");
        engine
            .spawn(&SpawnRequest::program("true").with_env(env))
            .unwrap();
        engine.spawn(&SpawnRequest::program("true")).unwrap();

        let calls = spawner.calls();
        assert_eq!(calls.len(), 2);
        match &calls[1] {
            SpawnCall::Batched(prepared) => {
                assert_eq!(prepared.environment, EnvironmentSource::Inherit)
            }
            other => panic!("expected batched call, got {:?}", other),
        }
    }
}
