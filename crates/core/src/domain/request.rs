// Spawn Request Domain Model

use super::{EnvironmentOverride, FdDispositions};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Process creation strategy, chosen explicitly by the caller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Strategy {
    /// File actions + attributes + one `posix_spawnp` call
    #[default]
    Batched,
    /// Duplicate-then-replace sharing memory until exec; no env overrides, no fd actions
    Fallback,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Batched => write!(f, "batched"),
            Strategy::Fallback => write!(f, "fallback"),
        }
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "batched" | "pspawn" => Ok(Strategy::Batched),
            "fallback" | "vspawn" => Ok(Strategy::Fallback),
            other => Err(format!("unknown strategy: {}", other)),
        }
    }
}

/// Identifier of a spawned child; the engine never waits on or reaps it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessHandle(i32);

impl ProcessHandle {
    pub fn new(pid: i32) -> Self {
        Self(pid)
    }

    pub fn pid(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-call state machine: Building -> Planning -> Executing -> {Succeeded, Failed}
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnPhase {
    Building,
    Planning,
    Executing,
    Succeeded(ProcessHandle),
    Failed,
}

impl fmt::Display for SpawnPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpawnPhase::Building => write!(f, "BUILDING"),
            SpawnPhase::Planning => write!(f, "PLANNING"),
            SpawnPhase::Executing => write!(f, "EXECUTING"),
            SpawnPhase::Succeeded(pid) => write!(f, "SUCCEEDED({})", pid),
            SpawnPhase::Failed => write!(f, "FAILED"),
        }
    }
}

/// One spawn call
///
/// `argv[0]` is conventionally the program name; `program` is what gets
/// looked up and executed.
#[derive(Debug, Clone)]
pub struct SpawnRequest {
    pub program: String,
    pub argv: Vec<String>,
    pub env: Option<EnvironmentOverride>,
    pub fd_actions: FdDispositions,
    pub strategy: Strategy,
}

impl SpawnRequest {
    pub fn new<I, S>(program: impl Into<String>, argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            argv: argv.into_iter().map(Into::into).collect(),
            env: None,
            fd_actions: FdDispositions::new(),
            strategy: Strategy::default(),
        }
    }

    /// Request with `argv == [program]`
    pub fn program(program: impl Into<String>) -> Self {
        let program = program.into();
        Self::new(program.clone(), [program])
    }

    pub fn with_env(mut self, env: EnvironmentOverride) -> Self {
        self.env = Some(env);
        self
    }

    pub fn with_fd_actions(mut self, fd_actions: FdDispositions) -> Self {
        self.fd_actions = fd_actions;
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Whether the request carries anything beyond program + argv
    pub fn has_options(&self) -> bool {
        self.env.as_ref().is_some_and(|env| !env.is_empty()) || !self.fd_actions.is_empty()
    }
}
