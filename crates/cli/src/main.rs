//! fastspawn CLI - spawn one program through the fastspawn engine

mod logging;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use serde::Serialize;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

use fastspawn_core::{
    EnvironmentOverride, ErrnoClass, FdDispositions, FdRef, ProcessHandle, SpawnConfig,
    SpawnEngine, SpawnError, SpawnRequest, Strategy,
};
use fastspawn_infra_system::{PosixSpawner, ProcessEnvironment};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Debug)]
#[command(name = "fastspawn")]
#[command(about = "Spawn a process with a controlled environment and descriptor set", long_about = None)]
#[command(version)]
struct Cli {
    /// Creation strategy: batched (posix_spawnp) or fallback (vfork-style)
    #[arg(short, long)]
    strategy: Option<Strategy>,

    /// Set a variable in the child's environment (repeatable)
    #[arg(short, long = "env", value_name = "NAME=VALUE")]
    env: Vec<String>,

    /// Remove a variable from the child's environment (repeatable)
    #[arg(short, long = "unset", value_name = "NAME")]
    unset: Vec<String>,

    /// Close a descriptor in the child: a number, or in / out / err (repeatable)
    #[arg(short, long = "close", value_name = "FD")]
    close: Vec<FdRef>,

    /// argv[0] for the child (default: PROGRAM)
    #[arg(long)]
    arg0: Option<String>,

    /// Wait for the child and exit with its status
    #[arg(short, long)]
    wait: bool,

    /// Print the spawn report as JSON
    #[arg(long)]
    json: bool,

    /// Debug-level logging for fastspawn crates
    #[arg(short, long)]
    verbose: bool,

    /// Program to run (looked up in PATH when it has no '/')
    program: String,

    /// Arguments passed to the program
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

#[derive(Serialize)]
struct SpawnReport {
    pid: ProcessHandle,
    strategy: Strategy,
    program: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    exit_code: Option<i32>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "fastspawn:".red().bold(), e);
            ExitCode::from(failure_exit_code(&e))
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    info!("fastspawn v{} starting", VERSION);

    let config = SpawnConfig::from_env();
    let engine = SpawnEngine::new(
        Arc::new(ProcessEnvironment),
        Arc::new(PosixSpawner::new(config.fallback_stack_size)),
        config.clone(),
    );

    let request = build_request(&cli, &config)?;
    let pid = engine
        .spawn(&request)
        .with_context(|| format!("failed to spawn {}", request.program))?;

    let exit_code = if cli.wait {
        Some(wait_for(pid)?)
    } else {
        None
    };

    let report = SpawnReport {
        pid,
        strategy: request.strategy,
        program: request.program.clone(),
        exit_code,
    };
    if cli.json {
        println!("{}", serde_json::to_string(&report)?);
    } else {
        println!("{}", report.pid);
    }

    Ok(match exit_code {
        Some(code) => ExitCode::from(code.clamp(0, 255) as u8),
        None => ExitCode::SUCCESS,
    })
}

/// Translate command-line arguments into a spawn request
///
/// Unsets are applied before sets, so `--unset X --env X=1` sets X.
fn build_request(cli: &Cli, config: &SpawnConfig) -> Result<SpawnRequest> {
    let mut argv = Vec::with_capacity(cli.args.len() + 1);
    argv.push(cli.arg0.clone().unwrap_or_else(|| cli.program.clone()));
    argv.extend(cli.args.iter().cloned());

    let mut request = SpawnRequest::new(cli.program.clone(), argv)
        .with_strategy(cli.strategy.unwrap_or(config.default_strategy));

    if !cli.env.is_empty() || !cli.unset.is_empty() {
        let mut env = EnvironmentOverride::new();
        for name in &cli.unset {
            env.unset(name.clone());
        }
        for assignment in &cli.env {
            let (name, value) = assignment
                .split_once('=')
                .with_context(|| format!("--env expects NAME=VALUE, got {:?}", assignment))?;
            env.set(name, value);
        }
        request = request.with_env(env);
    }

    if !cli.close.is_empty() {
        let mut fds = FdDispositions::new();
        for fd_ref in &cli.close {
            fds.close(fd_ref.clone());
        }
        request = request.with_fd_actions(fds);
    }

    Ok(request)
}

/// Reap the child (caller-side; the engine itself never waits)
fn wait_for(pid: ProcessHandle) -> Result<i32> {
    use nix::sys::wait::{waitpid, WaitStatus};
    use nix::unistd::Pid;

    loop {
        match waitpid(Pid::from_raw(pid.pid()), None).context("waitpid failed")? {
            WaitStatus::Exited(_, code) => return Ok(code),
            WaitStatus::Signaled(_, signal, _) => {
                eprintln!("{} child killed by {}", "fastspawn:".yellow().bold(), signal);
                return Ok(128 + signal as i32);
            }
            _ => continue,
        }
    }
}

/// Shell-style exit codes: 127 not found, 126 not executable, 2 usage
fn failure_exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<SpawnError>() {
        Some(SpawnError::InvalidArgument(_)) => 2,
        Some(e) => match e.errno_class() {
            Some(ErrnoClass::NotFound) => 127,
            Some(ErrnoClass::PermissionDenied) | Some(ErrnoClass::ExecFormat) => 126,
            _ => 1,
        },
        None => 1,
    }
}
