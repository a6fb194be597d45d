// src/exec/runner.rs

//! Runs one action: its command sequence, in its working directory, under a
//! cancellation token.

use std::process::ExitStatus;
use std::time::{Duration, Instant};

use tokio::process::Child;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::model::DEFAULT_SHUTDOWN_GRACE;
use crate::engine::{ActionOutcome, CommandFailure, ExecutionResult, FailureKind};
use crate::errors::Result;
use crate::exec::command::{display_command, shell_command};
use crate::exec::invocation::Invocation;
use crate::exec::output::{configure_stdio, OutputRelay};
use crate::exec::process_group::{isolate, signal_group, GroupSignal};
use crate::registry::Action;
use crate::types::{ExecMode, OutputMode};

/// Process-level options shared by every member of an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub output: OutputMode,
    /// Time a child gets to exit by itself after cancellation before it is
    /// killed.
    pub shutdown_grace: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            output: OutputMode::Inherit,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

/// Result of one command of the sequence.
enum CommandStep {
    Success,
    Failed(FailureKind),
    Cancelled,
}

/// Prepare and run a single action.
///
/// Structural problems (`WatchUnsupported`, `UnexpectedArguments`) are
/// returned as errors before anything is spawned; everything that happens
/// once processes run is reported in the [`ExecutionResult`].
pub async fn run(
    action: &Action,
    mode: ExecMode,
    extra_args: &[String],
    options: RunOptions,
    cancel: CancellationToken,
) -> Result<ExecutionResult> {
    let invocation = Invocation::prepare(action, mode, extra_args)?;
    Ok(run_invocation(invocation, options, cancel).await)
}

/// Run a prepared invocation to completion or cancellation.
///
/// Commands run strictly one after another; the first one that does not
/// succeed ends the action and the rest are never spawned.
pub async fn run_invocation(
    inv: Invocation,
    options: RunOptions,
    cancel: CancellationToken,
) -> ExecutionResult {
    let started = Instant::now();
    let outcome = run_commands(&inv, options, &cancel).await;
    let elapsed = started.elapsed();

    debug!(
        member = %inv.qualified_name(),
        elapsed_ms = elapsed.as_millis() as u64,
        %outcome,
        "action finished"
    );

    ExecutionResult::from_invocation(&inv, outcome, elapsed)
}

async fn run_commands(
    inv: &Invocation,
    options: RunOptions,
    cancel: &CancellationToken,
) -> ActionOutcome {
    let last = inv.commands.len().saturating_sub(1);

    for (index, command) in inv.commands.iter().enumerate() {
        if cancel.is_cancelled() {
            debug!(member = %inv.qualified_name(), index, "cancelled before command start");
            return ActionOutcome::Cancelled;
        }

        let args: &[String] = if index == last { &inv.args } else { &[] };

        match run_command(inv, index, command, args, options, cancel).await {
            CommandStep::Success => {}
            CommandStep::Failed(kind) => {
                return ActionOutcome::Failed(CommandFailure {
                    index,
                    command: display_command(command, args),
                    kind,
                });
            }
            CommandStep::Cancelled => return ActionOutcome::Cancelled,
        }
    }

    ActionOutcome::Success
}

async fn run_command(
    inv: &Invocation,
    index: usize,
    command: &str,
    args: &[String],
    options: RunOptions,
    cancel: &CancellationToken,
) -> CommandStep {
    let member = inv.qualified_name();
    info!(
        member = %member,
        index,
        cmd = %display_command(command, args),
        work_dir = %inv.work_dir.display(),
        mode = %inv.mode,
        "starting command"
    );

    let mut cmd = shell_command(command, args);
    cmd.current_dir(&inv.work_dir).kill_on_drop(true);
    isolate(&mut cmd);
    configure_stdio(&mut cmd, options.output);

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            error!(member = %member, index, error = %e, "failed to spawn command");
            return CommandStep::Failed(FailureKind::Spawn(format!(
                "{e} (working directory {:?})",
                inv.work_dir
            )));
        }
    };

    let relay = OutputRelay::attach(&mut child, &member);

    // Either the process exits on its own, or the invocation is cancelled
    // and the process is stopped.
    tokio::select! {
        status_res = child.wait() => {
            relay.finish().await;
            match status_res {
                Ok(status) => step_from_status(&member, index, status),
                Err(e) => {
                    error!(member = %member, index, error = %e, "failed waiting for process");
                    CommandStep::Failed(FailureKind::Spawn(format!("waiting for process: {e}")))
                }
            }
        }

        _ = cancel.cancelled() => {
            terminate(&mut child, &member, options.shutdown_grace).await;
            relay.abort();
            CommandStep::Cancelled
        }
    }
}

fn step_from_status(member: &str, index: usize, status: ExitStatus) -> CommandStep {
    info!(
        member = %member,
        index,
        exit_code = status.code().unwrap_or(-1),
        success = status.success(),
        "command exited"
    );

    if status.success() {
        return CommandStep::Success;
    }
    match status.code() {
        Some(code) => CommandStep::Failed(FailureKind::ExitCode(code)),
        None => CommandStep::Failed(FailureKind::Terminated),
    }
}

/// Stop a running child and everything it started, and wait until the
/// child is gone.
///
/// The child's process group gets SIGTERM and `grace` to exit on its own,
/// then SIGKILL. The final SIGKILL is sent even when the shell exited in
/// time, so that descendants ignoring SIGTERM do not outlive the action.
async fn terminate(child: &mut Child, member: &str, grace: Duration) {
    info!(member = %member, "cancellation requested; stopping process group");

    let leader = child.id();
    signal_group(leader, GroupSignal::Terminate, member);

    if !grace.is_zero() {
        match tokio::time::timeout(grace, child.wait()).await {
            Ok(Ok(status)) => {
                debug!(member = %member, ?status, "process exited within grace period");
                signal_group(leader, GroupSignal::Kill, member);
                return;
            }
            Ok(Err(e)) => {
                warn!(member = %member, error = %e, "failed waiting for process during grace period");
            }
            Err(_) => {
                info!(member = %member, grace_ms = grace.as_millis() as u64, "grace period elapsed; killing process group");
            }
        }
    }

    signal_group(leader, GroupSignal::Kill, member);
    if let Err(e) = child.kill().await {
        warn!(member = %member, error = %e, "failed to kill child process on cancellation");
    }
}
