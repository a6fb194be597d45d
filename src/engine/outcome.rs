// src/engine/outcome.rs

//! Per-member and per-group execution results.

use std::fmt;
use std::time::Duration;

use crate::exec::Invocation;
use crate::types::ExecMode;

/// Exit code reported when the representative failure is a cancellation.
pub const EXIT_CANCELLED: i32 = 130;

/// Exit code for failures without a usable process exit code.
pub const EXIT_FAILURE: i32 = 1;

/// How a single command of an action failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// The process exited with a non-zero code.
    ExitCode(i32),
    /// The process was terminated by a signal and has no exit code.
    Terminated,
    /// The process could not be spawned (missing shell, bad working
    /// directory, ...).
    Spawn(String),
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::ExitCode(code) => write!(f, "exited with code {code}"),
            FailureKind::Terminated => f.write_str("terminated by signal"),
            FailureKind::Spawn(msg) => write!(f, "could not be spawned: {msg}"),
        }
    }
}

/// `CommandFailed`: which command of the sequence failed, and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFailure {
    /// Index of the failing command within the action's sequence.
    pub index: usize,
    pub command: String,
    pub kind: FailureKind,
}

impl CommandFailure {
    pub fn exit_code(&self) -> i32 {
        match self.kind {
            FailureKind::ExitCode(code) if code != 0 => code,
            _ => EXIT_FAILURE,
        }
    }
}

impl fmt::Display for CommandFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "command #{} `{}` {}", self.index, self.command, self.kind)
    }
}

/// Outcome of one member of a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Success,
    Failed(CommandFailure),
    /// Interrupted while running; its process was stopped and awaited.
    Cancelled,
    /// Never started (fail-fast or cancellation before its turn).
    Skipped,
}

impl ActionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ActionOutcome::Success)
    }

    /// Whether this member was started at all.
    pub fn was_started(&self) -> bool {
        !matches!(self, ActionOutcome::Skipped)
    }

    /// Failed or cancelled.
    pub fn is_failure(&self) -> bool {
        matches!(self, ActionOutcome::Failed(_) | ActionOutcome::Cancelled)
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            ActionOutcome::Success => 0,
            ActionOutcome::Failed(failure) => failure.exit_code(),
            ActionOutcome::Cancelled => EXIT_CANCELLED,
            ActionOutcome::Skipped => EXIT_FAILURE,
        }
    }
}

impl fmt::Display for ActionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionOutcome::Success => f.write_str("succeeded"),
            ActionOutcome::Failed(failure) => write!(f, "failed: {failure}"),
            ActionOutcome::Cancelled => f.write_str("cancelled"),
            ActionOutcome::Skipped => f.write_str("skipped"),
        }
    }
}

/// Outcome of one `(module, action)` member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub module: String,
    pub action: String,
    pub position: usize,
    /// Ran in the background partition.
    pub background: bool,
    pub outcome: ActionOutcome,
    pub elapsed: Duration,
}

impl ExecutionResult {
    pub fn from_invocation(inv: &Invocation, outcome: ActionOutcome, elapsed: Duration) -> Self {
        Self {
            module: inv.module.clone(),
            action: inv.action.clone(),
            position: inv.position,
            background: inv.background,
            outcome,
            elapsed,
        }
    }

    pub fn skipped(inv: &Invocation) -> Self {
        Self::from_invocation(inv, ActionOutcome::Skipped, Duration::ZERO)
    }

    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.module, self.action)
    }
}

/// Aggregated outcome of a whole target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupResult {
    pub action: String,
    pub mode: ExecMode,
    /// One entry per member, in group order.
    pub members: Vec<ExecutionResult>,
    /// The invocation was interrupted.
    pub cancelled: bool,
}

impl GroupResult {
    pub fn new(action: impl Into<String>, mode: ExecMode, mut members: Vec<ExecutionResult>) -> Self {
        members.sort_by_key(|m| m.position);
        Self {
            action: action.into(),
            mode,
            members,
            cancelled: false,
        }
    }

    pub fn with_cancelled(mut self, cancelled: bool) -> Self {
        self.cancelled = cancelled;
        self
    }

    /// True iff every member ran and succeeded.
    pub fn success(&self) -> bool {
        self.members.iter().all(|m| m.outcome.is_success())
    }

    pub fn member(&self, module: &str) -> Option<&ExecutionResult> {
        self.members.iter().find(|m| m.module == module)
    }

    pub fn skipped(&self) -> impl Iterator<Item = &ExecutionResult> {
        self.members.iter().filter(|m| !m.outcome.was_started())
    }

    pub fn failures(&self) -> impl Iterator<Item = &ExecutionResult> {
        self.members.iter().filter(|m| m.outcome.is_failure())
    }

    /// The failure that determines the exit status: the first foreground
    /// failure if there is one, else the first background failure, both in
    /// group order.
    pub fn representative_failure(&self) -> Option<&ExecutionResult> {
        self.failures()
            .find(|m| !m.background)
            .or_else(|| self.failures().find(|m| m.background))
    }

    /// Process exit code for this result: 0 on success.
    pub fn exit_code(&self) -> i32 {
        if self.success() {
            return 0;
        }
        match self.representative_failure() {
            Some(m) => m.outcome.exit_code(),
            None if self.cancelled => EXIT_CANCELLED,
            None => EXIT_FAILURE,
        }
    }
}
