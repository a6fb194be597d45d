// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The scheduler and watcher talk to an [`ActionExecutor`] instead of
//! spawning processes themselves. This makes it easy to swap in a fake
//! executor in tests while keeping the production implementation in
//! [`runner`](crate::exec::runner).

use std::future::Future;
use std::pin::Pin;

use tokio_util::sync::CancellationToken;

use crate::engine::ExecutionResult;
use crate::exec::invocation::Invocation;
use crate::exec::runner::{run_invocation, RunOptions};

/// Trait abstracting how one prepared member is executed.
///
/// Implementations must honour `cancel`: once it fires, stop whatever is
/// running, wait for it to be gone, and report
/// [`ActionOutcome::Cancelled`](crate::engine::ActionOutcome::Cancelled).
pub trait ActionExecutor: Send + Sync {
    fn execute(
        &self,
        invocation: Invocation,
        cancel: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = ExecutionResult> + Send + '_>>;
}

/// Real executor backend: runs each command as a child process.
#[derive(Debug, Clone, Default)]
pub struct ProcessExecutor {
    options: RunOptions,
}

impl ProcessExecutor {
    pub fn new(options: RunOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> RunOptions {
        self.options
    }
}

impl ActionExecutor for ProcessExecutor {
    fn execute(
        &self,
        invocation: Invocation,
        cancel: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = ExecutionResult> + Send + '_>> {
        Box::pin(run_invocation(invocation, self.options, cancel))
    }
}
