// src/engine/scheduler.rs

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::engine::outcome::{
    ActionOutcome, CommandFailure, ExecutionResult, FailureKind, GroupResult,
};
use crate::engine::plan::ExecutionPlan;
use crate::errors::Result;
use crate::exec::{ActionExecutor, Invocation};
use crate::resolve::ResolvedTarget;
use crate::types::ExecMode;

/// Runs a resolved target to completion.
///
/// Policy:
/// - foreground members run one at a time, in group order; the first one
///   that does not succeed halts the group and every member not yet
///   started is recorded as skipped.
/// - if the whole foreground succeeded, all background members start at
///   once and are all awaited, whatever their individual outcome.
/// - cancellation stops unstarted foreground members and is forwarded to
///   everything already running.
pub struct Scheduler<E> {
    executor: Arc<E>,
}

impl<E> Scheduler<E>
where
    E: ActionExecutor + 'static,
{
    pub fn new(executor: Arc<E>) -> Self {
        Self { executor }
    }

    /// Plan and run `target`.
    ///
    /// Returns an error only for structural problems found while planning;
    /// in that case nothing has been spawned.
    pub async fn execute(
        &self,
        target: &ResolvedTarget<'_>,
        mode: ExecMode,
        extra_args: &[String],
        cancel: CancellationToken,
    ) -> Result<GroupResult> {
        let plan = ExecutionPlan::build(target, mode, extra_args)?;
        Ok(self.execute_plan(plan, cancel).await)
    }

    pub async fn execute_plan(&self, plan: ExecutionPlan, cancel: CancellationToken) -> GroupResult {
        let ExecutionPlan {
            action,
            mode,
            foreground,
            background,
        } = plan;

        info!(
            action = %action,
            %mode,
            foreground = foreground.len(),
            background = background.len(),
            "executing action"
        );

        let mut results = Vec::with_capacity(foreground.len() + background.len());
        let mut halted = false;

        for inv in foreground {
            if halted || cancel.is_cancelled() {
                halted = true;
                debug!(member = %inv.qualified_name(), "skipping foreground member");
                results.push(ExecutionResult::skipped(&inv));
                continue;
            }

            info!(member = %inv.qualified_name(), "running foreground action");
            let result = run_member(Arc::clone(&self.executor), inv, cancel.child_token()).await;
            log_result(&result);

            if !result.outcome.is_success() {
                warn!(
                    member = %result.qualified_name(),
                    "foreground action did not succeed; halting remaining members"
                );
                halted = true;
            }
            results.push(result);
        }

        if halted {
            for inv in background {
                debug!(member = %inv.qualified_name(), "skipping background member");
                results.push(ExecutionResult::skipped(&inv));
            }
        } else if !background.is_empty() {
            results.extend(self.run_background(background, &cancel).await);
        }

        GroupResult::new(action, mode, results).with_cancelled(cancel.is_cancelled())
    }

    /// Start every background member at once and wait for all of them.
    async fn run_background(
        &self,
        members: Vec<Invocation>,
        cancel: &CancellationToken,
    ) -> Vec<ExecutionResult> {
        info!(count = members.len(), "starting background actions concurrently");

        let handles: Vec<_> = members
            .into_iter()
            .map(|inv| {
                info!(member = %inv.qualified_name(), "starting background action");
                let meta = inv.clone();
                let handle = tokio::spawn(run_member(
                    Arc::clone(&self.executor),
                    inv,
                    cancel.child_token(),
                ));
                (meta, handle)
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (meta, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => executor_crashed(&meta, &e),
            };
            log_result(&result);
            results.push(result);
        }
        results
    }
}

/// Run one member on its own Tokio task so that a panicking executor is
/// reported as that member's failure instead of tearing down the group.
pub(crate) async fn run_member<E>(
    executor: Arc<E>,
    inv: Invocation,
    cancel: CancellationToken,
) -> ExecutionResult
where
    E: ActionExecutor + 'static,
{
    let meta = inv.clone();
    let handle = tokio::spawn(async move { executor.execute(inv, cancel).await });

    match handle.await {
        Ok(result) => result,
        Err(e) => executor_crashed(&meta, &e),
    }
}

/// Result for a member whose task died without reporting back.
pub(crate) fn executor_crashed(inv: &Invocation, err: &dyn fmt::Display) -> ExecutionResult {
    error!(member = %inv.qualified_name(), error = %err, "executor task failed");
    ExecutionResult::from_invocation(
        inv,
        ActionOutcome::Failed(CommandFailure {
            index: 0,
            command: inv.commands.first().cloned().unwrap_or_default(),
            kind: FailureKind::Spawn(format!("executor task failed: {err}")),
        }),
        Duration::ZERO,
    )
}

pub(crate) fn log_result(result: &ExecutionResult) {
    let elapsed_ms = result.elapsed.as_millis() as u64;
    match &result.outcome {
        ActionOutcome::Success => {
            info!(member = %result.qualified_name(), elapsed_ms, "action completed successfully")
        }
        ActionOutcome::Failed(failure) => warn!(
            member = %result.qualified_name(),
            elapsed_ms,
            index = failure.index,
            exit_code = failure.exit_code(),
            "action failed: {}",
            failure
        ),
        ActionOutcome::Cancelled => {
            info!(member = %result.qualified_name(), elapsed_ms, "action cancelled")
        }
        ActionOutcome::Skipped => debug!(member = %result.qualified_name(), "action skipped"),
    }
}
