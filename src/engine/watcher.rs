// src/engine/watcher.rs

use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::engine::outcome::{ExecutionResult, GroupResult};
use crate::engine::plan::ExecutionPlan;
use crate::engine::scheduler::{executor_crashed, log_result, run_member};
use crate::errors::Result;
use crate::exec::ActionExecutor;
use crate::resolve::ResolvedTarget;
use crate::types::ExecMode;

/// Runs a target in watch mode.
///
/// Every member runs its `watch_command`, which is long-lived by
/// construction, so nothing waits for a member to finish before starting
/// the next: foreground members are started one at a time in group order,
/// then all background members. The watcher then stays until either the
/// invocation is cancelled or every member has exited. A member exiting on
/// its own is reported but does not stop its siblings.
pub struct Watcher<E> {
    executor: Arc<E>,
}

impl<E> Watcher<E>
where
    E: ActionExecutor + 'static,
{
    pub fn new(executor: Arc<E>) -> Self {
        Self { executor }
    }

    /// Plan `target` in watch mode and run it until cancelled.
    ///
    /// `WatchUnsupported` / `UnexpectedArguments` for any member abort the
    /// whole invocation before anything is spawned.
    pub async fn watch_execute(
        &self,
        target: &ResolvedTarget<'_>,
        extra_args: &[String],
        cancel: CancellationToken,
    ) -> Result<GroupResult> {
        let plan = ExecutionPlan::build(target, ExecMode::Watch, extra_args)?;
        Ok(self.watch_plan(plan, cancel).await)
    }

    pub async fn watch_plan(&self, plan: ExecutionPlan, cancel: CancellationToken) -> GroupResult {
        let ExecutionPlan {
            action,
            mode,
            foreground,
            background,
        } = plan;

        info!(
            action = %action,
            members = foreground.len() + background.len(),
            "starting watch processes"
        );

        let mut results = Vec::new();
        let mut launched = Vec::new();
        let mut running = JoinSet::new();

        for inv in foreground.into_iter().chain(background) {
            if cancel.is_cancelled() {
                debug!(member = %inv.qualified_name(), "cancelled before start; skipping");
                results.push(ExecutionResult::skipped(&inv));
                continue;
            }

            info!(
                member = %inv.qualified_name(),
                background = inv.background,
                "starting watch action"
            );
            launched.push(inv.clone());
            running.spawn(run_member(
                Arc::clone(&self.executor),
                inv,
                cancel.child_token(),
            ));
        }

        let mut task_errors = Vec::new();

        while let Some(joined) = running.join_next().await {
            match joined {
                Ok(result) => {
                    if cancel.is_cancelled() {
                        log_result(&result);
                    } else {
                        warn!(
                            member = %result.qualified_name(),
                            outcome = %result.outcome,
                            remaining = running.len(),
                            "watch process exited"
                        );
                    }
                    results.push(result);
                }
                Err(e) => {
                    error!(error = %e, "watch task failed");
                    task_errors.push(e.to_string());
                }
            }
        }

        // A task that died never reported its member; record it as failed.
        if !task_errors.is_empty() {
            let reason = task_errors.join("; ");
            for inv in &launched {
                if !results.iter().any(|r| r.position == inv.position) {
                    let result = executor_crashed(inv, &reason);
                    log_result(&result);
                    results.push(result);
                }
            }
        }

        info!(action = %action, "all watch processes have exited");
        GroupResult::new(action, mode, results).with_cancelled(cancel.is_cancelled())
    }
}
