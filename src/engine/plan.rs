// src/engine/plan.rs

//! Pure planning step between resolution and execution.
//!
//! Building a plan prepares every member up front, so structural errors
//! (`WatchUnsupported`, `UnexpectedArguments`) abort the invocation before
//! a single process has been spawned. It has no Tokio types and performs no
//! IO.

use tracing::warn;

use crate::errors::{BpmError, Result};
use crate::exec::Invocation;
use crate::resolve::ResolvedTarget;
use crate::types::ExecMode;

/// Prepared members of a target, partitioned for execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan {
    pub action: String,
    pub mode: ExecMode,
    /// Run one at a time, in order, fail-fast.
    pub foreground: Vec<Invocation>,
    /// Run concurrently once the foreground has succeeded.
    pub background: Vec<Invocation>,
}

impl ExecutionPlan {
    /// Prepare and partition every member of `target`.
    ///
    /// Argument handling:
    /// - single member: `extra_args` go to it, or `UnexpectedArguments` if
    ///   it does not accept them.
    /// - group: `extra_args` go to members with `accepts_args`; the others
    ///   run without them (with a warning). If no member accepts them the
    ///   plan fails with `UnexpectedArguments`.
    pub fn build(target: &ResolvedTarget<'_>, mode: ExecMode, extra_args: &[String]) -> Result<Self> {
        let single = target.is_single();

        if !single && !extra_args.is_empty() {
            let accepting = target
                .members()
                .iter()
                .filter(|m| m.action.accepts_args)
                .count();

            if accepting == 0 {
                return Err(BpmError::UnexpectedArguments {
                    action: target.action_name().to_string(),
                    count: extra_args.len(),
                });
            }
            if accepting < target.len() {
                warn!(
                    action = %target.action_name(),
                    accepting,
                    total = target.len(),
                    "additional arguments will be ignored for actions that do not accept them"
                );
            }
        }

        let mut foreground = Vec::new();
        let mut background = Vec::new();

        for (position, member) in target.members().iter().enumerate() {
            let args: &[String] = if single || member.action.accepts_args {
                extra_args
            } else {
                &[]
            };

            let mut inv = Invocation::prepare(member.action, mode, args)?;
            inv.position = position;
            // Background concurrency only means something next to siblings.
            inv.background = !single && member.action.background_capable;

            if inv.background {
                background.push(inv);
            } else {
                foreground.push(inv);
            }
        }

        Ok(Self {
            action: target.action_name().to_string(),
            mode,
            foreground,
            background,
        })
    }

    pub fn len(&self) -> usize {
        self.foreground.len() + self.background.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All members in group order.
    pub fn members(&self) -> Vec<&Invocation> {
        let mut all: Vec<&Invocation> = self.foreground.iter().chain(self.background.iter()).collect();
        all.sort_by_key(|inv| inv.position);
        all
    }
}
