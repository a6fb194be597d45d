// src/engine/mod.rs

//! Action execution engine.
//!
//! This module ties together:
//! - the pure execution plan (prepare + partition members)
//! - the scheduler (foreground sequence, background pool, aggregation)
//! - the watcher (long-lived watch-mode variant)
//! - result types reported back to the CLI
//!
//! Processes themselves are run by an [`ActionExecutor`](crate::exec::ActionExecutor).

pub mod outcome;
pub mod plan;
pub mod scheduler;
pub mod watcher;

pub use outcome::{
    ActionOutcome, CommandFailure, ExecutionResult, FailureKind, GroupResult, EXIT_CANCELLED,
    EXIT_FAILURE,
};
pub use plan::ExecutionPlan;
pub use scheduler::Scheduler;
pub use watcher::Watcher;
