// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running the commands of an
//! action, using `tokio::process::Command`.
//!
//! - [`invocation`] prepares an action for running (mode, arguments).
//! - [`command`] builds the platform shell command.
//! - [`runner`] runs a command sequence with cancellation.
//! - [`output`] relays child output, optionally prefixed.
//! - `process_group` isolates each command in its own process group and
//!   signals the whole group on cancellation.
//! - [`backend`] provides the `ActionExecutor` trait and the concrete
//!   `ProcessExecutor`, which tests can replace with a fake implementation.

pub mod backend;
pub mod command;
pub mod invocation;
pub mod output;
mod process_group;
pub mod runner;

pub use backend::{ActionExecutor, ProcessExecutor};
pub use invocation::Invocation;
pub use runner::{run, run_invocation, RunOptions};
