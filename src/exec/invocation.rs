// src/exec/invocation.rs

//! A fully prepared, owned description of one action run.

use std::path::PathBuf;

use tracing::debug;

use crate::errors::{BpmError, Result};
use crate::exec::command::display_command;
use crate::registry::Action;
use crate::types::ExecMode;

/// Everything the executor needs to run one member, detached from the
/// registry so it can move into a spawned task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub module: String,
    pub action: String,
    /// Index of this member within its target, in registry module order.
    pub position: usize,
    pub mode: ExecMode,
    pub work_dir: PathBuf,
    /// The selected command sequence (`commands` or `watch_command`).
    pub commands: Vec<String>,
    /// Extra arguments appended to the last command only.
    pub args: Vec<String>,
    /// Runs in the concurrent background partition of a group.
    pub background: bool,
}

impl Invocation {
    /// Select the command sequence for `mode` and attach `extra_args`.
    ///
    /// Fails before anything is spawned when:
    /// - `mode` is watch and the action has no `watch_command`
    ///   (`WatchUnsupported`)
    /// - arguments are given to an action with `accepts_args = false`
    ///   (`UnexpectedArguments`)
    pub fn prepare(action: &Action, mode: ExecMode, extra_args: &[String]) -> Result<Self> {
        let commands = match mode {
            ExecMode::Normal => action.commands.clone(),
            ExecMode::Watch => action
                .watch_command
                .clone()
                .ok_or_else(|| BpmError::WatchUnsupported(action.qualified_name()))?,
        };

        if !extra_args.is_empty() && !action.accepts_args {
            return Err(BpmError::UnexpectedArguments {
                action: action.qualified_name(),
                count: extra_args.len(),
            });
        }

        if action.git_aware {
            debug!(
                action = %action.qualified_name(),
                "git_aware is reserved; running unconditionally"
            );
        }

        Ok(Self {
            module: action.module.clone(),
            action: action.name.clone(),
            position: 0,
            mode,
            work_dir: action.work_dir.clone(),
            commands,
            args: extra_args.to_vec(),
            background: false,
        })
    }

    /// `module.action`.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.module, self.action)
    }

    /// The command lines as they will be executed, with arguments shown on
    /// the last one.
    pub fn command_lines(&self) -> Vec<String> {
        let last = self.commands.len().saturating_sub(1);
        self.commands
            .iter()
            .enumerate()
            .map(|(idx, cmd)| {
                if idx == last {
                    display_command(cmd, &self.args)
                } else {
                    cmd.clone()
                }
            })
            .collect()
    }
}
