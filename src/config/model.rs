// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::config::ordered::ordered_map;
use crate::errors::{BpmError, Result};
use crate::types::{parse_duration, OutputMode};

/// Default grace period given to children on cancellation before they are
/// force-killed.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(3);

/// Top-level configuration as read from `bpm.toml` / `bpm.yaml`.
///
/// ```toml
/// [config]
/// prefix_output = true
///
/// [modules.api]
/// work_dir = "services/api"
///
/// [modules.api.actions.build]
/// commands = ["make build"]
///
/// [modules.web.actions.build]
/// cmd = "npm run build"
/// ```
///
/// Modules and actions are kept in declaration order; that order is the
/// order in which action groups execute.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    /// Global behaviour from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// All modules from `[modules.<name>]`, in declaration order.
    #[serde(default, deserialize_with = "ordered_map")]
    pub modules: Vec<(String, ModuleConfig)>,
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ConfigSection {
    /// Prefix every relayed output line with `[module.action]`.
    #[serde(default)]
    pub prefix_output: bool,

    /// Duration string (e.g. `"3s"`) children get to exit after a
    /// cancellation before being killed.
    #[serde(default)]
    pub shutdown_grace: Option<String>,
}

impl ConfigSection {
    pub fn output_mode(&self) -> OutputMode {
        if self.prefix_output {
            OutputMode::Prefixed
        } else {
            OutputMode::Inherit
        }
    }

    /// Effective shutdown grace period, defaulting to
    /// [`DEFAULT_SHUTDOWN_GRACE`].
    pub fn shutdown_grace(&self) -> Result<Duration> {
        match self.shutdown_grace.as_deref() {
            None => Ok(DEFAULT_SHUTDOWN_GRACE),
            Some(s) => parse_duration(s).map_err(|e| {
                BpmError::ConfigError(format!("invalid [config].shutdown_grace '{s}': {e}"))
            }),
        }
    }
}

/// `[modules.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleConfig {
    /// Working directory, relative to the repository root.
    pub work_dir: PathBuf,

    /// Actions from `[modules.<name>.actions.<action>]`, in declaration order.
    #[serde(default, deserialize_with = "ordered_map")]
    pub actions: Vec<(String, ActionConfig)>,
}

/// `[modules.<name>.actions.<action>]` section.
///
/// The short field names of older configs (`cmd`, `watch_cmd`, `args`,
/// `bg`) are accepted as aliases.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionConfig {
    /// Commands run in order; a single string is a one-element sequence.
    #[serde(alias = "cmd")]
    pub commands: CommandList,

    /// Alternate commands used in watch mode.
    #[serde(default, alias = "watch_cmd")]
    pub watch_command: Option<CommandList>,

    /// Append user-supplied trailing arguments to the last command.
    #[serde(default, alias = "args")]
    pub accepts_args: bool,

    /// May run concurrently with siblings in an action group.
    #[serde(default, alias = "bg")]
    pub background_capable: bool,

    /// Reserved for change-aware execution; currently has no effect.
    #[serde(default)]
    pub git_aware: bool,

    /// Per-action override of the module's working directory.
    #[serde(default)]
    pub work_dir: Option<PathBuf>,
}

/// One command string or a sequence of them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum CommandList {
    One(String),
    Many(Vec<String>),
}

impl CommandList {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            CommandList::One(cmd) => vec![cmd.clone()],
            CommandList::Many(cmds) => cmds.clone(),
        }
    }
}

impl From<Vec<String>> for CommandList {
    fn from(cmds: Vec<String>) -> Self {
        CommandList::Many(cmds)
    }
}

impl From<&str> for CommandList {
    fn from(cmd: &str) -> Self {
        CommandList::One(cmd.to_string())
    }
}
