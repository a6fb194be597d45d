#![allow(dead_code)]

use std::path::{Path, PathBuf};

use bpm::config::{ActionConfig, CommandList, ConfigSection, ModuleConfig, RawConfigFile};
use bpm::registry::Registry;

/// Builder for `RawConfigFile` to simplify test setup.
pub struct RawConfigBuilder {
    config: RawConfigFile,
}

impl RawConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                modules: Vec::new(),
            },
        }
    }

    pub fn with_module(mut self, name: &str, module: ModuleConfig) -> Self {
        self.config.modules.push((name.to_string(), module));
        self
    }

    pub fn prefix_output(mut self, val: bool) -> Self {
        self.config.config.prefix_output = val;
        self
    }

    pub fn shutdown_grace(mut self, duration: &str) -> Self {
        self.config.config.shutdown_grace = Some(duration.to_string());
        self
    }

    /// The raw config, unvalidated.
    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    /// Validate into a registry rooted at `root`.
    pub fn build(self, root: impl AsRef<Path>) -> Registry {
        Registry::build(&self.config, root).expect("Failed to build valid registry from builder")
    }
}

impl Default for RawConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `ModuleConfig`.
pub struct ModuleConfigBuilder {
    module: ModuleConfig,
}

impl ModuleConfigBuilder {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            module: ModuleConfig {
                work_dir: work_dir.into(),
                actions: Vec::new(),
            },
        }
    }

    pub fn action(mut self, name: &str, action: ActionConfig) -> Self {
        self.module.actions.push((name.to_string(), action));
        self
    }

    pub fn build(self) -> ModuleConfig {
        self.module
    }
}

/// Builder for `ActionConfig`.
pub struct ActionConfigBuilder {
    action: ActionConfig,
}

impl ActionConfigBuilder {
    /// An action running the single command `cmd`.
    pub fn new(cmd: &str) -> Self {
        Self::commands(&[cmd])
    }

    /// An action running `cmds` in order.
    pub fn commands(cmds: &[&str]) -> Self {
        Self {
            action: ActionConfig {
                commands: CommandList::Many(cmds.iter().map(|c| c.to_string()).collect()),
                watch_command: None,
                accepts_args: false,
                background_capable: false,
                git_aware: false,
                work_dir: None,
            },
        }
    }

    pub fn watch(mut self, cmd: &str) -> Self {
        self.action.watch_command = Some(CommandList::One(cmd.to_string()));
        self
    }

    pub fn watch_commands(mut self, cmds: &[&str]) -> Self {
        self.action.watch_command =
            Some(CommandList::Many(cmds.iter().map(|c| c.to_string()).collect()));
        self
    }

    pub fn accepts_args(mut self, val: bool) -> Self {
        self.action.accepts_args = val;
        self
    }

    pub fn background(mut self, val: bool) -> Self {
        self.action.background_capable = val;
        self
    }

    pub fn git_aware(mut self, val: bool) -> Self {
        self.action.git_aware = val;
        self
    }

    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.action.work_dir = Some(dir.into());
        self
    }

    pub fn build(self) -> ActionConfig {
        self.action
    }
}
