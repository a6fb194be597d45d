// src/registry/mod.rs

//! In-memory, validated view of the configured modules and their actions.
//!
//! - [`module`] holds the [`Module`] / [`Action`] value types.
//! - [`validate`] converts a [`RawConfigFile`] into modules, rejecting
//!   malformed input before anything runs.
//!
//! A [`Registry`] is built once per invocation and never mutated afterwards.

pub mod module;
pub mod validate;

use std::path::{Path, PathBuf};

use crate::config::model::RawConfigFile;
use crate::errors::{BpmError, Result};

pub use module::{rebase_path, Action, Module};

#[derive(Debug, Clone)]
pub struct Registry {
    root: PathBuf,
    /// Modules in declaration order.
    modules: Vec<Module>,
}

impl Registry {
    /// Validate `cfg` and build a registry whose working directories are
    /// resolved against `root`.
    pub fn build(cfg: &RawConfigFile, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let modules = validate::build_modules(cfg, &root)?;
        Ok(Self { root, modules })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn module(&self, name: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.name == name)
    }

    /// Every `(module, action)` pair whose action is called `name`, in module
    /// declaration order.
    pub fn actions_named(&self, name: &str) -> Vec<(&Module, &Action)> {
        self.modules
            .iter()
            .filter_map(|m| m.action(name).map(|a| (m, a)))
            .collect()
    }

    /// Look up one action of one module.
    pub fn action(&self, module: &str, name: &str) -> Result<&Action> {
        let m = self.module(module).ok_or_else(|| {
            BpmError::ActionNotFound(format!(
                "unknown module '{module}'; configured modules are: {}",
                join_or_none(self.modules.iter().map(|m| m.name.as_str()))
            ))
        })?;

        m.action(name).ok_or_else(|| {
            BpmError::ActionNotFound(format!(
                "action '{name}' is not defined for module '{module}'; available actions are: {}",
                join_or_none(m.action_names())
            ))
        })
    }

    /// Distinct action names across all modules, in first-seen order.
    pub fn action_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for name in self.modules.iter().flat_map(|m| m.action_names()) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }
}

pub(crate) fn join_or_none<'a>(names: impl Iterator<Item = &'a str>) -> String {
    let names: Vec<&str> = names.collect();
    if names.is_empty() {
        "(none)".to_string()
    } else {
        names.join(", ")
    }
}
