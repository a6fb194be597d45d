// src/registry/validate.rs

use std::collections::HashSet;
use std::path::Path;

use crate::config::model::{ActionConfig, RawConfigFile};
use crate::errors::{BpmError, Result};
use crate::registry::module::{rebase_path, Action, Module};

/// Validate a raw config and convert it into registry modules.
///
/// This checks:
/// - module names are non-empty and unique
/// - action names are non-empty and unique within their module
/// - every action has at least one command, and no blank commands
/// - `watch_command`, if present, is non-empty as well
///
/// It does **not** touch the filesystem: a missing working directory
/// surfaces as a spawn failure of the member that uses it.
pub(crate) fn build_modules(cfg: &RawConfigFile, root: &Path) -> Result<Vec<Module>> {
    let mut seen_modules = HashSet::new();
    let mut modules = Vec::with_capacity(cfg.modules.len());

    for (name, module_cfg) in cfg.modules.iter() {
        let location = format!("module '{name}'");
        if name.trim().is_empty() {
            return Err(BpmError::validation(location, "module name must not be empty"));
        }
        if !seen_modules.insert(name.as_str()) {
            return Err(BpmError::validation(location, "module name is defined more than once"));
        }

        let work_dir = rebase_path(root, &module_cfg.work_dir);

        let mut seen_actions = HashSet::new();
        let mut actions = Vec::with_capacity(module_cfg.actions.len());

        for (action_name, action_cfg) in module_cfg.actions.iter() {
            let location = format!("action '{name}.{action_name}'");
            if action_name.trim().is_empty() {
                return Err(BpmError::validation(location, "action name must not be empty"));
            }
            if !seen_actions.insert(action_name.as_str()) {
                return Err(BpmError::validation(
                    location,
                    "action name is defined more than once in this module",
                ));
            }

            let action = build_action(name, action_name, action_cfg, &work_dir, root)
                .map_err(|rule| BpmError::validation(location, rule))?;
            actions.push(action);
        }

        modules.push(Module {
            name: name.clone(),
            work_dir,
            actions,
        });
    }

    Ok(modules)
}

fn build_action(
    module: &str,
    name: &str,
    cfg: &ActionConfig,
    module_work_dir: &Path,
    root: &Path,
) -> std::result::Result<Action, String> {
    let commands = cfg.commands.to_vec();
    check_commands(&commands, "commands")?;

    let watch_command = match cfg.watch_command.as_ref() {
        Some(list) => {
            let watch = list.to_vec();
            check_commands(&watch, "watch_command")?;
            Some(watch)
        }
        None => None,
    };

    let work_dir = match cfg.work_dir.as_ref() {
        Some(dir) => rebase_path(root, dir),
        None => module_work_dir.to_path_buf(),
    };

    Ok(Action {
        name: name.to_string(),
        module: module.to_string(),
        commands,
        watch_command,
        accepts_args: cfg.accepts_args,
        background_capable: cfg.background_capable,
        git_aware: cfg.git_aware,
        work_dir,
    })
}

fn check_commands(commands: &[String], field: &str) -> std::result::Result<(), String> {
    if commands.is_empty() {
        return Err(format!("`{field}` must contain at least one command"));
    }
    if let Some(idx) = commands.iter().position(|c| c.trim().is_empty()) {
        return Err(format!("`{field}` entry {idx} is blank"));
    }
    Ok(())
}
