// src/resolve.rs

//! Turn an action name (and optional module filter) into the set of
//! `(module, action)` pairs to run.
//!
//! Resolution is a pure lookup against the [`Registry`]: no I/O, no side
//! effects.

use tracing::debug;

use crate::errors::{BpmError, Result};
use crate::registry::{join_or_none, Action, Module, Registry};

/// One `(module, action)` pair of a resolved target.
#[derive(Debug, Clone, Copy)]
pub struct Member<'r> {
    pub module: &'r Module,
    pub action: &'r Action,
}

/// Whether a target is a lone action or an action group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    /// Exactly one member; group semantics (background concurrency) do not
    /// apply.
    Single,
    /// Two or more same-named actions from different modules.
    Group,
}

#[derive(Debug, Clone)]
pub struct ResolvedTarget<'r> {
    action: String,
    kind: TargetKind,
    members: Vec<Member<'r>>,
}

impl<'r> ResolvedTarget<'r> {
    pub fn action_name(&self) -> &str {
        &self.action
    }

    pub fn kind(&self) -> TargetKind {
        self.kind
    }

    pub fn is_single(&self) -> bool {
        self.kind == TargetKind::Single
    }

    /// Members in registry module order.
    pub fn members(&self) -> &[Member<'r>] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Resolve `action`, optionally restricted to `module`.
///
/// - With a module: exactly that pair, or `ActionNotFound`.
/// - Without: every module defining `action`. None is `ActionNotFound`, one
///   is a single-unit target, more is an action group.
pub fn resolve<'r>(
    registry: &'r Registry,
    action: &str,
    module: Option<&str>,
) -> Result<ResolvedTarget<'r>> {
    if let Some(module_name) = module {
        let found = registry.action(module_name, action)?;
        let module = registry
            .module(module_name)
            .ok_or_else(|| BpmError::ActionNotFound(format!("unknown module '{module_name}'")))?;

        debug!(module = %module_name, action, "resolved single action via module filter");
        return Ok(ResolvedTarget {
            action: action.to_string(),
            kind: TargetKind::Single,
            members: vec![Member {
                module,
                action: found,
            }],
        });
    }

    let members: Vec<Member<'r>> = registry
        .actions_named(action)
        .into_iter()
        .map(|(module, action)| Member { module, action })
        .collect();

    let kind = match members.len() {
        0 => {
            return Err(BpmError::ActionNotFound(format!(
                "no module defines action '{action}'; defined actions are: {}",
                join_or_none(registry.action_names().into_iter())
            )));
        }
        1 => TargetKind::Single,
        _ => TargetKind::Group,
    };

    debug!(
        action,
        ?kind,
        modules = ?members.iter().map(|m| m.module.name.as_str()).collect::<Vec<_>>(),
        "resolved action"
    );

    Ok(ResolvedTarget {
        action: action.to_string(),
        kind,
        members,
    })
}
