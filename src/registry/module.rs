// src/registry/module.rs

use std::fmt;
use std::path::{Component, Path, PathBuf};

/// A named subproject with its own working directory and actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub name: String,
    /// Absolute working directory (rebased onto the repository root).
    pub work_dir: PathBuf,
    /// Actions in declaration order; names are unique within the module.
    pub actions: Vec<Action>,
}

impl Module {
    pub fn action(&self, name: &str) -> Option<&Action> {
        self.actions.iter().find(|a| a.name == name)
    }

    pub fn action_names(&self) -> impl Iterator<Item = &str> {
        self.actions.iter().map(|a| a.name.as_str())
    }
}

/// A named, possibly multi-step command belonging to exactly one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub name: String,
    /// Name of the owning module.
    pub module: String,
    /// Non-empty; run in order, aborting on the first failure.
    pub commands: Vec<String>,
    /// Non-empty when present.
    pub watch_command: Option<Vec<String>>,
    pub accepts_args: bool,
    pub background_capable: bool,
    /// Reserved. Actions always run unconditionally.
    pub git_aware: bool,
    /// Where the commands run: the module's `work_dir` unless overridden.
    pub work_dir: PathBuf,
}

impl Action {
    /// `module.action`, used in logs and output prefixes.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.module, self.name)
    }

    pub fn supports_watch(&self) -> bool {
        self.watch_command.is_some()
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.module, self.name)
    }
}

/// Rebase a configured path onto the repository root.
///
/// Paths already under `root` are returned unchanged. Anything else is
/// treated as root-relative, with a leading `/` ignored, so both
/// `"services/api"` and `"/services/api"` resolve to `<root>/services/api`.
pub fn rebase_path(root: &Path, path: &Path) -> PathBuf {
    if path.starts_with(root) {
        return path.to_path_buf();
    }

    let relative: PathBuf = path
        .components()
        .filter(|c| !matches!(c, Component::RootDir | Component::Prefix(_)))
        .collect();

    root.join(relative)
}
