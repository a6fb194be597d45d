// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info};

use crate::config::model::RawConfigFile;
use crate::errors::{BpmError, Result};

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "BPM_CONFIG_PATH";

/// File names searched for in the repository root, in priority order.
pub const CONFIG_FILE_NAMES: [&str; 3] = ["bpm.toml", "bpm.yml", "bpm.yaml"];

/// Serialization format of a config file, derived from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Ok(ConfigFormat::Toml),
            Some("yml") | Some("yaml") => Ok(ConfigFormat::Yaml),
            _ => Err(BpmError::ConfigError(format!(
                "unsupported config file extension for {:?} (expected .toml, .yml or .yaml)",
                path
            ))),
        }
    }
}

/// A config file read from disk together with where it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub path: PathBuf,
    /// Directory that module `work_dir`s are resolved against.
    pub root: PathBuf,
    pub raw: RawConfigFile,
}

/// Parse config text in the given format.
///
/// This only performs deserialization; semantic validation happens when the
/// [`Registry`](crate::registry::Registry) is built.
pub fn parse_str(contents: &str, format: ConfigFormat) -> Result<RawConfigFile> {
    let config = match format {
        ConfigFormat::Toml => toml::from_str(contents)?,
        ConfigFormat::Yaml => serde_yaml::from_str(contents)?,
    };
    Ok(config)
}

/// Load a configuration file from a given path, picking the parser from its
/// extension.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let format = ConfigFormat::from_path(path)?;
    let contents = fs::read_to_string(path)?;
    parse_str(&contents, format)
}

/// Find, read and parse the config file.
///
/// `explicit` is the `--config` CLI flag; see [`discover_config_path_with`]
/// for the lookup order.
pub fn load(explicit: Option<&Path>) -> Result<LoadedConfig> {
    let path = discover_config_path(explicit)?;
    info!(path = %path.display(), "using config file");

    let raw = load_from_path(&path)?;
    let root = repository_root(&path);
    debug!(root = %root.display(), "resolved repository root");

    Ok(LoadedConfig { path, root, raw })
}

/// Locate the config file using the process environment.
pub fn discover_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    let env_value = std::env::var(CONFIG_PATH_ENV).ok();
    let cwd = std::env::current_dir()?;
    let search_root = git_toplevel(&cwd).unwrap_or(cwd);
    discover_config_path_with(explicit, env_value.as_deref(), &search_root)
}

/// Locate the config file.
///
/// 1. `explicit`, if given (must exist).
/// 2. `env_value` (the `BPM_CONFIG_PATH` value), if non-empty (must exist).
/// 3. The first of [`CONFIG_FILE_NAMES`] present in `search_root`.
pub fn discover_config_path_with(
    explicit: Option<&Path>,
    env_value: Option<&str>,
    search_root: &Path,
) -> Result<PathBuf> {
    let requested = explicit
        .map(Path::to_path_buf)
        .or_else(|| env_value.filter(|v| !v.trim().is_empty()).map(PathBuf::from));

    if let Some(path) = requested {
        if !path.is_file() {
            return Err(BpmError::ConfigError(format!(
                "config file {:?} does not exist",
                path
            )));
        }
        return Ok(path);
    }

    CONFIG_FILE_NAMES
        .iter()
        .map(|name| search_root.join(name))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| {
            BpmError::ConfigError(format!(
                "no config file found in {:?} (looked for {}); set {} to point at one",
                search_root,
                CONFIG_FILE_NAMES.join(", "),
                CONFIG_PATH_ENV
            ))
        })
}

/// Figure out the repository root for a config file.
///
/// - The git top-level directory containing the config, if there is one.
/// - Otherwise the directory containing the config file, falling back to the
///   current working directory for a bare file name like `bpm.toml`.
pub fn repository_root(config_path: &Path) -> PathBuf {
    let parent = match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    };

    git_toplevel(&parent).unwrap_or(parent)
}

/// `git rev-parse --show-toplevel`, run from `dir`.
fn git_toplevel(dir: &Path) -> Option<PathBuf> {
    let output = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(["rev-parse", "--show-toplevel"])
        .output()
        .ok()?;

    if !output.status.success() {
        debug!(dir = %dir.display(), "not inside a git repository");
        return None;
    }

    let top = String::from_utf8(output.stdout).ok()?;
    let top = top.trim();
    if top.is_empty() {
        None
    } else {
        Some(PathBuf::from(top))
    }
}
