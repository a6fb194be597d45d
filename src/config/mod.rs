// src/config/mod.rs

//! Configuration loading for bpm.
//!
//! Responsibilities:
//! - Define the serde-backed data model (`model.rs`).
//! - Find and read a TOML or YAML config file (`loader.rs`).
//! - Keep module/action declaration order while deserializing (`ordered.rs`).
//!
//! Semantic validation lives in [`crate::registry`].

pub mod loader;
pub mod model;
pub mod ordered;

pub use loader::{load, load_from_path, parse_str, ConfigFormat, LoadedConfig};
pub use model::{ActionConfig, CommandList, ConfigSection, ModuleConfig, RawConfigFile};
