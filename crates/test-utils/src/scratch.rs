use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use bpm::registry::Registry;
use tempfile::TempDir;

use crate::builders::RawConfigBuilder;

/// A throwaway repository root for tests that spawn real commands.
///
/// Module directories are created on demand; the tree is removed on drop.
pub struct ScratchRepo {
    dir: TempDir,
}

impl ScratchRepo {
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
        })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// `rel` resolved under the root.
    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    /// Create `rel` (and parents) under the root.
    pub fn mkdir(&self, rel: &str) -> io::Result<PathBuf> {
        let path = self.path(rel);
        fs::create_dir_all(&path)?;
        Ok(path)
    }

    pub fn read(&self, rel: &str) -> io::Result<String> {
        fs::read_to_string(self.path(rel))
    }

    /// Build `config` into a registry rooted here.
    pub fn registry(&self, config: RawConfigBuilder) -> Registry {
        config.build(self.root())
    }
}
