// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Filesystem-backed `ConfigStore` (platform config dir or one explicit file).

use directories::ProjectDirs;
use lineage_core::{ConfigError, ConfigStore};
use std::fs;
use std::path::PathBuf;

enum Layout {
    /// One `<key>.json` per key under a directory.
    Directory(PathBuf),
    /// Every key maps to the same file.
    File(PathBuf),
}

/// Stores configs as JSON files on disk.
pub struct FsConfigStore {
    layout: Layout,
}

impl FsConfigStore {
    /// Create a store rooted at the user config directory (e.g. `~/.config/lineage`).
    ///
    /// # Errors
    ///
    /// [`ConfigError::Other`] when no home directory can be resolved.
    pub fn new() -> Result<Self, ConfigError> {
        let proj = ProjectDirs::from("dev", "flyingrobots", "lineage")
            .ok_or_else(|| ConfigError::Other("could not resolve config dir".into()))?;
        Ok(Self::in_dir(proj.config_dir().to_path_buf()))
    }

    /// Create a store keeping `<key>.json` files under `base`.
    pub fn in_dir(base: PathBuf) -> Self {
        Self {
            layout: Layout::Directory(base),
        }
    }

    /// Create a store backed by a single explicit file.
    pub fn file(path: PathBuf) -> Self {
        Self {
            layout: Layout::File(path),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        match &self.layout {
            Layout::Directory(base) => base.join(format!("{key}.json")),
            Layout::File(path) => path.clone(),
        }
    }
}

impl ConfigStore for FsConfigStore {
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
        let path = self.path_for(key);
        match fs::read(path) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(ConfigError::NotFound),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, data)?;
        Ok(())
    }
}
