//! Repository configuration stored as `<git-dir>/arbor.toml`.

use std::io::Write;
use std::path::{Path, PathBuf};

use arbor_revwalk::RevSort;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{RepoError, RepoResult};

/// File name of the configuration inside the git directory.
pub const CONFIG_FILE: &str = "arbor.toml";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    pub core: CoreConfig,
    pub walk: WalkConfig,
    pub index: IndexConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// zlib level for new loose objects, 0-9.
    pub compression_level: u32,
    /// Re-hash loose objects on read and reject mismatches.
    pub verify_on_read: bool,
    pub bare: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            compression_level: 1,
            verify_on_read: true,
            bare: false,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkConfig {
    /// Orderings applied to new revision walks.
    pub default_sort: Vec<RevSort>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Index file, relative to the git directory.
    pub path: PathBuf,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("index"),
        }
    }
}

impl RepositoryConfig {
    /// Load the configuration of `git_dir`. A missing file yields defaults.
    pub fn load(git_dir: &Path) -> RepoResult<Self> {
        let path = git_dir.join(CONFIG_FILE);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };
        let config: Self = toml::from_str(&text).map_err(|e| RepoError::Config {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        config.validate().map_err(|reason| RepoError::Config { path, reason })?;
        Ok(config)
    }

    /// Write the configuration to `git_dir` atomically.
    pub fn save(&self, git_dir: &Path) -> RepoResult<()> {
        let path = git_dir.join(CONFIG_FILE);
        let text = toml::to_string_pretty(self).map_err(|e| RepoError::Config {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        let mut tmp = NamedTempFile::new_in(git_dir)?;
        tmp.write_all(text.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| e.error)?;
        debug!(path = %path.display(), "config saved");
        Ok(())
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.core.compression_level > 9 {
            return Err(format!(
                "core.compression_level must be 0-9, got {}",
                self.core.compression_level
            ));
        }
        if self.index.path.as_os_str().is_empty() || self.index.path.is_absolute() {
            return Err("index.path must be a relative path".into());
        }
        Ok(())
    }
}
