// config.rs — Namespace root configuration.
//
// SpaceConfig determines where spacekeep keeps its state: the spaces tree,
// the metadata directory (index snapshot), and logs. The base directory
// comes from an explicit value, the SPACEKEEP_BASE environment variable,
// or the per-user data directory, in that order. An optional
// `spacekeep.toml` in the base directory may relocate the three subdirs.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::SpaceError;
use crate::resolver::normalize;

/// Environment variable overriding the base directory.
pub const BASE_DIR_ENV: &str = "SPACEKEEP_BASE";

/// Optional config file name, looked up directly inside the base directory.
pub const CONFIG_FILE_NAME: &str = "spacekeep.toml";

/// File name of the persisted index snapshot inside `metadata_dir`.
pub const INDEX_FILE_NAME: &str = "spaces_index.json";

/// Resolved directory layout for a spacekeep installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceConfig {
    /// Base directory everything else is derived from.
    pub base_dir: PathBuf,

    /// Root of the spaces tree. Every space lives somewhere below it.
    pub spaces_dir: PathBuf,

    /// Holds the index snapshot.
    pub metadata_dir: PathBuf,

    /// Log files written by the CLI.
    pub log_dir: PathBuf,
}

/// Overrides read from `spacekeep.toml`. Relative paths are joined onto the base.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub spaces_dir: Option<PathBuf>,

    #[serde(default)]
    pub metadata_dir: Option<PathBuf>,

    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

impl SpaceConfig {
    /// Create a config with the standard `spaces/`, `metadata/`, `logs/` layout.
    pub fn for_base(base_dir: impl AsRef<Path>) -> Self {
        let base = base_dir.as_ref().to_path_buf();
        Self {
            spaces_dir: base.join("spaces"),
            metadata_dir: base.join("metadata"),
            log_dir: base.join("logs"),
            base_dir: base,
        }
    }

    /// Resolve the configuration.
    ///
    /// `explicit_base` wins over the environment, which wins over the
    /// per-user default. A `spacekeep.toml` in the base dir is applied on top.
    pub fn load(explicit_base: Option<&Path>) -> Result<Self, SpaceError> {
        let base = match explicit_base {
            Some(p) => p.to_path_buf(),
            None => default_base_dir(),
        };
        let mut config = Self::for_base(&base);

        let file_path = base.join(CONFIG_FILE_NAME);
        if file_path.is_file() {
            let raw = fs::read_to_string(&file_path).map_err(|source| SpaceError::Io {
                path: file_path.clone(),
                source,
            })?;
            let overrides: ConfigFile = toml::from_str(&raw).map_err(|source| {
                SpaceError::Config {
                    path: file_path.clone(),
                    source,
                }
            })?;
            config.apply(overrides);
            tracing::debug!("applied config overrides from {}", file_path.display());
        }

        config.into_absolute()
    }

    /// Anchor relative directories at the current working directory.
    ///
    /// Space paths are recorded in metadata and the index snapshot, so
    /// they must not depend on where the process happens to run.
    pub fn into_absolute(self) -> Result<Self, SpaceError> {
        let cwd = if [&self.base_dir, &self.spaces_dir, &self.metadata_dir, &self.log_dir]
            .iter()
            .all(|p| p.is_absolute())
        {
            None
        } else {
            Some(std::env::current_dir().map_err(|source| SpaceError::Io {
                path: self.base_dir.clone(),
                source,
            })?)
        };
        let absolute = |p: PathBuf| match &cwd {
            Some(cwd) if p.is_relative() => normalize(&cwd.join(p)),
            _ => normalize(&p),
        };

        Ok(Self {
            base_dir: absolute(self.base_dir),
            spaces_dir: absolute(self.spaces_dir),
            metadata_dir: absolute(self.metadata_dir),
            log_dir: absolute(self.log_dir),
        })
    }

    fn apply(&mut self, overrides: ConfigFile) {
        let base = self.base_dir.clone();
        let rebase = |p: PathBuf| if p.is_absolute() { p } else { base.join(p) };
        if let Some(p) = overrides.spaces_dir {
            self.spaces_dir = rebase(p);
        }
        if let Some(p) = overrides.metadata_dir {
            self.metadata_dir = rebase(p);
        }
        if let Some(p) = overrides.log_dir {
            self.log_dir = rebase(p);
        }
    }

    /// Path of the persisted index snapshot.
    pub fn index_file(&self) -> PathBuf {
        self.metadata_dir.join(INDEX_FILE_NAME)
    }

    /// Create the spaces, metadata and log directories if missing.
    pub fn ensure_directories(&self) -> Result<(), SpaceError> {
        for dir in [&self.spaces_dir, &self.metadata_dir, &self.log_dir] {
            fs::create_dir_all(dir).map_err(|source| SpaceError::Io {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

/// Base directory from `SPACEKEEP_BASE`, else the per-user data directory.
pub fn default_base_dir() -> PathBuf {
    if let Some(base) = std::env::var_os(BASE_DIR_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(base);
    }
    match dirs::data_dir() {
        Some(data) => data.join("spacekeep"),
        None => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".local/share/spacekeep"),
    }
}
