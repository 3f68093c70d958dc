//! Build configuration loading.
//!
//! Layered with `figment`: compiled defaults, then an optional
//! `svs-index.toml` (or an explicit `--config` file), then `SVS_`-prefixed
//! environment variables. Command-line flags override the lot.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "svs-index.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Root of the hand-maintained shard files (one subdirectory per
    /// category).
    pub data_dir: PathBuf,
    /// Where the versioned artifact tree gets published.
    pub out_dir: PathBuf,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self { data_dir: PathBuf::from("data"), out_dir: PathBuf::from("dist") }
    }
}

impl BuildConfig {
    /// Load configuration, optionally from an explicit file.
    ///
    /// An explicit `--config` path must exist; the implicit
    /// [`CONFIG_FILE`] is allowed to be absent.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let figment = Figment::from(Serialized::defaults(Self::default()));
        let figment = match path {
            Some(path) => figment.merge(Toml::file_exact(path)),
            None => figment.merge(Toml::file(CONFIG_FILE)),
        };
        figment.merge(Env::prefixed("SVS_")).extract().or_raise(|| ErrorKind::Config)
    }

    /// Apply command-line overrides on top of whatever was loaded.
    pub fn with_overrides(mut self, data_dir: Option<PathBuf>, out_dir: Option<PathBuf>) -> Self {
        if let Some(data_dir) = data_dir {
            self.data_dir = data_dir;
        }
        if let Some(out_dir) = out_dir {
            self.out_dir = out_dir;
        }
        self
    }
}
