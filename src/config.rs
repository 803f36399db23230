// src/config.rs

//! Process-wide configuration
//!
//! Loaded once at startup from a TOML file and threaded by reference through
//! every operation. Every key is required; a missing key is fatal before any
//! operation runs. There is no environment-variable fallback.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/smelt.toml";

/// Immutable configuration for one invocation.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Root of `<name>.pkg` recipe files.
    pub recipes_dir: PathBuf,

    /// Cache of downloaded source archives.
    pub src_cache: PathBuf,

    /// Root of per-package scratch build trees.
    pub build_dir: PathBuf,

    /// Root of per-package DESTDIR staging trees.
    pub staging_dir: PathBuf,

    /// Database root; see `db` module for the layout underneath.
    pub db_root: PathBuf,

    /// Per-stage dated log files land here.
    pub log_dir: PathBuf,

    /// Fetch command template. `{output}` and `{url}` placeholders are
    /// substituted; if neither appears, output path and URL are appended.
    pub fetch_cmd: String,

    /// Passed to `make` and `cmake --build`, and exported as MAKEFLAGS.
    pub makeflags: String,

    /// Invoked on ELF files found in staging.
    pub strip_cmd: String,

    /// Live install root, conventionally `/`.
    pub install_prefix: PathBuf,

    /// Parallel jobs for compilers that take an explicit count.
    pub jobs: u32,

    /// Enable ANSI coloring on the user channel.
    pub color: bool,
}

impl Config {
    /// Load and validate configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("invalid config {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the working roots are usable. The recipe tree must already
    /// exist (it is read-only to us); everything else is created on demand.
    pub fn validate(&self) -> Result<()> {
        if self.fetch_cmd.split_whitespace().next().is_none() {
            return Err(Error::Config("fetch_cmd must not be empty".to_string()));
        }
        if self.strip_cmd.split_whitespace().next().is_none() {
            return Err(Error::Config("strip_cmd must not be empty".to_string()));
        }
        if !self.recipes_dir.is_dir() {
            return Err(Error::Config(format!(
                "recipes_dir {} is not a directory",
                self.recipes_dir.display()
            )));
        }
        for dir in [
            &self.src_cache,
            &self.build_dir,
            &self.staging_dir,
            &self.db_root,
            &self.log_dir,
            &self.install_prefix,
        ] {
            fs::create_dir_all(dir).map_err(|e| {
                Error::Config(format!("cannot create {}: {}", dir.display(), e))
            })?;
        }
        Ok(())
    }

    /// Per-package scratch build tree.
    pub fn pkg_build_dir(&self, name: &str) -> PathBuf {
        self.build_dir.join(name)
    }

    /// Per-package staging tree (the DESTDIR target).
    pub fn pkg_staging_dir(&self, name: &str) -> PathBuf {
        self.staging_dir.join(name)
    }
}
