// src/error.rs

//! Error types shared across the crate
//!
//! One enum covers the whole taxonomy: configuration, recipes, graph
//! resolution, fetch/verify, build, install, remove, and locking. Warnings
//! (strip failures, missing files during removal) never become errors; they
//! go through `tracing::warn!` at the call site.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Fatal at startup: missing or unusable configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// No `<name>.pkg` file in the recipe tree.
    #[error("no recipe found for '{0}'")]
    RecipeNotFound(String),

    /// Recipe file exists but cannot be used.
    #[error("malformed recipe '{name}': {reason}")]
    RecipeMalformed { name: String, reason: String },

    /// The recipe graph cannot be ordered.
    #[error("dependency cycle involving: {}", .0.join(", "))]
    DependencyCycle(Vec<String>),

    /// The fetch command failed or could not be spawned.
    #[error("failed to fetch {0}")]
    FetchFailed(String),

    /// Downloaded content does not match the recipe's declared hash.
    #[error("checksum mismatch for {file}: expected {expected}, got {actual}")]
    HashMismatch {
        file: PathBuf,
        expected: String,
        actual: String,
    },

    /// No handler for the archive's filename suffix.
    #[error("unsupported archive format: {0}")]
    UnsupportedArchive(String),

    /// No Build script and no recognized project descriptor in the source tree.
    #[error("no build strategy for '{0}': no Build script and no recognized project files")]
    NoBuildStrategy(String),

    /// A build or install stage subprocess exited non-zero.
    #[error("{stage} stage failed for '{package}' (exit status {status}); see {}", .log.display())]
    StageFailed {
        package: String,
        stage: String,
        status: i32,
        log: PathBuf,
    },

    /// An external command outside the build/install stages exited non-zero.
    #[error("command `{command}` failed with exit status {status}")]
    CommandFailed { command: String, status: i32 },

    /// Removal refused: installed packages still depend on this one.
    #[error("cannot remove '{package}': required by {}", .dependents.join(", "))]
    HasReverseDependents {
        package: String,
        dependents: Vec<String>,
    },

    /// Another operation holds the database lock.
    #[error("database is locked by another operation")]
    DatabaseLocked,

    #[error("package '{0}' is not installed")]
    NotInstalled(String),

    /// Install was requested without a prior successful build.
    #[error("package '{0}' has not been built; run build first")]
    NotBuilt(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
