// src/lib.rs

//! smelt — a source-based package manager
//!
//! Given a tree of textual build recipes, smelt materializes compiled
//! artifacts on the running host, tracks what is installed, and keeps the
//! installation graph consistent under additions, removals, rebuilds, and
//! upgrades.
//!
//! # Architecture
//!
//! - Recipes: line-oriented `<name>.pkg` files, re-read on every operation
//! - Staged installs: fetch -> verify -> extract -> build -> stage ->
//!   commit -> register; no step proceeds until the previous one succeeded
//! - Database: a plain directory of per-package records with atomic
//!   tmp-and-rename writes, guarded by one exclusive operation lock
//! - Reverse dependencies are computed from the current recipe tree, not
//!   from state captured at install time

pub mod build;
pub mod config;
pub mod db;
mod error;
pub mod hash;
pub mod install;
pub mod ops;
pub mod recipe;
pub mod resolver;
pub mod source;
mod stagelog;
pub mod version;

pub use config::Config;
pub use error::{Error, Result};
pub use recipe::{Recipe, RecipeStore};
pub use version::Version;
