// src/ops.rs

//! Composite operations
//!
//! Everything the CLI exposes is composed here from the recipe store, the
//! resolver, the source/build/install stages, and the database. Each public
//! function opens the database exactly once (acquiring the operation lock)
//! and threads that handle through its inner steps, so an operation never
//! contends with itself.

use crate::build;
use crate::config::Config;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::install;
use crate::recipe::{Recipe, RecipeStore};
use crate::resolver;
use crate::source;
use crate::version::Version;
use std::cmp::Ordering;
use std::fs;
use std::path::Path;
use std::process::Command;
use tracing::{debug, info, warn};

/// Recipe metadata alongside installation state, for display.
#[derive(Debug)]
pub struct InfoReport {
    pub recipe: Recipe,
    pub installed_version: Option<String>,
    pub manual: bool,
    pub file_count: usize,
}

/// What `upgrade` did.
#[derive(Debug, PartialEq, Eq)]
pub enum UpgradeOutcome {
    /// Recipe version is not newer than the installed one.
    UpToDate { installed: String },
    /// Rebuilt to the recipe version.
    Upgraded { from: String, to: String },
    /// Was not installed; built and installed fresh.
    Installed { version: String },
}

fn store(config: &Config) -> RecipeStore {
    RecipeStore::new(&config.recipes_dir)
}

/// Recipe metadata plus installed state.
pub fn info(config: &Config, name: &str) -> Result<InfoReport> {
    let store = store(config);
    let db = Database::open(&config.db_root)?;

    let recipe = store.load(name)?;
    let installed_version = db.installed_version(name);
    let file_count = db.installed_files(name)?.len();
    let manual = db.manual()?.contains(name);

    Ok(InfoReport {
        recipe,
        installed_version,
        manual,
        file_count,
    })
}

/// Resolve, make sure every dependency is installed, then build the target.
pub fn build(config: &Config, name: &str) -> Result<()> {
    let store = store(config);
    let db = Database::open(&config.db_root)?;
    build_inner(config, &store, &db, name)
}

fn build_inner(config: &Config, store: &RecipeStore, db: &Database, name: &str) -> Result<()> {
    let plan = resolver::resolve(store, name)?;
    let (target, deps) = plan.split_last().expect("plan contains at least the root");

    for dep in deps {
        if db.is_installed(&dep.name) {
            debug!("dependency {} already installed, skipping", dep.name);
            continue;
        }
        info!("building dependency {} for {}", dep.name, name);
        let workdir = source::prepare(config, dep)?;
        build::build(config, dep, &workdir)?;
        install::install(config, db, dep)?;
    }

    let workdir = source::prepare(config, target)?;
    build::build(config, target, &workdir)
}

/// Install a previously built package and mark it manually requested.
pub fn install(config: &Config, name: &str) -> Result<()> {
    let store = store(config);
    let db = Database::open(&config.db_root)?;

    let recipe = store.load(name)?;
    install::install(config, &db, &recipe)?;
    db.mark_manual(name)
}

/// Remove an installed package, refusing while reverse dependents exist.
pub fn remove(config: &Config, name: &str) -> Result<()> {
    let store = store(config);
    let db = Database::open(&config.db_root)?;
    remove_inner(config, &store, &db, name)
}

fn remove_inner(config: &Config, store: &RecipeStore, db: &Database, name: &str) -> Result<()> {
    if !db.is_installed(name) {
        return Err(Error::NotInstalled(name.to_string()));
    }

    let mut dependents: Vec<String> = db
        .reverse_deps(store)?
        .into_iter()
        .filter(|(dep, dependent)| dep == name && dependent != name)
        .map(|(_, dependent)| dependent)
        .collect();
    dependents.sort();
    dependents.dedup();
    if !dependents.is_empty() {
        return Err(Error::HasReverseDependents {
            package: name.to_string(),
            dependents,
        });
    }

    let files = db.installed_files(name)?;
    info!("removing {} ({} files)", name, files.len());
    delete_files(&files, &config.install_prefix);
    db.unregister(name)
}

/// Delete manifest paths, then prune now-empty parent directories bottom-up.
/// Missing files and prune failures are warnings.
fn delete_files(files: &[std::path::PathBuf], prefix: &Path) {
    for path in files {
        match fs::symlink_metadata(path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("{} already absent", path.display());
                continue;
            }
            Err(e) => {
                warn!("cannot stat {}: {}", path.display(), e);
                continue;
            }
            Ok(metadata) => {
                if metadata.is_dir() {
                    continue;
                }
                if let Err(e) = fs::remove_file(path) {
                    warn!("cannot remove {}: {}", path.display(), e);
                }
            }
        }
    }

    for path in files {
        let mut dir = path.parent();
        while let Some(d) = dir {
            if d == prefix || !d.starts_with(prefix) {
                break;
            }
            if fs::remove_dir(d).is_err() {
                break; // not empty, or already gone with its parent chain
            }
            debug!("pruned empty directory {}", d.display());
            dir = d.parent();
        }
    }
}

/// Remove (if installed), rebuild from source, and reinstall. The package is
/// briefly absent from the live root; rebuild is a maintenance action.
pub fn rebuild(config: &Config, name: &str) -> Result<()> {
    let store = store(config);
    let db = Database::open(&config.db_root)?;
    rebuild_inner(config, &store, &db, name)
}

fn rebuild_inner(config: &Config, store: &RecipeStore, db: &Database, name: &str) -> Result<()> {
    if db.is_installed(name) {
        if let Err(e) = remove_inner(config, store, db, name) {
            warn!("pre-rebuild removal of {} failed: {}", name, e);
        }
    }
    build_inner(config, store, db, name)?;
    // Manual membership lives in the manual set and survives the rebuild.
    let recipe = store.load(name)?;
    install::install(config, db, &recipe)?;
    Ok(())
}

/// Rebuild every installed package in dependency order.
pub fn rebuild_system(config: &Config) -> Result<()> {
    let store = store(config);
    let db = Database::open(&config.db_root)?;

    let installed = db.all_installed()?;
    let order = resolver::order_installed(&store, &installed)?;
    info!("rebuilding {} installed packages", order.len());

    for name in order {
        rebuild_inner(config, &store, &db, &name)?;
    }
    Ok(())
}

/// Upgrade a package when its recipe version is newer than the installed one.
pub fn upgrade(config: &Config, name: &str) -> Result<UpgradeOutcome> {
    let store = store(config);
    let db = Database::open(&config.db_root)?;

    let recipe = store.load(name)?;
    let installed = match db.installed_version(name) {
        Some(v) => v,
        None => {
            build_inner(config, &store, &db, name)?;
            install::install(config, &db, &recipe)?;
            db.mark_manual(name)?;
            return Ok(UpgradeOutcome::Installed {
                version: recipe.version,
            });
        }
    };

    match Version::compare(&recipe.version, &installed) {
        Ordering::Greater => {
            info!("upgrading {} {} -> {}", name, installed, recipe.version);
            rebuild_inner(config, &store, &db, name)?;
            Ok(UpgradeOutcome::Upgraded {
                from: installed,
                to: recipe.version,
            })
        }
        _ => Ok(UpgradeOutcome::UpToDate { installed }),
    }
}

/// Installed packages that nothing needs and nobody asked for.
pub fn orphans(config: &Config) -> Result<Vec<String>> {
    let store = store(config);
    let db = Database::open(&config.db_root)?;
    db.orphans(&store)
}

/// Remove orphans until none remain. Removing one orphan can orphan its own
/// dependencies, so this iterates to a fixed point, leaves first.
pub fn autoremove(config: &Config) -> Result<Vec<String>> {
    let store = store(config);
    let db = Database::open(&config.db_root)?;

    let mut removed = Vec::new();
    loop {
        let orphans = db.orphans(&store)?;
        if orphans.is_empty() {
            break;
        }
        for name in orphans {
            remove_inner(config, &store, &db, &name)?;
            removed.push(name);
        }
    }
    Ok(removed)
}

/// All installed packages with their versions.
pub fn list_installed(config: &Config) -> Result<Vec<(String, String)>> {
    let db = Database::open(&config.db_root)?;
    let mut listing = Vec::new();
    for name in db.all_installed()? {
        if let Some(version) = db.installed_version(&name) {
            listing.push((name, version));
        }
    }
    Ok(listing)
}

/// Mark an installed package as manually requested.
pub fn mark_manual(config: &Config, name: &str) -> Result<()> {
    let db = Database::open(&config.db_root)?;
    if !db.is_installed(name) {
        return Err(Error::NotInstalled(name.to_string()));
    }
    db.mark_manual(name)
}

/// Synchronize the recipe tree from its upstream. Repository management is
/// an external collaborator; this only invokes it. No database lock needed.
pub fn sync(config: &Config) -> Result<()> {
    let argv = [
        "git",
        "-C",
        &config.recipes_dir.to_string_lossy(),
        "pull",
        "--ff-only",
    ];
    info!("syncing recipe tree in {}", config.recipes_dir.display());

    let output = Command::new(argv[0]).args(&argv[1..]).output()?;
    if !output.status.success() {
        warn!(
            "sync failed: {}",
            String::from_utf8_lossy(&output.stderr).trim_end()
        );
        return Err(Error::CommandFailed {
            command: argv.join(" "),
            status: output.status.code().unwrap_or(-1),
        });
    }
    Ok(())
}
