// src/install.rs

//! Install stage
//!
//! Takes a package that already built in its scratch tree, installs it into
//! a per-package staging root via `DESTDIR`, strips ELF binaries, merges the
//! staging tree onto the live install root, and records the manifest in the
//! database. Only the database record write is atomic; the commit pass is a
//! best-effort overlay that a re-run repairs.

use crate::build::{run_command, run_script};
use crate::config::Config;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::recipe::Recipe;
use crate::source;
use crate::stagelog::StageLog;
use goblin::elf::header::ELFMAG;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{ErrorKind, Read};
use std::os::unix::fs::{symlink, MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Install a built package: stage, strip, commit, register. Returns the
/// recorded manifest.
pub fn install(config: &Config, db: &Database, recipe: &Recipe) -> Result<Vec<PathBuf>> {
    let scratch = config.pkg_build_dir(&recipe.name);
    if !scratch.is_dir() {
        return Err(Error::NotBuilt(recipe.name.clone()));
    }
    let workdir = source::workdir(&scratch)?;

    let staging = config.pkg_staging_dir(&recipe.name);
    if staging.exists() {
        fs::remove_dir_all(&staging)?;
    }
    fs::create_dir_all(&staging)?;

    let mut log = StageLog::open(config, "install")?;
    log.section(&format!("{} {}", recipe.name, recipe.version))?;
    info!("installing {} {}", recipe.name, recipe.version);

    stage(config, recipe, &workdir, &staging, &mut log)?;
    strip_pass(config, &staging);
    commit(&staging, &config.install_prefix)?;

    let files = manifest(&staging, &config.install_prefix)?;
    db.register(&recipe.name, &recipe.version, &files)?;

    info!("installed {} {} ({} files)", recipe.name, recipe.version, files.len());
    Ok(files)
}

/// Populate the staging tree: the recipe's Install script, or the first of
/// the conventional install commands that succeeds.
fn stage(
    config: &Config,
    recipe: &Recipe,
    workdir: &Path,
    staging: &Path,
    log: &mut StageLog,
) -> Result<()> {
    let env = [
        ("DESTDIR", staging.to_string_lossy().into_owned()),
        ("MAKEFLAGS", config.makeflags.clone()),
    ];

    if let Some(script) = &recipe.install_script {
        return run_script(recipe, "install", script, workdir, &env, log);
    }

    let candidates: [&[&str]; 3] = [
        &["cmake", "--install", "build"],
        &["make", "-C", "build", "install"],
        &["make", "install"],
    ];

    let mut last_err = None;
    for candidate in candidates {
        let argv: Vec<String> = candidate.iter().map(|s| s.to_string()).collect();
        match run_command(recipe, "install", &argv, workdir, &env, log) {
            Ok(()) => return Ok(()),
            Err(e) => {
                debug!("{}: `{}` did not succeed", recipe.name, candidate.join(" "));
                last_err = Some(e);
            }
        }
    }
    Err(last_err.expect("at least one install candidate ran"))
}

/// Strip ELF binaries found in staging. Candidates are regular files that
/// are executable or carry a library name; the content probe keeps scripts
/// and data out. Failures are warnings, never fatal.
fn strip_pass(config: &Config, staging: &Path) {
    let strip_argv: Vec<String> = config
        .strip_cmd
        .split_whitespace()
        .map(str::to_string)
        .collect();

    for entry in WalkDir::new(staging).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let name = entry.file_name().to_string_lossy();

        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(e) => {
                warn!("cannot stat {}: {}", path.display(), e);
                continue;
            }
        };
        let executable = metadata.permissions().mode() & 0o111 != 0;
        let library = name.contains(".so") || name.ends_with(".a");
        if !executable && !library {
            continue;
        }
        if !is_elf(path) {
            continue;
        }

        debug!("stripping {}", path.display());
        let result = Command::new(&strip_argv[0])
            .args(&strip_argv[1..])
            .arg(path)
            .output();
        match result {
            Ok(out) if out.status.success() => {}
            Ok(out) => warn!(
                "strip failed on {}: {}",
                path.display(),
                String::from_utf8_lossy(&out.stderr).trim_end()
            ),
            Err(e) => warn!("cannot run strip on {}: {}", path.display(), e),
        }
    }
}

/// Content probe: does the file start with the ELF magic?
fn is_elf(path: &Path) -> bool {
    let mut magic = [0u8; 4];
    match File::open(path).and_then(|mut f| f.read_exact(&mut magic)) {
        Ok(()) => magic == *ELFMAG,
        Err(_) => false,
    }
}

/// Merge the staging tree into the live root, preserving permissions,
/// symlinks, and hard links. Existing files are overwritten.
fn commit(staging: &Path, prefix: &Path) -> Result<()> {
    // (dev, ino) of multiply-linked staged files -> first committed target
    let mut links: HashMap<(u64, u64), PathBuf> = HashMap::new();

    for entry in WalkDir::new(staging) {
        let entry = entry.map_err(|e| {
            std::io::Error::other(format!("walking staging tree: {e}"))
        })?;
        let rel = entry
            .path()
            .strip_prefix(staging)
            .expect("entry is under staging");
        if rel.as_os_str().is_empty() {
            continue;
        }
        let target = prefix.join(rel);

        let file_type = entry.file_type();
        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_symlink() {
            let dest = fs::read_link(entry.path())?;
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            remove_existing(&target);
            symlink(&dest, &target)?;
        } else if file_type.is_file() {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            remove_existing(&target);

            let metadata = entry.metadata().map_err(|e| {
                std::io::Error::other(format!("stat {}: {e}", entry.path().display()))
            })?;
            let key = (metadata.dev(), metadata.ino());
            if metadata.nlink() > 1 {
                if let Some(first) = links.get(&key) {
                    fs::hard_link(first, &target)?;
                    continue;
                }
                links.insert(key, target.clone());
            }
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

fn remove_existing(target: &Path) {
    match fs::remove_file(target) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => debug!("cannot remove {} before overlay: {}", target.display(), e),
    }
}

/// Every path present in staging as a file or symlink, rewritten to the
/// live root. Sorted and de-duplicated.
fn manifest(staging: &Path, prefix: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(staging) {
        let entry = entry.map_err(|e| {
            std::io::Error::other(format!("walking staging tree: {e}"))
        })?;
        let file_type = entry.file_type();
        if !file_type.is_file() && !file_type.is_symlink() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(staging)
            .expect("entry is under staging");
        files.push(prefix.join(rel));
    }
    files.sort();
    files.dedup();
    Ok(files)
}
