// src/source.rs

//! Source fetching, verification, and extraction
//!
//! Downloads go through the configured fetch command into a content cache
//! keyed by URL basename; a cached regular file is a hit and is never
//! re-fetched. Verification is SHA-256 against the recipe's positional hash
//! and skipped when the recipe declares none. Extraction dispatches on the
//! archive's filename suffix to the matching external tool, invoked with an
//! argv array, never through a shell.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::hash;
use crate::recipe::{source_filename, Recipe};
use crate::stagelog::StageLog;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, warn};

/// Fetch a URL into the cache path. Cache hit if the path is already a
/// regular file. On failure the partial file, if any, is removed.
pub fn fetch(config: &Config, url: &str, cache_path: &Path) -> Result<()> {
    if cache_path.is_file() {
        debug!("cache hit: {}", cache_path.display());
        return Ok(());
    }
    if let Some(parent) = cache_path.parent() {
        fs::create_dir_all(parent)?;
    }

    info!("fetching {}", url);
    let argv = fetch_command(&config.fetch_cmd, cache_path, url);
    let output = Command::new(&argv[0]).args(&argv[1..]).output();

    let failed = match &output {
        Ok(out) => !out.status.success(),
        Err(_) => true,
    };
    if failed {
        if let Ok(out) = &output {
            warn!(
                "fetch command exited with {}: {}",
                out.status,
                String::from_utf8_lossy(&out.stderr).trim_end()
            );
        }
        if cache_path.exists() {
            let _ = fs::remove_file(cache_path);
        }
        return Err(Error::FetchFailed(url.to_string()));
    }

    if let Ok(mut log) = StageLog::open(config, "fetch") {
        let _ = log.section(url);
        let _ = log.output(output.as_ref().expect("checked above"));
    }
    Ok(())
}

/// Build the fetch argv from the configured template. `{output}` and `{url}`
/// tokens are substituted; if neither placeholder appears, the output path
/// and URL are appended in that order.
fn fetch_command(template: &str, output: &Path, url: &str) -> Vec<String> {
    let output = output.to_string_lossy();
    let mut argv: Vec<String> = Vec::new();
    let mut substituted = false;

    for token in template.split_whitespace() {
        if token.contains("{output}") || token.contains("{url}") {
            substituted = true;
        }
        argv.push(token.replace("{output}", &output).replace("{url}", url));
    }
    if !substituted {
        argv.push(output.into_owned());
        argv.push(url.to_string());
    }
    argv
}

/// Verify a file against an optional expected hash. A mismatched cache entry
/// is removed so the next run re-fetches it.
pub fn verify(file: &Path, expected: Option<&str>) -> Result<()> {
    let expected = match expected {
        Some(h) => h,
        None => return Ok(()),
    };
    match hash::verify_file(file, expected) {
        Ok(()) => Ok(()),
        Err(e @ Error::HashMismatch { .. }) => {
            let _ = fs::remove_file(file);
            Err(e)
        }
        Err(e) => Err(e),
    }
}

/// The argv for extracting an archive by filename suffix, or `None` for an
/// unrecognized suffix.
fn extract_argv(archive: &Path, dest: &Path) -> Option<Vec<String>> {
    let name = archive.file_name()?.to_str()?;
    let archive = archive.to_string_lossy().into_owned();
    let dest = dest.to_string_lossy().into_owned();

    let tar = |flags: &[&str]| -> Vec<String> {
        let mut argv = vec!["tar".to_string()];
        argv.extend(flags.iter().map(|s| s.to_string()));
        argv.extend([archive.clone(), "-C".to_string(), dest.clone()]);
        argv
    };

    if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        Some(tar(&["-xzf"]))
    } else if name.ends_with(".tar.xz") {
        Some(tar(&["-xJf"]))
    } else if name.ends_with(".tar.bz2") {
        Some(tar(&["-xjf"]))
    } else if name.ends_with(".tar.zst") {
        Some(tar(&["--zstd", "-xf"]))
    } else if name.ends_with(".tar") {
        Some(tar(&["-xf"]))
    } else if name.ends_with(".zip") {
        Some(vec![
            "unzip".to_string(),
            "-q".to_string(),
            archive,
            "-d".to_string(),
            dest,
        ])
    } else {
        None
    }
}

/// Extract an archive into a directory. Unknown suffixes fall back to
/// `bsdtar` when that tool is available.
pub fn extract(archive: &Path, dest: &Path) -> Result<()> {
    fs::create_dir_all(dest)?;

    let file_name = archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| archive.display().to_string());

    let argv = match extract_argv(archive, dest) {
        Some(argv) => argv,
        None => vec![
            "bsdtar".to_string(),
            "-xf".to_string(),
            archive.to_string_lossy().into_owned(),
            "-C".to_string(),
            dest.to_string_lossy().into_owned(),
        ],
    };

    debug!("extracting {} with {}", file_name, argv[0]);
    let output = match Command::new(&argv[0]).args(&argv[1..]).output() {
        Ok(out) => out,
        Err(e) if e.kind() == ErrorKind::NotFound && argv[0] == "bsdtar" => {
            return Err(Error::UnsupportedArchive(file_name));
        }
        Err(e) => return Err(e.into()),
    };

    if !output.status.success() {
        warn!(
            "{} failed on {}: {}",
            argv[0],
            file_name,
            String::from_utf8_lossy(&output.stderr).trim_end()
        );
        return Err(Error::CommandFailed {
            command: argv.join(" "),
            status: output.status.code().unwrap_or(-1),
        });
    }
    Ok(())
}

/// Clear a package's scratch area, then fetch, verify, and extract every
/// source into it. Returns the working directory: the unique top-level
/// subdirectory when extraction produced exactly one, else the scratch root.
pub fn prepare(config: &Config, recipe: &Recipe) -> Result<PathBuf> {
    let scratch = config.pkg_build_dir(&recipe.name);
    if scratch.exists() {
        fs::remove_dir_all(&scratch)?;
    }
    fs::create_dir_all(&scratch)?;

    for (index, url) in recipe.sources.iter().enumerate() {
        let cache_path = config.src_cache.join(source_filename(url));
        fetch(config, url, &cache_path)?;
        verify(&cache_path, recipe.hash_for(index))?;
        extract(&cache_path, &scratch)?;
    }

    workdir(&scratch)
}

/// The working-directory rule shared by builder and installer: a scratch
/// tree whose only top-level entry is a directory builds inside it;
/// anything else builds in the scratch root itself.
pub fn workdir(scratch: &Path) -> Result<PathBuf> {
    let entries: Vec<_> = fs::read_dir(scratch)?.collect::<std::io::Result<_>>()?;
    if entries.len() == 1 && entries[0].file_type()?.is_dir() {
        return Ok(entries[0].path());
    }
    Ok(scratch.to_path_buf())
}
