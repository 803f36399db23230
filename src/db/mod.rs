// src/db/mod.rs

//! Installed-package database
//!
//! Directory layout under the database root:
//!
//! ```text
//! installed/<name>/VERSION        version string, one line
//! installed/<name>/files.list     sorted manifest, one absolute path per line
//! installed/<name>/installed_at   epoch seconds
//! state/manual.list               manually requested packages, sorted, unique
//! state/lock                      exclusive-operation lock
//! ```
//!
//! A package is installed iff its record directory exists and contains a
//! VERSION entry. Record writes go through a temporary sibling and a rename,
//! so a crash leaves either the old or the new content, never a torn file.
//!
//! Opening the database acquires an exclusive flock on `state/lock`; a
//! second operation fails fast with `DatabaseLocked` instead of blocking.
//! The OS releases the lock on process exit, crashes included.

use crate::error::{Error, Result};
use crate::recipe::RecipeStore;
use fs2::FileExt;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Handle over the database directory. Owns the operation lock for its
/// lifetime; exactly one exists per operation.
pub struct Database {
    root: PathBuf,
    _lock: File,
}

impl Database {
    /// Open the database, creating the layout if needed, and acquire the
    /// exclusive operation lock without blocking.
    pub fn open(root: &Path) -> Result<Self> {
        fs::create_dir_all(root.join("installed"))?;
        fs::create_dir_all(root.join("state"))?;

        let lock_file = File::create(root.join("state").join("lock"))?;
        match lock_file.try_lock_exclusive() {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::WouldBlock => return Err(Error::DatabaseLocked),
            Err(e) => return Err(e.into()),
        }

        Ok(Self {
            root: root.to_path_buf(),
            _lock: lock_file,
        })
    }

    fn record_dir(&self, name: &str) -> PathBuf {
        self.root.join("installed").join(name)
    }

    fn manual_path(&self) -> PathBuf {
        self.root.join("state").join("manual.list")
    }

    /// The installed version of a package, or `None` if not installed.
    pub fn installed_version(&self, name: &str) -> Option<String> {
        let version = fs::read_to_string(self.record_dir(name).join("VERSION")).ok()?;
        let version = version.trim().to_string();
        if version.is_empty() {
            None
        } else {
            Some(version)
        }
    }

    /// Whether a package has an installed record.
    pub fn is_installed(&self, name: &str) -> bool {
        self.installed_version(name).is_some()
    }

    /// The recorded file manifest, or empty if absent.
    pub fn installed_files(&self, name: &str) -> Result<Vec<PathBuf>> {
        match fs::read_to_string(self.record_dir(name).join("files.list")) {
            Ok(content) => Ok(content
                .lines()
                .filter(|l| !l.is_empty())
                .map(PathBuf::from)
                .collect()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Atomically record an installed package, replacing any prior record.
    pub fn register(&self, name: &str, version: &str, files: &[PathBuf]) -> Result<()> {
        let dir = self.record_dir(name);
        fs::create_dir_all(&dir)?;

        let mut sorted: Vec<String> = files
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        sorted.sort();
        sorted.dedup();
        let mut manifest = sorted.join("\n");
        if !manifest.is_empty() {
            manifest.push('\n');
        }

        write_atomic(&dir.join("files.list"), &manifest)?;
        write_atomic(
            &dir.join("installed_at"),
            &format!("{}\n", chrono::Utc::now().timestamp()),
        )?;
        // VERSION last: its presence is what marks the record as installed.
        write_atomic(&dir.join("VERSION"), &format!("{version}\n"))?;

        debug!("registered {} {} ({} files)", name, version, sorted.len());
        Ok(())
    }

    /// Remove a package's record. Idempotent.
    pub fn unregister(&self, name: &str) -> Result<()> {
        match fs::remove_dir_all(self.record_dir(name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// All packages with an installed record.
    pub fn all_installed(&self) -> Result<BTreeSet<String>> {
        let mut installed = BTreeSet::new();
        for entry in fs::read_dir(self.root.join("installed"))? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if self.is_installed(&name) {
                installed.insert(name);
            }
        }
        Ok(installed)
    }

    /// Reverse-dependency edges `(dep, dependent)` over the current recipe
    /// tree: for every installed package `p`, one edge per entry in its
    /// recipe's Depends. Installed packages whose recipe has vanished
    /// contribute no edges.
    pub fn reverse_deps(&self, store: &RecipeStore) -> Result<Vec<(String, String)>> {
        let mut edges = Vec::new();
        for name in self.all_installed()? {
            match store.load(&name) {
                Ok(recipe) => {
                    for dep in recipe.depends {
                        edges.push((dep, name.clone()));
                    }
                }
                Err(Error::RecipeNotFound(_)) => {
                    debug!("installed package '{}' has no recipe; no edges", name);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(edges)
    }

    /// Add a package to the manual set. Idempotent; the file stays sorted.
    pub fn mark_manual(&self, name: &str) -> Result<()> {
        let mut manual = self.manual()?;
        if manual.insert(name.to_string()) {
            let body: String = manual.into_iter().map(|n| n + "\n").collect();
            write_atomic(&self.manual_path(), &body)?;
        }
        Ok(())
    }

    /// The set of manually requested packages.
    pub fn manual(&self) -> Result<BTreeSet<String>> {
        match fs::read_to_string(self.manual_path()) {
            Ok(content) => Ok(content
                .lines()
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeSet::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Installed packages that are neither manually requested nor a current
    /// dependency of any installed package.
    pub fn orphans(&self, store: &RecipeStore) -> Result<Vec<String>> {
        let installed = self.all_installed()?;
        let manual = self.manual()?;
        let needed: BTreeSet<String> = self
            .reverse_deps(store)?
            .into_iter()
            .map(|(dep, _)| dep)
            .collect();

        Ok(installed
            .into_iter()
            .filter(|name| !needed.contains(name) && !manual.contains(name))
            .collect())
    }
}

/// Write a file through a temporary sibling and rename, so readers observe
/// either the old content or the new, never a partial write.
fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("record");
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));
    fs::write(&tmp, content)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_db(temp: &TempDir) -> Database {
        Database::open(&temp.path().join("db")).unwrap()
    }

    #[test]
    fn test_register_and_query() {
        let temp = TempDir::new().unwrap();
        let db = open_db(&temp);

        assert_eq!(db.installed_version("zlib"), None);
        assert!(db.installed_files("zlib").unwrap().is_empty());

        let files = vec![PathBuf::from("/usr/lib/libz.so"), PathBuf::from("/usr/include/zlib.h")];
        db.register("zlib", "1.3", &files).unwrap();

        assert_eq!(db.installed_version("zlib").as_deref(), Some("1.3"));
        // Manifest comes back sorted
        assert_eq!(
            db.installed_files("zlib").unwrap(),
            vec![PathBuf::from("/usr/include/zlib.h"), PathBuf::from("/usr/lib/libz.so")]
        );
        assert_eq!(db.all_installed().unwrap().len(), 1);
    }

    #[test]
    fn test_register_overwrites() {
        let temp = TempDir::new().unwrap();
        let db = open_db(&temp);

        db.register("zlib", "1.2", &[PathBuf::from("/usr/lib/old.so")]).unwrap();
        db.register("zlib", "1.3", &[PathBuf::from("/usr/lib/new.so")]).unwrap();

        assert_eq!(db.installed_version("zlib").as_deref(), Some("1.3"));
        assert_eq!(db.installed_files("zlib").unwrap(), vec![PathBuf::from("/usr/lib/new.so")]);
    }

    #[test]
    fn test_register_dedups_manifest() {
        let temp = TempDir::new().unwrap();
        let db = open_db(&temp);

        let files = vec![PathBuf::from("/usr/bin/x"), PathBuf::from("/usr/bin/x")];
        db.register("x", "1", &files).unwrap();
        assert_eq!(db.installed_files("x").unwrap().len(), 1);
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let db = open_db(&temp);

        db.register("zlib", "1.3", &[]).unwrap();
        db.unregister("zlib").unwrap();
        assert!(!db.is_installed("zlib"));
        db.unregister("zlib").unwrap(); // second time is a no-op
    }

    #[test]
    fn test_lock_contention_fails_fast() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("db");

        let first = Database::open(&root).unwrap();
        let second = Database::open(&root);
        assert!(matches!(second, Err(Error::DatabaseLocked)));

        drop(first);
        assert!(Database::open(&root).is_ok());
    }

    #[test]
    fn test_manual_set_sorted_and_idempotent() {
        let temp = TempDir::new().unwrap();
        let db = open_db(&temp);

        db.mark_manual("zlib").unwrap();
        db.mark_manual("acl").unwrap();
        db.mark_manual("zlib").unwrap();

        let manual: Vec<String> = db.manual().unwrap().into_iter().collect();
        assert_eq!(manual, vec!["acl", "zlib"]);

        let raw = fs::read_to_string(temp.path().join("db/state/manual.list")).unwrap();
        assert_eq!(raw, "acl\nzlib\n");
    }

    #[test]
    fn test_reverse_deps_and_orphans() {
        let temp = TempDir::new().unwrap();
        let db = open_db(&temp);

        let recipes = temp.path().join("recipes");
        fs::create_dir_all(&recipes).unwrap();
        fs::write(recipes.join("a.pkg"), "Name: a\nVersion: 1\nSource: a.tar\n").unwrap();
        fs::write(recipes.join("b.pkg"), "Name: b\nVersion: 1\nSource: b.tar\nDepends: a\n").unwrap();
        let store = RecipeStore::new(&recipes);

        db.register("a", "1", &[]).unwrap();
        db.register("b", "1", &[]).unwrap();
        db.mark_manual("b").unwrap();

        let edges = db.reverse_deps(&store).unwrap();
        assert_eq!(edges, vec![("a".to_string(), "b".to_string())]);

        // a is needed by b, b is manual: no orphans
        assert!(db.orphans(&store).unwrap().is_empty());

        db.unregister("b").unwrap();
        // b gone: a is installed, not manual, not needed
        assert_eq!(db.orphans(&store).unwrap(), vec!["a"]);
    }

    #[test]
    fn test_installed_package_without_recipe_has_no_edges() {
        let temp = TempDir::new().unwrap();
        let db = open_db(&temp);

        let recipes = temp.path().join("recipes");
        fs::create_dir_all(&recipes).unwrap();
        let store = RecipeStore::new(&recipes);

        db.register("ghost", "1", &[]).unwrap();
        assert!(db.reverse_deps(&store).unwrap().is_empty());
        assert_eq!(db.orphans(&store).unwrap(), vec!["ghost"]);
    }

    #[test]
    fn test_record_without_version_is_not_installed() {
        let temp = TempDir::new().unwrap();
        let db = open_db(&temp);

        // A bare record directory (crashed install before VERSION landed)
        fs::create_dir_all(temp.path().join("db/installed/partial")).unwrap();
        assert!(!db.is_installed("partial"));
        assert!(!db.all_installed().unwrap().contains("partial"));
    }
}
