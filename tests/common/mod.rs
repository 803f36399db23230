// tests/common/mod.rs

//! Shared fixture for integration tests.
//!
//! Builds a complete throwaway installation inside a TempDir: recipe tree,
//! source cache, scratch/staging roots, database, and a private install
//! root. Sources are local files "fetched" with `cp`, and archives are real
//! tarballs created with the system tar, which the extractor shells out to
//! anyway.

use smelt::config::Config;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;

pub struct Fixture {
    pub temp: TempDir,
    pub config: Config,
}

pub fn setup() -> Fixture {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    fs::create_dir_all(root.join("recipes")).unwrap();
    fs::create_dir_all(root.join("payload")).unwrap();
    fs::create_dir_all(root.join("counts")).unwrap();

    let config = Config {
        recipes_dir: root.join("recipes"),
        src_cache: root.join("cache"),
        build_dir: root.join("build"),
        staging_dir: root.join("staging"),
        db_root: root.join("db"),
        log_dir: root.join("logs"),
        fetch_cmd: "cp {url} {output}".to_string(),
        makeflags: String::new(),
        strip_cmd: "strip".to_string(),
        install_prefix: root.join("root"),
        jobs: 1,
        color: false,
    };
    config.validate().unwrap();

    Fixture { temp, config }
}

impl Fixture {
    pub fn write_recipe(&self, name: &str, body: &str) {
        fs::write(
            self.config.recipes_dir.join(format!("{name}.pkg")),
            body,
        )
        .unwrap();
    }

    /// Create a gzipped tarball under payload/ and return its path (used as
    /// the recipe's Source "URL").
    pub fn tarball(&self, file_name: &str, entries: &[(&str, &str)]) -> PathBuf {
        self.tarball_exec(file_name, entries, &[])
    }

    /// Like `tarball`, with some member paths made executable.
    pub fn tarball_exec(
        &self,
        file_name: &str,
        entries: &[(&str, &str)],
        executables: &[&str],
    ) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let stage = self.temp.path().join("payload").join(format!("{file_name}.d"));
        if stage.exists() {
            fs::remove_dir_all(&stage).unwrap();
        }
        for (rel, content) in entries {
            let path = stage.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, content).unwrap();
        }
        for rel in executables {
            let path = stage.join(rel);
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        }

        let out = self.temp.path().join("payload").join(file_name);
        let members: Vec<String> = fs::read_dir(&stage)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        let status = Command::new("tar")
            .arg("-czf")
            .arg(&out)
            .arg("-C")
            .arg(&stage)
            .args(&members)
            .status()
            .unwrap();
        assert!(status.success(), "tar failed building {file_name}");
        out
    }

    /// Write a conventional test package: one tarball with a single payload
    /// file under `<name>-<version>/`, a Build script that bumps a per-name
    /// build counter, and an Install script placing `bin/<name>`.
    pub fn simple_package(&self, name: &str, version: &str, depends: &str) {
        let tar = self.tarball(
            &format!("{name}-{version}.tar.gz"),
            &[(
                &format!("{name}-{version}/payload.txt"),
                &format!("{name} {version}\n"),
            )],
        );
        let counts = self.temp.path().join("counts");
        let body = format!(
            "Name: {name}\n\
             Version: {version}\n\
             Source: {tar}\n\
             Depends: {depends}\n\
             Build: |\n\
             echo built >> {counts}/{name}\n\
             mkdir -p out\n\
             cp payload.txt out/{name}\n\
             Build: end\n\
             Install: |\n\
             mkdir -p \"$DESTDIR/bin\"\n\
             cp out/{name} \"$DESTDIR/bin/{name}\"\n\
             Install: end\n",
            tar = tar.display(),
            counts = counts.display(),
        );
        self.write_recipe(name, &body);
    }

    /// How many times `name`'s Build script has run.
    pub fn build_count(&self, name: &str) -> usize {
        fs::read_to_string(self.temp.path().join("counts").join(name))
            .map(|s| s.lines().count())
            .unwrap_or(0)
    }

    /// Path of an installed file under the live root.
    pub fn rooted(&self, rel: &str) -> PathBuf {
        self.config.install_prefix.join(rel)
    }
}
