// src/stagelog.rs

//! Dated per-stage log files
//!
//! Subprocess output from the long-running stages is appended to
//! `log_dir/<YYYYMMDD>_<stage>.log` so failed builds can be inspected after
//! the fact. The user channel only sees the diagnostics; the full compiler
//! noise lives here.

use crate::config::Config;
use crate::error::Result;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Output;

pub(crate) struct StageLog {
    file: File,
    path: PathBuf,
}

impl StageLog {
    /// Open (append) today's log file for a stage.
    pub fn open(config: &Config, stage: &str) -> Result<Self> {
        fs::create_dir_all(&config.log_dir)?;
        let name = format!("{}_{}.log", chrono::Local::now().format("%Y%m%d"), stage);
        let path = config.log_dir.join(name);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write a section header.
    pub fn section(&mut self, title: &str) -> io::Result<()> {
        writeln!(self.file, "=== {title} ===")
    }

    /// Append a subprocess's captured stdout and stderr.
    pub fn output(&mut self, output: &Output) -> io::Result<()> {
        if !output.stdout.is_empty() {
            self.file.write_all(&output.stdout)?;
            if !output.stdout.ends_with(b"\n") {
                self.file.write_all(b"\n")?;
            }
        }
        if !output.stderr.is_empty() {
            self.file.write_all(&output.stderr)?;
            if !output.stderr.ends_with(b"\n") {
                self.file.write_all(b"\n")?;
            }
        }
        Ok(())
    }
}
