// src/build.rs

//! Build stage
//!
//! Runs a recipe's Build script, or picks a heuristic build by the project
//! descriptor present in the working directory. Scripts are piped to
//! `sh -eu` on stdin so any failing command aborts the stage; MAKEFLAGS is
//! exported throughout. All subprocess output is captured to the dated
//! build log. Nothing here touches the live install root.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::recipe::Recipe;
use crate::stagelog::StageLog;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{debug, info};

/// Heuristic build systems, detected by project descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Autotools,
    Meson,
    Cmake,
}

/// Detect the build strategy for a working directory.
pub fn detect_strategy(workdir: &Path) -> Option<Strategy> {
    if workdir.join("configure").exists() {
        Some(Strategy::Autotools)
    } else if workdir.join("meson.build").exists() {
        Some(Strategy::Meson)
    } else if workdir.join("CMakeLists.txt").exists() {
        Some(Strategy::Cmake)
    } else {
        None
    }
}

/// Build a prepared package in its working directory.
pub fn build(config: &Config, recipe: &Recipe, workdir: &Path) -> Result<()> {
    let mut log = StageLog::open(config, "build")?;
    log.section(&format!("{} {}", recipe.name, recipe.version))?;

    info!("building {} {}", recipe.name, recipe.version);

    let env = [("MAKEFLAGS", config.makeflags.clone())];

    if let Some(script) = &recipe.build_script {
        return run_script(recipe, "build", script, workdir, &env, &mut log);
    }

    let strategy = detect_strategy(workdir)
        .ok_or_else(|| Error::NoBuildStrategy(recipe.name.clone()))?;
    debug!("{}: heuristic build via {:?}", recipe.name, strategy);

    let steps: Vec<Vec<String>> = match strategy {
        Strategy::Autotools => vec![
            argv(&["./configure", "--prefix=/usr"]),
            make_argv(config),
        ],
        Strategy::Meson => {
            let jobs = config.jobs.to_string();
            vec![
                argv(&["meson", "setup", "build", "--prefix=/usr"]),
                argv(&["meson", "compile", "-C", "build", "-j", &jobs]),
            ]
        }
        Strategy::Cmake => {
            let mut build_cmd = argv(&["cmake", "--build", "build", "--"]);
            build_cmd.extend(config.makeflags.split_whitespace().map(str::to_string));
            vec![
                argv(&[
                    "cmake",
                    "-B",
                    "build",
                    "-DCMAKE_BUILD_TYPE=Release",
                    "-DCMAKE_INSTALL_PREFIX=/usr",
                ]),
                build_cmd,
            ]
        }
    };

    for step in steps {
        run_command(recipe, "build", &step, workdir, &env, &mut log)?;
    }
    Ok(())
}

fn argv(tokens: &[&str]) -> Vec<String> {
    tokens.iter().map(|s| s.to_string()).collect()
}

fn make_argv(config: &Config) -> Vec<String> {
    let mut cmd = vec!["make".to_string()];
    cmd.extend(config.makeflags.split_whitespace().map(str::to_string));
    cmd
}

/// Run one external command for a stage, capturing output to the stage log.
pub(crate) fn run_command(
    recipe: &Recipe,
    stage: &str,
    argv: &[String],
    workdir: &Path,
    env: &[(&str, String)],
    log: &mut StageLog,
) -> Result<()> {
    debug!("{} {}: running {:?}", recipe.name, stage, argv);
    log.section(&format!("{} $ {}", recipe.name, argv.join(" ")))?;

    let output = Command::new(&argv[0])
        .args(&argv[1..])
        .current_dir(workdir)
        .envs(env.iter().map(|(k, v)| (*k, v.as_str())))
        .output()?;

    log.output(&output)?;

    if !output.status.success() {
        return Err(Error::StageFailed {
            package: recipe.name.clone(),
            stage: stage.to_string(),
            status: output.status.code().unwrap_or(-1),
            log: log.path().to_path_buf(),
        });
    }
    Ok(())
}

/// Pipe a recipe script to `sh -eu`, with the stage's environment exported
/// and output captured to the stage log.
pub(crate) fn run_script(
    recipe: &Recipe,
    stage: &str,
    script: &str,
    workdir: &Path,
    env: &[(&str, String)],
    log: &mut StageLog,
) -> Result<()> {
    debug!("{} {}: running recipe script", recipe.name, stage);
    log.section(&format!("{} {} script", recipe.name, stage))?;

    let mut child = Command::new("sh")
        .arg("-eu")
        .current_dir(workdir)
        .envs(env.iter().map(|(k, v)| (*k, v.as_str())))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(script.as_bytes())?;
        stdin.write_all(b"\n")?;
    }

    let output = child.wait_with_output()?;
    log.output(&output)?;

    if !output.status.success() {
        return Err(Error::StageFailed {
            package: recipe.name.clone(),
            stage: stage.to_string(),
            status: output.status.code().unwrap_or(-1),
            log: log.path().to_path_buf(),
        });
    }
    Ok(())
}
