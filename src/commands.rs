// src/commands.rs
//! Command implementations for the CLI

use anyhow::{Context, Result};
use smelt::config::Config;
use smelt::ops::{self, UpgradeOutcome};

pub fn cmd_info(config: &Config, package: &str) -> Result<()> {
    let report = ops::info(config, package)
        .with_context(|| format!("querying package '{package}'"))?;

    println!("Name:      {}", report.recipe.name);
    println!("Version:   {}", report.recipe.version);
    for source in &report.recipe.sources {
        println!("Source:    {source}");
    }
    if !report.recipe.depends.is_empty() {
        println!("Depends:   {}", report.recipe.depends.join(", "));
    }
    match &report.installed_version {
        Some(version) => {
            println!("Installed: {} ({} files)", version, report.file_count);
            if report.manual {
                println!("Manual:    yes");
            }
        }
        None => println!("Installed: no"),
    }
    Ok(())
}

pub fn cmd_build(config: &Config, package: &str) -> Result<()> {
    ops::build(config, package).with_context(|| format!("building '{package}'"))?;
    println!("Built {package}");
    Ok(())
}

pub fn cmd_install(config: &Config, package: &str) -> Result<()> {
    ops::install(config, package).with_context(|| format!("installing '{package}'"))?;
    println!("Installed {package}");
    Ok(())
}

pub fn cmd_remove(config: &Config, package: &str) -> Result<()> {
    ops::remove(config, package).with_context(|| format!("removing '{package}'"))?;
    println!("Removed {package}");
    Ok(())
}

pub fn cmd_orphans(config: &Config) -> Result<()> {
    let orphans = ops::orphans(config).context("computing orphans")?;
    if orphans.is_empty() {
        println!("No orphaned packages.");
    } else {
        for name in orphans {
            println!("{name}");
        }
    }
    Ok(())
}

pub fn cmd_autoremove(config: &Config) -> Result<()> {
    let removed = ops::autoremove(config).context("removing orphans")?;
    if removed.is_empty() {
        println!("No orphaned packages.");
    } else {
        println!("Removed {} orphaned package(s): {}", removed.len(), removed.join(", "));
    }
    Ok(())
}

pub fn cmd_rebuild(config: &Config, package: &str) -> Result<()> {
    ops::rebuild(config, package).with_context(|| format!("rebuilding '{package}'"))?;
    println!("Rebuilt {package}");
    Ok(())
}

pub fn cmd_rebuild_system(config: &Config) -> Result<()> {
    ops::rebuild_system(config).context("rebuilding system")?;
    println!("System rebuild complete");
    Ok(())
}

pub fn cmd_upgrade(config: &Config, package: &str) -> Result<()> {
    let outcome =
        ops::upgrade(config, package).with_context(|| format!("upgrading '{package}'"))?;
    match outcome {
        UpgradeOutcome::UpToDate { installed } => {
            println!("{package} {installed} is up to date; no upgrade");
        }
        UpgradeOutcome::Upgraded { from, to } => {
            println!("Upgraded {package} {from} -> {to}");
        }
        UpgradeOutcome::Installed { version } => {
            println!("Installed {package} {version}");
        }
    }
    Ok(())
}

pub fn cmd_list_installed(config: &Config) -> Result<()> {
    let listing = ops::list_installed(config).context("listing installed packages")?;
    for (name, version) in listing {
        println!("{name} {version}");
    }
    Ok(())
}

pub fn cmd_mark_manual(config: &Config, package: &str) -> Result<()> {
    ops::mark_manual(config, package)
        .with_context(|| format!("marking '{package}' manual"))?;
    println!("Marked {package} as manually requested");
    Ok(())
}

pub fn cmd_sync(config: &Config) -> Result<()> {
    ops::sync(config).context("syncing recipe tree")?;
    println!("Recipe tree synchronized");
    Ok(())
}
