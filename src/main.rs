// src/main.rs
//! smelt - CLI entry point

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use smelt::config::{Config, DEFAULT_CONFIG_PATH};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "smelt")]
#[command(version)]
#[command(about = "A source-based package manager", long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH, global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show recipe metadata and installation state
    Info {
        /// Package name
        package: String,
    },

    /// Build a package and any missing dependencies
    Build {
        /// Package name
        package: String,
    },

    /// Install a previously built package
    Install {
        /// Package name
        package: String,
    },

    /// Remove an installed package
    Remove {
        /// Package name
        package: String,
    },

    /// List installed packages nothing depends on
    Orphans,

    /// Remove all orphaned packages
    Autoremove,

    /// Remove, rebuild, and reinstall a package
    Rebuild {
        /// Package name
        package: String,
    },

    /// Rebuild every installed package in dependency order
    RebuildSystem,

    /// Rebuild a package when its recipe version is newer
    Upgrade {
        /// Package name
        package: String,
    },

    /// List installed packages with versions
    ListInstalled,

    /// Mark an installed package as manually requested
    MarkManual {
        /// Package name
        package: String,
    },

    /// Synchronize the recipe tree from its upstream
    Sync,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_ansi(config.color)
        .init();

    match cli.command {
        Commands::Info { package } => commands::cmd_info(&config, &package),
        Commands::Build { package } => commands::cmd_build(&config, &package),
        Commands::Install { package } => commands::cmd_install(&config, &package),
        Commands::Remove { package } => commands::cmd_remove(&config, &package),
        Commands::Orphans => commands::cmd_orphans(&config),
        Commands::Autoremove => commands::cmd_autoremove(&config),
        Commands::Rebuild { package } => commands::cmd_rebuild(&config, &package),
        Commands::RebuildSystem => commands::cmd_rebuild_system(&config),
        Commands::Upgrade { package } => commands::cmd_upgrade(&config, &package),
        Commands::ListInstalled => commands::cmd_list_installed(&config),
        Commands::MarkManual { package } => commands::cmd_mark_manual(&config, &package),
        Commands::Sync => commands::cmd_sync(&config),
    }
}
