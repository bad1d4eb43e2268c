//! qualdash CLI - quality dashboard data from the command line

#![deny(warnings)]

// Global invariants enforced:
// - Responses go to stdout, logs to stderr
// - Identical input yields byte-for-byte identical output

use anyhow::Context;
use clap::{Parser, Subcommand};
use qualdash_core::config::{self, ResolvedConfig};
use qualdash_core::{render_json, Dashboard};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "qualdash")]
#[command(about = "Quality dashboard data: metric trees, issues, tags and version diffs")]
#[command(version = env!("QUALDASH_VERSION"))]
struct Cli {
    /// Path to config file (default: auto-discover)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data directory (overrides config file)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Log debug details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    View(ViewCommand),
    /// Validate or show the configuration
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ViewCommand {
    /// Print the overview data
    Overview,
    /// Print the metric tree of one version
    Tree {
        /// Version id (e.g. transitfeed-1.0.7)
        version: String,
    },
    /// Print two metric trees and the maxima that scale their shared radar axes
    CompareTrees {
        version1: String,
        version2: String,
    },
    /// Print a file's source and its issues filed by line
    Issues {
        /// Version id
        version: String,
        /// File path inside the version (e.g. feedvalidator.py)
        file: String,
    },
    /// Print the issues introduced between two adjacent versions
    IssuesAdded {
        /// Version id or label (e.g. 0--transitfeed-1.0.7)
        version1: String,
        /// Version id or label
        version2: String,
    },
    /// Print tag statistics of a version, aligned with a second one if given
    Tags {
        version1: String,
        version2: Option<String>,
    },
    /// Print the per-release statistics series
    Statistics,
    /// Print the raw git diff between two versions
    Diff {
        /// Version id or label
        version1: String,
        /// Version id or label
        version2: String,
    },
    /// Print the configured release order and the versions present on disk
    Versions,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate a config file
    Validate,
    /// Show the resolved configuration (merged defaults + config file)
    Show,
}

fn main() -> anyhow::Result<()> {
    let Cli {
        config: config_path,
        data_dir,
        verbose,
        command,
    } = Cli::parse();
    init_logging(verbose);

    let project_root = std::env::current_dir()?;

    match command {
        Commands::Config { action } => run_config(&action, &project_root, config_path.as_deref()),
        Commands::View(view) => {
            let dashboard = load_dashboard(&project_root, config_path.as_deref(), data_dir)?;
            run_view(view, &dashboard)
        }
    }
}

fn load_dashboard(
    project_root: &Path,
    config_path: Option<&Path>,
    data_dir: Option<PathBuf>,
) -> anyhow::Result<Dashboard> {
    let mut resolved = config::load_and_resolve(project_root, config_path)
        .context("failed to load configuration")?;
    if let Some(path) = &resolved.config_path {
        tracing::debug!("using config: {}", path.display());
    }

    // CLI flag overrides config file value
    if let Some(dir) = data_dir {
        resolved.data_dir = if dir.is_relative() {
            project_root.join(dir)
        } else {
            dir
        };
    }

    Ok(Dashboard::from_config(resolved))
}

fn run_view(view: ViewCommand, dashboard: &Dashboard) -> anyhow::Result<()> {
    match view {
        ViewCommand::Overview => {
            println!("{}", dashboard.overview()?);
        }
        ViewCommand::Tree { version } => {
            println!("{}", render_json(&dashboard.radar_tree(&version)?)?);
        }
        ViewCommand::CompareTrees { version1, version2 } => {
            let paired = dashboard.paired_radar_trees(&version1, &version2)?;
            println!("{}", render_json(&paired)?);
        }
        ViewCommand::Issues { version, file } => {
            println!("{}", render_json(&dashboard.file_issues(&version, &file)?)?);
        }
        ViewCommand::IssuesAdded { version1, version2 } => {
            let records = dashboard.issues_added(&version1, &version2)?;
            println!("{}", render_json(&records)?);
        }
        ViewCommand::Tags { version1, version2 } => {
            let stats = dashboard.tag_stats(&version1, version2.as_deref())?;
            println!("{}", render_json(&stats)?);
        }
        ViewCommand::Statistics => {
            println!("{}", render_json(&dashboard.statistics()?)?);
        }
        ViewCommand::Diff { version1, version2 } => {
            print!("{}", dashboard.source_diff(&version1, &version2)?);
        }
        ViewCommand::Versions => {
            let available = dashboard.store().list_versions()?;
            let listing = serde_json::json!({
                "order": dashboard.config().version_order,
                "available": available,
            });
            println!("{}", render_json(&listing)?);
        }
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run_config(
    action: &ConfigAction,
    project_root: &Path,
    config_path: Option<&Path>,
) -> anyhow::Result<()> {
    match action {
        ConfigAction::Validate => match config::load_and_resolve(project_root, config_path) {
            Ok(config) => {
                if let Some(ref p) = config.config_path {
                    println!("Config valid: {}", p.display());
                } else {
                    println!("No config file found. Using defaults.");
                }
            }
            Err(e) => {
                eprintln!("Config validation failed: {:#}", e);
                std::process::exit(1);
            }
        },
        ConfigAction::Show => {
            let resolved = config::load_and_resolve(project_root, config_path)
                .context("failed to load configuration")?;
            print_config(&resolved);
        }
    }
    Ok(())
}

fn print_config(resolved: &ResolvedConfig) {
    println!("Configuration:");
    if let Some(ref p) = resolved.config_path {
        println!("  Source: {}", p.display());
    } else {
        println!("  Source: defaults (no config file found)");
    }
    println!();
    println!("Data:");
    println!("  data_dir: {}", resolved.data_dir.display());
    println!(
        "  repository: {}",
        resolved
            .repository
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "none".to_string())
    );
    println!();
    println!("Revisions:");
    println!("  version_prefix: {}", resolved.version_prefix);
    for (version, revision) in &resolved.revision_overrides {
        println!("  {} -> {}", version, revision);
    }
    println!();
    println!("Release order ({} versions):", resolved.version_order.len());
    for version in resolved.version_order.as_slice() {
        println!("  {}", version);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_tags_second_version_is_optional() {
        let cli = Cli::try_parse_from(["qualdash", "tags", "transitfeed-1.0.7"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::View(ViewCommand::Tags { version2: None, .. })
        ));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "qualdash",
            "issues-added",
            "0--transitfeed-1.0.7",
            "1--transitfeed-1.0.8",
            "--data-dir",
            "back/data",
        ])
        .unwrap();
        assert_eq!(cli.data_dir, Some(PathBuf::from("back/data")));
        assert!(matches!(
            cli.command,
            Commands::View(ViewCommand::IssuesAdded { .. })
        ));
    }

    #[test]
    fn test_config_subcommand() {
        let cli = Cli::try_parse_from(["qualdash", "config", "validate"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigAction::Validate
            }
        ));
    }
}
