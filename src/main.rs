//! # rbuild CLI Entry Point
//!
//! Parses arguments with clap, loads the project descriptor and hands the
//! requested targets to the build coordinator.

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use std::path::{Path, PathBuf};

use rbuild::build::BuildCoordinator;
use rbuild::config::{self, BuildOptions, DepMode, ProjectDescriptor};

const DEFAULT_PROJECT_FILES: [&str; 2] = ["rbuild.toml", "rbuild.json"];

#[derive(Parser)]
#[command(name = "rbuild")]
#[command(about = "Incremental build engine for C, C++ and assembly", version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Targets to build, `all`, or `list` to show the available targets
    targets: Vec<String>,

    /// Project descriptor [default: rbuild.toml, then rbuild.json]
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Ignore dependency records and rebuild every source
    #[arg(long)]
    rebuild: bool,

    /// Echo full command lines and enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Parallel compile jobs, a number or `auto`; 0 compiles sequentially
    #[arg(short, long, value_parser = parse_jobs)]
    jobs: Option<usize>,

    /// Stop at the first target that fails
    #[arg(long)]
    failexit: bool,

    /// Remove object files and dependency records instead of building
    #[arg(long)]
    clean: bool,

    /// Read modification times from disk on every check
    #[arg(long = "filetime-nocache")]
    filetime_nocache: bool,

    /// Leave system headers out of dependency records (-MMD)
    #[arg(long)]
    mmd: bool,

    /// Link C/C++ targets statically
    #[arg(long = "static")]
    static_link: bool,
}

fn parse_jobs(s: &str) -> Result<usize, String> {
    if s == "auto" {
        return Ok(config::default_num_jobs());
    }
    s.parse::<usize>()
        .map_err(|_| format!("expected a number or 'auto', got '{s}'"))
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "rbuild=debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn project_file(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    DEFAULT_PROJECT_FILES
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "no project file found.\n\nTip: create rbuild.toml or pass one with --file."
            )
        })
}

fn list_targets(project: &ProjectDescriptor) {
    let defaults = project.default_targets();
    println!("{}", "Targets:".bold());
    for name in project.targets.keys() {
        if defaults.iter().any(|d| d == "all" || d == name) {
            println!("  {} {}", name.green(), "(default)".dimmed());
        } else {
            println!("  {}", name);
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let path = project_file(cli.file.as_deref())?;
    let project = config::load_project(&path)
        .with_context(|| format!("Failed to load {}", path.display()))?;

    if cli.targets.iter().any(|t| t == "list") {
        list_targets(&project);
        return Ok(());
    }

    let options = BuildOptions {
        verbose: cli.verbose,
        rebuild: cli.rebuild,
        num_jobs: cli.jobs.unwrap_or_else(config::default_num_jobs),
        mtime_cache: !cli.filetime_nocache,
        dep_mode: if cli.mmd { DepMode::UserOnly } else { DepMode::All },
        static_link: cli.static_link,
        fail_exit: cli.failexit,
    };

    let coordinator = BuildCoordinator::new(&project, options);
    let targets = if cli.targets.is_empty() {
        for name in project.invalid_default_targets() {
            coordinator
                .context()
                .console
                .warn(&format!("ignoring invalid default target '{name}'"));
        }
        project.default_targets()
    } else {
        cli.targets.clone()
    };
    if targets.is_empty() {
        println!("{} No targets to build", "!".yellow());
        return Ok(());
    }

    let summary = if cli.clean {
        coordinator.clean_targets(&targets)?
    } else {
        coordinator.build_targets(&targets)?
    };

    if !summary.success() {
        std::process::exit(1);
    }
    Ok(())
}
