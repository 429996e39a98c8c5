//! Main CLI application structure

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use super::output::{Output, OutputFormat};
use super::{plan, run as run_cmd};
use crate::logging::init_logging;
use crate::storage::Config;

#[derive(Parser)]
#[command(name = "wpsched")]
#[command(author, version, about = "Dependency-aware work package scheduler")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (defaults to `default_format` from config)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Log at debug level
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Configuration file to use instead of wpsched.toml
    #[arg(long, short = 'c', global = true, env = "WPSCHED_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build an execution plan and show it
    Plan(plan::PlanArgs),

    /// Check definitions for missing, orphaned and circular dependencies
    Validate(plan::PlanArgs),

    /// Compare sequential and parallel duration estimates
    Estimate(plan::PlanArgs),

    /// Show the dependency tree of one work package
    Tree {
        #[command(flatten)]
        plan: plan::PlanArgs,

        /// Work package ID
        id: String,
    },

    /// Execute a plan
    Run(run_cmd::RunArgs),
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    init_logging(&config.logging, cli.verbose);

    let format = cli.format.unwrap_or_else(|| config.default_format.into());
    let output = Output::new(format);

    match cli.command {
        Commands::Plan(args) => plan::plan(&output, &config, &args),
        Commands::Validate(args) => plan::validate(&output, &config, &args),
        Commands::Estimate(args) => plan::estimate(&output, &config, &args),
        Commands::Tree { plan: args, id } => plan::tree(&output, &config, &args, &id),
        Commands::Run(args) => run_cmd::run(&output, &config, &args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_run_flags() {
        let cli = Cli::try_parse_from([
            "wpsched", "--format", "json", "run", "work.yaml", "--sequential", "-w", "2",
            "--dry-run",
        ])
        .unwrap();

        assert_eq!(cli.format, Some(OutputFormat::Json));
        match cli.command {
            Commands::Run(args) => {
                assert!(args.sequential);
                assert!(args.dry_run);
                assert_eq!(args.workers, Some(2));
                assert_eq!(args.plan.file, PathBuf::from("work.yaml"));
            }
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn parse_tree() {
        let cli = Cli::try_parse_from(["wpsched", "tree", "work.json", "deploy", "--no-detect"])
            .unwrap();

        match cli.command {
            Commands::Tree { plan, id } => {
                assert_eq!(id, "deploy");
                assert!(plan.no_detect);
            }
            _ => panic!("expected tree command"),
        }
    }
}
