//! Plan execution command

use anyhow::{bail, Result};
use clap::Args;

use super::output::Output;
use super::plan::PlanArgs;
use crate::planner::{ExecutionMode, ExecutionReport};
use crate::storage::Config;

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub plan: PlanArgs,

    /// Run one work package at a time
    #[arg(long)]
    pub sequential: bool,

    /// Maximum concurrent work packages per group
    #[arg(long, short = 'w')]
    pub workers: Option<usize>,

    /// Use the simulated engine even when commands are defined
    #[arg(long)]
    pub dry_run: bool,

    /// Skip work packages whose dependencies did not complete
    #[arg(long)]
    pub skip_dependents: bool,
}

/// Execute a plan; fails when any work package did not complete
pub fn run(output: &Output, config: &Config, args: &RunArgs) -> Result<()> {
    let definitions = args.plan.load()?;

    let mut planner = args.plan.planner(config);
    if args.skip_dependents {
        planner = planner.skip_dependents_on_failure(true);
    }

    let has_commands = definitions.iter().any(|d| d.command.is_some());
    if has_commands && !args.dry_run {
        planner = planner.with_engine(config.command_engine(&definitions));
    } else {
        tracing::debug!(dry_run = args.dry_run, "Using simulated engine");
    }

    let plan = planner.create_execution_plan(&definitions);
    let parallel = config.execution.parallel && !args.sequential;
    let workers = args.workers.unwrap_or(config.execution.max_workers);

    let report = planner.execute_plan(&plan, parallel, workers);

    if output.is_json() {
        output.data(&report);
    } else {
        print_report(&report);
    }

    if !report.is_success() {
        bail!(
            "{} of {} work package(s) did not complete",
            report.failed + report.skipped,
            report.total_work_packages
        );
    }

    Ok(())
}

fn print_report(report: &ExecutionReport) {
    let mode = match report.mode {
        ExecutionMode::Sequential => "sequential".to_string(),
        ExecutionMode::Parallel { max_workers } => format!("parallel, {} workers", max_workers),
    };

    println!(
        "Executed {} work package(s) in {:.2}s ({})",
        report.total_work_packages, report.total_wall_clock_seconds, mode
    );
    println!(
        "  Completed: {}  Failed: {}  Skipped: {}",
        report.completed, report.failed, report.skipped
    );
    println!("  Estimated speedup: {:.1}x", report.parallel_speedup);

    let problems: Vec<_> = report.unsuccessful().collect();
    if !problems.is_empty() {
        println!();
        println!("Not completed:");
        for (id, result) in problems {
            println!(
                "  {:<20} {:<9} {}",
                id,
                result.status,
                result.error.as_deref().unwrap_or("")
            );
        }
    }
}
