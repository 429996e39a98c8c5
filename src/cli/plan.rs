//! Planning commands (plan, validate, estimate, tree)
//!
//! None of these execute anything; they only read the definition file.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;

use super::output::Output;
use crate::domain::{GraphError, WorkPackageDefinition};
use crate::planner::Planner;
use crate::storage::{load_definitions, Config};

/// Arguments shared by every command that reads a definition file
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Work package definitions (.json, .yaml, .yml or .toml)
    pub file: PathBuf,

    /// Only use explicitly declared dependencies
    #[arg(long)]
    pub no_detect: bool,
}

impl PlanArgs {
    pub(super) fn load(&self) -> Result<Vec<WorkPackageDefinition>> {
        load_definitions(&self.file)
    }

    pub(super) fn planner(&self, config: &Config) -> Planner {
        let planner = config.planner();
        if self.no_detect {
            planner.detect_dependencies(false)
        } else {
            planner
        }
    }
}

/// Build a plan and show it
pub fn plan(output: &Output, config: &Config, args: &PlanArgs) -> Result<()> {
    let definitions = args.load()?;
    let planner = args.planner(config);
    let plan = planner.create_execution_plan(&definitions);

    if output.is_json() {
        output.data(&plan);
    } else {
        print!("{}", planner.visualize_plan(&plan));
    }

    Ok(())
}

/// Report dependency problems; fails when there are any
pub fn validate(output: &Output, config: &Config, args: &PlanArgs) -> Result<()> {
    let definitions = args.load()?;
    let graph = args.planner(config).build_graph(&definitions);
    let findings = graph.validate_dependencies();

    if output.is_json() {
        output.data(&serde_json::json!({
            "valid": findings.is_empty(),
            "work_packages": graph.len(),
            "findings": findings,
        }));
    } else if findings.is_empty() {
        output.success(&format!(
            "No dependency problems in {} work package(s)",
            graph.len()
        ));
    } else {
        println!("Dependency problems ({}):", findings.len());
        for finding in &findings {
            println!("  - {}", finding);
        }
    }

    if !findings.is_empty() {
        bail!(
            "{} dependency problem(s) in {}",
            findings.len(),
            args.file.display()
        );
    }

    Ok(())
}

/// Compare sequential and parallel estimates
pub fn estimate(output: &Output, config: &Config, args: &PlanArgs) -> Result<()> {
    let definitions = args.load()?;
    let planner = args.planner(config);
    let plan = planner.create_execution_plan(&definitions);

    let sequential = planner.estimate_sequential_time(&definitions);
    let parallel = planner.estimate_parallel_time(&plan);
    let critical = plan.critical_path();

    if output.is_json() {
        output.data(&serde_json::json!({
            "work_packages": plan.len(),
            "groups": plan.parallel_groups().len(),
            "sequential_hours": sequential,
            "parallel_hours": parallel,
            "critical_path": critical,
        }));
        return Ok(());
    }

    println!("Work packages:  {}", plan.len());
    println!("Sequential:     {:.1}h", sequential);
    println!(
        "Parallel:       {:.1}h ({} groups)",
        parallel,
        plan.parallel_groups().len()
    );
    if critical.is_empty() {
        println!("Critical path:  {:.1}h", critical.hours);
    } else {
        println!(
            "Critical path:  {:.1}h ({})",
            critical.hours,
            critical.ids.join(" -> ")
        );
    }
    if sequential > 0.0 {
        println!("Time saved:     {:.0}%", (1.0 - parallel / sequential) * 100.0);
    }

    Ok(())
}

/// Show the dependency tree of one work package
pub fn tree(output: &Output, config: &Config, args: &PlanArgs, id: &str) -> Result<()> {
    let definitions = args.load()?;
    let graph = args.planner(config).build_graph(&definitions);

    let tree = graph
        .dependency_tree(id)
        .ok_or_else(|| GraphError::WorkPackageNotFound(id.to_string()))?;

    if output.is_json() {
        output.data(&tree);
    } else {
        print!("{}", tree);
    }

    Ok(())
}
