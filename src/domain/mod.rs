//! Domain models for the scheduler
//!
//! Contains the graph model and scheduling algorithms without any I/O or
//! execution concerns.

mod work_package;
mod graph;
mod schedule;
mod detect;
mod plan;

pub use work_package::{WorkPackage, WorkPackageDefinition, WorkPackageStatus, DEFAULT_ESTIMATED_HOURS};
pub use graph::{DependencyGraph, DependencyTree, GraphError, MAX_TREE_DEPTH};
pub use schedule::CriticalPath;
pub use detect::{
    BlueprintRule, DependencyDetector, DependencyRule, ImplementationRule, MigrationRule,
    ReferenceUpdateRule, TestCoverageRule,
};
pub use plan::{ExecutionPlan, PlanFallback, PlanStage, Stage};
