//! wpsched - Dependency-aware work package scheduler
//!
//! Work packages declare estimates and dependencies; further dependencies can
//! be inferred from their titles and descriptions. The planner turns them
//! into an execution order, parallel groups and a critical path, and runs
//! the groups through a pluggable execution engine.

pub mod domain;
pub mod engine;
pub mod planner;
pub mod storage;
pub mod logging;
pub mod cli;

pub use domain::{
    DependencyGraph, ExecutionPlan, GraphError, WorkPackage, WorkPackageDefinition,
    WorkPackageStatus,
};
pub use engine::{EngineError, ExecutionEngine, SimulatedEngine};
pub use planner::{ExecutionReport, Planner};
