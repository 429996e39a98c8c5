//! # Planner
//!
//! Turns raw [`WorkPackageDefinition`]s into an [`ExecutionPlan`] and runs
//! plans against an [`ExecutionEngine`].
//!
//! ## Planning
//!
//! 1. Register every definition, then its explicit dependencies
//! 2. Add dependencies inferred by the [`DependencyDetector`]
//! 3. Validate; findings are logged, never fatal
//! 4. Order, group and find the critical path
//!
//! Each derived stage that fails is replaced by a safe default and recorded
//! on the plan (see [`ExecutionPlan::fallbacks`]), so planning always yields
//! a usable plan:
//!
//! | Stage | Fallback |
//! |-------|----------|
//! | Execution order | Definition order |
//! | Parallel groups | One group per package, in execution order |
//! | Critical path | Execution order, length = sum of all estimates |
//!
//! ## Execution
//!
//! See [`Planner::execute_plan`].

mod execute;
mod report;
mod visualize;

use std::collections::HashSet;
use std::time::Duration;

use crate::domain::{
    CriticalPath, DependencyDetector, DependencyGraph, ExecutionPlan, PlanStage, Stage,
    WorkPackageDefinition, DEFAULT_ESTIMATED_HOURS,
};
use crate::engine::{ExecutionEngine, SimulatedEngine};

pub use report::{ExecutionMode, ExecutionReport, WorkPackageResult};
pub use visualize::PlanView;

/// Builds and executes plans
pub struct Planner {
    detector: DependencyDetector,
    engine: Box<dyn ExecutionEngine>,
    default_estimated_hours: f64,
    detect_dependencies: bool,
    skip_dependents_on_failure: bool,
}

impl Default for Planner {
    fn default() -> Self {
        Self {
            detector: DependencyDetector::default(),
            engine: Box::new(SimulatedEngine::default()),
            default_estimated_hours: DEFAULT_ESTIMATED_HOURS,
            detect_dependencies: true,
            skip_dependents_on_failure: false,
        }
    }
}

impl std::fmt::Debug for Planner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Planner")
            .field("detector", &self.detector)
            .field("default_estimated_hours", &self.default_estimated_hours)
            .field("detect_dependencies", &self.detect_dependencies)
            .field("skip_dependents_on_failure", &self.skip_dependents_on_failure)
            .finish_non_exhaustive()
    }
}

impl Planner {
    /// Creates a planner with the built-in rules and a simulated engine
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_engine(mut self, engine: impl ExecutionEngine + 'static) -> Self {
        self.engine = Box::new(engine);
        self
    }

    /// Uses a [`SimulatedEngine`] with the given delay
    pub fn with_simulated_delay(self, delay: Duration) -> Self {
        self.with_engine(SimulatedEngine::new(delay))
    }

    pub fn with_detector(mut self, detector: DependencyDetector) -> Self {
        self.detector = detector;
        self
    }

    /// Estimate used for definitions that do not state one
    pub fn with_default_estimate(mut self, hours: f64) -> Self {
        self.default_estimated_hours = hours;
        self
    }

    /// Enables or disables heuristic dependency detection
    pub fn detect_dependencies(mut self, enabled: bool) -> Self {
        self.detect_dependencies = enabled;
        self
    }

    /// When enabled, packages whose dependencies failed are skipped
    pub fn skip_dependents_on_failure(mut self, enabled: bool) -> Self {
        self.skip_dependents_on_failure = enabled;
        self
    }

    /// Builds the dependency graph for a set of definitions
    ///
    /// Nodes first, then explicit edges, then detected edges.
    pub fn build_graph(&self, definitions: &[WorkPackageDefinition]) -> DependencyGraph {
        let mut graph = DependencyGraph::new();

        for def in definitions {
            graph.add_work_package(def.to_work_package(self.default_estimated_hours));
        }
        for def in definitions {
            for dep in &def.dependencies {
                graph.add_dependency(&def.id, dep);
            }
        }

        if self.detect_dependencies {
            let detected = self.detector.detect(graph.work_packages());
            let mut added = 0;
            for (from, tos) in &detected {
                for to in tos {
                    if graph.add_dependency(from, to) {
                        added += 1;
                    }
                }
            }
            tracing::debug!(added, "Applied detected dependencies");
        }

        graph
    }

    /// Creates an execution plan; never fails
    pub fn create_execution_plan(&self, definitions: &[WorkPackageDefinition]) -> ExecutionPlan {
        let graph = self.build_graph(definitions);

        for finding in graph.validate_dependencies() {
            tracing::warn!(%finding, "Dependency validation");
        }

        let mut fallbacks = Vec::new();

        let execution_order = Stage::resolve(graph.topological_sort(), || {
            definition_order(definitions)
        })
        .into_value(PlanStage::ExecutionOrder, &mut fallbacks);

        let parallel_groups = Stage::resolve(graph.find_parallel_groups(), || {
            execution_order.iter().map(|id| vec![id.clone()]).collect()
        })
        .into_value(PlanStage::ParallelGroups, &mut fallbacks);

        let critical_path = Stage::resolve(graph.critical_path(), || CriticalPath {
            ids: execution_order.clone(),
            hours: graph.total_estimated_hours(),
        })
        .into_value(PlanStage::CriticalPath, &mut fallbacks);

        tracing::info!(
            work_packages = graph.len(),
            groups = parallel_groups.len(),
            critical_path_hours = critical_path.hours,
            degraded = !fallbacks.is_empty(),
            "Created execution plan"
        );

        ExecutionPlan::new(graph, execution_order, parallel_groups, critical_path, fallbacks)
    }

    /// Total hours if every package ran one after another
    pub fn estimate_sequential_time(&self, definitions: &[WorkPackageDefinition]) -> f64 {
        definitions
            .iter()
            .map(|def| {
                def.to_work_package(self.default_estimated_hours)
                    .estimated_hours
            })
            .sum()
    }

    /// Total hours when groups run one after another and members run together
    pub fn estimate_parallel_time(&self, plan: &ExecutionPlan) -> f64 {
        plan.parallel_groups()
            .iter()
            .map(|group| {
                group
                    .iter()
                    .filter_map(|id| plan.work_package(id))
                    .map(|wp| wp.estimated_hours)
                    .fold(0.0, f64::max)
            })
            .sum()
    }

    /// Renders a plan for humans
    pub fn visualize_plan(&self, plan: &ExecutionPlan) -> String {
        PlanView::new(plan).to_string()
    }
}

/// Definition ids in caller order, first occurrence wins
fn definition_order(definitions: &[WorkPackageDefinition]) -> Vec<String> {
    let mut seen = HashSet::new();
    definitions
        .iter()
        .filter(|def| seen.insert(def.id.as_str()))
        .map(|def| def.id.clone())
        .collect()
}
