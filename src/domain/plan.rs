//! Immutable execution plans
//!
//! A plan is a snapshot of a [`DependencyGraph`] together with everything
//! derived from it. Planning stages that failed and were replaced by their
//! safe default are recorded as [`PlanFallback`]s.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use super::graph::DependencyGraph;
use super::schedule::CriticalPath;
use super::work_package::WorkPackage;

/// Planning stage that can fall back to a default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStage {
    ExecutionOrder,
    ParallelGroups,
    CriticalPath,
}

impl PlanStage {
    pub fn label(&self) -> &'static str {
        match self {
            PlanStage::ExecutionOrder => "execution order",
            PlanStage::ParallelGroups => "parallel groups",
            PlanStage::CriticalPath => "critical path",
        }
    }
}

/// A stage that could not be computed and what replaced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanFallback {
    pub stage: PlanStage,
    pub reason: String,
}

/// Outcome of one planning stage
#[derive(Debug, Clone, PartialEq)]
pub enum Stage<T> {
    Computed(T),
    Fallback { value: T, reason: String },
}

impl<T> Stage<T> {
    /// Resolves a stage result, substituting `fallback` on error
    pub fn resolve<E: std::fmt::Display>(
        result: Result<T, E>,
        fallback: impl FnOnce() -> T,
    ) -> Self {
        match result {
            Ok(value) => Stage::Computed(value),
            Err(e) => Stage::Fallback {
                value: fallback(),
                reason: e.to_string(),
            },
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Stage::Fallback { .. })
    }

    /// Extracts the value, recording a fallback for `stage` if there was one
    pub fn into_value(self, stage: PlanStage, fallbacks: &mut Vec<PlanFallback>) -> T {
        match self {
            Stage::Computed(value) => value,
            Stage::Fallback { value, reason } => {
                tracing::warn!(stage = stage.label(), %reason, "Planning stage fell back to default");
                fallbacks.push(PlanFallback { stage, reason });
                value
            }
        }
    }
}

/// An immutable plan for executing a set of work packages
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    graph: DependencyGraph,
    execution_order: Vec<String>,
    parallel_groups: Vec<Vec<String>>,
    critical_path: CriticalPath,
    fallbacks: Vec<PlanFallback>,
}

impl ExecutionPlan {
    pub fn new(
        graph: DependencyGraph,
        execution_order: Vec<String>,
        parallel_groups: Vec<Vec<String>>,
        critical_path: CriticalPath,
        fallbacks: Vec<PlanFallback>,
    ) -> Self {
        Self {
            graph,
            execution_order,
            parallel_groups,
            critical_path,
            fallbacks,
        }
    }

    /// The graph the plan was derived from
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn work_package(&self, id: &str) -> Option<&WorkPackage> {
        self.graph.work_package(id)
    }

    pub fn work_packages(&self) -> impl Iterator<Item = &WorkPackage> {
        self.graph.work_packages()
    }

    pub fn execution_order(&self) -> &[String] {
        &self.execution_order
    }

    pub fn parallel_groups(&self) -> &[Vec<String>] {
        &self.parallel_groups
    }

    pub fn critical_path(&self) -> &CriticalPath {
        &self.critical_path
    }

    /// Estimated completion time: the critical path length in hours
    pub fn estimated_hours(&self) -> f64 {
        self.critical_path.hours
    }

    /// Sum of every package's estimate, in hours
    pub fn sequential_hours(&self) -> f64 {
        self.graph.total_estimated_hours()
    }

    pub fn fallbacks(&self) -> &[PlanFallback] {
        &self.fallbacks
    }

    /// Returns true if any planning stage fell back to its default
    pub fn is_degraded(&self) -> bool {
        !self.fallbacks.is_empty()
    }

    /// Index of the parallel group containing `id`
    pub fn group_of(&self, id: &str) -> Option<usize> {
        self.parallel_groups
            .iter()
            .position(|group| group.iter().any(|member| member == id))
    }

    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }
}

#[derive(Serialize)]
struct PlannedWorkPackage<'a> {
    #[serde(flatten)]
    work_package: &'a WorkPackage,
    dependencies: Vec<String>,
    dependents: Vec<String>,
}

impl Serialize for ExecutionPlan {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let work_packages: Vec<_> = self
            .graph
            .work_packages()
            .map(|wp| PlannedWorkPackage {
                work_package: wp,
                dependencies: self.graph.dependencies(&wp.id),
                dependents: self.graph.dependents(&wp.id),
            })
            .collect();

        let mut state = serializer.serialize_struct("ExecutionPlan", 6)?;
        state.serialize_field("work_packages", &work_packages)?;
        state.serialize_field("execution_order", &self.execution_order)?;
        state.serialize_field("parallel_groups", &self.parallel_groups)?;
        state.serialize_field("critical_path", &self.critical_path)?;
        state.serialize_field("estimated_hours", &self.estimated_hours())?;
        state.serialize_field("fallbacks", &self.fallbacks)?;
        state.end()
    }
}
