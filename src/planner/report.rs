//! Execution reports
//!
//! Reports are plain serializable values so external consumers (history,
//! metrics) can store them as-is.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{ExecutionPlan, WorkPackageStatus};

/// How a plan was executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ExecutionMode {
    Sequential,
    Parallel { max_workers: usize },
}

/// Outcome of one work package
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkPackageResult {
    pub status: WorkPackageStatus,
    pub elapsed_seconds: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkPackageResult {
    pub fn completed(elapsed: Duration) -> Self {
        Self {
            status: WorkPackageStatus::Completed,
            elapsed_seconds: elapsed.as_secs_f64(),
            error: None,
        }
    }

    pub fn failed(elapsed: Duration, error: impl Into<String>) -> Self {
        Self {
            status: WorkPackageStatus::Failed,
            elapsed_seconds: elapsed.as_secs_f64(),
            error: Some(error.into()),
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            status: WorkPackageStatus::Skipped,
            elapsed_seconds: 0.0,
            error: Some(reason.into()),
        }
    }
}

/// Aggregated outcome of one plan execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub total_work_packages: usize,
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub total_wall_clock_seconds: f64,
    /// Sequential estimate divided by the measured wall-clock time
    pub parallel_speedup: f64,
    pub critical_path_hours: f64,
    pub mode: ExecutionMode,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub results: BTreeMap<String, WorkPackageResult>,
}

impl ExecutionReport {
    /// Aggregates per-package results into a report
    pub fn from_results(
        plan: &ExecutionPlan,
        results: BTreeMap<String, WorkPackageResult>,
        mode: ExecutionMode,
        started_at: DateTime<Utc>,
        wall_clock: Duration,
    ) -> Self {
        let count = |status: WorkPackageStatus| {
            results.values().filter(|r| r.status == status).count()
        };
        let completed = count(WorkPackageStatus::Completed);
        let failed = count(WorkPackageStatus::Failed);
        let skipped = count(WorkPackageStatus::Skipped);

        let wall_seconds = wall_clock.as_secs_f64();
        let sequential_seconds: f64 = plan
            .work_packages()
            .map(|wp| wp.estimated_seconds())
            .sum();
        let parallel_speedup = if wall_seconds > 0.0 {
            sequential_seconds / wall_seconds
        } else {
            1.0
        };

        Self {
            total_work_packages: plan.len(),
            completed,
            failed,
            skipped,
            total_wall_clock_seconds: wall_seconds,
            parallel_speedup,
            critical_path_hours: plan.critical_path().hours,
            mode,
            started_at,
            finished_at: Utc::now(),
            results,
        }
    }

    /// Returns true if every package completed
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.skipped == 0 && self.completed == self.total_work_packages
    }

    /// Failed and skipped packages with their results
    pub fn unsuccessful(&self) -> impl Iterator<Item = (&String, &WorkPackageResult)> {
        self.results.iter().filter(|(_, r)| r.status.is_unsuccessful())
    }

    pub fn status_of(&self, id: &str) -> Option<WorkPackageStatus> {
        self.results.get(id).map(|r| r.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CriticalPath, DependencyGraph, WorkPackage};

    fn plan_of(hours: &[(&str, f64)]) -> ExecutionPlan {
        let mut graph = DependencyGraph::new();
        for (id, h) in hours {
            graph.add_work_package(WorkPackage::new(*id, *id).with_estimate(*h));
        }
        let ids = graph.ids();
        ExecutionPlan::new(
            graph,
            ids.clone(),
            vec![ids],
            CriticalPath {
                ids: vec![hours[0].0.to_string()],
                hours: hours[0].1,
            },
            Vec::new(),
        )
    }

    #[test]
    fn counts_and_speedup() {
        let plan = plan_of(&[("a", 1.0), ("b", 1.0), ("c", 1.0)]);
        let mut results = BTreeMap::new();
        results.insert("a".to_string(), WorkPackageResult::completed(Duration::from_secs(1)));
        results.insert("b".to_string(), WorkPackageResult::failed(Duration::from_secs(1), "boom"));
        results.insert("c".to_string(), WorkPackageResult::skipped("dependency failed"));

        let report = ExecutionReport::from_results(
            &plan,
            results,
            ExecutionMode::Parallel { max_workers: 2 },
            Utc::now(),
            Duration::from_secs(3600),
        );

        assert_eq!(report.total_work_packages, 3);
        assert_eq!(report.completed, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.parallel_speedup, 3.0);
        assert_eq!(report.critical_path_hours, 1.0);
        assert!(!report.is_success());
        assert_eq!(report.unsuccessful().count(), 2);
        assert_eq!(report.status_of("a"), Some(WorkPackageStatus::Completed));
    }

    #[test]
    fn zero_wall_clock_defaults_speedup() {
        let plan = plan_of(&[("a", 1.0)]);
        let report = ExecutionReport::from_results(
            &plan,
            BTreeMap::new(),
            ExecutionMode::Sequential,
            Utc::now(),
            Duration::ZERO,
        );

        assert_eq!(report.parallel_speedup, 1.0);
    }

    #[test]
    fn report_json_shape() {
        let plan = plan_of(&[("a", 0.5)]);
        let mut results = BTreeMap::new();
        results.insert("a".to_string(), WorkPackageResult::completed(Duration::from_millis(10)));

        let report = ExecutionReport::from_results(
            &plan,
            results,
            ExecutionMode::Parallel { max_workers: 4 },
            Utc::now(),
            Duration::from_millis(20),
        );
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["completed"], 1);
        assert_eq!(json["mode"]["kind"], "parallel");
        assert_eq!(json["mode"]["max_workers"], 4);
        assert_eq!(json["results"]["a"]["status"], "completed");
        assert!(json["results"]["a"].get("error").is_none());

        let back: ExecutionReport = serde_json::from_value(json).unwrap();
        assert_eq!(back, report);
    }
}
