//! Plan execution
//!
//! Groups run strictly one after another. Inside a group, members are pulled
//! by a pool of `min(max_workers, group size)` scoped threads. Each worker
//! keeps the results for the ids it claimed and hands them back on join.

use std::collections::{BTreeMap, HashMap};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use chrono::Utc;

use super::report::{ExecutionMode, ExecutionReport, WorkPackageResult};
use super::Planner;
use crate::domain::{ExecutionPlan, GraphError};

type Results = BTreeMap<String, WorkPackageResult>;

impl Planner {
    /// Executes a plan and reports per-package outcomes
    ///
    /// Sequential mode follows the execution order. Parallel mode runs each
    /// parallel group on its own bounded worker pool and waits for the whole
    /// group before starting the next. A failing package never stops its
    /// siblings or later groups (unless skipping dependents of failures is
    /// enabled, in which case only its dependents are skipped).
    pub fn execute_plan(
        &self,
        plan: &ExecutionPlan,
        parallel: bool,
        max_workers: usize,
    ) -> ExecutionReport {
        let started_at = Utc::now();
        let start = Instant::now();
        let mut results = Results::new();

        let mode = if parallel {
            let max_workers = max_workers.max(1);
            for (index, group) in plan.parallel_groups().iter().enumerate() {
                let runnable = self.filter_skipped(plan, group, &mut results);
                let workers = max_workers.min(runnable.len());
                tracing::debug!(
                    group = index + 1,
                    size = group.len(),
                    workers,
                    "Executing parallel group"
                );
                results.extend(self.run_group(plan, &runnable, workers));
            }
            ExecutionMode::Parallel { max_workers }
        } else {
            for id in plan.execution_order() {
                let runnable = self.filter_skipped(plan, std::slice::from_ref(id), &mut results);
                for id in runnable {
                    let result = self.execute_one(plan, id);
                    results.insert(id.clone(), result);
                }
            }
            ExecutionMode::Sequential
        };

        let report =
            ExecutionReport::from_results(plan, results, mode, started_at, start.elapsed());

        tracing::info!(
            completed = report.completed,
            failed = report.failed,
            skipped = report.skipped,
            wall_clock_seconds = report.total_wall_clock_seconds,
            "Plan execution finished"
        );

        report
    }

    /// Records skips for packages with unsuccessful dependencies, returns the rest
    fn filter_skipped<'a>(
        &self,
        plan: &ExecutionPlan,
        ids: &'a [String],
        results: &mut Results,
    ) -> Vec<&'a String> {
        if !self.skip_dependents_on_failure {
            return ids.iter().collect();
        }

        let mut runnable = Vec::with_capacity(ids.len());
        for id in ids {
            let blocker = plan.graph().dependencies(id).into_iter().find(|dep| {
                results
                    .get(dep)
                    .map(|r| r.status.is_unsuccessful())
                    .unwrap_or(false)
            });
            match blocker {
                Some(dep) => {
                    tracing::warn!(%id, dependency = %dep, "Skipping work package");
                    results.insert(
                        id.clone(),
                        WorkPackageResult::skipped(format!("Dependency {} did not complete", dep)),
                    );
                }
                None => runnable.push(id),
            }
        }
        runnable
    }

    fn run_group(&self, plan: &ExecutionPlan, ids: &[&String], workers: usize) -> Results {
        if workers <= 1 {
            return ids
                .iter()
                .map(|id| ((*id).clone(), self.execute_one(plan, id)))
                .collect();
        }

        let next = &AtomicUsize::new(0);
        let mut collected: HashMap<String, WorkPackageResult> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    scope.spawn(move || {
                        let mut claimed = Vec::new();
                        while let Some(id) = ids.get(next.fetch_add(1, Ordering::Relaxed)) {
                            claimed.push(((*id).clone(), self.execute_one(plan, id)));
                        }
                        claimed
                    })
                })
                .collect();

            handles
                .into_iter()
                .flat_map(|handle| handle.join().unwrap_or_default())
                .collect()
        });

        ids.iter()
            .map(|id| {
                let result = collected.remove(id.as_str()).unwrap_or_else(|| {
                    WorkPackageResult::failed(
                        std::time::Duration::ZERO,
                        "Worker terminated before reporting a result",
                    )
                });
                ((*id).clone(), result)
            })
            .collect()
    }

    /// Runs one package through the engine; never panics or fails
    fn execute_one(&self, plan: &ExecutionPlan, id: &str) -> WorkPackageResult {
        let start = Instant::now();

        let Some(work_package) = plan.work_package(id) else {
            let err = GraphError::WorkPackageNotFound(id.to_string());
            tracing::error!(%id, "Work package missing from plan");
            return WorkPackageResult::failed(start.elapsed(), err.to_string());
        };

        tracing::debug!(%id, title = %work_package.title, "Executing work package");
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.engine.execute(work_package)));
        let elapsed = start.elapsed();

        let result = match outcome {
            Ok(Ok(true)) => WorkPackageResult::completed(elapsed),
            Ok(Ok(false)) => WorkPackageResult::failed(elapsed, "Execution engine reported failure"),
            Ok(Err(e)) => WorkPackageResult::failed(elapsed, e.to_string()),
            Err(payload) => WorkPackageResult::failed(elapsed, panic_message(payload.as_ref())),
        };

        if let Some(error) = &result.error {
            tracing::warn!(%id, %error, "Work package failed");
        }
        result
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("Execution engine panicked: {}", detail)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use crate::domain::{WorkPackage, WorkPackageDefinition, WorkPackageStatus};
    use crate::engine::EngineError;
    use crate::planner::{ExecutionMode, Planner};

    fn independent(n: usize) -> Vec<WorkPackageDefinition> {
        (0..n)
            .map(|i| WorkPackageDefinition::new(format!("wp{}", i), format!("Package {}", i)))
            .collect()
    }

    fn chain() -> Vec<WorkPackageDefinition> {
        vec![
            WorkPackageDefinition::new("r", "R"),
            WorkPackageDefinition::new("a", "A").depends_on("r"),
            WorkPackageDefinition::new("b", "B").depends_on("a"),
        ]
    }

    #[test]
    fn parallel_simulated_execution() {
        let planner = Planner::new().with_simulated_delay(Duration::from_millis(10));
        let plan = planner.create_execution_plan(&independent(5));

        let report = planner.execute_plan(&plan, true, 2);

        assert_eq!(report.total_work_packages, 5);
        assert_eq!(report.completed, 5);
        assert_eq!(report.failed, 0);
        assert_eq!(report.skipped, 0);
        assert!(report.parallel_speedup >= 1.0);
        assert_eq!(report.mode, ExecutionMode::Parallel { max_workers: 2 });
        assert!(report.is_success());
    }

    #[test]
    fn sequential_execution_follows_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&seen);
        let planner = Planner::new().with_engine(move |wp: &WorkPackage| -> Result<bool, EngineError> {
            recorder.lock().unwrap().push(wp.id.clone());
            Ok(true)
        });
        let plan = planner.create_execution_plan(&chain());

        let report = planner.execute_plan(&plan, false, 4);

        assert_eq!(*seen.lock().unwrap(), vec!["r", "a", "b"]);
        assert_eq!(report.completed, 3);
        assert_eq!(report.mode, ExecutionMode::Sequential);
    }

    #[test]
    fn failures_do_not_stop_siblings_or_later_groups() {
        let planner = Planner::new().with_engine(|wp: &WorkPackage| -> Result<bool, EngineError> {
            match wp.id.as_str() {
                "wp1" => Err(EngineError::Failed("disk full".to_string())),
                "wp3" => Ok(false),
                _ => Ok(true),
            }
        });
        let mut defs = independent(4);
        defs.push(WorkPackageDefinition::new("after", "After").depends_on("wp1"));
        let plan = planner.create_execution_plan(&defs);

        let report = planner.execute_plan(&plan, true, 4);

        assert_eq!(report.completed, 3);
        assert_eq!(report.failed, 2);
        assert_eq!(report.status_of("after"), Some(WorkPackageStatus::Completed));
        assert_eq!(report.results["wp1"].error.as_deref(), Some("disk full"));
        assert_eq!(
            report.results["wp3"].error.as_deref(),
            Some("Execution engine reported failure")
        );
    }

    #[test]
    fn engine_panic_is_recorded_as_failure() {
        let planner = Planner::new().with_engine(|wp: &WorkPackage| -> Result<bool, EngineError> {
            if wp.id == "wp0" {
                panic!("engine exploded");
            }
            Ok(true)
        });
        let plan = planner.create_execution_plan(&independent(3));

        let report = planner.execute_plan(&plan, true, 3);

        assert_eq!(report.completed, 2);
        assert_eq!(report.failed, 1);
        let error = report.results["wp0"].error.clone().unwrap();
        assert!(error.contains("engine exploded"));
    }

    #[test]
    fn groups_run_in_order_with_bounded_workers() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let log = Arc::new(Mutex::new(Vec::new()));
        let (a, p, l) = (Arc::clone(&active), Arc::clone(&peak), Arc::clone(&log));

        let planner = Planner::new().with_engine(move |wp: &WorkPackage| -> Result<bool, EngineError> {
            let now = a.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
            p.fetch_max(now, std::sync::atomic::Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(20));
            l.lock().unwrap().push(wp.id.clone());
            a.fetch_sub(1, std::sync::atomic::Ordering::SeqCst);
            Ok(true)
        });

        let mut defs = independent(6);
        defs.push(
            WorkPackageDefinition::new("last", "Last")
                .depends_on("wp0")
                .depends_on("wp5"),
        );
        let plan = planner.create_execution_plan(&defs);
        assert_eq!(plan.parallel_groups().len(), 2);

        let report = planner.execute_plan(&plan, true, 2);

        assert_eq!(report.completed, 7);
        assert!(peak.load(std::sync::atomic::Ordering::SeqCst) <= 2);
        assert_eq!(log.lock().unwrap().last().map(String::as_str), Some("last"));
    }

    #[test]
    fn zero_workers_runs_one_at_a_time() {
        let planner = Planner::new().with_simulated_delay(Duration::ZERO);
        let plan = planner.create_execution_plan(&independent(3));

        let report = planner.execute_plan(&plan, true, 0);

        assert_eq!(report.completed, 3);
        assert_eq!(report.mode, ExecutionMode::Parallel { max_workers: 1 });
    }

    #[test]
    fn skip_dependents_on_failure() {
        let planner = Planner::new()
            .skip_dependents_on_failure(true)
            .with_engine(|wp: &WorkPackage| -> Result<bool, EngineError> { Ok(wp.id != "r") });
        let plan = planner.create_execution_plan(&chain());

        for parallel in [true, false] {
            let report = planner.execute_plan(&plan, parallel, 2);

            assert_eq!(report.failed, 1);
            assert_eq!(report.skipped, 2);
            assert_eq!(report.status_of("a"), Some(WorkPackageStatus::Skipped));
            assert_eq!(report.status_of("b"), Some(WorkPackageStatus::Skipped));
            assert!(report.results["a"].error.as_deref().unwrap().contains("r"));
        }
    }

    #[test]
    fn failures_do_not_skip_by_default() {
        let planner = Planner::new()
            .with_engine(|wp: &WorkPackage| -> Result<bool, EngineError> { Ok(wp.id != "r") });
        let plan = planner.create_execution_plan(&chain());

        let report = planner.execute_plan(&plan, true, 2);

        assert_eq!(report.failed, 1);
        assert_eq!(report.completed, 2);
        assert_eq!(report.skipped, 0);
    }

    #[test]
    fn empty_plan_reports_nothing() {
        let planner = Planner::new();
        let plan = planner.create_execution_plan(&[]);

        let report = planner.execute_plan(&plan, true, 4);

        assert_eq!(report.total_work_packages, 0);
        assert!(report.results.is_empty());
        assert!(report.is_success());
    }

    #[test]
    fn missing_work_package_is_a_failure() {
        use crate::domain::{CriticalPath, DependencyGraph, ExecutionPlan};

        let mut graph = DependencyGraph::new();
        graph.add_work_package(WorkPackage::new("a", "A"));
        let plan = ExecutionPlan::new(
            graph,
            vec!["a".into(), "ghost".into()],
            vec![vec!["a".into(), "ghost".into()]],
            CriticalPath::default(),
            Vec::new(),
        );
        let planner = Planner::new().with_simulated_delay(Duration::ZERO);

        let report = planner.execute_plan(&plan, true, 2);

        assert_eq!(report.status_of("a"), Some(WorkPackageStatus::Completed));
        assert_eq!(report.status_of("ghost"), Some(WorkPackageStatus::Failed));
        assert!(report.results["ghost"]
            .error
            .as_deref()
            .unwrap()
            .contains("not found"));
    }
}
