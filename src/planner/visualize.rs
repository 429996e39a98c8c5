//! Human-readable plan rendering

use std::fmt;

use crate::domain::ExecutionPlan;

/// Text view of an [`ExecutionPlan`]
///
/// Lists every group with its members and estimates, then the critical path.
pub struct PlanView<'a> {
    plan: &'a ExecutionPlan,
}

impl<'a> PlanView<'a> {
    pub fn new(plan: &'a ExecutionPlan) -> Self {
        Self { plan }
    }
}

impl fmt::Display for PlanView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plan = self.plan;
        let critical = plan.critical_path();

        writeln!(f, "Execution Plan")?;
        writeln!(f, "{}", "=".repeat(60))?;
        writeln!(
            f,
            "Work packages: {}  Groups: {}  Sequential: {:.1}h  Critical path: {:.1}h",
            plan.len(),
            plan.parallel_groups().len(),
            plan.sequential_hours(),
            plan.estimated_hours()
        )?;

        for (index, group) in plan.parallel_groups().iter().enumerate() {
            writeln!(f)?;
            let noun = if group.len() == 1 { "package" } else { "packages" };
            writeln!(f, "Group {} ({} {}):", index + 1, group.len(), noun)?;
            for id in group {
                // `*` marks critical path members
                let marker = if critical.contains(id) { "*" } else { " " };
                match plan.work_package(id) {
                    Some(wp) => {
                        let deps = plan.graph().dependencies(id);
                        write!(
                            f,
                            "  [{}] {:<20} {:>6.1}h  {}",
                            marker, id, wp.estimated_hours, wp.title
                        )?;
                        if !deps.is_empty() {
                            write!(f, "  (after: {})", deps.join(", "))?;
                        }
                        writeln!(f)?;
                    }
                    None => writeln!(f, "  [{}] {:<20} (unknown)", marker, id)?,
                }
            }
        }

        writeln!(f)?;
        writeln!(f, "Critical path ({:.1}h):", critical.hours)?;
        if critical.is_empty() {
            writeln!(f, "  (none)")?;
        } else {
            writeln!(f, "  {}", critical.ids.join(" -> "))?;
        }

        if plan.is_degraded() {
            writeln!(f)?;
            writeln!(f, "Fallbacks:")?;
            for fallback in plan.fallbacks() {
                writeln!(f, "  {}: {}", fallback.stage.label(), fallback.reason)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::WorkPackageDefinition;
    use crate::planner::Planner;

    #[test]
    fn view_lists_every_package_and_critical_path() {
        let planner = Planner::new();
        let plan = planner.create_execution_plan(&[
            WorkPackageDefinition::new("root", "Root").hours(1.0),
            WorkPackageDefinition::new("short", "Short").hours(0.5).depends_on("root"),
            WorkPackageDefinition::new("long", "Long").hours(2.0).depends_on("root"),
        ]);

        let text = planner.visualize_plan(&plan);

        assert!(text.contains("Group 1 (1 package):"));
        assert!(text.contains("Group 2 (2 packages):"));
        for id in ["root", "short", "long"] {
            assert!(text.contains(id));
        }
        assert!(text.contains("0.5h"));
        assert!(text.contains("2.0h"));
        assert!(text.contains("root -> long"));
        assert!(text.contains("Critical path (3.0h)"));
        assert!(!text.contains("Fallbacks"));
    }

    #[test]
    fn view_lists_fallbacks() {
        let planner = Planner::new();
        let plan = planner.create_execution_plan(&[
            WorkPackageDefinition::new("a", "A").depends_on("b"),
            WorkPackageDefinition::new("b", "B").depends_on("a"),
        ]);

        let text = planner.visualize_plan(&plan);

        assert!(text.contains("Fallbacks:"));
        assert!(text.contains("execution order: Circular dependency"));
    }
}
