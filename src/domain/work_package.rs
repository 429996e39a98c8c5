//! Work package domain model
//!
//! A work package is an opaque unit of schedulable work with an estimated
//! duration and a priority. Its edges live in the [`DependencyGraph`], not on
//! the package itself.
//!
//! [`DependencyGraph`]: super::DependencyGraph

use serde::{Deserialize, Serialize};

/// Estimate used when a definition does not state one (hours)
pub const DEFAULT_ESTIMATED_HOURS: f64 = 0.5;

/// Status of a work package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkPackageStatus {
    #[default]
    Pending,
    Ready,
    Running,
    Completed,
    Failed,
    Skipped,
}

impl WorkPackageStatus {
    /// Returns true if the package did not complete successfully
    pub fn is_unsuccessful(&self) -> bool {
        matches!(self, WorkPackageStatus::Failed | WorkPackageStatus::Skipped)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkPackageStatus::Pending => "pending",
            WorkPackageStatus::Ready => "ready",
            WorkPackageStatus::Running => "running",
            WorkPackageStatus::Completed => "completed",
            WorkPackageStatus::Failed => "failed",
            WorkPackageStatus::Skipped => "skipped",
        }
    }
}

impl std::fmt::Display for WorkPackageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// A schedulable unit of work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkPackage {
    /// Unique key within a graph
    pub id: String,

    pub title: String,

    /// Free text, only consulted by the dependency detector
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Estimated duration in hours (never negative)
    pub estimated_hours: f64,

    /// Higher runs earlier when otherwise unconstrained
    #[serde(default)]
    pub priority: i32,

    #[serde(default)]
    pub status: WorkPackageStatus,
}

impl WorkPackage {
    /// Creates a pending work package with the default estimate
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            estimated_hours: DEFAULT_ESTIMATED_HOURS,
            priority: 0,
            status: WorkPackageStatus::Pending,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the estimate, clamping negative or non-finite values to zero
    pub fn with_estimate(mut self, hours: f64) -> Self {
        self.estimated_hours = sanitize_hours(&self.id, hours);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Lowercased title, used for case-insensitive matching
    pub fn title_lower(&self) -> String {
        self.title.to_lowercase()
    }

    /// Lowercased title and description joined by a space
    pub fn text_lower(&self) -> String {
        format!("{} {}", self.title, self.description).to_lowercase()
    }

    /// Estimated duration in seconds
    pub fn estimated_seconds(&self) -> f64 {
        self.estimated_hours * 3600.0
    }
}

fn sanitize_hours(id: &str, hours: f64) -> f64 {
    if hours.is_finite() && hours >= 0.0 {
        hours
    } else {
        tracing::warn!(id, hours, "Invalid duration estimate, clamping to 0");
        0.0
    }
}

/// Raw definition of a work package as supplied by callers
///
/// Definitions are what the planner consumes. Missing estimates fall back to
/// the planner's configured default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkPackageDefinition {
    pub id: String,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(
        default,
        alias = "estimated_duration",
        skip_serializing_if = "Option::is_none"
    )]
    pub estimated_hours: Option<f64>,

    /// Ids this package explicitly requires
    #[serde(
        default,
        alias = "explicit_dependencies",
        alias = "depends_on",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub dependencies: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,

    /// Shell command run by the process engine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

impl WorkPackageDefinition {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            estimated_hours: None,
            dependencies: Vec::new(),
            priority: None,
            command: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn hours(mut self, hours: f64) -> Self {
        self.estimated_hours = Some(hours);
        self
    }

    pub fn depends_on(mut self, id: impl Into<String>) -> Self {
        self.dependencies.push(id.into());
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    /// Effective estimate given the configured default
    pub fn hours_or(&self, default_hours: f64) -> f64 {
        self.estimated_hours.unwrap_or(default_hours)
    }

    /// Converts the definition into a pending work package
    pub fn to_work_package(&self, default_hours: f64) -> WorkPackage {
        WorkPackage::new(self.id.clone(), self.title.clone())
            .with_description(self.description.clone().unwrap_or_default())
            .with_estimate(self.hours_or(default_hours))
            .with_priority(self.priority.unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_work_package_defaults() {
        let wp = WorkPackage::new("wp-1", "Write parser");
        assert_eq!(wp.estimated_hours, DEFAULT_ESTIMATED_HOURS);
        assert_eq!(wp.priority, 0);
        assert_eq!(wp.status, WorkPackageStatus::Pending);
        assert!(wp.description.is_empty());
    }

    #[test]
    fn negative_estimate_is_clamped() {
        let wp = WorkPackage::new("wp-1", "Oops").with_estimate(-2.0);
        assert_eq!(wp.estimated_hours, 0.0);

        let wp = WorkPackage::new("wp-2", "Oops").with_estimate(f64::NAN);
        assert_eq!(wp.estimated_hours, 0.0);
    }

    #[test]
    fn text_lower_joins_title_and_description() {
        let wp = WorkPackage::new("wp-1", "Define Interface").with_description("Public API");
        assert_eq!(wp.text_lower(), "define interface public api");
        assert_eq!(wp.title_lower(), "define interface");
    }

    #[test]
    fn definition_applies_default_estimate() {
        let def = WorkPackageDefinition::new("a", "A");
        assert_eq!(def.to_work_package(0.5).estimated_hours, 0.5);
        assert_eq!(def.to_work_package(2.0).estimated_hours, 2.0);

        let def = def.hours(3.0).priority(7);
        let wp = def.to_work_package(0.5);
        assert_eq!(wp.estimated_hours, 3.0);
        assert_eq!(wp.priority, 7);
    }

    #[test]
    fn definition_accepts_field_aliases() {
        let json = r#"{
            "id": "b",
            "title": "B",
            "estimated_duration": 1.5,
            "explicit_dependencies": ["a"]
        }"#;
        let def: WorkPackageDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(def.estimated_hours, Some(1.5));
        assert_eq!(def.dependencies, vec!["a".to_string()]);
        assert_eq!(def.priority, None);
    }

    #[test]
    fn status_outcomes() {
        assert!(WorkPackageStatus::Failed.is_unsuccessful());
        assert!(!WorkPackageStatus::Completed.is_unsuccessful());
        assert_eq!(WorkPackageStatus::Completed.to_string(), "completed");
    }
}
