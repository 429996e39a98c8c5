//! Heuristic dependency detection
//!
//! Infers implicit edges by matching keywords in work package titles and
//! descriptions. Matching is plain case-insensitive substring search, so the
//! rules sit behind [`DependencyRule`] and can be swapped without touching
//! the graph.

use std::collections::{BTreeMap, BTreeSet};

use super::work_package::WorkPackage;

/// A single detection heuristic
pub trait DependencyRule: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Returns true if `candidate` should depend on `other`
    fn matches(&self, candidate: &WorkPackage, other: &WorkPackage) -> bool;
}

fn mentions_any(text: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| text.contains(needle))
}

/// Implementations depend on the interfaces they implement
#[derive(Debug, Clone, Copy, Default)]
pub struct ImplementationRule;

impl DependencyRule for ImplementationRule {
    fn name(&self) -> &str {
        "implementation-after-interface"
    }

    fn matches(&self, candidate: &WorkPackage, other: &WorkPackage) -> bool {
        // "implement" also covers "implementation"
        mentions_any(&candidate.text_lower(), &["implement"])
            && mentions_any(&other.text_lower(), &["interface"])
    }
}

/// Blueprints depend on the module configuration they are built from
#[derive(Debug, Clone, Copy, Default)]
pub struct BlueprintRule;

impl DependencyRule for BlueprintRule {
    fn name(&self) -> &str {
        "blueprint-after-module-config"
    }

    fn matches(&self, candidate: &WorkPackage, other: &WorkPackage) -> bool {
        mentions_any(&candidate.text_lower(), &["blueprint"])
            && other.description.to_lowercase().contains("module.json")
    }
}

/// Coverage and validation work depends on test authoring work
#[derive(Debug, Clone, Copy, Default)]
pub struct TestCoverageRule;

impl DependencyRule for TestCoverageRule {
    fn name(&self) -> &str {
        "coverage-after-tests"
    }

    fn matches(&self, candidate: &WorkPackage, other: &WorkPackage) -> bool {
        if !mentions_any(&candidate.text_lower(), &["coverage", "test validation"]) {
            return false;
        }
        let title = other.title_lower();
        title.contains("test") && !title.contains("coverage") && !title.contains("validation")
    }
}

/// Migrations depend on schema work
#[derive(Debug, Clone, Copy, Default)]
pub struct MigrationRule;

impl DependencyRule for MigrationRule {
    fn name(&self) -> &str {
        "migration-after-schema"
    }

    fn matches(&self, candidate: &WorkPackage, other: &WorkPackage) -> bool {
        mentions_any(&candidate.text_lower(), &["migration", "migrate"])
            && mentions_any(&other.text_lower(), &["schema"])
    }
}

/// Import and reference fixes depend on moves and renames
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceUpdateRule;

impl DependencyRule for ReferenceUpdateRule {
    fn name(&self) -> &str {
        "references-after-moves"
    }

    fn matches(&self, candidate: &WorkPackage, other: &WorkPackage) -> bool {
        mentions_any(&candidate.text_lower(), &["import", "reference"])
            && mentions_any(&other.text_lower(), &["move", "rename"])
    }
}

/// Ordered collection of [`DependencyRule`]s
pub struct DependencyDetector {
    rules: Vec<Box<dyn DependencyRule>>,
}

impl Default for DependencyDetector {
    fn default() -> Self {
        Self::empty()
            .with_rule(ImplementationRule)
            .with_rule(BlueprintRule)
            .with_rule(TestCoverageRule)
            .with_rule(MigrationRule)
            .with_rule(ReferenceUpdateRule)
    }
}

impl std::fmt::Debug for DependencyDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyDetector")
            .field("rules", &self.rule_names())
            .finish()
    }
}

impl DependencyDetector {
    /// Creates a detector with the built-in rule set
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a detector with no rules
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Appends a rule
    pub fn with_rule(mut self, rule: impl DependencyRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Detects implicit dependencies between the given packages
    ///
    /// Returns `id -> ids it should depend on`. Only packages with at least one
    /// detected dependency appear. Does not touch any graph.
    pub fn detect<'a>(
        &self,
        work_packages: impl IntoIterator<Item = &'a WorkPackage>,
    ) -> BTreeMap<String, BTreeSet<String>> {
        let work_packages: Vec<_> = work_packages.into_iter().collect();
        let mut detected: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for candidate in &work_packages {
            for other in &work_packages {
                if candidate.id == other.id {
                    continue;
                }
                if let Some(rule) = self.rules.iter().find(|r| r.matches(candidate, other)) {
                    tracing::debug!(
                        rule = rule.name(),
                        from = %candidate.id,
                        to = %other.id,
                        "Detected implicit dependency"
                    );
                    detected
                        .entry(candidate.id.clone())
                        .or_default()
                        .insert(other.id.clone());
                }
            }
        }

        detected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wp(id: &str, title: &str, description: &str) -> WorkPackage {
        WorkPackage::new(id, title).with_description(description)
    }

    fn deps_of(detected: &BTreeMap<String, BTreeSet<String>>, id: &str) -> Vec<String> {
        detected
            .get(id)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default()
    }

    #[test]
    fn implementation_depends_on_interface() {
        let packages = [
            wp("iface", "Define storage interface", ""),
            wp("impl", "Storage implementation", "Backed by files"),
        ];

        let detected = DependencyDetector::new().detect(&packages);
        assert_eq!(deps_of(&detected, "impl"), vec!["iface"]);
        assert!(deps_of(&detected, "iface").is_empty());
    }

    #[test]
    fn matching_is_case_insensitive() {
        let packages = [
            wp("iface", "INTERFACE", ""),
            wp("impl", "Implement It", ""),
        ];

        let detected = DependencyDetector::new().detect(&packages);
        assert_eq!(deps_of(&detected, "impl"), vec!["iface"]);
    }

    #[test]
    fn blueprint_depends_on_module_config() {
        let packages = [
            wp("cfg", "Module setup", "Write module.json for the plugin"),
            wp("bp", "Generate blueprint", ""),
            wp("title-only", "module.json", "no config text here"),
        ];

        let detected = DependencyDetector::new().detect(&packages);
        assert_eq!(deps_of(&detected, "bp"), vec!["cfg"]);
    }

    #[test]
    fn coverage_depends_on_test_authoring() {
        let packages = [
            wp("tests", "Write unit tests", ""),
            wp("cov", "Raise coverage", ""),
            wp("val", "Test validation", "Validate suites"),
        ];

        let detected = DependencyDetector::new().detect(&packages);
        assert_eq!(deps_of(&detected, "cov"), vec!["tests"]);
        assert_eq!(deps_of(&detected, "val"), vec!["tests"]);
        assert!(deps_of(&detected, "tests").is_empty());
    }

    #[test]
    fn migration_depends_on_schema() {
        let packages = [
            wp("schema", "Update schema", ""),
            wp("mig", "Migrate user rows", ""),
        ];

        let detected = DependencyDetector::new().detect(&packages);
        assert_eq!(deps_of(&detected, "mig"), vec!["schema"]);
    }

    #[test]
    fn imports_depend_on_moves() {
        let packages = [
            wp("mv", "Move utils to core", ""),
            wp("rn", "Rename helpers", ""),
            wp("imp", "Fix imports", ""),
        ];

        let detected = DependencyDetector::new().detect(&packages);
        assert_eq!(deps_of(&detected, "imp"), vec!["mv", "rn"]);
    }

    #[test]
    fn self_matches_are_excluded() {
        let packages = [wp("both", "Implement interface", "")];

        let detected = DependencyDetector::new().detect(&packages);
        assert!(detected.is_empty());
    }

    #[test]
    fn empty_detector_finds_nothing() {
        let packages = [
            wp("iface", "Define interface", ""),
            wp("impl", "Implementation", ""),
        ];

        assert!(DependencyDetector::empty().detect(&packages).is_empty());
    }

    struct SameTitleRule;

    impl DependencyRule for SameTitleRule {
        fn name(&self) -> &str {
            "same-title"
        }

        fn matches(&self, candidate: &WorkPackage, other: &WorkPackage) -> bool {
            candidate.title == other.title && candidate.id > other.id
        }
    }

    #[test]
    fn custom_rules_are_applied() {
        let detector = DependencyDetector::empty().with_rule(SameTitleRule);
        assert_eq!(detector.rule_names(), vec!["same-title"]);

        let packages = [wp("a", "Same", ""), wp("b", "Same", "")];
        let detected = detector.detect(&packages);
        assert_eq!(deps_of(&detected, "b"), vec!["a"]);
    }
}
