//! Work package definition files
//!
//! Definitions can be written as JSON, YAML or TOML; the format is picked
//! from the file extension. JSON and YAML accept either a bare list or an
//! object with a `work_packages` key. TOML needs the keyed form:
//!
//! ```toml
//! [[work_packages]]
//! id = "schema"
//! title = "Update schema"
//! estimated_hours = 1.5
//!
//! [[work_packages]]
//! id = "migrate"
//! title = "Migrate rows"
//! dependencies = ["schema"]
//! ```

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;

use crate::domain::WorkPackageDefinition;

#[derive(Debug, Error, PartialEq)]
pub enum DefinitionError {
    #[error("Unsupported definition file: {0} (expected .json, .yaml, .yml or .toml)")]
    UnsupportedFormat(String),

    #[error("Failed to parse definitions: {0}")]
    Parse(String),

    #[error("Work package #{0} has an empty id")]
    EmptyId(usize),
}

/// Serialization format of a definition file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionFormat {
    Json,
    Yaml,
    Toml,
}

impl DefinitionFormat {
    /// Picks the format from a file extension
    pub fn from_path(path: &Path) -> Result<Self, DefinitionError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("json") => Ok(DefinitionFormat::Json),
            Some("yaml") | Some("yml") => Ok(DefinitionFormat::Yaml),
            Some("toml") => Ok(DefinitionFormat::Toml),
            _ => Err(DefinitionError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DefinitionFile {
    List(Vec<WorkPackageDefinition>),
    Keyed {
        work_packages: Vec<WorkPackageDefinition>,
    },
}

impl DefinitionFile {
    fn into_definitions(self) -> Vec<WorkPackageDefinition> {
        match self {
            DefinitionFile::List(defs) => defs,
            DefinitionFile::Keyed { work_packages } => work_packages,
        }
    }
}

/// Parses definitions from text in the given format
pub fn parse_definitions(
    content: &str,
    format: DefinitionFormat,
) -> Result<Vec<WorkPackageDefinition>, DefinitionError> {
    let file: DefinitionFile = match format {
        DefinitionFormat::Json => {
            serde_json::from_str(content).map_err(|e| DefinitionError::Parse(e.to_string()))?
        }
        DefinitionFormat::Yaml => {
            serde_yaml::from_str(content).map_err(|e| DefinitionError::Parse(e.to_string()))?
        }
        DefinitionFormat::Toml => {
            toml::from_str(content).map_err(|e| DefinitionError::Parse(e.to_string()))?
        }
    };

    let definitions = file.into_definitions();
    if let Some(pos) = definitions.iter().position(|d| d.id.trim().is_empty()) {
        return Err(DefinitionError::EmptyId(pos + 1));
    }

    Ok(definitions)
}

/// Reads definitions from a file
pub fn load_definitions(path: &Path) -> Result<Vec<WorkPackageDefinition>> {
    let format = DefinitionFormat::from_path(path)?;

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read definitions: {}", path.display()))?;

    let definitions = parse_definitions(&content, format)
        .with_context(|| format!("Invalid definitions in {}", path.display()))?;

    tracing::debug!(path = %path.display(), count = definitions.len(), "Loaded definitions");
    Ok(definitions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn format_from_extension() {
        assert_eq!(
            DefinitionFormat::from_path(Path::new("plan.JSON")),
            Ok(DefinitionFormat::Json)
        );
        assert_eq!(
            DefinitionFormat::from_path(Path::new("plan.yml")),
            Ok(DefinitionFormat::Yaml)
        );
        assert_eq!(
            DefinitionFormat::from_path(Path::new("plan.toml")),
            Ok(DefinitionFormat::Toml)
        );
        assert!(matches!(
            DefinitionFormat::from_path(Path::new("plan.txt")),
            Err(DefinitionError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn parse_json_list() {
        let json = r#"[
            {"id": "a", "title": "A", "estimated_hours": 1.0},
            {"id": "b", "title": "B", "dependencies": ["a"], "priority": 3}
        ]"#;

        let defs = parse_definitions(json, DefinitionFormat::Json).unwrap();
        assert_eq!(defs.len(), 2);
        assert_eq!(defs[1].dependencies, vec!["a"]);
        assert_eq!(defs[1].priority, Some(3));
    }

    #[test]
    fn parse_yaml_keyed() {
        let yaml = r#"
work_packages:
  - id: schema
    title: Update schema
  - id: migrate
    title: Migrate rows
    depends_on: [schema]
    command: "true"
"#;

        let defs = parse_definitions(yaml, DefinitionFormat::Yaml).unwrap();
        assert_eq!(defs.len(), 2);
        assert_eq!(defs[1].dependencies, vec!["schema"]);
        assert_eq!(defs[1].command.as_deref(), Some("true"));
    }

    #[test]
    fn parse_toml_keyed() {
        let toml = r#"
[[work_packages]]
id = "a"
title = "A"
estimated_hours = 2.5

[[work_packages]]
id = "b"
title = "B"
dependencies = ["a"]
"#;

        let defs = parse_definitions(toml, DefinitionFormat::Toml).unwrap();
        assert_eq!(defs.len(), 2);
        assert_eq!(defs[0].estimated_hours, Some(2.5));
    }

    #[test]
    fn empty_id_rejected() {
        let json = r#"[{"id": "a", "title": "A"}, {"id": " ", "title": "Blank"}]"#;
        assert_eq!(
            parse_definitions(json, DefinitionFormat::Json),
            Err(DefinitionError::EmptyId(2))
        );
    }

    #[test]
    fn malformed_input_rejected() {
        let result = parse_definitions("{ not json", DefinitionFormat::Json);
        assert!(matches!(result, Err(DefinitionError::Parse(_))));
    }

    #[test]
    fn load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plan.json");
        fs::write(&path, r#"[{"id": "a", "title": "A"}]"#).unwrap();

        let defs = load_definitions(&path).unwrap();
        assert_eq!(defs.len(), 1);

        let missing = load_definitions(&dir.path().join("missing.json"));
        assert!(missing.is_err());
    }
}
