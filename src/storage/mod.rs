//! # Storage Layer
//!
//! File inputs for wpsched. Plans and reports are never persisted.
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Definitions | JSON, YAML or TOML | any path given on the command line |
//! | Config | TOML | `wpsched.toml` (project), `<config dir>/wpsched/config.toml` (global) |
//!
//! ## Key Types
//!
//! - [`Config`] - Planner, execution and logging configuration
//! - [`load_definitions`] - Reads work package definitions from a file

mod config;
mod definitions;

pub use config::{
    Config, ConfigError, ExecutionConfig, LogFormat, LoggingConfig, OutputFormat, PlannerConfig,
    PROJECT_CONFIG_FILE,
};
pub use definitions::{load_definitions, parse_definitions, DefinitionError, DefinitionFormat};
