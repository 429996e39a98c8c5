//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting.
//!
//! ## Commands
//!
//! | Command | Purpose |
//! |---------|---------|
//! | `plan <file>` | Build and show an execution plan |
//! | `validate <file>` | Report missing, orphaned and circular dependencies |
//! | `estimate <file>` | Compare sequential and parallel duration estimates |
//! | `tree <file> <id>` | Show everything one work package requires |
//! | `run <file>` | Execute a plan group by group |
//!
//! ## Output Formats
//!
//! All commands support `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! The default can also be set with `default_format` in `wpsched.toml`.
//!
//! ## Verbose Mode
//!
//! Use `--verbose` (or `-v`) to log at debug level on stderr:
//! ```bash
//! wpsched --verbose plan work.yaml
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod output;
mod plan;
mod run;

pub use app::{run, Cli, Commands};
pub use output::{Output, OutputFormat};
pub use plan::PlanArgs;
pub use run::RunArgs;
