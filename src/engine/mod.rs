//! # Execution Engines
//!
//! An [`ExecutionEngine`] performs the actual work behind a work package. The
//! planner only decides *when* each package runs; the engine decides *what*
//! running it means.
//!
//! | Engine | Behavior |
//! |--------|----------|
//! | [`SimulatedEngine`] | Sleeps briefly and reports success (dry runs, tests) |
//! | [`CommandEngine`] | Runs a shell command per package, success on exit 0 |
//!
//! Closures of type `Fn(&WorkPackage) -> Result<bool, EngineError>` are
//! engines too, which keeps test doubles short.

mod command;

use std::time::Duration;

use thiserror::Error;

use crate::domain::WorkPackage;

pub use command::CommandEngine;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Failed to start command for {id}: {source}")]
    Spawn {
        id: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command for {id} exited with {status}")]
    CommandFailed { id: String, status: String },

    #[error("Work package {id} timed out after {seconds:.1}s")]
    Timeout { id: String, seconds: f64 },

    #[error("{0}")]
    Failed(String),
}

/// Performs the work represented by a work package
pub trait ExecutionEngine: Send + Sync {
    /// Runs one work package
    ///
    /// `Ok(true)` means the package completed, `Ok(false)` that the engine
    /// judged it failed without a more specific error.
    fn execute(&self, work_package: &WorkPackage) -> Result<bool, EngineError>;
}

impl<F> ExecutionEngine for F
where
    F: Fn(&WorkPackage) -> Result<bool, EngineError> + Send + Sync,
{
    fn execute(&self, work_package: &WorkPackage) -> Result<bool, EngineError> {
        self(work_package)
    }
}

/// Engine used when no real engine is wired: pauses, then reports success
#[derive(Debug, Clone)]
pub struct SimulatedEngine {
    delay: Duration,
}

impl SimulatedEngine {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for SimulatedEngine {
    fn default() -> Self {
        Self::new(Duration::from_millis(100))
    }
}

impl ExecutionEngine for SimulatedEngine {
    fn execute(&self, work_package: &WorkPackage) -> Result<bool, EngineError> {
        tracing::debug!(id = %work_package.id, delay_ms = self.delay.as_millis() as u64, "Simulating work package");
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn simulated_engine_succeeds_after_delay() {
        let engine = SimulatedEngine::new(Duration::from_millis(20));
        let start = Instant::now();

        let result = engine.execute(&WorkPackage::new("a", "A")).unwrap();

        assert!(result);
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn closures_are_engines() {
        let engine = |wp: &WorkPackage| -> Result<bool, EngineError> {
            if wp.id == "bad" {
                Err(EngineError::Failed("boom".to_string()))
            } else {
                Ok(true)
            }
        };

        assert!(engine.execute(&WorkPackage::new("good", "Good")).unwrap());
        let err = engine.execute(&WorkPackage::new("bad", "Bad")).unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }
}
