//! Shell command engine
//!
//! Runs the command attached to each work package through a shell. Child
//! output goes to our stderr so stdout stays free for reports.
//!
//! With a timeout set, each command gets its own process group on Unix, and
//! a timeout kills the whole group so nothing the command started outlives it.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use super::{EngineError, ExecutionEngine};
use crate::domain::{WorkPackage, WorkPackageDefinition};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Engine that runs one shell command per work package
#[derive(Debug, Clone)]
pub struct CommandEngine {
    commands: HashMap<String, String>,
    shell: String,
    timeout: Option<Duration>,
    working_dir: Option<PathBuf>,
}

impl CommandEngine {
    /// Creates an engine with no commands, using `shell -c` to run them
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            commands: HashMap::new(),
            shell: shell.into(),
            timeout: None,
            working_dir: None,
        }
    }

    /// Collects the `command` of every definition that has one
    pub fn from_definitions(shell: impl Into<String>, definitions: &[WorkPackageDefinition]) -> Self {
        let mut engine = Self::new(shell);
        for def in definitions {
            if let Some(cmd) = &def.command {
                engine.commands.insert(def.id.clone(), cmd.clone());
            }
        }
        engine
    }

    pub fn with_command(mut self, id: impl Into<String>, command: impl Into<String>) -> Self {
        self.commands.insert(id.into(), command.into());
        self
    }

    /// Kills commands that run longer than `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Number of packages with a command attached
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    fn wait(&self, id: &str, mut child: Child) -> Result<bool, EngineError> {
        let spawn_err = |source| EngineError::Spawn {
            id: id.to_string(),
            source,
        };

        let status = match self.timeout {
            None => child.wait().map_err(spawn_err)?,
            Some(timeout) => {
                let deadline = Instant::now() + timeout;
                loop {
                    if let Some(status) = child.try_wait().map_err(spawn_err)? {
                        break status;
                    }
                    if Instant::now() >= deadline {
                        kill_process_tree(id, &mut child);
                        return Err(EngineError::Timeout {
                            id: id.to_string(),
                            seconds: timeout.as_secs_f64(),
                        });
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }
            }
        };

        if status.success() {
            Ok(true)
        } else {
            Err(EngineError::CommandFailed {
                id: id.to_string(),
                status: status.to_string(),
            })
        }
    }
}

/// Kills a timed-out child together with everything it started, then reaps it
fn kill_process_tree(id: &str, child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        // The child leads its own group, so its pid is the group id
        if let Ok(pgid) = i32::try_from(child.id()) {
            if let Err(e) = killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
                tracing::debug!(%id, error = %e, "Failed to signal process group");
            }
        }
    }

    // Already-exited races are fine to ignore here
    let _ = child.kill();
    let _ = child.wait();
}

impl ExecutionEngine for CommandEngine {
    fn execute(&self, work_package: &WorkPackage) -> Result<bool, EngineError> {
        let Some(cmd) = self.commands.get(&work_package.id) else {
            tracing::debug!(id = %work_package.id, "No command attached, nothing to run");
            return Ok(true);
        };

        tracing::info!(id = %work_package.id, command = %cmd, "Running command");

        let mut command = Command::new(&self.shell);
        command
            .arg("-c")
            .arg(cmd)
            .stdin(Stdio::null())
            .stdout(Stdio::from(std::io::stderr()))
            .stderr(Stdio::inherit());
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        #[cfg(unix)]
        if self.timeout.is_some() {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let child = command.spawn().map_err(|source| EngineError::Spawn {
            id: work_package.id.clone(),
            source,
        })?;

        self.wait(&work_package.id, child)
    }
}
