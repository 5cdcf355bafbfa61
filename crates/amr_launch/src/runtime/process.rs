//! Supervised child process abstraction

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::{Child, Command};

/// Process status as seen by a non-blocking poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessStatus {
    /// Process is running
    Running,
    /// Process exited with code 0
    Stopped,
    /// Process exited with a non-zero code or was killed by a signal
    Error,
    /// No process in this slot
    None,
}

impl ProcessStatus {
    /// Check if process has exited
    pub fn has_exited(&self) -> bool {
        matches!(self, ProcessStatus::Stopped | ProcessStatus::Error)
    }

    fn from_exit(status: ExitStatus) -> Self {
        if status.success() {
            ProcessStatus::Stopped
        } else {
            ProcessStatus::Error
        }
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProcessStatus::Running => "running",
            ProcessStatus::Stopped => "stopped",
            ProcessStatus::Error => "error",
            ProcessStatus::None => "none",
        };
        f.write_str(s)
    }
}

/// Fully resolved command line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchCommand {
    pub executable: String,
    pub args: Vec<String>,
}

impl fmt::Display for LaunchCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.executable)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Files receiving a process's stdout and stderr
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSinks {
    pub stdout: PathBuf,
    pub stderr: PathBuf,
}

impl LogSinks {
    /// `<dir>/<name>_output.log` and `<dir>/<name>_error.log`
    pub fn in_dir(dir: &Path, name: &str) -> Self {
        Self {
            stdout: dir.join(format!("{}_output.log", name)),
            stderr: dir.join(format!("{}_error.log", name)),
        }
    }

    /// Create (or truncate) both files
    fn open(&self) -> Result<(File, File), ProcessError> {
        let create = |path: &Path| -> Result<File, ProcessError> {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| ProcessError::LogSink {
                    path: parent.display().to_string(),
                    source: e,
                })?;
            }
            File::create(path).map_err(|e| ProcessError::LogSink {
                path: path.display().to_string(),
                source: e,
            })
        };
        Ok((create(&self.stdout)?, create(&self.stderr)?))
    }
}

/// How a stop request ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Process exited after the interrupt
    Exited(Option<i32>),
    /// Process ignored the interrupt and was killed
    Killed,
}

/// Exclusive owner of one spawned child process.
///
/// Only [`ProcessHandle::stop`] ever waits on the child; [`ProcessHandle::poll`]
/// never blocks.
pub struct ProcessHandle {
    name: String,
    pid: u32,
    child: Child,
    sinks: LogSinks,
}

impl ProcessHandle {
    /// Spawn `command` with its output redirected to `sinks`
    pub fn spawn(name: &str, command: &LaunchCommand, sinks: LogSinks) -> Result<Self, ProcessError> {
        let (stdout, stderr) = sinks.open()?;

        log::info!("[{}] Starting: {}", name, command);

        let child = Command::new(&command.executable)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                log::error!("[{}] Failed to spawn process: {}", name, e);
                ProcessError::SpawnFailed {
                    name: name.to_string(),
                    source: e,
                }
            })?;

        // id() is only None once the child has been reaped
        let pid = child.id().unwrap_or_default();
        log::info!("[{}] Process started with PID: {}", name, pid);

        Ok(Self {
            name: name.to_string(),
            pid,
            child,
            sinks,
        })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn sinks(&self) -> &LogSinks {
        &self.sinks
    }

    /// Check whether the process has exited, without blocking.
    ///
    /// An `Err` means the status could not be queried; the process may still
    /// be alive.
    pub fn poll(&mut self) -> Result<ProcessStatus, ProcessError> {
        match self.child.try_wait() {
            Ok(None) => Ok(ProcessStatus::Running),
            Ok(Some(status)) => {
                log::info!(
                    "[{}] Process exited with code: {:?}",
                    self.name,
                    status.code()
                );
                Ok(ProcessStatus::from_exit(status))
            }
            Err(e) => {
                log::error!("[{}] Error checking process status: {}", self.name, e);
                Err(ProcessError::Wait {
                    name: self.name.clone(),
                    source: e,
                })
            }
        }
    }

    /// Wait for the process to exit on its own
    pub async fn wait(&mut self) -> Result<ProcessStatus, ProcessError> {
        let status = self.child.wait().await.map_err(|e| ProcessError::Wait {
            name: self.name.clone(),
            source: e,
        })?;
        log::info!(
            "[{}] Process exited with code: {:?}",
            self.name,
            status.code()
        );
        Ok(ProcessStatus::from_exit(status))
    }

    /// Stop the process gracefully (SIGINT, then SIGKILL after `timeout`).
    ///
    /// With `timeout == None` this waits for as long as the process takes.
    pub async fn stop(&mut self, timeout: Option<Duration>) -> Result<StopOutcome, ProcessError> {
        log::info!("[{}] Stopping process...", self.name);
        self.interrupt();

        let exit_result = match timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.child.wait()).await.ok(),
            None => Some(self.child.wait().await),
        };

        match exit_result {
            Some(Ok(status)) => {
                log::info!(
                    "[{}] Process exited with code: {:?}",
                    self.name,
                    status.code()
                );
                Ok(StopOutcome::Exited(status.code()))
            }
            Some(Err(e)) => {
                log::error!("[{}] Error waiting for process: {}", self.name, e);
                Err(ProcessError::Wait {
                    name: self.name.clone(),
                    source: e,
                })
            }
            None => {
                log::warn!(
                    "[{}] Process did not exit gracefully, forcing kill",
                    self.name
                );
                // kill() sends SIGKILL and reaps the child
                self.child.kill().await.map_err(|e| ProcessError::Wait {
                    name: self.name.clone(),
                    source: e,
                })?;
                Ok(StopOutcome::Killed)
            }
        }
    }

    /// Send the graceful termination signal
    fn interrupt(&mut self) {
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            if let Err(e) = kill(Pid::from_raw(self.pid as i32), Signal::SIGINT) {
                log::debug!("[{}] SIGINT not delivered: {}", self.name, e);
            }
        }

        #[cfg(not(unix))]
        {
            // No interrupt signal on non-Unix, the stop becomes a kill
            let _ = self.child.start_kill();
        }
    }
}

/// Errors that can occur with supervised processes
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("Failed to spawn process '{name}': {source}")]
    SpawnFailed {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to open log sink '{path}': {source}")]
    LogSink {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed waiting for process '{name}': {source}")]
    Wait {
        name: String,
        #[source]
        source: std::io::Error,
    },
}
