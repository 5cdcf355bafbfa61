//! Session runner - drives one robot session from bringup to shutdown

use crate::runtime::launcher::{LaunchError, LaunchReport, LaunchRequest, Launcher};
use crate::runtime::mode::{LaunchMode, ProcessKind};
use crate::runtime::process::ProcessStatus;
use std::collections::HashMap;
use tokio::sync::watch;

/// Where session reports go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    /// Through the logger
    #[default]
    Log,
    /// One JSON object per line on stdout
    Json,
}

impl ReportFormat {
    pub fn emit(&self, report: &LaunchReport) {
        match self {
            ReportFormat::Log => {
                let pid = report
                    .pid
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "-".to_string());
                let state = report
                    .state
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "-".to_string());
                log::info!("launcher: {}, pid: {}, state: {}", report.launcher, pid, state);
                if let Some(message) = &report.message {
                    log::warn!("{}", message);
                }
            }
            ReportFormat::Json => match serde_json::to_string(report) {
                Ok(line) => println!("{}", line),
                Err(e) => log::error!("Failed to serialize report: {}", e),
            },
        }
    }
}

/// What a session runs
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Subsystem started on top of bringup
    pub target: Option<LaunchRequest>,
    /// Save the map under this name before a mapping session shuts down
    pub save_map_as: Option<String>,
    pub format: ReportFormat,
}

/// Run a session: start bringup, then the target (mapping or navigation) if
/// given, supervise until shutdown is signalled or bringup dies, then stop
/// everything innermost-first.
pub async fn run_session(
    launcher: &Launcher,
    options: SessionOptions,
    mut shutdown_rx: watch::Receiver<()>,
) -> Result<(), LaunchError> {
    let format = options.format;
    format.emit(&launcher.start_bringup().await?);

    if let Some(request) = options.target {
        if shutdown_rx.has_changed().unwrap_or(false) {
            log::info!("Shutdown requested, aborting launch");
        } else {
            match launcher.start(request).await {
                Ok(report) => format.emit(&report),
                Err(e) => {
                    log_failure("Launch failed", &e);
                    format.emit(&launcher.stop_all().await);
                    return Err(e);
                }
            }
        }
    }

    supervise(launcher, &mut shutdown_rx, format).await;

    let saved = match &options.save_map_as {
        Some(name) if launcher.mode() == LaunchMode::Mapping => {
            log::info!("Saving map '{}' before shutdown", name);
            launcher.save_map(name).await.map(|report| format.emit(&report))
        }
        Some(name) => {
            log::warn!("Mapping is not running, map '{}' not saved", name);
            Ok(())
        }
        None => Ok(()),
    };
    if let Err(e) = &saved {
        log_failure("Saving map failed", e);
    }

    log::info!("Shutting down session...");
    format.emit(&launcher.stop_all().await);
    log::info!("Session shut down");

    saved
}

fn log_failure(context: &str, e: &LaunchError) {
    log::error!("{}: {}", context, e);
    if let Some(hint) = e.hint() {
        log::error!("  {}", hint);
    }
}

/// Poll every kind periodically until shutdown or until the launcher falls
/// back to `Off`
async fn supervise(
    launcher: &Launcher,
    shutdown_rx: &mut watch::Receiver<()>,
    format: ReportFormat,
) {
    let mut last: HashMap<ProcessKind, ProcessStatus> = HashMap::new();
    let interval = launcher.config().poll_interval();

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                log::info!("Shutdown signal received");
                break;
            }

            _ = tokio::time::sleep(interval) => {
                for kind in ProcessKind::ALL {
                    let report = launcher.report(kind).await;
                    let status = report.state.unwrap_or(ProcessStatus::None);
                    if last.insert(kind, status) != Some(status) && status.has_exited() {
                        log::warn!("[{}] Process is gone ({})", kind, status);
                        format.emit(&report);
                    }
                }

                if launcher.mode() == LaunchMode::Off {
                    log::warn!("Bringup is no longer running, ending session");
                    break;
                }
            }
        }
    }
}
