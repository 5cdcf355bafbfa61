//! Mode supervisor - gates, spawns and reaps the bringup, mapping and
//! navigation launch processes
//!
//! All state lives behind one async mutex: a start commits the handle and the
//! new mode before the lock is released, so a concurrent status query never
//! observes a handle paired with a stale mode. The mode is mirrored into a
//! watch channel updated under the same lock, which keeps [`Launcher::mode`]
//! readable while a blocking stop holds the lock.
//!
//! Status polls are not pure accessors: a poll that finds its process dead
//! reaps the handle and moves the mode back to the kind's fallback mode.

use crate::catalog::{slam_catalog_for, CatalogError, FsMapCatalog, MapCatalog, SlamCatalog};
use crate::config::AppConfig;
use crate::runtime::mode::{LaunchMode, ProcessKind};
use crate::runtime::process::{
    LaunchCommand, LogSinks, ProcessError, ProcessHandle, ProcessStatus, StopOutcome,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, watch, Mutex};

/// A request to start one of the supervised kinds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchRequest {
    Bringup,
    Mapping {
        slam_method: String,
    },
    Navigation {
        map_name: String,
        planner_type: String,
        with_virtual_walls: bool,
    },
}

impl LaunchRequest {
    pub fn kind(&self) -> ProcessKind {
        match self {
            LaunchRequest::Bringup => ProcessKind::Bringup,
            LaunchRequest::Mapping { .. } => ProcessKind::Mapping,
            LaunchRequest::Navigation { .. } => ProcessKind::Navigation,
        }
    }
}

/// Resolved command for a request, without spawning anything
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub kind: ProcessKind,
    pub command: LaunchCommand,
    /// Non-fatal notice to pass back to the caller
    pub advisory: Option<String>,
}

/// Outcome of a launcher operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchReport {
    /// Mode after the operation
    pub launcher: LaunchMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<ProcessStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl LaunchReport {
    fn mode(launcher: LaunchMode) -> Self {
        Self {
            launcher,
            pid: None,
            state: None,
            message: None,
        }
    }
}

/// Lifecycle notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchEvent {
    /// Process spawned
    Started { kind: ProcessKind, pid: u32 },
    /// Process exited after an interrupt
    Exited { kind: ProcessKind, code: Option<i32> },
    /// Process ignored the interrupt and was killed
    Killed { kind: ProcessKind },
    /// A poll found the process dead and released its handle
    Reaped {
        kind: ProcessKind,
        status: ProcessStatus,
    },
}

#[derive(Default)]
struct Slots {
    bringup: Option<ProcessHandle>,
    mapping: Option<ProcessHandle>,
    navigation: Option<ProcessHandle>,
}

impl Slots {
    fn get(&self, kind: ProcessKind) -> Option<&ProcessHandle> {
        match kind {
            ProcessKind::Bringup => self.bringup.as_ref(),
            ProcessKind::Mapping => self.mapping.as_ref(),
            ProcessKind::Navigation => self.navigation.as_ref(),
        }
    }

    fn get_mut(&mut self, kind: ProcessKind) -> &mut Option<ProcessHandle> {
        match kind {
            ProcessKind::Bringup => &mut self.bringup,
            ProcessKind::Mapping => &mut self.mapping,
            ProcessKind::Navigation => &mut self.navigation,
        }
    }
}

#[derive(Default)]
struct LauncherState {
    mode: LaunchMode,
    slots: Slots,
}

/// Authoritative owner of the operating mode and the supervised processes
pub struct Launcher {
    config: AppConfig,
    maps: Arc<dyn MapCatalog>,
    slam: Arc<dyn SlamCatalog>,
    state: Mutex<LauncherState>,
    mode_tx: watch::Sender<LaunchMode>,
    event_tx: broadcast::Sender<LaunchEvent>,
}

impl Launcher {
    /// Create a launcher consulting the given catalogs
    pub fn new(config: AppConfig, maps: Arc<dyn MapCatalog>, slam: Arc<dyn SlamCatalog>) -> Self {
        let (mode_tx, _) = watch::channel(LaunchMode::Off);
        let (event_tx, _) = broadcast::channel(64);

        Self {
            config,
            maps,
            slam,
            state: Mutex::new(LauncherState::default()),
            mode_tx,
            event_tx,
        }
    }

    /// Create a launcher with the filesystem catalogs named by `config`
    pub fn from_config(config: AppConfig) -> Self {
        let maps = Arc::new(FsMapCatalog::new(config.maps_dir.clone()));
        let slam: Arc<dyn SlamCatalog> = Arc::from(slam_catalog_for(&config));
        Self::new(config, maps, slam)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn maps(&self) -> &dyn MapCatalog {
        self.maps.as_ref()
    }

    pub fn slam_methods(&self) -> &dyn SlamCatalog {
        self.slam.as_ref()
    }

    /// Current mode. Never waits on an in-flight operation.
    pub fn mode(&self) -> LaunchMode {
        *self.mode_tx.borrow()
    }

    /// Subscribe to mode changes
    pub fn watch_mode(&self) -> watch::Receiver<LaunchMode> {
        self.mode_tx.subscribe()
    }

    /// Subscribe to lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<LaunchEvent> {
        self.event_tx.subscribe()
    }

    /// Resolve the command a request would run.
    ///
    /// Validates SLAM methods and map names against the catalogs but does not
    /// look at the current mode.
    pub fn plan(&self, request: &LaunchRequest) -> Result<LaunchPlan, LaunchError> {
        let (launch_file, launch_args, advisory) = match request {
            LaunchRequest::Bringup => (self.config.bringup_launch.clone(), Vec::new(), None),
            LaunchRequest::Mapping { slam_method } => {
                let method = self.slam.find(slam_method)?.ok_or_else(|| {
                    let known = self
                        .slam
                        .methods()
                        .map(|m| m.into_iter().map(|m| m.name).collect())
                        .unwrap_or_default();
                    LaunchError::UnknownSlamMethod {
                        method: slam_method.clone(),
                        known,
                    }
                })?;
                (method.launch_file, Vec::new(), None)
            }
            LaunchRequest::Navigation {
                map_name,
                planner_type,
                with_virtual_walls,
            } => {
                let maps = self.maps.list_maps()?;
                let known: Vec<String> = maps.iter().map(|m| m.name.clone()).collect();
                let map = maps
                    .into_iter()
                    .find(|m| &m.name == map_name)
                    .ok_or_else(|| LaunchError::UnknownMap {
                        name: map_name.clone(),
                        known: known.clone(),
                    })?;

                let virtual_name = format!("{}_virtual", map_name);
                let virtual_walls = *with_virtual_walls && known.contains(&virtual_name);
                let advisory = (*with_virtual_walls && !virtual_walls)
                    .then(|| format!("virtual map '{}' doesn't exist", virtual_name));

                let mut args = vec![format!("map:={}", map.descriptor.display())];
                if self.config.forward_navigation_args {
                    args.push(format!("local_planner_type:={}", planner_type));
                    args.push(format!("with_virtual_walls:={}", virtual_walls));
                }
                (self.config.navigation_launch.clone(), args, advisory)
            }
        };

        Ok(LaunchPlan {
            kind: request.kind(),
            command: self.launch_command(&launch_file, launch_args),
            advisory,
        })
    }

    fn launch_command(&self, launch_file: &str, launch_args: Vec<String>) -> LaunchCommand {
        let mut prefix = self.config.launch_command.iter().cloned();
        let executable = prefix.next().unwrap_or_default();
        let mut args: Vec<String> = prefix.collect();
        args.push(self.config.amr_ros_pkg_name.clone());
        args.push(launch_file.to_string());
        args.extend(launch_args);
        LaunchCommand { executable, args }
    }

    /// Start the requested kind if the current mode allows it.
    ///
    /// On rejection the mode is left unchanged.
    pub async fn start(&self, request: LaunchRequest) -> Result<LaunchReport, LaunchError> {
        let kind = request.kind();
        let mut state = self.state.lock().await;

        if state.mode != kind.required_mode() {
            log::warn!("[{}] Refusing to start in {} mode", kind, state.mode);
            return Err(LaunchError::InvalidMode {
                requested: kind,
                mode: state.mode,
            });
        }

        let plan = self.plan(&request)?;
        if let Some(advisory) = &plan.advisory {
            log::warn!("[{}] {}", kind, advisory);
        }

        let sinks = LogSinks::in_dir(&self.config.log_dir, kind.name());
        let handle = ProcessHandle::spawn(kind.name(), &plan.command, sinks)?;
        let pid = handle.pid();
        log::debug!("[{}] Output: {}", kind, handle.sinks().stdout.display());

        *state.slots.get_mut(kind) = Some(handle);
        self.set_mode(&mut state, kind.active_mode());
        self.emit(LaunchEvent::Started { kind, pid });

        let status = self.poll_locked(&mut state, kind).await;

        Ok(LaunchReport {
            launcher: state.mode,
            pid: Some(pid),
            state: Some(status),
            message: plan.advisory,
        })
    }

    /// Start bringup (legal only in `Off` mode)
    pub async fn start_bringup(&self) -> Result<LaunchReport, LaunchError> {
        self.start(LaunchRequest::Bringup).await
    }

    /// Start mapping with a SLAM method (legal only in `Bringup` mode)
    pub async fn start_mapping(&self, slam_method: &str) -> Result<LaunchReport, LaunchError> {
        self.start(LaunchRequest::Mapping {
            slam_method: slam_method.to_string(),
        })
        .await
    }

    /// Start navigation on a known map (legal only in `Bringup` mode)
    pub async fn start_navigation(
        &self,
        map_name: &str,
        planner_type: &str,
        with_virtual_walls: bool,
    ) -> Result<LaunchReport, LaunchError> {
        self.start(LaunchRequest::Navigation {
            map_name: map_name.to_string(),
            planner_type: planner_type.to_string(),
            with_virtual_walls,
        })
        .await
    }

    /// Stop bringup, stopping any mapping or navigation on top of it first
    pub async fn stop_bringup(&self) -> LaunchReport {
        let mut state = self.state.lock().await;
        self.stop_locked(&mut state, ProcessKind::Bringup).await;
        LaunchReport::mode(state.mode)
    }

    /// Stop mapping, returning to `Bringup` mode. No-op when not mapping.
    pub async fn stop_mapping(&self) -> LaunchReport {
        let mut state = self.state.lock().await;
        self.stop_locked(&mut state, ProcessKind::Mapping).await;
        LaunchReport::mode(state.mode)
    }

    /// Stop navigation, returning to `Bringup` mode. No-op when not navigating.
    pub async fn stop_navigation(&self) -> LaunchReport {
        let mut state = self.state.lock().await;
        self.stop_locked(&mut state, ProcessKind::Navigation).await;
        LaunchReport::mode(state.mode)
    }

    /// Stop the whole session, innermost subsystem first, ending in `Off`
    pub async fn stop_all(&self) -> LaunchReport {
        let mut state = self.state.lock().await;
        if let Some(dependent) = state.mode.dependent() {
            self.stop_locked(&mut state, dependent).await;
        }
        self.stop_locked(&mut state, ProcessKind::Bringup).await;
        LaunchReport::mode(state.mode)
    }

    /// Save the map being built as `<maps_dir>/<name>` (legal only in `Mapping` mode).
    ///
    /// Runs the map saver to completion while holding the lock, so mapping
    /// cannot be stopped underneath it. The mode is left unchanged.
    pub async fn save_map(&self, name: &str) -> Result<LaunchReport, LaunchError> {
        let state = self.state.lock().await;

        if state.mode != LaunchMode::Mapping {
            log::warn!("[{}] Refusing to save a map in {} mode", MAP_SAVER, state.mode);
            return Err(LaunchError::NotMapping { mode: state.mode });
        }
        if !is_valid_map_name(name) {
            return Err(LaunchError::InvalidMapName(name.to_string()));
        }
        if self.maps.contains(name)? {
            return Err(LaunchError::MapExists {
                name: name.to_string(),
            });
        }

        let target = self.config.maps_dir.join(name);
        let mut prefix = self.config.map_saver_command.iter().cloned();
        let command = LaunchCommand {
            executable: prefix.next().unwrap_or_default(),
            args: prefix
                .chain(["-f".to_string(), target.display().to_string()])
                .collect(),
        };

        let sinks = LogSinks::in_dir(&self.config.log_dir, MAP_SAVER);
        let mut saver = ProcessHandle::spawn(MAP_SAVER, &command, sinks)?;
        let pid = saver.pid();

        let status = match self.config.save_map_timeout() {
            Some(timeout) => {
                let waited = tokio::time::timeout(timeout, saver.wait()).await;
                match waited {
                    Ok(result) => result?,
                    Err(_) => {
                        log::warn!("[{}] Timed out after {:?}", MAP_SAVER, timeout);
                        saver.stop(self.config.stop_timeout()).await?;
                        ProcessStatus::Error
                    }
                }
            }
            None => saver.wait().await?,
        };

        if status != ProcessStatus::Stopped {
            return Err(LaunchError::MapSaveFailed {
                name: name.to_string(),
                status,
            });
        }

        log::info!("[{}] Map saved in {}", MAP_SAVER, target.display());
        Ok(LaunchReport {
            launcher: state.mode,
            pid: Some(pid),
            state: Some(status),
            message: Some(format!("map saved in {}", target.display())),
        })
    }

    /// Poll one kind, reaping it if it has exited
    pub async fn state(&self, kind: ProcessKind) -> ProcessStatus {
        let mut state = self.state.lock().await;
        self.poll_locked(&mut state, kind).await
    }

    pub async fn bringup_state(&self) -> ProcessStatus {
        self.state(ProcessKind::Bringup).await
    }

    pub async fn mapping_state(&self) -> ProcessStatus {
        self.state(ProcessKind::Mapping).await
    }

    pub async fn navigation_state(&self) -> ProcessStatus {
        self.state(ProcessKind::Navigation).await
    }

    /// PID of the process in a slot, without polling it
    pub async fn pid(&self, kind: ProcessKind) -> Option<u32> {
        self.state.lock().await.slots.get(kind).map(ProcessHandle::pid)
    }

    pub async fn bringup_pid(&self) -> Option<u32> {
        self.pid(ProcessKind::Bringup).await
    }

    pub async fn mapping_pid(&self) -> Option<u32> {
        self.pid(ProcessKind::Mapping).await
    }

    pub async fn navigation_pid(&self) -> Option<u32> {
        self.pid(ProcessKind::Navigation).await
    }

    /// Poll a kind and report mode, pid and status together
    pub async fn report(&self, kind: ProcessKind) -> LaunchReport {
        let mut state = self.state.lock().await;
        let status = self.poll_locked(&mut state, kind).await;
        LaunchReport {
            launcher: state.mode,
            pid: state.slots.get(kind).map(ProcessHandle::pid),
            state: Some(status),
            message: None,
        }
    }

    async fn poll_locked(&self, state: &mut LauncherState, kind: ProcessKind) -> ProcessStatus {
        let polled = match state.slots.get_mut(kind) {
            Some(handle) => handle.poll(),
            None => return ProcessStatus::None,
        };

        let status = match polled {
            Ok(status) if status.has_exited() => {
                log::warn!("[{}] Process exited unattended ({})", kind, status);
                state.slots.get_mut(kind).take();
                if kind == ProcessKind::Bringup {
                    for dependent in ProcessKind::DEPENDENTS {
                        self.stop_slot(state, dependent).await;
                    }
                }
                status
            }
            Ok(status) => return status,
            Err(e) => {
                // The process may still be alive, release it through the stop protocol
                log::warn!("[{}] Releasing process after failed status query: {}", kind, e);
                self.stop_locked(state, kind).await;
                ProcessStatus::Error
            }
        };

        self.emit(LaunchEvent::Reaped { kind, status });
        self.set_mode(state, kind.fallback_mode());
        status
    }

    async fn stop_locked(&self, state: &mut LauncherState, kind: ProcessKind) {
        if state.slots.get(kind).is_none() {
            return;
        }
        if kind == ProcessKind::Bringup {
            for dependent in ProcessKind::DEPENDENTS {
                self.stop_slot(state, dependent).await;
            }
        }
        self.stop_slot(state, kind).await;
    }

    async fn stop_slot(&self, state: &mut LauncherState, kind: ProcessKind) {
        let Some(mut handle) = state.slots.get_mut(kind).take() else {
            return;
        };

        match handle.stop(self.config.stop_timeout()).await {
            Ok(StopOutcome::Exited(code)) => self.emit(LaunchEvent::Exited { kind, code }),
            Ok(StopOutcome::Killed) => self.emit(LaunchEvent::Killed { kind }),
            Err(e) => log::error!("[{}] Error stopping process: {}", kind, e),
        }
        self.set_mode(state, kind.fallback_mode());
    }

    fn set_mode(&self, state: &mut LauncherState, mode: LaunchMode) {
        if state.mode != mode {
            log::info!("Launcher mode: {} -> {}", state.mode, mode);
        }
        state.mode = mode;
        self.mode_tx.send_replace(mode);
    }

    fn emit(&self, event: LaunchEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }
}

/// Name of the one-shot map saver process and its log sinks
const MAP_SAVER: &str = "map_saver";

/// Map names become file names in the maps directory
fn is_valid_map_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Errors returned by launcher operations
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("Cannot start {requested} in {mode} mode")]
    InvalidMode {
        requested: ProcessKind,
        mode: LaunchMode,
    },

    #[error("Map '{name}' doesn't exist")]
    UnknownMap { name: String, known: Vec<String> },

    #[error("Cannot save a map in {mode} mode")]
    NotMapping { mode: LaunchMode },

    #[error("map with name {name} already exists")]
    MapExists { name: String },

    #[error("Invalid map name '{0}'")]
    InvalidMapName(String),

    #[error("Map saver for '{name}' ended with {status}")]
    MapSaveFailed { name: String, status: ProcessStatus },

    #[error("Unknown SLAM method '{method}'")]
    UnknownSlamMethod { method: String, known: Vec<String> },

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Process error: {0}")]
    Process(#[from] ProcessError),
}

impl LaunchError {
    /// Operator instruction for a rejected transition
    pub fn hint(&self) -> Option<&'static str> {
        let (requested, mode) = match self {
            LaunchError::InvalidMode { requested, mode } => (requested, mode),
            LaunchError::NotMapping { .. } => return Some("first launch mapping"),
            _ => return None,
        };
        let hint = match (requested, mode) {
            (ProcessKind::Bringup, _) => "bringup is already running, stop it first",
            (_, LaunchMode::Off) => "first launch bringup",
            (ProcessKind::Mapping, LaunchMode::Mapping) => {
                "mapping is running, stop the current mapping first"
            }
            (ProcessKind::Mapping, _) => "first stop navigation",
            (ProcessKind::Navigation, LaunchMode::Navigation) => {
                "first stop the current navigation"
            }
            (ProcessKind::Navigation, _) => "first stop mapping",
        };
        Some(hint)
    }
}

impl std::fmt::Display for LaunchPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "  {}", self.kind)?;
        write!(f, "     Command: {}", self.command)?;
        if let Some(advisory) = &self.advisory {
            writeln!(f)?;
            write!(f, "     Note: {}", advisory)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StaticSlamCatalog;

    fn launcher(maps_dir: &std::path::Path) -> Launcher {
        let config = AppConfig {
            amr_ros_pkg_name: "robot".to_string(),
            maps_dir: maps_dir.to_path_buf(),
            ..Default::default()
        };
        Launcher::new(
            config,
            Arc::new(FsMapCatalog::new(maps_dir)),
            Arc::new(StaticSlamCatalog::new(["slam_toolbox"])),
        )
    }

    fn write_map(dir: &std::path::Path, name: &str) {
        std::fs::write(dir.join(format!("{}.yaml", name)), format!("image: {}.pgm\n", name)).unwrap();
        std::fs::write(dir.join(format!("{}.pgm", name)), b"P5").unwrap();
    }

    #[test]
    fn test_plan_bringup() {
        let dir = tempfile::tempdir().unwrap();
        let plan = launcher(dir.path()).plan(&LaunchRequest::Bringup).unwrap();
        assert_eq!(plan.command.to_string(), "ros2 launch robot bringup_launch.py");
        assert_eq!(plan.advisory, None);
    }

    #[test]
    fn test_plan_mapping_uses_method_launch_file() {
        let dir = tempfile::tempdir().unwrap();
        let plan = launcher(dir.path())
            .plan(&LaunchRequest::Mapping {
                slam_method: "slam_toolbox".to_string(),
            })
            .unwrap();
        assert_eq!(plan.command.args.last().unwrap(), "slam_toolbox.launch.py");
    }

    #[test]
    fn test_plan_mapping_unknown_method() {
        let dir = tempfile::tempdir().unwrap();
        let err = launcher(dir.path())
            .plan(&LaunchRequest::Mapping {
                slam_method: "gmapping".to_string(),
            })
            .unwrap_err();
        match err {
            LaunchError::UnknownSlamMethod { method, known } => {
                assert_eq!(method, "gmapping");
                assert_eq!(known, vec!["slam_toolbox"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_plan_navigation_passes_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        write_map(dir.path(), "lab");
        let plan = launcher(dir.path())
            .plan(&LaunchRequest::Navigation {
                map_name: "lab".to_string(),
                planner_type: "teb".to_string(),
                with_virtual_walls: false,
            })
            .unwrap();
        let expected = format!("map:={}", dir.path().join("lab.yaml").display());
        assert_eq!(plan.command.args.last().unwrap(), &expected);
        assert_eq!(plan.advisory, None);
    }

    #[test]
    fn test_plan_navigation_virtual_walls() {
        let dir = tempfile::tempdir().unwrap();
        write_map(dir.path(), "lab");
        let mut launcher = launcher(dir.path());
        launcher.config.forward_navigation_args = true;

        let request = LaunchRequest::Navigation {
            map_name: "lab".to_string(),
            planner_type: "dwb".to_string(),
            with_virtual_walls: true,
        };
        let plan = launcher.plan(&request).unwrap();
        assert_eq!(
            plan.advisory.as_deref(),
            Some("virtual map 'lab_virtual' doesn't exist")
        );
        assert!(plan.command.args.contains(&"with_virtual_walls:=false".to_string()));
        assert!(plan.command.args.contains(&"local_planner_type:=dwb".to_string()));

        write_map(dir.path(), "lab_virtual");
        let plan = launcher.plan(&request).unwrap();
        assert_eq!(plan.advisory, None);
        assert!(plan.command.args.contains(&"with_virtual_walls:=true".to_string()));
    }

    #[test]
    fn test_plan_navigation_unknown_map() {
        let dir = tempfile::tempdir().unwrap();
        write_map(dir.path(), "office");
        let err = launcher(dir.path())
            .plan(&LaunchRequest::Navigation {
                map_name: "lab".to_string(),
                planner_type: "teb".to_string(),
                with_virtual_walls: false,
            })
            .unwrap_err();
        assert_eq!(err.to_string(), "Map 'lab' doesn't exist");
        assert!(matches!(err, LaunchError::UnknownMap { known, .. } if known == vec!["office"]));
    }

    #[test]
    fn test_custom_launch_command_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let mut launcher = launcher(dir.path());
        launcher.config.launch_command = vec!["nice".into(), "ros2".into(), "launch".into()];
        let plan = launcher.plan(&LaunchRequest::Bringup).unwrap();
        assert_eq!(plan.command.executable, "nice");
        assert_eq!(plan.command.args, vec!["ros2", "launch", "robot", "bringup_launch.py"]);
    }

    #[test]
    fn test_invalid_mode_hints() {
        let hint = |requested, mode| LaunchError::InvalidMode { requested, mode }.hint().unwrap();
        assert_eq!(hint(ProcessKind::Mapping, LaunchMode::Off), "first launch bringup");
        assert_eq!(hint(ProcessKind::Mapping, LaunchMode::Navigation), "first stop navigation");
        assert_eq!(hint(ProcessKind::Navigation, LaunchMode::Mapping), "first stop mapping");
        assert_eq!(
            hint(ProcessKind::Navigation, LaunchMode::Navigation),
            "first stop the current navigation"
        );
        assert!(LaunchError::UnknownMap {
            name: "x".into(),
            known: vec![]
        }
        .hint()
        .is_none());
    }

    #[test]
    fn test_map_name_validation() {
        assert!(is_valid_map_name("lab_2-east"));
        assert!(!is_valid_map_name(""));
        assert!(!is_valid_map_name("../etc/lab"));
        assert!(!is_valid_map_name("lab.v2"));
    }

    #[tokio::test]
    async fn test_save_map_requires_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let err = launcher(dir.path()).save_map("lab").await.unwrap_err();
        assert!(matches!(err, LaunchError::NotMapping { mode: LaunchMode::Off }));
        assert_eq!(err.hint(), Some("first launch mapping"));
    }

    #[test]
    fn test_report_serialization() {
        let report = LaunchReport {
            launcher: LaunchMode::Bringup,
            pid: Some(42),
            state: Some(ProcessStatus::Running),
            message: None,
        };
        assert_eq!(
            serde_json::to_string(&report).unwrap(),
            r#"{"launcher":"bringup","pid":42,"state":"running"}"#
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_status_query_releases_slot() {
        use nix::sys::wait::waitpid;
        use nix::unistd::Pid;

        let dir = tempfile::tempdir().unwrap();
        let mut launcher = launcher(dir.path());
        launcher.config.launch_command = vec!["sh".into(), "-c".into(), "sleep 0.3".into()];
        launcher.config.log_dir = dir.path().join("logs");
        launcher.config.stop_timeout_secs = 1;
        let mut events = launcher.subscribe();

        let pid = launcher.start_bringup().await.unwrap().pid.unwrap();
        // Reap behind the launcher's back so its status query fails
        waitpid(Pid::from_raw(pid as i32), None).unwrap();

        assert_eq!(launcher.bringup_state().await, ProcessStatus::Error);
        assert_eq!(launcher.mode(), LaunchMode::Off);
        assert_eq!(launcher.bringup_pid().await, None);
        assert_eq!(launcher.bringup_state().await, ProcessStatus::None);

        let reaped = std::iter::from_fn(|| events.try_recv().ok()).any(|e| {
            e == LaunchEvent::Reaped {
                kind: ProcessKind::Bringup,
                status: ProcessStatus::Error,
            }
        });
        assert!(reaped);
    }

    #[tokio::test]
    async fn test_empty_launcher_polls_none() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = launcher(dir.path());
        for _ in 0..3 {
            for kind in ProcessKind::ALL {
                assert_eq!(launcher.state(kind).await, ProcessStatus::None);
                assert_eq!(launcher.pid(kind).await, None);
            }
        }
        assert_eq!(launcher.mode(), LaunchMode::Off);
        assert_eq!(launcher.stop_all().await.launcher, LaunchMode::Off);
    }
}
