//! Test helpers for launcher integration tests

#![allow(dead_code)]

use amr_launch::{AppConfig, LaunchEvent, Launcher, ProcessKind, ProcessStatus};
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::broadcast;

/// Stand-in for `ros2 launch`, invoked as `sh fake_ros2.sh <pkg> <launch_file> [args..]`.
///
/// Behaviour is picked from the launch file name:
/// - `exit_ok*`: exits 0 shortly after start
/// - `exit_err*`: exits 3 shortly after start
/// - `stubborn*`: ignores SIGINT
/// - `die*`: runs half a second, then exits 1
/// - anything else: runs until SIGINT, then exits 0
///
/// Invoked as `sh fake_ros2.sh map_saver -f <path>` it stands in for the map
/// saver: writes `<path>.yaml` and `<path>.pgm`, or exits 1 when the path
/// contains `fail`.
const FAKE_ROS2: &str = r#"
echo "$@"
if [ "$1" = map_saver ]; then
  case "$3" in *fail*) exit 1 ;; esac
  printf 'image: %s.pgm\n' "${3##*/}" > "$3.yaml"
  printf 'P5' > "$3.pgm"
  exit 0
fi
case "$2" in
  exit_ok*) sleep 0.2; exit 0 ;;
  exit_err*) sleep 0.2; exit 3 ;;
  die*) trap 'exit 0' INT; sleep 0.5; exit 1 ;;
  stubborn*) trap '' INT ;;
  *) trap 'exit 0' INT ;;
esac
while true; do sleep 0.05; done
"#;

/// SLAM methods known to test launchers
pub const SLAM_METHODS: [&str; 4] = ["slam_toolbox", "exit_ok", "exit_err", "stubborn"];

/// Temporary robot environment: fake launch tool, log and map directories
pub struct TestEnv {
    pub dir: TempDir,
    pub config: AppConfig,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let script = dir.path().join("fake_ros2.sh");
        std::fs::write(&script, FAKE_ROS2).expect("Failed to write fake ros2");

        let maps_dir = dir.path().join("maps");
        std::fs::create_dir_all(&maps_dir).expect("Failed to create maps dir");

        let config = AppConfig {
            amr_ros_pkg_name: "test_robot".to_string(),
            launch_command: vec!["sh".to_string(), script.display().to_string()],
            log_dir: dir.path().join("logs"),
            maps_dir,
            slam_methods: Some(SLAM_METHODS.iter().map(|s| s.to_string()).collect()),
            map_saver_command: vec![
                "sh".to_string(),
                script.display().to_string(),
                "map_saver".to_string(),
            ],
            save_map_timeout_secs: 5,
            stop_timeout_secs: 1,
            poll_interval_ms: 50,
            ..Default::default()
        };

        Self { dir, config }
    }

    pub fn launcher(&self) -> Launcher {
        Launcher::from_config(self.config.clone())
    }

    pub fn maps_dir(&self) -> PathBuf {
        self.config.maps_dir.clone()
    }

    /// Write a `<name>.yaml` descriptor and its `<name>.pgm` raster
    pub fn write_map(&self, name: &str) {
        let maps_dir = self.maps_dir();
        std::fs::write(
            maps_dir.join(format!("{}.yaml", name)),
            format!("image: {}.pgm\nresolution: 0.05\norigin: [0.0, 0.0, 0.0]\n", name),
        )
        .expect("Failed to write map descriptor");
        std::fs::write(maps_dir.join(format!("{}.pgm", name)), b"P5\n1 1\n255\n\0")
            .expect("Failed to write map raster");
    }

    /// Contents of a kind's stdout sink
    pub fn output_log(&self, kind: ProcessKind) -> String {
        self.sink_contents(kind.name())
    }

    /// Contents of `<name>_output.log`
    pub fn sink_contents(&self, name: &str) -> String {
        let path = self.config.log_dir.join(format!("{}_output.log", name));
        std::fs::read_to_string(path).unwrap_or_default()
    }
}

/// Poll a kind until it reports an exit, returning that status
pub async fn wait_for_exit(launcher: &Launcher, kind: ProcessKind) -> ProcessStatus {
    for _ in 0..200 {
        let status = launcher.state(kind).await;
        if status.has_exited() {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("{} did not exit in time", kind);
}

/// Wait until `check` returns true or fail after `timeout`
pub async fn wait_until(timeout: Duration, mut check: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("condition not met within {:?}", timeout);
}

/// Give the fake launch tool time to install its SIGINT trap
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(200)).await;
}

/// Drain every event received so far
pub fn drain(rx: &mut broadcast::Receiver<LaunchEvent>) -> Vec<LaunchEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
