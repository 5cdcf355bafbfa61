//! `appconfig.yaml` schema

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// ROS package holding the robot's launch files
    pub amr_ros_pkg_name: String,

    /// Launch file started for bringup
    pub bringup_launch: String,

    /// Launch file of the default SLAM method
    pub slam_launch: String,

    /// Launch file started for navigation
    pub navigation_launch: String,

    /// Program and leading arguments used to run a launch file.
    /// The package name, launch file and launch arguments are appended.
    pub launch_command: Vec<String>,

    /// Directory receiving `<kind>_output.log` and `<kind>_error.log`
    pub log_dir: PathBuf,

    /// Directory holding map descriptors and rasters
    pub maps_dir: PathBuf,

    /// Package `launch/` directory scanned for SLAM methods.
    /// Resolved from `AMENT_PREFIX_PATH` when unset.
    pub launch_dir: Option<PathBuf>,

    /// Fixed SLAM method list, bypassing the launch directory scan
    pub slam_methods: Option<Vec<String>>,

    /// Seconds to wait after SIGINT before SIGKILL (0 = wait forever)
    pub stop_timeout_secs: u64,

    /// Interval between state polls while a session runs
    pub poll_interval_ms: u64,

    /// Pass `local_planner_type:=` and `with_virtual_walls:=` to navigation
    pub forward_navigation_args: bool,

    /// Program and leading arguments of the map saver.
    /// `-f <maps_dir>/<name>` is appended.
    pub map_saver_command: Vec<String>,

    /// Seconds to wait for the map saver before stopping it (0 = wait forever)
    pub save_map_timeout_secs: u64,
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("/tmp"))
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            amr_ros_pkg_name: "navigationx_robot".to_string(),
            bringup_launch: "bringup_launch.py".to_string(),
            slam_launch: "slam_toolbox.launch.py".to_string(),
            navigation_launch: "navigation2.launch.py".to_string(),
            launch_command: vec!["ros2".to_string(), "launch".to_string()],
            log_dir: home_dir().join(".logs"),
            maps_dir: home_dir().join("maps"),
            launch_dir: None,
            slam_methods: None,
            stop_timeout_secs: 10,
            poll_interval_ms: 1000,
            forward_navigation_args: false,
            map_saver_command: vec![
                "ros2".to_string(),
                "run".to_string(),
                "nav2_map_server".to_string(),
                "map_saver_cli".to_string(),
            ],
            save_map_timeout_secs: 30,
        }
    }
}

impl AppConfig {
    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_yaml(&content)
    }

    /// Load configuration from a YAML file, falling back to defaults when
    /// the file does not exist
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            log::warn!(
                "Config file {} not found, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }
        Self::from_file(path)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not to an empty mapping
        let config: AppConfig = if content.trim().is_empty() {
            AppConfig::default()
        } else {
            serde_yaml::from_str(content)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.launch_command.is_empty() || self.launch_command[0].trim().is_empty() {
            return Err(ConfigError::Validation(
                "'launch_command' must name a program".to_string(),
            ));
        }

        if self.map_saver_command.is_empty() || self.map_saver_command[0].trim().is_empty() {
            return Err(ConfigError::Validation(
                "'map_saver_command' must name a program".to_string(),
            ));
        }

        for (key, value) in [
            ("amr_ros_pkg_name", &self.amr_ros_pkg_name),
            ("bringup_launch", &self.bringup_launch),
            ("slam_launch", &self.slam_launch),
            ("navigation_launch", &self.navigation_launch),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "'{}' must not be empty",
                    key
                )));
            }
        }

        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "'poll_interval_ms' must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Stop timeout, `None` meaning an unbounded wait
    pub fn stop_timeout(&self) -> Option<Duration> {
        match self.stop_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Map saver timeout, `None` meaning an unbounded wait
    pub fn save_map_timeout(&self) -> Option<Duration> {
        match self.save_map_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Interval between state polls while a session runs
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// SLAM method selected by `slam_launch`
    pub fn default_slam_method(&self) -> &str {
        launch_file_stem(&self.slam_launch)
    }
}

/// Text before the first `.` of a launch file name (`slam_toolbox.launch.py` -> `slam_toolbox`)
pub fn launch_file_stem(file_name: &str) -> &str {
    file_name.split('.').next().unwrap_or(file_name)
}

/// Errors that can occur when loading the configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}
