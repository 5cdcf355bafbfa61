//! AMR Launch
//!
//! Mode supervisor for a mobile robot's ROS 2 launch processes.
//!
//! # Overview
//!
//! The launcher owns one operating mode and up to three supervised
//! `ros2 launch` processes:
//!
//! ```text
//! Off --start_bringup--> Bringup --start_mapping----> Mapping
//!                                --start_navigation-> Navigation
//! ```
//!
//! - Mapping and navigation are mutually exclusive and both need bringup
//! - Stops send SIGINT and wait, escalating to SIGKILL after a timeout
//! - Status polls reap processes that died on their own and move the mode back
//! - While mapping, the map can be saved into the maps directory
//!
//! # Example Config
//!
//! ```yaml
//! amr_ros_pkg_name: navigationx_robot
//! bringup_launch: bringup_launch.py
//! slam_launch: slam_toolbox.launch.py
//! navigation_launch: navigation2.launch.py
//! maps_dir: /home/nvidia/maps
//! stop_timeout_secs: 10
//! ```

pub mod catalog;
pub mod cli;
pub mod config;
pub mod runtime;

pub use catalog::{
    CatalogError, FsMapCatalog, FsSlamCatalog, MapArtifact, MapCatalog, SlamCatalog, SlamMethod,
    StaticSlamCatalog,
};
pub use cli::LaunchArgs;
pub use config::{AppConfig, ConfigError};
pub use runtime::{
    run_session, LaunchCommand, LaunchError, LaunchEvent, LaunchMode, LaunchPlan, LaunchReport,
    LaunchRequest, Launcher, ProcessError, ProcessHandle, ProcessKind, ProcessStatus,
    ReportFormat, SessionOptions,
};
