//! Operating modes and the supervised process kinds

use serde::{Deserialize, Serialize};
use std::fmt;

/// Global operating mode of the robot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaunchMode {
    #[default]
    Off,
    Bringup,
    Mapping,
    Navigation,
}

impl LaunchMode {
    /// Subsystem running on top of bringup in this mode, if any
    pub fn dependent(&self) -> Option<ProcessKind> {
        match self {
            LaunchMode::Mapping => Some(ProcessKind::Mapping),
            LaunchMode::Navigation => Some(ProcessKind::Navigation),
            LaunchMode::Off | LaunchMode::Bringup => None,
        }
    }
}

impl fmt::Display for LaunchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LaunchMode::Off => "off",
            LaunchMode::Bringup => "bringup",
            LaunchMode::Mapping => "mapping",
            LaunchMode::Navigation => "navigation",
        };
        f.write_str(s)
    }
}

/// One of the three supervised process slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessKind {
    Bringup,
    Mapping,
    Navigation,
}

impl ProcessKind {
    pub const ALL: [ProcessKind; 3] = [
        ProcessKind::Bringup,
        ProcessKind::Mapping,
        ProcessKind::Navigation,
    ];

    /// Kinds that require bringup underneath them
    pub const DEPENDENTS: [ProcessKind; 2] = [ProcessKind::Mapping, ProcessKind::Navigation];

    /// Slot name, also used for log sink file names
    pub fn name(&self) -> &'static str {
        match self {
            ProcessKind::Bringup => "bringup",
            ProcessKind::Mapping => "mapping",
            ProcessKind::Navigation => "navigation",
        }
    }

    /// Mode in which this kind may be started
    pub fn required_mode(&self) -> LaunchMode {
        match self {
            ProcessKind::Bringup => LaunchMode::Off,
            ProcessKind::Mapping | ProcessKind::Navigation => LaunchMode::Bringup,
        }
    }

    /// Mode entered once this kind is running
    pub fn active_mode(&self) -> LaunchMode {
        match self {
            ProcessKind::Bringup => LaunchMode::Bringup,
            ProcessKind::Mapping => LaunchMode::Mapping,
            ProcessKind::Navigation => LaunchMode::Navigation,
        }
    }

    /// Mode left behind once this kind is stopped or reaped
    pub fn fallback_mode(&self) -> LaunchMode {
        self.required_mode()
    }
}

impl fmt::Display for ProcessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
