//! Command-line interface for amr_launch

use crate::config::AppConfig;
use crate::runtime::{LaunchRequest, ReportFormat, SessionOptions};
use argh::FromArgs;

/// Run AMR bringup, mapping or navigation launch sessions
#[derive(FromArgs, Debug)]
pub struct LaunchArgs {
    /// path to the application config (default: appconfig.yaml, optional)
    #[argh(option, short = 'c')]
    pub config: Option<String>,

    /// log level (error, warn, info, debug, trace)
    #[argh(option, short = 'l', default = "String::from(\"info\")")]
    pub log_level: String,

    /// print launcher reports as JSON lines on stdout
    #[argh(switch)]
    pub json: bool,

    #[argh(subcommand)]
    pub command: Command,
}

#[derive(FromArgs, Debug, PartialEq)]
#[argh(subcommand)]
pub enum Command {
    Bringup(BringupArgs),
    Mapping(MappingArgs),
    Navigation(NavigationArgs),
    Maps(MapsArgs),
    SlamMethods(SlamMethodsArgs),
}

/// Run bringup until Ctrl+C
#[derive(FromArgs, Debug, PartialEq)]
#[argh(subcommand, name = "bringup")]
pub struct BringupArgs {
    /// show launch plan without executing
    #[argh(switch)]
    pub dry_run: bool,
}

/// Run bringup with mapping on top until Ctrl+C
#[derive(FromArgs, Debug, PartialEq)]
#[argh(subcommand, name = "mapping")]
pub struct MappingArgs {
    /// slam method (default: the one named by `slam_launch`)
    #[argh(option, short = 's')]
    pub slam_method: Option<String>,

    /// save the map under this name when the session is stopped
    #[argh(option)]
    pub save_as: Option<String>,

    /// show launch plan without executing
    #[argh(switch)]
    pub dry_run: bool,
}

/// Run bringup with navigation on top until Ctrl+C
#[derive(FromArgs, Debug, PartialEq)]
#[argh(subcommand, name = "navigation")]
pub struct NavigationArgs {
    /// name of a known map
    #[argh(option, short = 'm')]
    pub map: String,

    /// local planner type (default: teb)
    #[argh(option, short = 'p', default = "String::from(\"teb\")")]
    pub planner: String,

    /// use the `<map>_virtual` variant when it exists
    #[argh(switch)]
    pub virtual_walls: bool,

    /// show launch plan without executing
    #[argh(switch)]
    pub dry_run: bool,
}

/// List known maps
#[derive(FromArgs, Debug, PartialEq)]
#[argh(subcommand, name = "maps")]
pub struct MapsArgs {}

/// List known SLAM methods
#[derive(FromArgs, Debug, PartialEq)]
#[argh(subcommand, name = "slam-methods")]
pub struct SlamMethodsArgs {}

impl LaunchArgs {
    /// Normalized log filter, falling back to `info`
    pub fn log_filter(&self) -> &'static str {
        match self.log_level.to_lowercase().as_str() {
            "error" => "error",
            "warn" => "warn",
            "debug" => "debug",
            "trace" => "trace",
            _ => "info",
        }
    }

    pub fn report_format(&self) -> ReportFormat {
        if self.json {
            ReportFormat::Json
        } else {
            ReportFormat::Log
        }
    }

    /// Session to run for a bringup, mapping or navigation command
    pub fn session_options(&self, config: &AppConfig) -> SessionOptions {
        let save_map_as = match &self.command {
            Command::Mapping(a) => a.save_as.clone(),
            _ => None,
        };
        SessionOptions {
            target: self.command.target(config),
            save_map_as,
            format: self.report_format(),
        }
    }
}

impl Command {
    pub fn dry_run(&self) -> bool {
        match self {
            Command::Bringup(a) => a.dry_run,
            Command::Mapping(a) => a.dry_run,
            Command::Navigation(a) => a.dry_run,
            Command::Maps(_) | Command::SlamMethods(_) => false,
        }
    }

    /// Subsystem to start on top of bringup, if any
    pub fn target(&self, config: &AppConfig) -> Option<LaunchRequest> {
        match self {
            Command::Mapping(a) => Some(LaunchRequest::Mapping {
                slam_method: a
                    .slam_method
                    .clone()
                    .unwrap_or_else(|| config.default_slam_method().to_string()),
            }),
            Command::Navigation(a) => Some(LaunchRequest::Navigation {
                map_name: a.map.clone(),
                planner_type: a.planner.clone(),
                with_virtual_walls: a.virtual_walls,
            }),
            Command::Bringup(_) | Command::Maps(_) | Command::SlamMethods(_) => None,
        }
    }
}
