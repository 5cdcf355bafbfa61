//! AMR Launch CLI
//!
//! Usage:
//!   amr_launch bringup
//!   amr_launch mapping --slam-method slam_toolbox --save-as lab
//!   amr_launch navigation --map lab --virtual-walls
//!   amr_launch -c appconfig.yaml navigation --map lab --dry-run
//!   amr_launch maps

use amr_launch::cli::Command;
use amr_launch::{run_session, AppConfig, LaunchArgs, LaunchRequest, Launcher};
use tokio::sync::watch;

#[tokio::main]
async fn main() {
    let args: LaunchArgs = argh::from_env();

    // Initialize logging
    let env = env_logger::Env::default().default_filter_or(args.log_filter());
    env_logger::init_from_env(env);

    // Load config
    let loaded = match &args.config {
        Some(path) => {
            log::info!("Loading config: {}", path);
            AppConfig::from_file(path)
        }
        None => AppConfig::load_or_default("appconfig.yaml"),
    };
    let config = match loaded {
        Ok(c) => c,
        Err(e) => {
            log::error!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    let options = args.session_options(&config);
    let launcher = Launcher::from_config(config);

    match &args.command {
        Command::Maps(_) => list_maps(&launcher, args.json),
        Command::SlamMethods(_) => list_slam_methods(&launcher, args.json),
        _ if args.command.dry_run() => print_plan(&launcher, options.target),
        _ => {
            // Create shutdown channel
            let (shutdown_tx, shutdown_rx) = watch::channel(());

            // Set up Ctrl+C handler
            if let Err(e) = ctrlc::set_handler(move || {
                log::info!("Received Ctrl+C, initiating shutdown...");
                let _ = shutdown_tx.send(());
            }) {
                log::error!("Error setting Ctrl+C handler: {}", e);
                std::process::exit(1);
            }

            if let Err(e) = run_session(&launcher, options, shutdown_rx).await {
                log::error!("Session failed: {}", e);
                std::process::exit(1);
            }

            log::info!("AMR launcher exiting");
        }
    }
}

fn list_maps(launcher: &Launcher, json: bool) {
    let maps = match launcher.maps().list_maps() {
        Ok(m) => m,
        Err(e) => {
            log::error!("Failed to list maps: {}", e);
            std::process::exit(1);
        }
    };

    if json {
        match serde_json::to_string_pretty(&maps) {
            Ok(s) => println!("{}", s),
            Err(e) => log::error!("Failed to serialize maps: {}", e),
        }
        return;
    }

    println!("Maps in {}:", launcher.config().maps_dir.display());
    for map in &maps {
        println!("  {} ({})", map.name, map.descriptor.display());
    }
}

fn list_slam_methods(launcher: &Launcher, json: bool) {
    let methods = match launcher.slam_methods().methods() {
        Ok(m) => m,
        Err(e) => {
            log::error!("Failed to list SLAM methods: {}", e);
            std::process::exit(1);
        }
    };

    if json {
        match serde_json::to_string_pretty(&methods) {
            Ok(s) => println!("{}", s),
            Err(e) => log::error!("Failed to serialize SLAM methods: {}", e),
        }
        return;
    }

    println!("SLAM methods:");
    for method in &methods {
        println!("  {} ({})", method.name, method.launch_file);
    }
}

fn print_plan(launcher: &Launcher, target: Option<LaunchRequest>) {
    println!("Launch Plan");
    println!("===========");

    let requests = std::iter::once(LaunchRequest::Bringup).chain(target);
    for (i, request) in requests.enumerate() {
        match launcher.plan(&request) {
            Ok(plan) => {
                println!();
                println!("{}. {}", i + 1, plan.to_string().trim_start());
            }
            Err(e) => {
                log::error!("Failed to generate launch plan: {}", e);
                std::process::exit(1);
            }
        }
    }
}
