//! Application configuration parsing

mod app_config;

pub use app_config::*;
