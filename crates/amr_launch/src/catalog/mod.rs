//! Read-only catalogs of known maps and SLAM methods
//!
//! The launcher consults these before starting navigation or mapping.
//! Packaging (previews, archives) is handled elsewhere; a catalog only
//! reports what exists on disk.

mod maps;
mod slam;

pub use maps::*;
pub use slam::*;

/// Errors that can occur while scanning a catalog
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Launch directory for package '{0}' not found (is AMENT_PREFIX_PATH set?)")]
    LaunchDirNotFound(String),
}
