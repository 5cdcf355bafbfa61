//! Map artifacts stored as `<name>.yaml` descriptor + raster image

use super::CatalogError;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// One navigable map and the files backing it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MapArtifact {
    /// Map name (descriptor file name up to the first `.`)
    pub name: String,
    /// Coordinate/metadata descriptor (`<name>.yaml`)
    pub descriptor: PathBuf,
    /// Raster referenced by the descriptor's `image` key
    pub raster: PathBuf,
    /// Derived preview image
    pub preview: PathBuf,
    /// Derived archive (`<name>.zip`)
    pub archive: PathBuf,
}

impl MapArtifact {
    /// Build an artifact from a descriptor file.
    ///
    /// Returns `None` when the descriptor is unreadable, has no `image` key,
    /// or the raster it references is missing.
    pub fn from_descriptor(maps_dir: &Path, descriptor: &Path) -> Option<Self> {
        let content = match fs::read_to_string(descriptor) {
            Ok(c) => c,
            Err(e) => {
                log::debug!("Skipping {}: {}", descriptor.display(), e);
                return None;
            }
        };

        let value: serde_yaml::Value = match serde_yaml::from_str(&content) {
            Ok(v) => v,
            Err(e) => {
                log::debug!("Skipping {}: {}", descriptor.display(), e);
                return None;
            }
        };

        let image = value.get("image").and_then(|i| i.as_str())?;
        let raster_name = Path::new(image).file_name()?.to_str()?;
        let raster = maps_dir.join(raster_name);
        if !raster.is_file() {
            log::debug!(
                "Skipping {}: raster {} missing",
                descriptor.display(),
                raster.display()
            );
            return None;
        }

        let name = first_segment(descriptor.file_name()?.to_str()?).to_string();
        let preview = maps_dir.join(format!("{}.png", first_segment(raster_name)));
        let archive = maps_dir.join(format!("{}.zip", name));

        Some(Self {
            name,
            descriptor: descriptor.to_path_buf(),
            raster,
            preview,
            archive,
        })
    }

    /// Whether the descriptor is exactly `<name>.yaml`
    pub fn is_canonical(&self) -> bool {
        self.descriptor
            .file_name()
            .and_then(|f| f.to_str())
            .is_some_and(|f| f.strip_suffix(".yaml") == Some(self.name.as_str()))
    }
}

fn first_segment(file_name: &str) -> &str {
    file_name.split('.').next().unwrap_or(file_name)
}

/// Provider of the currently valid maps
pub trait MapCatalog: Send + Sync {
    /// List every map with a valid descriptor + raster pair, sorted by name
    fn list_maps(&self) -> Result<Vec<MapArtifact>, CatalogError>;

    /// Names of all known maps
    fn names(&self) -> Result<Vec<String>, CatalogError> {
        Ok(self.list_maps()?.into_iter().map(|m| m.name).collect())
    }

    fn contains(&self, name: &str) -> Result<bool, CatalogError> {
        Ok(self.names()?.iter().any(|n| n == name))
    }

    /// Look up a map by name
    fn find(&self, name: &str) -> Result<Option<MapArtifact>, CatalogError> {
        Ok(self.list_maps()?.into_iter().find(|m| m.name == name))
    }
}

/// Map catalog backed by a directory of descriptors
#[derive(Debug, Clone)]
pub struct FsMapCatalog {
    maps_dir: PathBuf,
}

impl FsMapCatalog {
    pub fn new(maps_dir: impl Into<PathBuf>) -> Self {
        Self {
            maps_dir: maps_dir.into(),
        }
    }
}

impl MapCatalog for FsMapCatalog {
    fn list_maps(&self) -> Result<Vec<MapArtifact>, CatalogError> {
        let io_err = |e| CatalogError::Io {
            path: self.maps_dir.display().to_string(),
            source: e,
        };

        let entries = match fs::read_dir(&self.maps_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!("Maps directory {} does not exist", self.maps_dir.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(io_err(e)),
        };

        let mut descriptors = Vec::new();
        for entry in entries {
            let path = entry.map_err(io_err)?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "yaml") {
                descriptors.push(path);
            }
        }
        descriptors.sort();

        let mut maps: Vec<MapArtifact> = descriptors
            .iter()
            .filter_map(|d| MapArtifact::from_descriptor(&self.maps_dir, d))
            .collect();
        // `<name>.yaml` wins over `<name>.<variant>.yaml`
        maps.sort_by_key(|m| (m.name.clone(), !m.is_canonical()));
        maps.dedup_by(|a, b| a.name == b.name);

        Ok(maps)
    }
}
