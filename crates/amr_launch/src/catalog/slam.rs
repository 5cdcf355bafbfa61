//! SLAM methods, one per launch file of the robot package

use super::CatalogError;
use crate::config::{launch_file_stem, AppConfig};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// A selectable SLAM method and the launch file that runs it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlamMethod {
    pub name: String,
    pub launch_file: String,
}

impl SlamMethod {
    pub fn from_launch_file(launch_file: impl Into<String>) -> Self {
        let launch_file = launch_file.into();
        Self {
            name: launch_file_stem(&launch_file).to_string(),
            launch_file,
        }
    }
}

/// Provider of the valid SLAM methods
pub trait SlamCatalog: Send + Sync {
    /// All known methods, sorted by name
    fn methods(&self) -> Result<Vec<SlamMethod>, CatalogError>;

    /// Look up a method by name
    fn find(&self, name: &str) -> Result<Option<SlamMethod>, CatalogError> {
        Ok(self.methods()?.into_iter().find(|m| m.name == name))
    }
}

/// Fixed list of methods, each run by `<name>.launch.py`
#[derive(Debug, Clone, Default)]
pub struct StaticSlamCatalog {
    methods: Vec<SlamMethod>,
}

impl StaticSlamCatalog {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut methods: Vec<SlamMethod> = names
            .into_iter()
            .map(|n| {
                let name = n.into();
                SlamMethod {
                    launch_file: format!("{}.launch.py", name),
                    name,
                }
            })
            .collect();
        methods.sort_by(|a, b| a.name.cmp(&b.name));
        methods.dedup_by(|a, b| a.name == b.name);
        Self { methods }
    }
}

impl SlamCatalog for StaticSlamCatalog {
    fn methods(&self) -> Result<Vec<SlamMethod>, CatalogError> {
        Ok(self.methods.clone())
    }
}

/// Methods discovered from the files of a package `launch/` directory
#[derive(Debug, Clone)]
pub struct FsSlamCatalog {
    package: String,
    launch_dir: Option<PathBuf>,
}

impl FsSlamCatalog {
    /// Catalog for `package`, using `launch_dir` when given and
    /// `AMENT_PREFIX_PATH` otherwise
    pub fn new(package: impl Into<String>, launch_dir: Option<PathBuf>) -> Self {
        Self {
            package: package.into(),
            launch_dir,
        }
    }

    fn launch_dir(&self) -> Result<PathBuf, CatalogError> {
        match &self.launch_dir {
            Some(dir) => Ok(dir.clone()),
            None => resolve_launch_dir(&self.package),
        }
    }
}

impl SlamCatalog for FsSlamCatalog {
    fn methods(&self) -> Result<Vec<SlamMethod>, CatalogError> {
        let dir = self.launch_dir()?;
        let io_err = |e| CatalogError::Io {
            path: dir.display().to_string(),
            source: e,
        };

        let mut methods = Vec::new();
        for entry in fs::read_dir(&dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if !path.is_file() {
                continue;
            }
            if let Some(file_name) = path.file_name().and_then(|f| f.to_str()) {
                methods.push(SlamMethod::from_launch_file(file_name));
            }
        }
        methods.sort_by(|a, b| a.name.cmp(&b.name).then(a.launch_file.cmp(&b.launch_file)));
        methods.dedup_by(|a, b| a.name == b.name);

        Ok(methods)
    }
}

/// Locate `<prefix>/share/<package>/launch` for the first matching prefix in
/// `AMENT_PREFIX_PATH`
pub fn resolve_launch_dir(package: &str) -> Result<PathBuf, CatalogError> {
    let prefixes = std::env::var("AMENT_PREFIX_PATH").unwrap_or_default();
    prefixes
        .split(':')
        .filter(|p| !p.is_empty())
        .map(|prefix| Path::new(prefix).join("share").join(package).join("launch"))
        .find(|dir| dir.is_dir())
        .ok_or_else(|| CatalogError::LaunchDirNotFound(package.to_string()))
}

/// Build the SLAM catalog selected by the configuration
pub fn slam_catalog_for(config: &AppConfig) -> Box<dyn SlamCatalog> {
    match &config.slam_methods {
        Some(names) => Box::new(StaticSlamCatalog::new(names.iter().cloned())),
        None => Box::new(FsSlamCatalog::new(
            config.amr_ros_pkg_name.clone(),
            config.launch_dir.clone(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Env var tests must run serially since they mutate shared process state
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_static_catalog() {
        let catalog = StaticSlamCatalog::new(["slam_toolbox", "cartographer", "slam_toolbox"]);
        let methods = catalog.methods().unwrap();
        assert_eq!(methods.len(), 2);
        assert_eq!(methods[0].name, "cartographer");
        assert_eq!(methods[0].launch_file, "cartographer.launch.py");
        assert!(catalog.find("slam_toolbox").unwrap().is_some());
        assert!(catalog.find("gmapping").unwrap().is_none());
    }

    #[test]
    fn test_fs_catalog_lists_launch_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("slam_toolbox.launch.py"), "").unwrap();
        fs::write(dir.path().join("cartographer.launch.py"), "").unwrap();
        fs::create_dir(dir.path().join("__pycache__")).unwrap();

        let catalog = FsSlamCatalog::new("robot", Some(dir.path().to_path_buf()));
        let methods = catalog.methods().unwrap();
        let names: Vec<&str> = methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["cartographer", "slam_toolbox"]);
        assert_eq!(methods[1].launch_file, "slam_toolbox.launch.py");
    }

    #[test]
    fn test_fs_catalog_missing_dir_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = FsSlamCatalog::new("robot", Some(dir.path().join("missing")));
        assert!(matches!(catalog.methods(), Err(CatalogError::Io { .. })));
    }

    #[test]
    fn test_resolve_launch_dir_from_ament_prefix() {
        let _lock = ENV_LOCK.lock().unwrap();
        let prev = std::env::var("AMENT_PREFIX_PATH").ok();

        let empty = tempfile::tempdir().unwrap();
        let install = tempfile::tempdir().unwrap();
        let launch = install.path().join("share/robot/launch");
        fs::create_dir_all(&launch).unwrap();

        std::env::set_var(
            "AMENT_PREFIX_PATH",
            format!("{}:{}", empty.path().display(), install.path().display()),
        );
        assert_eq!(resolve_launch_dir("robot").unwrap(), launch);
        assert!(matches!(
            resolve_launch_dir("other"),
            Err(CatalogError::LaunchDirNotFound(_))
        ));

        if let Some(v) = prev {
            std::env::set_var("AMENT_PREFIX_PATH", v);
        } else {
            std::env::remove_var("AMENT_PREFIX_PATH");
        }
    }

    #[test]
    fn test_slam_catalog_for_static_config() {
        let config = AppConfig::from_yaml("slam_methods: [gmapping]").unwrap();
        let catalog = slam_catalog_for(&config);
        assert_eq!(catalog.methods().unwrap()[0].name, "gmapping");
    }
}
