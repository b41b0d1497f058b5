//! Layered configuration: project `ovo.toml` (or legacy `.ovo/config.toml`)
//! over a global `~/.ovo/config.toml`. Every field is optional at each
//! layer; the project layer wins field-by-field over the global one.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    Read(PathBuf, std::io::Error),

    #[error("failed to parse {0}: {1}")]
    Parse(PathBuf, toml::de::Error),
}

/// One layer of configuration, each field absent unless the TOML file set
/// it explicitly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigLayer {
    pub cache_dir: Option<PathBuf>,
    pub offline: Option<bool>,
    pub registry_url: Option<String>,
    pub vcpkg_root: Option<PathBuf>,
    pub conan_user_home: Option<PathBuf>,
    pub max_parallel: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub cache_ttl_secs: Option<u64>,
    pub use_lockfile: Option<bool>,
}

impl ConfigLayer {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ConfigLayer::default()),
            Err(e) => return Err(ConfigError::Read(path.to_path_buf(), e)),
        };
        toml::from_str(&contents).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))
    }

    /// `self` is the lower-priority layer; fields set in `other` win.
    fn merge(self, other: ConfigLayer) -> ConfigLayer {
        ConfigLayer {
            cache_dir: other.cache_dir.or(self.cache_dir),
            offline: other.offline.or(self.offline),
            registry_url: other.registry_url.or(self.registry_url),
            vcpkg_root: other.vcpkg_root.or(self.vcpkg_root),
            conan_user_home: other.conan_user_home.or(self.conan_user_home),
            max_parallel: other.max_parallel.or(self.max_parallel),
            timeout_secs: other.timeout_secs.or(self.timeout_secs),
            cache_ttl_secs: other.cache_ttl_secs.or(self.cache_ttl_secs),
            use_lockfile: other.use_lockfile.or(self.use_lockfile),
        }
    }
}

/// Resolved configuration: the global layer merged under the project
/// layer, with hard-coded defaults filling in whatever neither layer set.
#[derive(Debug, Clone)]
pub struct Config {
    pub cache_dir: PathBuf,
    pub offline: bool,
    pub registry_url: Option<String>,
    pub vcpkg_root: Option<PathBuf>,
    pub conan_user_home: Option<PathBuf>,
    pub max_parallel: usize,
    pub timeout_secs: u64,
    pub cache_ttl_secs: u64,
    pub use_lockfile: bool,
}

impl Config {
    /// Loads and merges `global_path` then `project_path`, falling back to
    /// built-in defaults for anything neither layer sets.
    pub fn load(global_path: &Path, project_path: &Path, default_cache_dir: PathBuf) -> Result<Self, ConfigError> {
        let global = ConfigLayer::load(global_path)?;
        let project = ConfigLayer::load(project_path)?;
        let merged = global.merge(project);
        Ok(Config::from_layer(merged, default_cache_dir))
    }

    fn from_layer(layer: ConfigLayer, default_cache_dir: PathBuf) -> Self {
        Config {
            cache_dir: layer.cache_dir.unwrap_or(default_cache_dir),
            offline: layer.offline.unwrap_or(false),
            registry_url: layer.registry_url,
            vcpkg_root: layer.vcpkg_root.or_else(|| std::env::var("VCPKG_ROOT").ok().map(PathBuf::from)),
            conan_user_home: layer.conan_user_home.or_else(|| std::env::var("CONAN_USER_HOME").ok().map(PathBuf::from)),
            max_parallel: layer.max_parallel.unwrap_or(4),
            timeout_secs: layer.timeout_secs.unwrap_or(60),
            cache_ttl_secs: layer.cache_ttl_secs.unwrap_or(7 * 24 * 3600),
            use_lockfile: layer.use_lockfile.unwrap_or(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn project_layer_overrides_global_field_by_field() {
        let tmp = TempDir::new().unwrap();
        let global_path = tmp.path().join("global.toml");
        let project_path = tmp.path().join("project.toml");

        std::fs::write(&global_path, "offline = false\nmax_parallel = 2\n").unwrap();
        std::fs::write(&project_path, "max_parallel = 8\n").unwrap();

        let config = Config::load(&global_path, &project_path, PathBuf::from("/default")).unwrap();
        assert_eq!(config.max_parallel, 8);
        assert!(!config.offline);
    }

    #[test]
    fn missing_files_fall_back_to_defaults() {
        let tmp = TempDir::new().unwrap();
        let config =
            Config::load(&tmp.path().join("none1.toml"), &tmp.path().join("none2.toml"), PathBuf::from("/default"))
                .unwrap();
        assert_eq!(config.cache_dir, PathBuf::from("/default"));
        assert_eq!(config.max_parallel, 4);
        assert!(config.use_lockfile);
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.toml");
        std::fs::write(&path, "not = [valid toml").unwrap();
        let err = ConfigLayer::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_, _)));
    }
}
