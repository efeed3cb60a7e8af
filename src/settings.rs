//! Engine settings: where fragments live and how they are named.
//!
//! ## Environment Variables
//! - `FRAGCONF_ROOT` - Configuration root directory (default: `./config`)
//! - `FRAGCONF_SNAPSHOT` - Snapshot file name at the root (default: `config_full.yml`)
//! - `FRAGCONF_CATALOG` - Optional YAML catalog declaration

use crate::error::{ConfigError, ConfigResult};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

/// Default fragment file name, one per service directory.
pub const DEFAULT_FRAGMENT_FILE: &str = "config.yml";

/// Default snapshot file name, at the configuration root.
pub const DEFAULT_SNAPSHOT_FILE: &str = "config_full.yml";

/// Leaf prefix that marks an environment reference.
pub const DEFAULT_ENV_PREFIX: &str = "$";

/// Settings shared by the locator, resolver, mutator, cache, and watcher.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Configuration root directory.
    pub root: PathBuf,
    /// File name every fragment uses.
    pub fragment_file_name: String,
    /// File name of the merged snapshot at the root.
    pub snapshot_file_name: String,
    /// Sentinel prefix for environment substitution.
    pub env_prefix: String,
    /// Debounce window for the change watcher.
    pub debounce: Duration,
    /// Optional catalog declaration file.
    pub catalog_path: Option<PathBuf>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::discover()
    }
}

impl EngineSettings {
    /// Discover settings from environment and defaults.
    pub fn discover() -> Self {
        let root = std::env::var("FRAGCONF_ROOT")
            .ok()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("config"));

        let mut settings = Self::with_root(root);

        if let Ok(snapshot) = std::env::var("FRAGCONF_SNAPSHOT") {
            settings.snapshot_file_name = snapshot;
        }
        settings.catalog_path = std::env::var("FRAGCONF_CATALOG").ok().map(PathBuf::from);

        settings
    }

    /// Create settings with an explicit root and default naming.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            fragment_file_name: DEFAULT_FRAGMENT_FILE.to_string(),
            snapshot_file_name: DEFAULT_SNAPSHOT_FILE.to_string(),
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
            debounce: Duration::from_millis(500),
            catalog_path: None,
        }
    }

    /// Path of the fragment owned by `service`: `<root>/<service>/<fragment>`.
    pub fn fragment_path(&self, service: &str) -> ConfigResult<PathBuf> {
        validate_service_name(service)?;
        Ok(self.root.join(service).join(&self.fragment_file_name))
    }

    /// Path of the merged snapshot.
    pub fn snapshot_path(&self) -> PathBuf {
        self.root.join(&self.snapshot_file_name)
    }

    /// Path of the fingerprint written alongside the snapshot.
    pub fn fingerprint_path(&self) -> PathBuf {
        self.root
            .join(format!("{}.fingerprint", self.snapshot_file_name))
    }

    /// Whether `path` names a fragment file (regardless of location).
    pub fn is_fragment_file(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n == self.fragment_file_name)
    }
}

/// A service name must be exactly one normal path component.
fn validate_service_name(service: &str) -> ConfigResult<()> {
    if service.is_empty() {
        return Err(ConfigError::invalid_service(service, "name is empty"));
    }
    let mut components = Path::new(service).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !service.contains(['/', '\\']) => Ok(()),
        _ => Err(ConfigError::invalid_service(
            service,
            "name must be a single directory name",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_fragment_path_layout() {
        let settings = EngineSettings::with_root("/etc/app");
        let path = settings.fragment_path("memApp").unwrap();
        assert_eq!(path, PathBuf::from("/etc/app/memApp/config.yml"));
        assert_eq!(
            settings.snapshot_path(),
            PathBuf::from("/etc/app/config_full.yml")
        );
    }

    #[test]
    fn test_service_names_cannot_escape_root() {
        let settings = EngineSettings::with_root("/etc/app");
        for bad in ["", ".", "..", "a/b", "../etc", "/abs", "a\\b"] {
            let err = settings.fragment_path(bad).unwrap_err();
            assert_eq!(err.code(), ErrorCode::InvalidService, "accepted {bad:?}");
        }
    }

    #[test]
    fn test_is_fragment_file() {
        let settings = EngineSettings::with_root("cfg");
        assert!(settings.is_fragment_file(Path::new("cfg/logger/config.yml")));
        assert!(!settings.is_fragment_file(Path::new("cfg/config_full.yml")));
        assert!(!settings.is_fragment_file(Path::new("cfg/logger/config.yaml")));
    }
}
