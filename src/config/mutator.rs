//! Validation-gated read-modify-write against a single fragment.
//!
//! Every mutation loads the whole fragment, edits it in memory, and rewrites
//! the whole file atomically. Mutations of the same fragment are serialized
//! through a per-path lock; the merged snapshot is never touched.

use super::SharedCatalog;
use super::store::{load_fragment, write_tree_atomic};
use super::validation::validate_leaf;
use crate::error::{ConfigError, ConfigResult};
use crate::settings::EngineSettings;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// One lock per fragment path, created on first use.
#[derive(Debug, Default)]
pub struct FragmentLocks {
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl FragmentLocks {
    /// The lock guarding `path`.
    pub fn for_path(&self, path: &Path) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(locks.entry(path.to_path_buf()).or_default())
    }
}

/// Applies `set_arg` / `delete_arg` / `delete_section` to fragments.
#[derive(Debug)]
pub struct Mutator {
    settings: EngineSettings,
    catalog: SharedCatalog,
    locks: FragmentLocks,
}

impl Mutator {
    pub fn new(settings: EngineSettings, catalog: SharedCatalog) -> Self {
        Self {
            settings,
            catalog,
            locks: FragmentLocks::default(),
        }
    }

    /// Set `section.key = value` in `service`'s fragment.
    ///
    /// A missing section is seeded from the catalog defaults. If the schema
    /// has a rule for the key, the value must satisfy it; otherwise nothing is
    /// written and a validation error is returned.
    pub fn set_arg(&self, service: &str, section: &str, key: &str, value: Value) -> ConfigResult<()> {
        let path = self.settings.fragment_path(service)?;
        let lock = self.locks.for_path(&path);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        let catalog = self.catalog.load();
        let mut config = load_fragment(&path)?;

        if !config.contains_key(section) {
            let seeded = catalog.default_section(service, section).unwrap_or_default();
            debug!("Seeding {service}.{section} with {} default keys", seeded.len());
            config.insert(section.to_string(), Value::Object(seeded));
        }
        let Some(Value::Object(section_map)) = config.get_mut(section) else {
            return Err(ConfigError::invalid_structure(
                &path,
                format!("section {section} is not a mapping"),
            ));
        };
        section_map.insert(key.to_string(), value.clone());

        if let Some(rule) = catalog
            .schema_for(service)
            .get(section)
            .and_then(|rules| rules.get(key))
        {
            let violations = validate_leaf(key, &value, rule);
            if !violations.is_empty() {
                return Err(ConfigError::Validation {
                    service: service.to_string(),
                    section: section.to_string(),
                    key: key.to_string(),
                    value,
                    violations,
                });
            }
        }

        write_tree_atomic(&path, &Value::Object(config))?;
        info!("Set {service}.{section}.{key}");
        Ok(())
    }

    /// Remove `section.key`. Returns `false` (and writes nothing) if absent.
    pub fn delete_arg(&self, service: &str, section: &str, key: &str) -> ConfigResult<bool> {
        self.rewrite(service, |config| match config.get_mut(section) {
            Some(Value::Object(section_map)) => section_map.shift_remove(key).is_some(),
            _ => false,
        })
        .inspect(|&done| {
            if done {
                info!("Deleted {service}.{section}.{key}");
            }
        })
    }

    /// Remove a whole section. Returns `false` (and writes nothing) if absent.
    pub fn delete_section(&self, service: &str, section: &str) -> ConfigResult<bool> {
        self.rewrite(service, |config| config.shift_remove(section).is_some())
            .inspect(|&done| {
                if done {
                    info!("Deleted section {service}.{section}");
                }
            })
    }

    /// Load, apply `edit`, and rewrite only if `edit` reports a change.
    fn rewrite<F>(&self, service: &str, edit: F) -> ConfigResult<bool>
    where
        F: FnOnce(&mut Map<String, Value>) -> bool,
    {
        let path = self.settings.fragment_path(service)?;
        let lock = self.locks.for_path(&path);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut config = load_fragment(&path)?;
        if !edit(&mut config) {
            debug!("Nothing to delete in {}", path.display());
            return Ok(false);
        }
        write_tree_atomic(&path, &Value::Object(config))?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Catalog;
    use crate::config::store::load_tree;
    use crate::error::ErrorCode;
    use arc_swap::ArcSwap;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn mutator(root: &Path) -> Mutator {
        let catalog = Arc::new(ArcSwap::from_pointee(Catalog::builtin()));
        Mutator::new(EngineSettings::with_root(root), catalog)
    }

    #[test]
    fn test_set_arg_seeds_section_from_defaults() {
        let temp = TempDir::new().unwrap();
        let m = mutator(temp.path());
        m.set_arg("memApp", "watchdog", "interval", json!(60)).unwrap();

        let tree = load_tree(&temp.path().join("memApp/config.yml")).unwrap().unwrap();
        assert_eq!(
            tree,
            json!({"watchdog": {
                "enabled": false,
                "interval": 60,
                "log_path": "/var/log/memapp/watchdog.log"
            }})
        );
    }

    #[test]
    fn test_set_arg_without_defaults_starts_empty() {
        let temp = TempDir::new().unwrap();
        let m = mutator(temp.path());
        m.set_arg("api", "http", "port", json!(80)).unwrap();

        let tree = load_tree(&temp.path().join("api/config.yml")).unwrap().unwrap();
        assert_eq!(tree, json!({"http": {"port": 80}}));
    }

    #[test]
    fn test_set_arg_validation_failure_writes_nothing() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("memApp/config.yml");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "watchdog:\n  interval: 30\n").unwrap();
        let before = fs::read(&path).unwrap();
        let mtime = fs::metadata(&path).unwrap().modified().unwrap();

        let err = mutator(temp.path())
            .set_arg("memApp", "watchdog", "interval", json!(0))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
        assert_eq!(fs::read(&path).unwrap(), before);
        assert_eq!(fs::metadata(&path).unwrap().modified().unwrap(), mtime);
    }

    #[test]
    fn test_set_arg_on_scalar_section_is_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("svc/config.yml");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "net: 8080\n").unwrap();

        let err = mutator(temp.path())
            .set_arg("svc", "net", "port", json!(1))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidStructure);
        assert_eq!(fs::read_to_string(&path).unwrap(), "net: 8080\n");
    }

    #[test]
    fn test_delete_arg_and_section() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("svc/config.yml");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "a:\n  x: 1\n  y: 2\nb:\n  z: 3\n").unwrap();
        let m = mutator(temp.path());

        assert!(m.delete_arg("svc", "a", "x").unwrap());
        assert!(!m.delete_arg("svc", "a", "x").unwrap());
        assert!(!m.delete_arg("svc", "nope", "x").unwrap());
        assert!(m.delete_section("svc", "b").unwrap());
        assert!(!m.delete_section("svc", "b").unwrap());

        let tree = load_tree(&path).unwrap().unwrap();
        assert_eq!(tree, json!({"a": {"y": 2}}));
    }

    #[test]
    fn test_delete_absent_writes_nothing() {
        let temp = TempDir::new().unwrap();
        let m = mutator(temp.path());
        assert!(!m.delete_section("ghost", "s").unwrap());
        assert!(!temp.path().join("ghost/config.yml").exists());
    }

    #[test]
    fn test_locks_are_shared_per_path() {
        let locks = FragmentLocks::default();
        let a = locks.for_path(Path::new("x/config.yml"));
        let b = locks.for_path(Path::new("x/config.yml"));
        let c = locks.for_path(Path::new("y/config.yml"));
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
    }
}
