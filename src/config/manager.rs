//! Facade over resolution, mutation, and the snapshot cache.

use super::catalog::Catalog;
use super::merge::{MergeReport, merge_configs};
use super::mutator::Mutator;
use super::resolver::{ConfigQuery, resolve};
use super::snapshot::SnapshotCache;
use super::store::load_fragment;
use super::validation::validate_section;
use super::watcher::{FragmentWatcherHandle, start_fragment_watcher};
use super::{ConfigTree, SharedCatalog};
use crate::error::{ConfigError, ConfigResult, RuleViolation};
use crate::settings::EngineSettings;
use arc_swap::ArcSwap;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Rule violations found in one section of one service's fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionReport {
    pub service: String,
    pub section: String,
    pub violations: Vec<RuleViolation>,
}

/// Entry point for reading and changing service configuration.
///
/// The catalog is injected at construction and can be swapped as a whole
/// with [`replace_catalog`](Self::replace_catalog).
#[derive(Debug)]
pub struct ConfigManager {
    settings: EngineSettings,
    catalog: SharedCatalog,
    mutator: Mutator,
    cache: SnapshotCache,
}

impl ConfigManager {
    pub fn new(settings: EngineSettings, catalog: Catalog) -> Self {
        let catalog: SharedCatalog = Arc::new(ArcSwap::from_pointee(catalog));
        Self {
            mutator: Mutator::new(settings.clone(), Arc::clone(&catalog)),
            cache: SnapshotCache::new(settings.clone()),
            settings,
            catalog,
        }
    }

    /// Build from settings, loading the catalog declaration if one is set.
    pub fn from_settings(settings: EngineSettings) -> ConfigResult<Self> {
        let catalog = match settings.catalog_path {
            Some(ref path) => Catalog::load(path)?,
            None => Catalog::builtin(),
        };
        Ok(Self::new(settings, catalog))
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// The catalog currently in effect.
    pub fn catalog(&self) -> Arc<Catalog> {
        self.catalog.load_full()
    }

    /// Swap in a new catalog for all later operations.
    pub fn replace_catalog(&self, catalog: Catalog) {
        self.catalog.store(Arc::new(catalog));
    }

    /// One service's fragment as stored; absent fragments are empty.
    pub fn get_service_config(&self, service: &str) -> ConfigResult<ConfigTree> {
        let path = self.settings.fragment_path(service)?;
        load_fragment(&path).map(Value::Object)
    }

    /// The merged snapshot, rebuilt first when missing or stale.
    pub fn get_full_config(&self) -> ConfigResult<ConfigTree> {
        self.cache.read()
    }

    /// Resolve a query: load, substitute, apply defaults, project.
    pub fn get_config(&self, query: &ConfigQuery) -> ConfigResult<ConfigTree> {
        let source = match query.service {
            Some(ref service) => self.get_service_config(service)?,
            None => self.get_full_config()?,
        };
        debug!("Resolving {:?}", query);
        Ok(resolve(&source, query, &self.settings.env_prefix, |name| {
            std::env::var(name).ok()
        }))
    }

    pub fn set_arg(&self, service: &str, section: &str, key: &str, value: Value) -> ConfigResult<()> {
        self.mutator.set_arg(service, section, key, value)
    }

    pub fn delete_arg(&self, service: &str, section: &str, key: &str) -> ConfigResult<bool> {
        self.mutator.delete_arg(service, section, key)
    }

    pub fn delete_section(&self, service: &str, section: &str) -> ConfigResult<bool> {
        self.mutator.delete_section(service, section)
    }

    /// Fold all fragments without touching the snapshot.
    pub fn merge_configs(&self) -> MergeReport {
        merge_configs(&self.settings)
    }

    /// Rebuild and persist the snapshot.
    pub fn refresh(&self) -> ConfigResult<MergeReport> {
        self.cache.refresh()
    }

    pub fn snapshot(&self) -> &SnapshotCache {
        &self.cache
    }

    /// Audit a service's fragment against its schema.
    ///
    /// Only sections present in the fragment are checked; absent sections
    /// fall back to catalog defaults when first written.
    pub fn validate_service(&self, service: &str) -> ConfigResult<Vec<SectionReport>> {
        let path = self.settings.fragment_path(service)?;
        let fragment = load_fragment(&path)?;
        let catalog = self.catalog.load();

        let mut reports = Vec::new();
        for (section, rules) in catalog.schema_for(service) {
            let violations = match fragment.get(section) {
                Some(Value::Object(map)) => validate_section(map, rules),
                Some(_) => {
                    return Err(ConfigError::invalid_structure(
                        &path,
                        format!("section {section} is not a mapping"),
                    ));
                }
                None => continue,
            };
            if !violations.is_empty() {
                reports.push(SectionReport {
                    service: service.to_string(),
                    section: section.clone(),
                    violations,
                });
            }
        }
        Ok(reports)
    }

    /// Register `callback` for fragment changes under the root.
    pub fn watch<F>(&self, callback: F) -> ConfigResult<FragmentWatcherHandle>
    where
        F: Fn() + Send + 'static,
    {
        start_fragment_watcher(&self.settings, callback)
    }
}
