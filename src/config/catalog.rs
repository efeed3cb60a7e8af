//! Defaults and schema catalogs.
//!
//! Both tables are keyed by service name and are read-only once built. A
//! catalog can be replaced as a whole (for example after reloading a
//! declaration file) but entries are never edited in place.

use super::ConfigTree;
use super::store::{parse_tree, read_text};
use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::path::Path;

/// Value type a rule may require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Integer,
    /// Any number; integers are accepted.
    Float,
    Number,
    Boolean,
    List,
    Dict,
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ValueType::String => "string",
            ValueType::Integer => "integer",
            ValueType::Float => "float",
            ValueType::Number => "number",
            ValueType::Boolean => "boolean",
            ValueType::List => "list",
            ValueType::Dict => "dict",
        };
        f.write_str(name)
    }
}

/// Validation rule for a single leaf key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleDescriptor {
    /// Required value type (unchecked when absent).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<ValueType>,

    /// Whether the key must be present in its section.
    #[serde(default)]
    pub required: bool,

    /// Whether `null` is an acceptable value.
    #[serde(default)]
    pub nullable: bool,

    /// Closed set of accepted values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<Value>>,

    /// Inclusive numeric lower bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,

    /// Inclusive numeric upper bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl RuleDescriptor {
    pub fn of_type(value_type: ValueType) -> Self {
        Self {
            value_type: Some(value_type),
            ..Self::default()
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn with_max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn with_allowed<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.allowed = Some(values.into_iter().map(Into::into).collect());
        self
    }
}

/// Leaf key → rule for one section.
pub type SectionRules = BTreeMap<String, RuleDescriptor>;

/// Section → rules for one service.
pub type ServiceSchema = BTreeMap<String, SectionRules>;

static EMPTY_SCHEMA: ServiceSchema = BTreeMap::new();

/// Per-service defaults and validation rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    /// Service → section → leaf defaults.
    #[serde(default)]
    defaults: Map<String, Value>,

    /// Service → section → leaf rules.
    #[serde(default, rename = "schemas")]
    schemas: BTreeMap<String, ServiceSchema>,
}

impl Catalog {
    /// An empty catalog: every service has no defaults and no rules.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a catalog from explicit tables.
    pub fn new(defaults: Map<String, Value>, schemas: BTreeMap<String, ServiceSchema>) -> Self {
        Self { defaults, schemas }
    }

    /// The tables shipped with the application.
    pub fn builtin() -> Self {
        let defaults = json!({
            "memApp": {
                "watchdog": {
                    "enabled": false,
                    "interval": 30,
                    "log_path": "/var/log/memapp/watchdog.log"
                },
                "database": {
                    "host": "localhost",
                    "port": 5432,
                    "user": "memapp",
                    "password": ""
                }
            },
            "logger": {
                "logger": {
                    "level": "WARNING",
                    "file": "/var/log/memapp/app.log",
                    "rotation": "weekly"
                }
            }
        });

        let mut schemas = BTreeMap::new();

        let mut mem_app = ServiceSchema::new();
        mem_app.insert(
            "watchdog".to_string(),
            SectionRules::from([
                (
                    "enabled".to_string(),
                    RuleDescriptor::of_type(ValueType::Boolean).required(),
                ),
                (
                    "interval".to_string(),
                    RuleDescriptor::of_type(ValueType::Integer)
                        .with_min(1.0)
                        .required(),
                ),
                (
                    "log_path".to_string(),
                    RuleDescriptor::of_type(ValueType::String).required(),
                ),
            ]),
        );
        mem_app.insert(
            "database".to_string(),
            SectionRules::from([
                (
                    "host".to_string(),
                    RuleDescriptor::of_type(ValueType::String).required(),
                ),
                (
                    "port".to_string(),
                    RuleDescriptor::of_type(ValueType::Integer)
                        .with_min(1.0)
                        .required(),
                ),
                (
                    "user".to_string(),
                    RuleDescriptor::of_type(ValueType::String).required(),
                ),
                (
                    "password".to_string(),
                    RuleDescriptor::of_type(ValueType::String),
                ),
            ]),
        );
        schemas.insert("memApp".to_string(), mem_app);

        let mut logger = ServiceSchema::new();
        logger.insert(
            "logger".to_string(),
            SectionRules::from([
                (
                    "level".to_string(),
                    RuleDescriptor::of_type(ValueType::String)
                        .with_allowed(["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])
                        .required(),
                ),
                (
                    "file".to_string(),
                    RuleDescriptor::of_type(ValueType::String).required(),
                ),
                (
                    "rotation".to_string(),
                    RuleDescriptor::of_type(ValueType::String)
                        .with_allowed(["daily", "weekly"])
                        .required(),
                ),
            ]),
        );
        schemas.insert("logger".to_string(), logger);

        let defaults = match defaults {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self { defaults, schemas }
    }

    /// Load a catalog declaration from a YAML file.
    ///
    /// The file has two optional top-level keys, `defaults` and `schemas`.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let text = read_text(path)?.ok_or_else(|| ConfigError::NotFound {
            path: path.to_path_buf(),
        })?;
        let map = parse_tree(path, &text)?;
        let catalog: Catalog =
            serde_json::from_value(Value::Object(map)).map_err(|e| ConfigError::parse(path, e))?;

        for (service, tree) in &catalog.defaults {
            if !tree.is_object() {
                return Err(ConfigError::invalid_structure(
                    path,
                    format!("defaults for {service} must be a mapping of sections"),
                ));
            }
        }
        Ok(catalog)
    }

    /// Default sections for `service`; empty for unknown services.
    pub fn defaults_for(&self, service: &str) -> ConfigTree {
        self.defaults
            .get(service)
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()))
    }

    /// Default content for one section of `service`, if the catalog has one.
    pub fn default_section(&self, service: &str, section: &str) -> Option<Map<String, Value>> {
        match self.defaults.get(service)?.get(section)? {
            Value::Object(map) => Some(map.clone()),
            _ => None,
        }
    }

    /// Validation rules for `service`; empty for unknown services.
    pub fn schema_for(&self, service: &str) -> &ServiceSchema {
        self.schemas.get(service).unwrap_or(&EMPTY_SCHEMA)
    }

    /// Services that have either defaults or rules.
    pub fn services(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .defaults
            .keys()
            .cloned()
            .chain(self.schemas.keys().cloned())
            .collect();
        names.sort();
        names.dedup();
        names
    }
}
