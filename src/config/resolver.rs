//! Read-path resolution: substitute, apply caller defaults, project.

use super::ConfigTree;
use super::env::substitute_env_with;
use super::merge::merge_owned;
use serde_json::{Map, Value};

/// Selectors for [`ConfigManager::get_config`](super::ConfigManager::get_config).
///
/// Exactly one projection applies per call, chosen in this order:
/// `multi_sections`, then `section`, then `keys`, then the whole tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigQuery {
    /// Resolve one service's fragment instead of the merged snapshot.
    pub service: Option<String>,
    /// Single section to extract.
    pub section: Option<String>,
    /// Leaf keys to keep.
    pub keys: Option<Vec<String>>,
    /// Several sections to extract at once.
    pub multi_sections: Option<Vec<String>>,
    /// Nest a single-section result under its name.
    pub with_section: bool,
    /// Caller defaults merged beneath the resolved tree.
    pub defaults: Option<ConfigTree>,
}

impl Default for ConfigQuery {
    fn default() -> Self {
        Self {
            service: None,
            section: None,
            keys: None,
            multi_sections: None,
            with_section: true,
            defaults: None,
        }
    }
}

impl ConfigQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    pub fn section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    pub fn keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keys = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    pub fn multi_sections<I, S>(mut self, sections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.multi_sections = Some(sections.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_section(mut self, with_section: bool) -> Self {
        self.with_section = with_section;
        self
    }

    pub fn defaults(mut self, defaults: ConfigTree) -> Self {
        self.defaults = Some(defaults);
        self
    }
}

/// Run steps 2-4 of the read path over an already loaded source tree.
///
/// The source is never modified; the returned tree shares nothing with it.
pub fn resolve<F>(source: &ConfigTree, query: &ConfigQuery, env_prefix: &str, lookup: F) -> ConfigTree
where
    F: Fn(&str) -> Option<String>,
{
    let substituted = substitute_env_with(source, env_prefix, lookup);

    let tree = match query.defaults {
        Some(ref defaults) => merge_owned(defaults.clone(), substituted),
        None => substituted,
    };

    project(tree, query)
}

/// Apply the single projection selected by `query`.
pub fn project(tree: ConfigTree, query: &ConfigQuery) -> ConfigTree {
    let keys = query.keys.as_deref();

    if let Some(ref sections) = query.multi_sections {
        let result: Map<String, Value> = sections
            .iter()
            .map(|name| {
                let section = section_of(&tree, name);
                let section = match keys {
                    Some(keys) => filter_keys(&section, keys),
                    None => section,
                };
                (name.clone(), section)
            })
            .collect();
        return Value::Object(result);
    }

    if let Some(ref name) = query.section {
        let section = section_of(&tree, name);
        let section = match keys {
            Some(keys) => filter_keys(&section, keys),
            None => section,
        };
        if query.with_section {
            let mut wrapped = Map::new();
            wrapped.insert(name.clone(), section);
            return Value::Object(wrapped);
        }
        return section;
    }

    if let Some(keys) = keys {
        return Value::Object(first_match_per_key(&tree, keys));
    }

    tree
}

/// A top-level section's value, or an empty mapping when absent.
fn section_of(tree: &ConfigTree, name: &str) -> Value {
    tree.get(name)
        .cloned()
        .unwrap_or_else(|| Value::Object(Map::new()))
}

/// Keep only `keys` that exist in the section, in the order requested.
fn filter_keys(section: &Value, keys: &[String]) -> Value {
    let Value::Object(map) = section else {
        return Value::Object(Map::new());
    };
    Value::Object(
        keys.iter()
            .filter_map(|k| map.get(k).map(|v| (k.clone(), v.clone())))
            .collect(),
    )
}

/// For each key, the value from the first section (in tree order) holding it.
fn first_match_per_key(tree: &ConfigTree, keys: &[String]) -> Map<String, Value> {
    let mut flat = Map::new();
    let Value::Object(sections) = tree else {
        return flat;
    };

    for key in keys {
        let found = sections
            .values()
            .filter_map(Value::as_object)
            .find_map(|section| section.get(key));
        if let Some(value) = found {
            flat.insert(key.clone(), value.clone());
        }
    }
    flat
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn source() -> ConfigTree {
        json!({
            "net": {"port": 8080, "host": "$HOST"},
            "log": {"level": "INFO", "port": 514},
            "flag": true
        })
    }

    #[test]
    fn test_full_tree_when_no_selector() {
        let out = resolve(&source(), &ConfigQuery::new(), "$", no_env);
        assert_eq!(out, source());
    }

    #[test]
    fn test_substitution_happens_before_projection() {
        let query = ConfigQuery::new().section("net");
        let out = resolve(&source(), &query, "$", |n| {
            (n == "HOST").then(|| "db.local".to_string())
        });
        assert_eq!(out, json!({"net": {"port": 8080, "host": "db.local"}}));
    }

    #[test]
    fn test_section_unwrapped() {
        let query = ConfigQuery::new().section("log").with_section(false);
        let out = resolve(&source(), &query, "$", no_env);
        assert_eq!(out, json!({"level": "INFO", "port": 514}));
    }

    #[test]
    fn test_section_with_keys() {
        let query = ConfigQuery::new().section("log").keys(["level", "missing"]);
        let out = resolve(&source(), &query, "$", no_env);
        assert_eq!(out, json!({"log": {"level": "INFO"}}));
    }

    #[test]
    fn test_missing_section_is_empty() {
        let query = ConfigQuery::new().section("nope");
        let out = resolve(&source(), &query, "$", no_env);
        assert_eq!(out, json!({"nope": {}}));
    }

    #[test]
    fn test_multi_sections_take_priority() {
        let query = ConfigQuery::new()
            .multi_sections(["net", "absent"])
            .section("log")
            .keys(["port"]);
        let out = resolve(&source(), &query, "$", no_env);
        assert_eq!(out, json!({"net": {"port": 8080}, "absent": {}}));
    }

    #[test]
    fn test_keys_first_section_wins() {
        let query = ConfigQuery::new().keys(["port", "level", "unknown"]);
        let out = resolve(&source(), &query, "$", no_env);
        assert_eq!(out, json!({"port": 8080, "level": "INFO"}));
    }

    #[test]
    fn test_defaults_sit_beneath_resolved_values() {
        let query = ConfigQuery::new().defaults(json!({
            "log": {"level": "WARNING", "rotation": "weekly"},
            "extra": 1
        }));
        let out = resolve(&source(), &query, "$", no_env);
        assert_eq!(out["log"], json!({"level": "INFO", "port": 514, "rotation": "weekly"}));
        assert_eq!(out["extra"], json!(1));
    }

    #[test]
    fn test_defaults_only_on_empty_source() {
        let query = ConfigQuery::new().defaults(json!({"level": "WARNING", "rotation": "weekly"}));
        let out = resolve(&json!({}), &query, "$", no_env);
        assert_eq!(out, json!({"level": "WARNING", "rotation": "weekly"}));
    }

    #[test]
    fn test_result_is_independent_of_source() {
        let src = source();
        let mut out = resolve(&src, &ConfigQuery::new(), "$", no_env);
        out["net"]["port"] = json!(1);
        assert_eq!(src["net"]["port"], json!(8080));
    }
}
