//! Deep merge of configuration trees and the resilient fragment fold.
//!
//! Mappings are merged recursively; every other value on the overlay side
//! replaces the base value outright. Sequences are replaced, not concatenated.
//!
//! **Type mismatches are not errors.** A mapping in `base` overwritten by a
//! scalar in `overlay` (or the reverse) silently takes the overlay's value.
//! This can hide authoring mistakes such as `net: 8080` in one fragment
//! shadowing `net: {port: 8080}` in another; `validate` is the place to catch
//! those.

use super::locator::find_fragments;
use super::store::load_tree;
use crate::error::ConfigError;
use crate::settings::EngineSettings;
use serde_json::{Map, Value};
use std::path::PathBuf;
use tracing::{debug, warn};

/// Deep merge two trees, with `overlay` taking precedence over `base`.
///
/// Neither input is modified; the result is a new tree.
///
/// # Example
/// ```
/// use serde_json::json;
/// use fragment_config::config::deep_merge;
///
/// let base = json!({"net": {"port": 8080, "host": "localhost"}, "tags": ["a", "b"]});
/// let overlay = json!({"net": {"port": 9000}, "tags": ["c"]});
/// let merged = deep_merge(&base, &overlay);
/// assert_eq!(merged, json!({"net": {"port": 9000, "host": "localhost"}, "tags": ["c"]}));
/// ```
pub fn deep_merge(base: &Value, overlay: &Value) -> Value {
    merge_owned(base.clone(), overlay.clone())
}

/// Owned variant used by the folds; consumes both sides.
pub(crate) fn merge_owned(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                // Merge in place so existing keys keep their position.
                match base_map.get_mut(&key) {
                    Some(slot) => {
                        let base_value = slot.take();
                        *slot = merge_owned(base_value, overlay_value);
                    }
                    None => {
                        base_map.insert(key, overlay_value);
                    }
                }
            }
            Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// Merge multiple trees in order, with later trees taking precedence.
pub fn deep_merge_all(values: impl IntoIterator<Item = Value>) -> Value {
    values
        .into_iter()
        .fold(Value::Object(Map::new()), merge_owned)
}

/// A fragment that could not be folded into the merge.
#[derive(Debug)]
pub struct FragmentError {
    pub path: PathBuf,
    pub error: ConfigError,
}

/// Result of a resilient merge: the best-effort tree plus skipped fragments.
#[derive(Debug)]
pub struct MergeReport {
    pub tree: Value,
    pub errors: Vec<FragmentError>,
}

impl MergeReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Fold every fragment under the root, in sorted path order.
///
/// A fragment that fails to read or parse is recorded in the report and the
/// fold continues with the rest.
pub fn merge_configs(settings: &EngineSettings) -> MergeReport {
    let mut tree = Value::Object(Map::new());
    let mut errors = Vec::new();

    for path in find_fragments(settings) {
        match load_tree(&path) {
            Ok(Some(fragment)) => {
                debug!("Merging fragment {}", path.display());
                tree = merge_owned(tree, fragment);
            }
            Ok(None) => {
                // Removed between discovery and read.
                debug!("Fragment vanished before read: {}", path.display());
            }
            Err(error) => {
                warn!("Skipping fragment {}: {}", path.display(), error);
                errors.push(FragmentError { path, error });
            }
        }
    }

    MergeReport { tree, errors }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_simple_objects() {
        let base = json!({"a": 1, "b": 2});
        let overlay = json!({"b": 3, "c": 4});
        let result = deep_merge(&base, &overlay);
        assert_eq!(result, json!({"a": 1, "b": 3, "c": 4}));
    }

    #[test]
    fn test_merge_nested_objects() {
        let base = json!({
            "net": {"host": "localhost", "port": 8080},
            "debug": true
        });
        let overlay = json!({
            "net": {"port": 9000}
        });
        let result = deep_merge(&base, &overlay);
        assert_eq!(
            result,
            json!({
                "net": {"host": "localhost", "port": 9000},
                "debug": true
            })
        );
    }

    #[test]
    fn test_inputs_are_not_mutated() {
        let base = json!({"net": {"port": 8080}});
        let overlay = json!({"net": {"timeout": 5}});
        let _ = deep_merge(&base, &overlay);
        assert_eq!(base, json!({"net": {"port": 8080}}));
        assert_eq!(overlay, json!({"net": {"timeout": 5}}));
    }

    #[test]
    fn test_arrays_replaced_not_merged() {
        let base = json!({"items": [1, 2, 3]});
        let overlay = json!({"items": [4, 5]});
        let result = deep_merge(&base, &overlay);
        assert_eq!(result, json!({"items": [4, 5]}));
    }

    #[test]
    fn test_null_overlay_replaces_base() {
        let base = json!({"a": 1, "b": {"c": 2}});
        let overlay = json!({"a": null, "b": {"c": null}});
        let result = deep_merge(&base, &overlay);
        assert_eq!(result, json!({"a": null, "b": {"c": null}}));
    }

    #[test]
    fn test_deep_nested_merge() {
        let base = json!({"l1": {"l2": {"l3": {"a": 1, "b": 2}}}});
        let overlay = json!({"l1": {"l2": {"l3": {"b": 3, "c": 4}}}});
        let result = deep_merge(&base, &overlay);
        assert_eq!(result, json!({"l1": {"l2": {"l3": {"a": 1, "b": 3, "c": 4}}}}));
    }

    #[test]
    fn test_merge_all_later_wins() {
        let values = vec![json!({"a": 1}), json!({"b": 2}), json!({"a": 3, "c": 4})];
        let result = deep_merge_all(values);
        assert_eq!(result, json!({"a": 3, "b": 2, "c": 4}));
    }

    #[test]
    fn test_merge_all_empty_is_empty_mapping() {
        assert_eq!(deep_merge_all(Vec::new()), json!({}));
    }

    #[test]
    fn test_scalar_replaces_mapping() {
        let base = json!({"value": {"nested": true}});
        let overlay = json!({"value": 42});
        assert_eq!(deep_merge(&base, &overlay), json!({"value": 42}));
    }

    #[test]
    fn test_mapping_replaces_scalar() {
        let base = json!({"value": 42});
        let overlay = json!({"value": {"nested": true}});
        assert_eq!(deep_merge(&base, &overlay), json!({"value": {"nested": true}}));
    }

    #[test]
    fn test_merged_keys_keep_base_order() {
        let base = json!({"z": 1, "a": 2});
        let overlay = json!({"m": 3, "z": 4});
        let result = deep_merge(&base, &overlay);
        let keys: Vec<&str> = result
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }
}
