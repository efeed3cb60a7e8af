//! Environment substitution for `$NAME` leaves.
//!
//! A string leaf that starts with the prefix names an environment variable.
//! If the variable is set, the leaf becomes its value; if not, the leaf is
//! kept verbatim, prefix included. Numbers, booleans and nulls are never
//! touched. Substitution runs on every read and is never cached.

use super::ConfigTree;
use serde_json::Value;

/// Substitute from the process environment using the `$` prefix.
pub fn substitute_env(tree: &ConfigTree) -> ConfigTree {
    substitute_env_with(tree, crate::settings::DEFAULT_ENV_PREFIX, |name| {
        std::env::var(name).ok()
    })
}

/// Substitute using an explicit prefix and variable lookup.
pub fn substitute_env_with<F>(tree: &ConfigTree, prefix: &str, lookup: F) -> ConfigTree
where
    F: Fn(&str) -> Option<String>,
{
    substitute(tree, prefix, &lookup)
}

fn substitute<F>(value: &Value, prefix: &str, lookup: &F) -> Value
where
    F: Fn(&str) -> Option<String>,
{
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), substitute(v, prefix, lookup)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|v| substitute(v, prefix, lookup))
                .collect(),
        ),
        Value::String(s) => match s.strip_prefix(prefix) {
            Some(name) if !prefix.is_empty() => match lookup(name) {
                Some(resolved) => Value::String(resolved),
                None => value.clone(),
            },
            _ => value.clone(),
        },
        other => other.clone(),
    }
}
