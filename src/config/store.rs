//! Reading and atomically rewriting YAML tree files.

use super::ConfigTree;
use crate::error::{ConfigError, ConfigResult};
use serde_json::{Map, Value};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Read a file, returning `None` when it does not exist.
pub(crate) fn read_text(path: &Path) -> ConfigResult<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ConfigError::read(path, e)),
    }
}

/// Parse YAML text into a mapping. Empty and `null` documents are empty mappings.
pub(crate) fn parse_tree(path: &Path, text: &str) -> ConfigResult<Map<String, Value>> {
    if text.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_yaml::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(Value::Null) => Ok(Map::new()),
        Ok(other) => Err(ConfigError::parse(
            path,
            format!("document root must be a mapping, found {}", kind_name(&other)),
        )),
        Err(e) => Err(ConfigError::parse(path, e)),
    }
}

/// Load a tree file; `Ok(None)` when the file is absent.
pub fn load_tree(path: &Path) -> ConfigResult<Option<ConfigTree>> {
    let Some(text) = read_text(path)? else {
        return Ok(None);
    };
    debug!("Loaded {}", path.display());
    parse_tree(path, &text).map(|map| Some(Value::Object(map)))
}

/// Load a fragment as a mapping; an absent fragment is empty.
pub fn load_fragment(path: &Path) -> ConfigResult<Map<String, Value>> {
    match read_text(path)? {
        Some(text) => parse_tree(path, &text),
        None => Ok(Map::new()),
    }
}

/// Serialize a tree to YAML text.
pub fn to_yaml(path: &Path, tree: &ConfigTree) -> ConfigResult<String> {
    serde_yaml::to_string(tree).map_err(|e| ConfigError::parse(path, e))
}

/// Replace `path` with the YAML form of `tree`.
///
/// The content goes to a temporary file in the same directory, is synced, and
/// is then renamed over the target, so readers see either the old file or the
/// new one.
pub fn write_tree_atomic(path: &Path, tree: &ConfigTree) -> ConfigResult<()> {
    let content = to_yaml(path, tree)?;
    write_text_atomic(path, &content)
}

pub(crate) fn write_text_atomic(path: &Path, content: &str) -> ConfigResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| ConfigError::write(path, e))?;

    let mut temp = NamedTempFile::new_in(dir).map_err(|e| ConfigError::write(path, e))?;
    temp.write_all(content.as_bytes())
        .map_err(|e| ConfigError::write(path, e))?;
    temp.flush().map_err(|e| ConfigError::write(path, e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| ConfigError::write(path, e))?;
    temp.persist(path)
        .map_err(|e| ConfigError::write(path, e.error))?;

    debug!("Wrote {}", path.display());
    Ok(())
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}
