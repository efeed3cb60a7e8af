//! Fragment discovery.
//!
//! Walks the configuration root and returns every fragment file below it,
//! sorted by full path. Files sitting directly in the root (the snapshot) are
//! never fragments.

use crate::settings::EngineSettings;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Find all fragment files under the configuration root.
///
/// The result is sorted by the bytes of the full path, so two calls over the
/// same directory state return the same sequence regardless of the order the
/// filesystem lists entries in. A missing root yields an empty list.
pub fn find_fragments(settings: &EngineSettings) -> Vec<PathBuf> {
    let mut found = Vec::new();

    if !settings.root.is_dir() {
        return found;
    }

    let mut pending = vec![settings.root.clone()];
    while let Some(dir) = pending.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Cannot list {}: {}", dir.display(), e);
                continue;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            let Ok(file_type) = entry.file_type() else {
                continue;
            };

            // Symlinked directories are not followed to keep the walk finite.
            if file_type.is_dir() {
                pending.push(path);
            } else if is_fragment(&path, &dir, settings) {
                found.push(path);
            }
        }
    }

    found.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));
    found
}

fn is_fragment(path: &Path, parent: &Path, settings: &EngineSettings) -> bool {
    parent != settings.root && settings.is_fragment_file(path) && path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "{}\n").unwrap();
    }

    #[test]
    fn test_missing_root_is_empty() {
        let temp = TempDir::new().unwrap();
        let settings = EngineSettings::with_root(temp.path().join("nope"));
        assert!(find_fragments(&settings).is_empty());
    }

    #[test]
    fn test_root_level_files_are_excluded() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        touch(&root.join("config.yml"));
        touch(&root.join("config_full.yml"));
        touch(&root.join("svc/config.yml"));

        let settings = EngineSettings::with_root(root);
        assert_eq!(find_fragments(&settings), vec![root.join("svc/config.yml")]);
    }

    #[test]
    fn test_only_fragment_names_selected() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        touch(&root.join("svc/config.yml"));
        touch(&root.join("svc/config.yaml"));
        touch(&root.join("svc/notes.txt"));

        let settings = EngineSettings::with_root(root);
        assert_eq!(find_fragments(&settings), vec![root.join("svc/config.yml")]);
    }

    #[test]
    fn test_sorted_and_recursive() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        touch(&root.join("b/config.yml"));
        touch(&root.join("a/nested/config.yml"));
        touch(&root.join("a/config.yml"));
        touch(&root.join("c/config.yml"));

        let settings = EngineSettings::with_root(root);
        let first = find_fragments(&settings);
        assert_eq!(
            first,
            vec![
                root.join("a/config.yml"),
                root.join("a/nested/config.yml"),
                root.join("b/config.yml"),
                root.join("c/config.yml"),
            ]
        );
        assert_eq!(first, find_fragments(&settings));
    }
}
