//! Per-service configuration fragments and their merged view.
//!
//! Each service owns one fragment at `<root>/<service>/config.yml`. Fragments
//! are the only source of truth; the snapshot at `<root>/config_full.yml` is
//! their fold in sorted path order and can always be rebuilt.
//!
//! ## Read path
//! 1. Load one fragment (or the snapshot)
//! 2. Substitute `$NAME` leaves from the environment
//! 3. Merge caller defaults beneath the result
//! 4. Project by `multi_sections`, `section`, or `keys`
//!
//! ## Write path
//! `set_arg`, `delete_arg` and `delete_section` rewrite one whole fragment
//! atomically. They never touch the snapshot; call `refresh` for that.

mod catalog;
mod env;
mod locator;
mod manager;
mod merge;
mod mutator;
mod resolver;
mod snapshot;
mod store;
mod validation;
pub mod watcher;

use arc_swap::ArcSwap;
use std::sync::Arc;

pub use catalog::{Catalog, RuleDescriptor, SectionRules, ServiceSchema, ValueType};
pub use env::{substitute_env, substitute_env_with};
pub use locator::find_fragments;
pub use manager::{ConfigManager, SectionReport};
pub use merge::{FragmentError, MergeReport, deep_merge, deep_merge_all, merge_configs};
pub use mutator::{FragmentLocks, Mutator};
pub use resolver::{ConfigQuery, project, resolve};
pub use snapshot::{SnapshotCache, fragment_fingerprint};
pub use store::{load_fragment, load_tree, to_yaml, write_tree_atomic};
pub use validation::{validate_leaf, validate_section};
pub use watcher::{FragmentChangeEvent, FragmentWatcherHandle, start_fragment_watcher};

/// A configuration tree: nested mappings, sequences, and scalars.
pub type ConfigTree = serde_json::Value;

/// Catalog shared between the manager and the mutator; swapped as a whole.
pub type SharedCatalog = Arc<ArcSwap<Catalog>>;
