//! File watcher for configuration fragments.
//!
//! Watches the configuration root recursively and invokes a single callback
//! whenever one or more fragment files change. Uses debouncing to coalesce
//! the bursts of events a single save (or an atomic rename) produces.
//!
//! The watcher is a hint, not a consistency mechanism: events can be missed
//! or merged. The snapshot fingerprint remains the authority on staleness.

use crate::error::{ConfigError, ConfigResult};
use crate::settings::EngineSettings;
use notify::RecursiveMode;
use notify_debouncer_mini::{DebouncedEvent, DebouncedEventKind, Debouncer, new_debouncer};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use tokio::sync::watch;
use tracing::{debug, error, info};

/// Event types emitted when fragments change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentChangeEvent {
    /// A single fragment changed
    FragmentChanged(PathBuf),
    /// Multiple fragments changed in quick succession
    BatchChange(Vec<PathBuf>),
    /// Watcher encountered an error
    Error(String),
}

impl FragmentChangeEvent {
    /// Returns true if this event should trigger a snapshot refresh.
    pub fn requires_reload(&self) -> bool {
        !matches!(self, FragmentChangeEvent::Error(_))
    }

    /// Get the affected paths for this event.
    pub fn affected_paths(&self) -> Vec<&Path> {
        match self {
            FragmentChangeEvent::FragmentChanged(p) => vec![p.as_path()],
            FragmentChangeEvent::BatchChange(paths) => paths.iter().map(|p| p.as_path()).collect(),
            FragmentChangeEvent::Error(_) => vec![],
        }
    }
}

/// Handle to a running fragment watcher. Dropping it stops the watcher.
pub struct FragmentWatcherHandle {
    /// Latest change event, for async consumers.
    pub events: watch::Receiver<Option<FragmentChangeEvent>>,
    // Owns the OS watcher; dropping it closes the event channel, which ends
    // the processing thread.
    _debouncer: Debouncer<notify::RecommendedWatcher>,
    _thread: thread::JoinHandle<()>,
}

impl FragmentWatcherHandle {
    /// Wait for the next change event.
    pub async fn wait_for_change(&mut self) -> Option<FragmentChangeEvent> {
        loop {
            if self.events.changed().await.is_err() {
                return None;
            }
            let event = self.events.borrow_and_update().clone();
            if event.is_some() {
                return event;
            }
        }
    }

    /// Get the latest event without waiting.
    pub fn latest_event(&self) -> Option<FragmentChangeEvent> {
        self.events.borrow().clone()
    }
}

/// Start watching the configuration root.
///
/// `callback` runs on the watcher thread once per debounced batch that
/// touched at least one fragment, before the batch's event is published on
/// the handle. It decides for itself whether to refresh the snapshot. Returns as soon as the observer is registered.
pub fn start_fragment_watcher<F>(
    settings: &EngineSettings,
    callback: F,
) -> ConfigResult<FragmentWatcherHandle>
where
    F: Fn() + Send + 'static,
{
    if !settings.root.is_dir() {
        return Err(ConfigError::NotFound {
            path: settings.root.clone(),
        });
    }

    let (event_tx, event_rx) = watch::channel(None);
    let (notify_tx, notify_rx) = mpsc::channel();

    let mut debouncer = new_debouncer(settings.debounce, notify_tx)?;
    debouncer
        .watcher()
        .watch(&settings.root, RecursiveMode::Recursive)?;
    info!("Watching fragments under {}", settings.root.display());

    let settings = settings.clone();
    let thread = thread::Builder::new()
        .name("fragment-watcher".to_string())
        .spawn(move || process_notify_events(notify_rx, event_tx, &settings, callback))
        .map_err(|e| ConfigError::Io {
            path: PathBuf::from("<watcher thread>"),
            source: e,
        })?;

    Ok(FragmentWatcherHandle {
        events: event_rx,
        _debouncer: debouncer,
        _thread: thread,
    })
}

/// Process debounced notify batches until the debouncer is dropped.
fn process_notify_events<F>(
    rx: mpsc::Receiver<Result<Vec<DebouncedEvent>, notify::Error>>,
    tx: watch::Sender<Option<FragmentChangeEvent>>,
    settings: &EngineSettings,
    callback: F,
) where
    F: Fn(),
{
    let filter = FragmentFilter::new(settings);
    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let paths = events
                    .into_iter()
                    .filter(|e| {
                        matches!(
                            e.kind,
                            DebouncedEventKind::Any | DebouncedEventKind::AnyContinuous
                        )
                    })
                    .map(|e| e.path);
                if let Some(event) = classify_paths(paths, &filter) {
                    debug!("Fragment change detected: {:?}", event);
                    // Publish only after the callback so async waiters observe its effects.
                    callback();
                    tx.send_replace(Some(event));
                }
            }
            Ok(Err(e)) => {
                error!("File watcher error: {}", e);
                tx.send_replace(Some(FragmentChangeEvent::Error(e.to_string())));
            }
            Err(_) => {
                info!("Fragment watcher channel closed, stopping");
                return;
            }
        }
    }
}

/// Decides which changed paths are fragments.
struct FragmentFilter<'a> {
    settings: &'a EngineSettings,
    canonical_root: Option<PathBuf>,
}

impl<'a> FragmentFilter<'a> {
    fn new(settings: &'a EngineSettings) -> Self {
        Self {
            settings,
            canonical_root: settings.root.canonicalize().ok(),
        }
    }

    /// A fragment is a file with the fragment name below (not at) the root.
    fn matches(&self, path: &Path) -> bool {
        if !self.settings.is_fragment_file(path) {
            return false;
        }
        let Some(parent) = path.parent() else {
            return false;
        };
        if parent == self.settings.root {
            return false;
        }
        match self.canonical_root {
            Some(ref root) => parent != root.as_path(),
            None => true,
        }
    }
}

/// Collapse the changed paths of one debounced batch into at most one event.
fn classify_paths(
    paths: impl IntoIterator<Item = PathBuf>,
    filter: &FragmentFilter<'_>,
) -> Option<FragmentChangeEvent> {
    let mut changed: Vec<PathBuf> = paths.into_iter().filter(|p| filter.matches(p)).collect();
    changed.sort();
    changed.dedup();

    match changed.len() {
        0 => None,
        1 => changed.pop().map(FragmentChangeEvent::FragmentChanged),
        _ => Some(FragmentChangeEvent::BatchChange(changed)),
    }
}
