//! Live watcher tests against a temp directory.

use fragment_config::config::{ConfigManager, FragmentChangeEvent, Catalog};
use fragment_config::settings::EngineSettings;
use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::timeout;

#[tokio::test]
async fn callback_completes_before_event_is_published() {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join("svc")).unwrap();

    let mut settings = EngineSettings::with_root(temp.path());
    settings.debounce = Duration::from_millis(100);
    let manager = ConfigManager::new(settings, Catalog::empty());

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let mut handle = manager
        .watch(move || {
            // A slow callback must still finish before the event is published.
            std::thread::sleep(Duration::from_millis(200));
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    fs::write(temp.path().join("svc/config.yml"), "a:\n  x: 1\n").unwrap();

    let event = timeout(Duration::from_secs(10), handle.wait_for_change())
        .await
        .expect("no change event within timeout")
        .expect("watcher stopped");
    assert!(event.requires_reload());
    assert!(
        event
            .affected_paths()
            .iter()
            .all(|p| p.ends_with("svc/config.yml"))
    );
    assert!(calls.load(Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn snapshot_write_does_not_trigger_callback() {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join("svc")).unwrap();
    fs::write(temp.path().join("svc/config.yml"), "a:\n  x: 1\n").unwrap();

    let mut settings = EngineSettings::with_root(temp.path());
    settings.debounce = Duration::from_millis(100);
    let manager = ConfigManager::new(settings, Catalog::empty());

    let mut handle = manager.watch(|| {}).unwrap();
    manager.refresh().unwrap();

    let waited = timeout(Duration::from_millis(1500), handle.wait_for_change()).await;
    assert!(!matches!(
        waited,
        Ok(Some(FragmentChangeEvent::FragmentChanged(_) | FragmentChangeEvent::BatchChange(_)))
    ));
}
