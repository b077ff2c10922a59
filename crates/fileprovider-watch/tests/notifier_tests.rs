use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use fileprovider_core::ChangeHandler;
use fileprovider_watch::{ChangeNotifier, DebounceSettings};
use parking_lot::Mutex;
use tempfile::TempDir;
use tokio::time::sleep;

fn counting_handler() -> (ChangeHandler, Arc<AtomicUsize>, Arc<Mutex<Vec<Instant>>>) {
    let count = Arc::new(AtomicUsize::new(0));
    let calls = Arc::new(Mutex::new(Vec::new()));
    let handler: ChangeHandler = {
        let count = Arc::clone(&count);
        let calls = Arc::clone(&calls);
        Arc::new(move || {
            count.fetch_add(1, Ordering::SeqCst);
            calls.lock().push(Instant::now());
        })
    };
    (handler, count, calls)
}

fn touch(dir: &Path, name: &str) {
    fs::write(dir.join(name), name.as_bytes()).unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_register_missing_path_is_noop() {
    let temp = TempDir::new().unwrap();
    let notifier = ChangeNotifier::new(DebounceSettings::default()).unwrap();
    let (handler, _, _) = counting_handler();

    let missing = temp.path().join("missing");
    notifier.register(&missing, handler.clone());
    assert!(!notifier.is_registered(&missing));

    let file = temp.path().join("file.txt");
    fs::write(&file, "x").unwrap();
    notifier.register(&file, handler);
    assert!(!notifier.is_registered(&file));
    assert!(notifier.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_register_and_unregister() {
    let temp = TempDir::new().unwrap();
    let notifier = ChangeNotifier::new(DebounceSettings::default()).unwrap();
    let (handler, _, _) = counting_handler();

    notifier.register(temp.path(), handler);
    assert!(notifier.is_registered(temp.path()));
    assert_eq!(notifier.registered_paths(), vec![temp.path().to_path_buf()]);

    notifier.unregister(temp.path());
    assert!(!notifier.is_registered(temp.path()));

    // Unregistering again is a no-op
    notifier.unregister(temp.path());
    notifier.unregister(&temp.path().join("never-watched"));
    assert!(notifier.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_single_change_fires_after_delay() {
    let temp = TempDir::new().unwrap();
    let notifier = ChangeNotifier::new(DebounceSettings::default()).unwrap();
    let (handler, count, _) = counting_handler();

    notifier.register(temp.path(), handler);
    touch(temp.path(), "a.txt");

    sleep(Duration::from_millis(100)).await;
    assert_eq!(count.load(Ordering::SeqCst), 0);

    sleep(Duration::from_millis(700)).await;
    assert!(count.load(Ordering::SeqCst) >= 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_burst_is_coalesced() {
    let temp = TempDir::new().unwrap();
    let notifier = ChangeNotifier::new(DebounceSettings::default()).unwrap();
    let (handler, count, calls) = counting_handler();

    notifier.register(temp.path(), handler);

    let burst_start = Instant::now();
    for i in 0..50 {
        touch(temp.path(), &format!("file-{i}.txt"));
        sleep(Duration::from_millis(20)).await;
    }
    let burst_ms = burst_start.elapsed().as_millis() as usize;

    sleep(Duration::from_millis(800)).await;

    let fired = count.load(Ordering::SeqCst);
    // Allow one extra for events the OS delivers after the burst ends
    let max_expected = burst_ms.div_ceil(200) + 1;
    assert!(fired >= 1, "handler never fired");
    assert!(fired <= max_expected, "fired {fired} times for a {burst_ms}ms burst");

    let first = calls.lock()[0];
    assert!(first.duration_since(burst_start) >= Duration::from_millis(200));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_reregister_replaces_handler() {
    let temp = TempDir::new().unwrap();
    let notifier = ChangeNotifier::new(DebounceSettings::default()).unwrap();
    let (first, first_count, _) = counting_handler();
    let (second, second_count, _) = counting_handler();

    notifier.register(temp.path(), first);
    notifier.register(temp.path(), second);
    assert_eq!(notifier.len(), 1);

    touch(temp.path(), "changed.txt");
    sleep(Duration::from_millis(800)).await;

    assert_eq!(first_count.load(Ordering::SeqCst), 0);
    assert!(second_count.load(Ordering::SeqCst) >= 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_paused_watch_is_silent() {
    let temp = TempDir::new().unwrap();
    let notifier = ChangeNotifier::new(DebounceSettings::default()).unwrap();
    let (handler, count, _) = counting_handler();

    notifier.register(temp.path(), handler);
    assert!(notifier.pause(temp.path()));

    touch(temp.path(), "quiet.txt");
    sleep(Duration::from_millis(700)).await;
    assert_eq!(count.load(Ordering::SeqCst), 0);

    assert!(notifier.resume(temp.path()));
    touch(temp.path(), "loud.txt");
    sleep(Duration::from_millis(700)).await;
    assert!(count.load(Ordering::SeqCst) >= 1);

    assert!(!notifier.pause(&temp.path().join("elsewhere")));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unregister_cancels_pending_call() {
    let temp = TempDir::new().unwrap();
    let notifier = ChangeNotifier::new(DebounceSettings::default()).unwrap();
    let (handler, count, _) = counting_handler();

    notifier.register(temp.path(), handler);
    touch(temp.path(), "gone.txt");
    sleep(Duration::from_millis(50)).await;
    notifier.unregister(temp.path());

    sleep(Duration::from_millis(600)).await;
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[test]
fn test_new_requires_runtime() {
    assert!(ChangeNotifier::new(DebounceSettings::default()).is_err());
}
