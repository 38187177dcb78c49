use nomadnet_releases::counter::CounterStore;
use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use tempfile::TempDir;

#[test]
fn first_download_on_empty_store() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("download_counts.json");
    let store = CounterStore::open(&path);

    assert_eq!(store.get("app.apk"), 0);
    assert_eq!(store.increment("app.apk"), 1);

    let json: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
    assert_eq!(json["counts"], serde_json::json!({"app.apk": 1}));
}

#[test]
fn readers_never_see_counts_go_backwards() {
    let temp = TempDir::new().unwrap();
    let path = Arc::new(temp.path().join("download_counts.json"));
    let done = Arc::new(AtomicBool::new(false));

    let reader = {
        let path = Arc::clone(&path);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let store = CounterStore::open(path.as_path());
            let mut last = 0;
            while !done.load(Ordering::SeqCst) {
                let now = store.get("app.apk");
                assert!(now >= last, "count went from {last} to {now}");
                last = now;
            }
        })
    };

    let writers: Vec<_> = (0..4)
        .map(|_| {
            let path = Arc::clone(&path);
            thread::spawn(move || {
                let store = CounterStore::open(path.as_path());
                for _ in 0..50 {
                    store.increment("app.apk");
                }
            })
        })
        .collect();
    for writer in writers {
        writer.join().unwrap();
    }
    done.store(true, Ordering::SeqCst);
    reader.join().unwrap();

    assert_eq!(CounterStore::open(path.as_path()).get("app.apk"), 200);
}

#[test]
fn counts_survive_for_assets_no_longer_mirrored() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("download_counts.json");
    let store = CounterStore::open(&path);
    store.increment("app-1.0.apk");
    store.increment("app-2.0.apk");

    let doc = store.load();
    assert_eq!(doc.counts.len(), 2);
    assert!(doc.last_updated.is_some());
    assert_eq!(doc.get("app-1.0.apk"), 1);
}
