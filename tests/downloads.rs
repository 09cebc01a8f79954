use std::time::{Duration, SystemTime};

use encore::downloads::DownloadCache;

fn write_file(dir: &std::path::Path, name: &str, len: usize, age: Duration) {
    let path = dir.join(name);
    std::fs::write(&path, vec![0u8; len]).unwrap();
    let mtime = SystemTime::now() - age;
    let file = std::fs::File::options().write(true).open(&path).unwrap();
    file.set_modified(mtime).unwrap();
}

#[tokio::test]
async fn sweep_under_cap_evicts_nothing() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "a.opus", 100, Duration::from_secs(60));
    write_file(dir.path(), "b.opus", 100, Duration::from_secs(30));

    let cache = DownloadCache::new(dir.path(), 1000);
    let report = cache.sweep().await.unwrap();

    assert_eq!(report.files_seen, 2);
    assert_eq!(report.files_evicted, 0);
    assert_eq!(report.bytes_kept, 200);
}

#[tokio::test]
async fn sweep_evicts_oldest_files_first() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "old.opus", 400, Duration::from_secs(300));
    write_file(dir.path(), "mid.opus", 400, Duration::from_secs(200));
    write_file(dir.path(), "new.opus", 400, Duration::from_secs(100));

    let cache = DownloadCache::new(dir.path(), 900);
    let report = cache.sweep().await.unwrap();

    assert_eq!(report.files_evicted, 1);
    assert_eq!(report.bytes_freed, 400);
    assert_eq!(report.bytes_kept, 800);
    assert!(!dir.path().join("old.opus").exists());
    assert!(dir.path().join("mid.opus").exists());
    assert!(dir.path().join("new.opus").exists());
}

#[tokio::test]
async fn sweep_keeps_evicting_until_under_cap() {
    let dir = tempfile::tempdir().unwrap();
    for (i, age) in [500u64, 400, 300, 200, 100].iter().enumerate() {
        write_file(
            dir.path(),
            &format!("track{i}.opus"),
            100,
            Duration::from_secs(*age),
        );
    }

    let cache = DownloadCache::new(dir.path(), 250);
    let report = cache.sweep().await.unwrap();

    assert_eq!(report.files_evicted, 3);
    assert_eq!(report.bytes_kept, 200);
}

#[tokio::test]
async fn missing_directory_is_an_empty_sweep() {
    let cache = DownloadCache::new("/nonexistent/encore-downloads", 1000);
    let report = cache.sweep().await.unwrap();
    assert_eq!(report.files_seen, 0);
    assert_eq!(report.files_evicted, 0);
}
