use std::collections::HashMap;

use encore::db::BotDb;
use encore::metrics::CommandUsage;

async fn db_with_schema(sql: &str) -> BotDb {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("0001_schema.sql"), sql).unwrap();
    let db = BotDb::in_memory().await.unwrap();
    db.apply_migrations(dir.path()).await.unwrap();
    db
}

#[tokio::test]
async fn flush_writes_counters_and_clears_them() {
    let db = db_with_schema(
        "CREATE TABLE command_usage (name TEXT PRIMARY KEY, uses INTEGER NOT NULL DEFAULT 0);",
    )
    .await;
    let usage = CommandUsage::default();
    usage.bump("play").await;
    usage.bump("play").await;
    usage.bump("ping").await;

    assert_eq!(usage.flush(&db).await, 2);
    assert!(usage.snapshot().await.is_empty());

    let stored: HashMap<String, i64> = db.command_usage().await.unwrap().into_iter().collect();
    assert_eq!(stored.get("play"), Some(&2));
    assert_eq!(stored.get("ping"), Some(&1));
}

/// A write failure part-way through a flush must put back only the
/// counters that were not written; counters already persisted in the same
/// pass stay persisted, so a retry cannot double-count them.
#[tokio::test]
async fn failed_flush_never_double_counts() {
    // The constraint rejects exactly one counter name, so the flush fails
    // whenever it reaches that entry. Map iteration order is arbitrary, so
    // repeat the scenario to exercise both orderings.
    const SCHEMA: &str = "CREATE TABLE command_usage (\
        name TEXT PRIMARY KEY, uses INTEGER NOT NULL DEFAULT 0, \
        CHECK (name <> 'rejected'));";

    for _ in 0..12 {
        let db = db_with_schema(SCHEMA).await;
        let usage = CommandUsage::default();
        usage.bump("play").await;
        usage.bump("rejected").await;

        usage.flush(&db).await;

        let stored: HashMap<String, i64> = db.command_usage().await.unwrap().into_iter().collect();
        let pending = usage.snapshot().await;

        let play_total = stored.get("play").copied().unwrap_or(0) as u64
            + pending.get("play").copied().unwrap_or(0);
        assert_eq!(play_total, 1, "play was lost or double-counted");
        assert_eq!(pending.get("rejected"), Some(&1));
        assert_eq!(stored.get("rejected"), None);
    }
}
