use std::path::Path;

use encore::db::BotDb;
use encore::i18n::Locale;
use encore::store::{GuildStore, SbCategory, SettingChange};

const GUILD: u64 = 123_456_789;

async fn store() -> GuildStore {
    let db = BotDb::in_memory().await.unwrap();
    db.apply_migrations(Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/migrations")))
        .await
        .unwrap();
    GuildStore::new(db, ".", Locale::En)
}

#[tokio::test]
async fn unknown_guilds_get_defaults() {
    let store = store().await;
    assert!(!store.contains(GUILD).await);
    assert_eq!(store.prefix(GUILD).await, ".");
    assert_eq!(store.locale(GUILD).await, Locale::En);
    assert!(store.get(GUILD).await.sponsorblock.categories.is_empty());
}

#[tokio::test]
async fn prefix_updates_and_repeats_are_noops() {
    let store = store().await;
    assert_eq!(store.set_prefix(GUILD, "!").await, SettingChange::Updated);
    assert_eq!(store.set_prefix(GUILD, "!").await, SettingChange::Unchanged);
    assert_eq!(store.prefix(GUILD).await, "!");
}

#[tokio::test]
async fn persisted_settings_survive_a_cold_cache() {
    let store = store().await;
    store.set_prefix(GUILD, "?").await;
    store.set_locale(GUILD, Locale::Pt).await;
    store.enable_category(GUILD, SbCategory::Sponsor).await.unwrap();
    store.enable_category(GUILD, SbCategory::Outro).await.unwrap();
    store.set_announce_skips(GUILD, true).await;
    store.persist(GUILD).await.unwrap();

    // Same database, fresh cache.
    let reloaded = GuildStore::new(store.db().clone(), ".", Locale::En);
    reloaded.warm().await.unwrap();

    let config = reloaded.get(GUILD).await;
    assert_eq!(config.prefix, "?");
    assert_eq!(config.locale, Locale::Pt);
    assert!(config.sponsorblock.announce_skips);
    assert_eq!(config.sponsorblock.categories_csv(), "sponsor,outro");
}

#[tokio::test]
async fn category_toggles_reject_redundant_changes() {
    let store = store().await;

    let active = store.enable_category(GUILD, SbCategory::Intro).await.unwrap();
    assert!(active.contains(&SbCategory::Intro));
    assert!(store.enable_category(GUILD, SbCategory::Intro).await.is_err());

    let active = store.disable_category(GUILD, SbCategory::Intro).await.unwrap();
    assert!(active.is_empty());
    assert!(store.disable_category(GUILD, SbCategory::Intro).await.is_err());
}

#[tokio::test]
async fn guild_join_and_leave_lifecycle() {
    let store = store().await;

    store.create_default(GUILD).await.unwrap();
    assert!(store.contains(GUILD).await);

    let reloaded = GuildStore::new(store.db().clone(), ".", Locale::En);
    reloaded.warm().await.unwrap();
    assert!(reloaded.contains(GUILD).await);

    store.remove(GUILD).await.unwrap();
    assert!(!store.contains(GUILD).await);

    let emptied = GuildStore::new(store.db().clone(), ".", Locale::En);
    emptied.warm().await.unwrap();
    assert!(!emptied.contains(GUILD).await);
}

#[tokio::test]
async fn usage_counters_accumulate_additively() {
    let db = BotDb::in_memory().await.unwrap();
    db.apply_migrations(Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/migrations")))
        .await
        .unwrap();

    db.add_command_uses("play", 3).await.unwrap();
    db.add_command_uses("play", 2).await.unwrap();
    db.add_command_uses("ping", 1).await.unwrap();

    let usage = db.command_usage().await.unwrap();
    assert_eq!(usage[0], ("play".to_string(), 5));
    assert_eq!(usage[1], ("ping".to_string(), 1));
}
