use std::collections::{BTreeSet, HashMap};
use std::fmt;

use anyhow::Result;
use tokio::sync::RwLock;
use tracing::info;

use crate::db::BotDb;
use crate::i18n::Locale;

/// Skippable segment tags understood by the playback node. Closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SbCategory {
    Sponsor,
    Selfpromo,
    Interaction,
    Intro,
    Outro,
    Preview,
    MusicOfftopic,
    Filler,
}

impl SbCategory {
    pub const ALL: [SbCategory; 8] = [
        SbCategory::Sponsor,
        SbCategory::Selfpromo,
        SbCategory::Interaction,
        SbCategory::Intro,
        SbCategory::Outro,
        SbCategory::Preview,
        SbCategory::MusicOfftopic,
        SbCategory::Filler,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SbCategory::Sponsor => "sponsor",
            SbCategory::Selfpromo => "selfpromo",
            SbCategory::Interaction => "interaction",
            SbCategory::Intro => "intro",
            SbCategory::Outro => "outro",
            SbCategory::Preview => "preview",
            SbCategory::MusicOfftopic => "music_offtopic",
            SbCategory::Filler => "filler",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim().to_lowercase();
        Self::ALL.into_iter().find(|c| c.as_str() == raw)
    }

    pub fn parse_csv(raw: &str) -> BTreeSet<Self> {
        raw.split(',').filter_map(Self::parse).collect()
    }
}

impl fmt::Display for SbCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SponsorBlockConfig {
    pub categories: BTreeSet<SbCategory>,
    pub announce_skips: bool,
}

impl SponsorBlockConfig {
    /// Canonical comma-joined form, stable ordering. Stored as-is in SQLite.
    pub fn categories_csv(&self) -> String {
        self.categories
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuildConfig {
    pub prefix: String,
    pub locale: Locale,
    pub sponsorblock: SponsorBlockConfig,
}

/// Outcome of a setter: `Unchanged` means the value was already set and no
/// write should happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingChange {
    Updated,
    Unchanged,
}

/// Category toggles that are rejected before any mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryError {
    AlreadyEnabled(SbCategory),
    NotEnabled(SbCategory),
}

impl fmt::Display for CategoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryError::AlreadyEnabled(c) => write!(f, "category {c} is already enabled"),
            CategoryError::NotEnabled(c) => write!(f, "category {c} is not enabled"),
        }
    }
}

impl std::error::Error for CategoryError {}

/// In-memory mirror of per-guild settings, warm-loaded from the database.
///
/// Setters mutate the cache synchronously and report whether anything
/// changed; callers persist with [`GuildStore::persist`], usually joined
/// with the confirmation reply. Concurrent writers for the same guild are
/// last-write-wins.
pub struct GuildStore {
    db: BotDb,
    cache: RwLock<HashMap<u64, GuildConfig>>,
    default_prefix: String,
    default_locale: Locale,
}

impl GuildStore {
    pub fn new(db: BotDb, default_prefix: impl Into<String>, default_locale: Locale) -> Self {
        Self {
            db,
            cache: RwLock::new(HashMap::new()),
            default_prefix: default_prefix.into(),
            default_locale,
        }
    }

    pub fn db(&self) -> &BotDb {
        &self.db
    }

    fn default_config(&self) -> GuildConfig {
        GuildConfig {
            prefix: self.default_prefix.clone(),
            locale: self.default_locale,
            sponsorblock: SponsorBlockConfig::default(),
        }
    }

    /// Loads every stored guild row into the cache. Call once at startup.
    pub async fn warm(&self) -> Result<usize> {
        let guilds = self.db.load_guilds().await?;
        let count = guilds.len();
        *self.cache.write().await = guilds;
        info!("Loaded configuration for {count} guilds");
        Ok(count)
    }

    pub async fn get(&self, guild_id: u64) -> GuildConfig {
        self.cache
            .read()
            .await
            .get(&guild_id)
            .cloned()
            .unwrap_or_else(|| self.default_config())
    }

    pub async fn contains(&self, guild_id: u64) -> bool {
        self.cache.read().await.contains_key(&guild_id)
    }

    pub async fn prefix(&self, guild_id: u64) -> String {
        self.get(guild_id).await.prefix
    }

    pub async fn locale(&self, guild_id: u64) -> Locale {
        self.get(guild_id).await.locale
    }

    pub async fn set_prefix(&self, guild_id: u64, prefix: &str) -> SettingChange {
        let mut cache = self.cache.write().await;
        let entry = cache
            .entry(guild_id)
            .or_insert_with(|| self.default_config());
        if entry.prefix == prefix {
            return SettingChange::Unchanged;
        }
        entry.prefix = prefix.to_string();
        SettingChange::Updated
    }

    pub async fn set_locale(&self, guild_id: u64, locale: Locale) -> SettingChange {
        let mut cache = self.cache.write().await;
        let entry = cache
            .entry(guild_id)
            .or_insert_with(|| self.default_config());
        if entry.locale == locale {
            return SettingChange::Unchanged;
        }
        entry.locale = locale;
        SettingChange::Updated
    }

    pub async fn set_announce_skips(&self, guild_id: u64, announce: bool) -> SettingChange {
        let mut cache = self.cache.write().await;
        let entry = cache
            .entry(guild_id)
            .or_insert_with(|| self.default_config());
        if entry.sponsorblock.announce_skips == announce {
            return SettingChange::Unchanged;
        }
        entry.sponsorblock.announce_skips = announce;
        SettingChange::Updated
    }

    /// Returns the new active set, or a rejection if the category is
    /// already a member.
    pub async fn enable_category(
        &self,
        guild_id: u64,
        category: SbCategory,
    ) -> Result<BTreeSet<SbCategory>, CategoryError> {
        let mut cache = self.cache.write().await;
        let entry = cache
            .entry(guild_id)
            .or_insert_with(|| self.default_config());
        if !entry.sponsorblock.categories.insert(category) {
            return Err(CategoryError::AlreadyEnabled(category));
        }
        Ok(entry.sponsorblock.categories.clone())
    }

    pub async fn disable_category(
        &self,
        guild_id: u64,
        category: SbCategory,
    ) -> Result<BTreeSet<SbCategory>, CategoryError> {
        let mut cache = self.cache.write().await;
        let entry = cache
            .entry(guild_id)
            .or_insert_with(|| self.default_config());
        if !entry.sponsorblock.categories.remove(&category) {
            return Err(CategoryError::NotEnabled(category));
        }
        Ok(entry.sponsorblock.categories.clone())
    }

    /// Write-through: upserts the cached entry for this guild.
    pub async fn persist(&self, guild_id: u64) -> Result<()> {
        let config = self.get(guild_id).await;
        self.db.upsert_guild(guild_id, &config).await
    }

    /// Guild-join path: defaulted entry in cache and store.
    pub async fn create_default(&self, guild_id: u64) -> Result<()> {
        let config = self.default_config();
        self.cache
            .write()
            .await
            .entry(guild_id)
            .or_insert_with(|| config.clone());
        self.db.upsert_guild(guild_id, &config).await
    }

    /// Guild-leave path: cache entry dropped and backing row deleted.
    pub async fn remove(&self, guild_id: u64) -> Result<()> {
        self.cache.write().await.remove(&guild_id);
        self.db.delete_guild(guild_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parse_accepts_all_known_tags() {
        for cat in SbCategory::ALL {
            assert_eq!(SbCategory::parse(cat.as_str()), Some(cat));
        }
        assert_eq!(SbCategory::parse("MUSIC_OFFTOPIC"), Some(SbCategory::MusicOfftopic));
        assert_eq!(SbCategory::parse("jumpscare"), None);
    }

    #[test]
    fn csv_round_trip_is_canonical() {
        let set = SbCategory::parse_csv("outro,sponsor,outro,bogus");
        let cfg = SponsorBlockConfig {
            categories: set,
            announce_skips: false,
        };
        assert_eq!(cfg.categories_csv(), "sponsor,outro");
    }
}
