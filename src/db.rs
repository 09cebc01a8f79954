use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context as _, Result};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use tracing::info;

use crate::i18n::Locale;
use crate::store::{GuildConfig, SbCategory, SponsorBlockConfig};

/// SQLite access layer. Cheap to clone, everything goes through the pool.
#[derive(Clone)]
pub struct BotDb {
    pool: SqlitePool,
}

impl BotDb {
    pub async fn connect(db_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(db_url)
            .await
            .with_context(|| format!("failed to open database {db_url}"))?;
        Ok(Self { pool })
    }

    /// A single-connection in-memory database, used by the test suite.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Ok(Self { pool })
    }

    /// Applies every `*.sql` file under `dir` in lexicographic order.
    pub async fn apply_migrations(&self, dir: &Path) -> Result<usize> {
        let mut entries = tokio::fs::read_dir(dir)
            .await
            .with_context(|| format!("failed to read migrations directory {}", dir.display()))?;

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "sql") {
                files.push(path);
            }
        }
        files.sort();

        for path in &files {
            let sql = tokio::fs::read_to_string(path).await?;
            sqlx::raw_sql(&sql)
                .execute(&self.pool)
                .await
                .with_context(|| format!("migration {} failed", path.display()))?;
            info!("Applied migration {}", path.display());
        }

        Ok(files.len())
    }

    pub async fn upsert_guild(&self, guild_id: u64, config: &GuildConfig) -> Result<()> {
        sqlx::query(
            "INSERT INTO guilds (id, prefix, locale, sb_categories, sb_announce)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (id) DO UPDATE SET
                prefix = excluded.prefix,
                locale = excluded.locale,
                sb_categories = excluded.sb_categories,
                sb_announce = excluded.sb_announce",
        )
        .bind(guild_id as i64)
        .bind(&config.prefix)
        .bind(config.locale.code())
        .bind(config.sponsorblock.categories_csv())
        .bind(config.sponsorblock.announce_skips)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn delete_guild(&self, guild_id: u64) -> Result<()> {
        sqlx::query("DELETE FROM guilds WHERE id = ?1")
            .bind(guild_id as i64)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn load_guilds(&self) -> Result<HashMap<u64, GuildConfig>> {
        let rows = sqlx::query("SELECT id, prefix, locale, sb_categories, sb_announce FROM guilds")
            .fetch_all(&self.pool)
            .await?;

        let mut guilds = HashMap::with_capacity(rows.len());
        for row in rows {
            let id: i64 = row.try_get("id")?;
            let prefix: String = row.try_get("prefix")?;
            let locale: String = row.try_get("locale")?;
            let categories: String = row.try_get("sb_categories")?;
            let announce: bool = row.try_get("sb_announce")?;

            guilds.insert(
                id as u64,
                GuildConfig {
                    prefix,
                    locale: Locale::parse(&locale).unwrap_or_default(),
                    sponsorblock: SponsorBlockConfig {
                        categories: SbCategory::parse_csv(&categories),
                        announce_skips: announce,
                    },
                },
            );
        }
        Ok(guilds)
    }

    /// Additive counter flush. Counts are never read back before writing.
    pub async fn add_command_uses(&self, name: &str, uses: u64) -> Result<()> {
        sqlx::query(
            "INSERT INTO command_usage (name, uses) VALUES (?1, ?2)
             ON CONFLICT (name) DO UPDATE SET uses = command_usage.uses + excluded.uses",
        )
        .bind(name)
        .bind(uses as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn command_usage(&self) -> Result<Vec<(String, i64)>> {
        let rows = sqlx::query("SELECT name, uses FROM command_usage ORDER BY uses DESC")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| Ok((row.try_get("name")?, row.try_get("uses")?)))
            .collect()
    }
}
