use std::env;
use std::path::PathBuf;

use anyhow::{Context as _, Result};

use crate::i18n::Locale;

const DEFAULT_DATABASE_URL: &str = "sqlite://encore.db?mode=rwc";
const DEFAULT_LAVALINK_JAR: &str = "./lavalink/Lavalink.jar";
const DEFAULT_DOWNLOAD_CAP: u64 = 2 * 1024 * 1024 * 1024;

/// Everything the bot reads from the environment at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub discord_token: String,
    pub database_url: String,
    pub default_prefix: String,
    pub default_locale: Locale,
    pub testing_guild_id: Option<u64>,
    pub invite_link: String,
    pub source_link: String,
    pub genius_token: Option<String>,
    pub user_agent: String,
    pub meme_subreddit: String,
    pub lavalink_password: String,
    pub lavalink_jar: PathBuf,
    pub download_dir: PathBuf,
    pub download_cap_bytes: u64,
    pub dev: bool,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            discord_token: required("DISCORD_TOKEN")?,
            database_url: optional("DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            default_prefix: optional("ENCORE_DEFAULT_PREFIX").unwrap_or_else(|| ".".to_string()),
            default_locale: optional("ENCORE_DEFAULT_LOCALE")
                .as_deref()
                .map(|raw| {
                    Locale::parse(raw)
                        .with_context(|| format!("ENCORE_DEFAULT_LOCALE: unknown locale {raw:?}"))
                })
                .transpose()?
                .unwrap_or(Locale::En),
            testing_guild_id: parsed_optional("ENCORE_TESTING_GUILD_ID")?,
            invite_link: optional("ENCORE_INVITE_LINK").unwrap_or_default(),
            source_link: optional("ENCORE_SOURCE_LINK")
                .unwrap_or_else(|| "https://github.com".to_string()),
            genius_token: optional("GENIUS_TOKEN"),
            user_agent: optional("ENCORE_USER_AGENT").unwrap_or_else(|| {
                format!("encore-bot/{} (discord music bot)", env!("CARGO_PKG_VERSION"))
            }),
            meme_subreddit: optional("ENCORE_MEME_SUBREDDIT").unwrap_or_else(|| "memes".to_string()),
            lavalink_password: optional("LAVALINK_PASSWORD")
                .unwrap_or_else(|| "youshallnotpass".to_string()),
            lavalink_jar: optional("LAVALINK_JAR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LAVALINK_JAR)),
            download_dir: optional("ENCORE_DOWNLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./downloads")),
            download_cap_bytes: parsed_optional("ENCORE_DOWNLOAD_CAP_BYTES")?
                .unwrap_or(DEFAULT_DOWNLOAD_CAP),
            dev: false,
        })
    }
}

fn required(name: &str) -> Result<String> {
    env::var(name).with_context(|| format!("missing required environment variable {name}"))
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

fn parsed_optional<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    optional(name)
        .map(|v| {
            v.parse()
                .with_context(|| format!("could not parse environment variable {name}"))
        })
        .transpose()
}
