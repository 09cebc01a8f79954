pub mod args;
pub mod commands;
pub mod db;
pub mod downloads;
pub mod events;
pub mod i18n;
pub mod lavalink;
pub mod metrics;
pub mod reddit;
pub mod scrape;
pub mod settings;
pub mod signal;
pub mod store;

use std::sync::Arc;
use std::time::Instant;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

/// Process-wide state handed to every command handler by the framework.
pub struct Data {
    pub settings: settings::Settings,
    pub db: db::BotDb,
    pub store: Arc<store::GuildStore>,
    pub i18n: Arc<i18n::Translations>,
    pub metrics: Arc<metrics::CommandUsage>,
    pub memes: Arc<reddit::MemeFeed>,
    pub downloads: Arc<downloads::DownloadCache>,
    pub node: Arc<lavalink::NodeHandle>,
    pub lavalink: lavalink_rs::client::LavalinkClient,
    pub lyrics: Option<scrape::genius::GeniusClient>,
    pub track_stats: scrape::spotify::TrackStatsClient,
    pub started_at: Instant,
}
