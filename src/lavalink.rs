use std::collections::BTreeSet;
use std::path::Path;
use std::process::Stdio;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use anyhow::{anyhow, bail, Context as _, Result};
use lavalink_rs::client::LavalinkClient;
use lavalink_rs::hook;
use lavalink_rs::model::events;
use lavalink_rs::node::NodeBuilder;
use lavalink_rs::prelude::NodeDistributionStrategy;
use poise::serenity_prelude as serenity;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::process::Child;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, warn};

use crate::i18n::Translations;
use crate::store::{GuildStore, SbCategory};

pub const DEFAULT_ENDPOINT: &str = "127.0.0.1:2333";
const READY_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Request metadata the bot attaches to tracks it does not own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackMeta {
    pub requester_id: u64,
    pub enqueued_at: i64,
    pub first_to_play: bool,
}

impl TrackMeta {
    pub fn new(requester_id: u64, first_to_play: bool) -> Self {
        Self {
            requester_id,
            enqueued_at: chrono::Utc::now().timestamp(),
            first_to_play,
        }
    }
}

/// Per-guild player context data: where playback announcements go.
pub struct PlayerChannel {
    pub text_channel: serenity::ChannelId,
    pub http: Arc<serenity::Http>,
}

/// Handle on the companion playback node: either an endpoint we were
/// pointed at, or a child process we spawned ourselves.
pub struct NodeHandle {
    endpoint: String,
    password: String,
    http: reqwest::Client,
    session_id: RwLock<Option<String>>,
    child: Mutex<Option<Child>>,
}

impl NodeHandle {
    /// Attach to an already-running node.
    pub fn connect(endpoint: impl Into<String>, password: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            endpoint: endpoint.into(),
            password: password.into(),
            http,
            session_id: RwLock::new(None),
            child: Mutex::new(None),
        }
    }

    /// Spawn the node jar as a child process on the default endpoint.
    pub async fn spawn(jar: &Path, password: impl Into<String>, http: reqwest::Client) -> Result<Self> {
        if !jar.is_file() {
            bail!("playback node jar not found at {}", jar.display());
        }

        let child = tokio::process::Command::new("java")
            .arg("-jar")
            .arg(jar)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .context("failed to start the playback node (is java installed?)")?;
        info!("Spawned playback node from {}", jar.display());

        let handle = Self::connect(DEFAULT_ENDPOINT, password, http);
        *handle.child.lock().await = Some(child);
        Ok(handle)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// Polls the node's version endpoint until it answers or the deadline
    /// passes. Startup is fatal without a reachable node.
    pub async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let url = format!("http://{}/version", self.endpoint);
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let probe = self
                .http
                .get(&url)
                .header(reqwest::header::AUTHORIZATION, &self.password)
                .send()
                .await;
            if let Ok(resp) = probe {
                if resp.status().is_success() {
                    info!("Playback node at {} is ready", self.endpoint);
                    return Ok(());
                }
            }

            if tokio::time::Instant::now() >= deadline {
                bail!("playback node at {} did not become ready", self.endpoint);
            }
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
    }

    pub async fn set_session_id(&self, id: String) {
        *self.session_id.write().await = Some(id);
    }

    /// Pushes a guild's active sponsor-block categories to the node.
    pub async fn update_sponsorblock(
        &self,
        guild_id: u64,
        categories: &BTreeSet<SbCategory>,
    ) -> Result<()> {
        let session = self
            .session_id
            .read()
            .await
            .clone()
            .ok_or_else(|| anyhow!("playback node session not established yet"))?;

        let url = format!(
            "http://{}/v4/sessions/{session}/players/{guild_id}/sponsorblock/categories",
            self.endpoint
        );
        let body: Vec<&str> = categories.iter().map(|c| c.as_str()).collect();

        self.http
            .put(url)
            .header(reqwest::header::AUTHORIZATION, &self.password)
            .json(&body)
            .send()
            .await?
            .error_for_status()
            .context("node rejected sponsorblock category update")?;
        Ok(())
    }

    /// Kills the child node if we spawned one.
    pub async fn shutdown(&self) {
        if let Some(mut child) = self.child.lock().await.take() {
            info!("Stopping playback node");
            if let Err(e) = child.kill().await {
                warn!("Could not kill playback node: {e}");
            }
        }
    }
}

/// Shared state the event hooks need; hooks are plain functions, so this
/// is installed once at startup.
pub struct HookState {
    pub node: Arc<NodeHandle>,
    pub store: Arc<GuildStore>,
    pub i18n: Arc<Translations>,
}

static HOOK_STATE: OnceLock<HookState> = OnceLock::new();

pub fn install_hook_state(state: HookState) {
    let _ = HOOK_STATE.set(state);
}

fn hook_state() -> Option<&'static HookState> {
    HOOK_STATE.get()
}

pub async fn build_client(user_id: serenity::UserId, node: &NodeHandle) -> LavalinkClient {
    let hooks = events::Events {
        ready: Some(ready_event),
        track_start: Some(track_start_event),
        track_end: Some(track_end_event),
        raw: Some(raw_event),
        ..Default::default()
    };

    let builder = NodeBuilder {
        hostname: node.endpoint().to_string(),
        is_ssl: false,
        events: events::Events::default(),
        password: node.password().to_string(),
        user_id: user_id.into(),
        session_id: None,
    };

    LavalinkClient::new(hooks, vec![builder], NodeDistributionStrategy::round_robin()).await
}

#[hook]
async fn ready_event(_client: LavalinkClient, session_id: String, event: &events::Ready) {
    info!("Playback node ready, session {session_id} (resumed: {})", event.resumed);
    if let Some(state) = hook_state() {
        state.node.set_session_id(session_id).await;
    }
}

#[hook]
async fn track_start_event(client: LavalinkClient, _session_id: String, event: &events::TrackStart) {
    let Some(state) = hook_state() else { return };
    let Some(player) = client.get_player_context(event.guild_id) else {
        return;
    };
    let Ok(data) = player.data::<PlayerChannel>() else {
        return;
    };

    let locale = state.store.locale(event.guild_id.0).await;
    let info = &event.track.info;
    let title = state
        .i18n
        .tr(locale, "events", "track", "msg", "now_playing", &[])
        .await;

    let link = match &info.uri {
        Some(uri) => format!("[{}]({uri})", info.title),
        None => info.title.clone(),
    };
    let mut embed = serenity::CreateEmbed::new()
        .title(title)
        .description(format!("{link}\n{}", info.author))
        .color(0x1DB954);

    let meta = event
        .track
        .user_data
        .clone()
        .and_then(|v| serde_json::from_value::<TrackMeta>(v).ok());
    if let Some(meta) = meta {
        let requested_by = state
            .i18n
            .tr(locale, "events", "track", "msg", "requested_by", &[])
            .await;
        embed = embed.field(requested_by, format!("<@{}>", meta.requester_id), true);
    }

    let message = serenity::CreateMessage::new().embed(embed);
    if let Err(e) = data.text_channel.send_message(&data.http, message).await {
        error!("Failed to announce track start: {e}");
    }
}

#[hook]
async fn track_end_event(_client: LavalinkClient, _session_id: String, event: &events::TrackEnd) {
    info!(
        "Track {} ended in guild {} ({:?})",
        event.track.info.title, event.guild_id.0, event.reason
    );
}

/// Sponsor-block segment skips arrive as plugin events outside the typed
/// model; announce them when the guild opted in.
#[hook]
async fn raw_event(client: LavalinkClient, _session_id: String, event: &Value) {
    if event.get("type").and_then(Value::as_str) != Some("SegmentSkipped") {
        return;
    }
    let Some(state) = hook_state() else { return };
    let Some(guild_id) = event
        .get("guildId")
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<u64>().ok())
    else {
        return;
    };

    if !state.store.get(guild_id).await.sponsorblock.announce_skips {
        return;
    }
    let Some(player) = client.get_player_context(guild_id) else {
        return;
    };
    let Ok(data) = player.data::<PlayerChannel>() else {
        return;
    };

    let category = event
        .pointer("/segment/category")
        .and_then(Value::as_str)
        .unwrap_or("segment");
    let locale = state.store.locale(guild_id).await;
    let text = state
        .i18n
        .tr(
            locale,
            "events",
            "track",
            "msg",
            "segment_skipped",
            &[("category", category.to_string())],
        )
        .await;

    if let Err(e) = data.text_channel.say(&data.http, text).await {
        error!("Failed to announce skipped segment: {e}");
    }
}
