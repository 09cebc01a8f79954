use std::sync::Arc;
use std::time::Duration;

use lavalink_rs::model::player::{Filters, Timescale};
use lavalink_rs::prelude::{PlayerContext, SearchEngines, TrackInQueue, TrackLoadData};
use poise::serenity_prelude as serenity;
use rand::seq::SliceRandom;
use tracing::warn;

use super::tr;
use crate::lavalink::{PlayerChannel, TrackMeta};
use crate::scrape::LyricsSource;
use crate::{Context, Error};

const EMBED_COLOR: u32 = 0x1DB954;
const QUEUE_PAGE_SIZE: usize = 10;
const MAX_VOLUME: u16 = 200;
// Discord caps embed descriptions at 4096; leave room for the source link.
const MAX_LYRICS_CHARS: usize = 4000;

/// Queues a track, playlist or search result.
///
/// URLs are loaded as-is, anything else becomes a YouTube search. Joins
/// the caller's voice channel when not connected yet.
#[poise::command(prefix_command, slash_command, category = "Music", guild_only, aliases("p"))]
pub async fn play(
    ctx: Context<'_>,
    #[rest]
    #[description = "Track URL or search terms"]
    query: String,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let lava = ctx.data().lavalink.clone();

    let voice_channel = ctx.guild().and_then(|guild| {
        guild
            .voice_states
            .get(&ctx.author().id)
            .and_then(|state| state.channel_id)
    });
    let Some(voice_channel) = voice_channel else {
        let reply = common(&ctx, "err", "not_in_voice", &[]).await;
        ctx.say(reply).await?;
        return Ok(());
    };

    ctx.defer().await?;

    if lava.get_player_context(guild_id).is_none() {
        let Some(manager) = songbird::get(ctx.serenity_context()).await else {
            return Err("voice client was not initialised".into());
        };
        match manager.join_gateway(guild_id, voice_channel).await {
            Ok((connection_info, _call)) => {
                lava.create_player_context_with_data::<PlayerChannel>(
                    guild_id,
                    connection_info,
                    Arc::new(PlayerChannel {
                        text_channel: ctx.channel_id(),
                        http: ctx.serenity_context().http.clone(),
                    }),
                )
                .await?;
            }
            Err(e) => {
                warn!("Could not join voice channel {voice_channel}: {e}");
                let reply = common(&ctx, "err", "join_failed", &[]).await;
                ctx.say(reply).await?;
                return Ok(());
            }
        }
    }
    let Some(player) = lava.get_player_context(guild_id) else {
        return Err("player context vanished after creation".into());
    };

    let query = query.trim().to_string();
    let query = if query.starts_with("http://") || query.starts_with("https://") {
        query
    } else {
        SearchEngines::YouTube.to_query(&query)?
    };

    let loaded = lava.load_tracks(guild_id, &query).await?;
    let mut playlist_name = None;
    let mut tracks: Vec<TrackInQueue> = match loaded.data {
        Some(TrackLoadData::Track(track)) => vec![track.into()],
        Some(TrackLoadData::Search(results)) => match results.into_iter().next() {
            Some(track) => vec![track.into()],
            None => {
                let reply = tr(&ctx, "err", "not_found", &[("query", query)]).await;
                ctx.say(reply).await?;
                return Ok(());
            }
        },
        Some(TrackLoadData::Playlist(playlist)) => {
            playlist_name = Some(playlist.info.name.clone());
            playlist.tracks.into_iter().map(Into::into).collect()
        }
        Some(TrackLoadData::Error(why)) => {
            warn!("Track load failed: {:?}", why);
            let reply = tr(&ctx, "err", "load_failed", &[]).await;
            ctx.say(reply).await?;
            return Ok(());
        }
        None => {
            let reply = tr(&ctx, "err", "not_found", &[("query", query)]).await;
            ctx.say(reply).await?;
            return Ok(());
        }
    };

    let idle = match player.get_player().await {
        Ok(data) => data.track.is_none(),
        Err(_) => true,
    };
    let queued_count = player.get_queue().get_count().await.unwrap_or(0);
    let first_to_play = idle && queued_count == 0;

    let meta = TrackMeta::new(ctx.author().id.get(), first_to_play);
    let meta_value = serde_json::to_value(&meta)?;
    for track in &mut tracks {
        track.track.user_data = Some(meta_value.clone());
    }

    let count = tracks.len();
    let first_title = tracks
        .first()
        .map(|t| t.track.info.title.clone())
        .unwrap_or_default();
    player.get_queue().append(tracks.into())?;

    // Kick the player when it is idle with something queued.
    if let Ok(data) = player.get_player().await {
        if data.track.is_none() && player.get_queue().get_track(0).await.is_ok_and(|t| t.is_some()) {
            player.skip()?;
        }
    }

    let reply = match playlist_name {
        Some(name) => {
            tr(
                &ctx,
                "msg",
                "queued_playlist",
                &[("name", name), ("count", count.to_string())],
            )
            .await
        }
        None if first_to_play => {
            // Announcement comes from the track-start event.
            tr(&ctx, "msg", "starting", &[("title", first_title)]).await
        }
        None => {
            tr(
                &ctx,
                "msg",
                "queued",
                &[("title", first_title), ("position", queued_count.saturating_add(1).to_string())],
            )
            .await
        }
    };
    ctx.say(reply).await?;
    Ok(())
}

#[poise::command(prefix_command, slash_command, category = "Music", guild_only)]
pub async fn pause(ctx: Context<'_>) -> Result<(), Error> {
    let Some(player) = player_or_reply(&ctx).await? else {
        return Ok(());
    };
    player.set_pause(true).await?;
    let reply = tr(&ctx, "msg", "paused", &[]).await;
    ctx.say(reply).await?;
    Ok(())
}

#[poise::command(prefix_command, slash_command, category = "Music", guild_only, aliases("unpause"))]
pub async fn resume(ctx: Context<'_>) -> Result<(), Error> {
    let Some(player) = player_or_reply(&ctx).await? else {
        return Ok(());
    };
    player.set_pause(false).await?;
    let reply = tr(&ctx, "msg", "resumed", &[]).await;
    ctx.say(reply).await?;
    Ok(())
}

/// Skips the current track; playback moves to the next queued one.
#[poise::command(prefix_command, slash_command, category = "Music", guild_only, aliases("next"))]
pub async fn skip(ctx: Context<'_>) -> Result<(), Error> {
    let Some(player) = player_or_reply(&ctx).await? else {
        return Ok(());
    };

    let Some(current) = player.get_player().await?.track else {
        let reply = common(&ctx, "err", "nothing_playing", &[]).await;
        ctx.say(reply).await?;
        return Ok(());
    };
    player.skip()?;

    let reply = tr(&ctx, "msg", "skipped", &[("title", current.info.title)]).await;
    ctx.say(reply).await?;
    Ok(())
}

/// Stops playback, clears the queue and leaves the voice channel.
#[poise::command(prefix_command, slash_command, category = "Music", guild_only, aliases("leave"))]
pub async fn stop(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let lava = &ctx.data().lavalink;

    let Some(player) = player_or_reply(&ctx).await? else {
        return Ok(());
    };
    player.get_queue().clear()?;
    player.stop_now().await?;
    lava.delete_player(guild_id).await?;

    if let Some(manager) = songbird::get(ctx.serenity_context()).await {
        if let Err(e) = manager.remove(guild_id).await {
            warn!("Could not leave voice channel: {e}");
        }
    }

    let reply = tr(&ctx, "msg", "stopped", &[]).await;
    ctx.say(reply).await?;
    Ok(())
}

/// Jumps to a position in the current track. Accepts seconds or clock
/// notation like `1:30`.
#[poise::command(prefix_command, slash_command, category = "Music", guild_only)]
pub async fn seek(
    ctx: Context<'_>,
    #[description = "Position, e.g. 90 or 1:30"] position: String,
) -> Result<(), Error> {
    let Some(player) = player_or_reply(&ctx).await? else {
        return Ok(());
    };

    let Some(secs) = parse_timestamp(&position) else {
        let reply = tr(&ctx, "err", "bad_position", &[("input", position)]).await;
        ctx.say(reply).await?;
        return Ok(());
    };

    let Some(current) = player.get_player().await?.track else {
        let reply = common(&ctx, "err", "nothing_playing", &[]).await;
        ctx.say(reply).await?;
        return Ok(());
    };
    let target_ms = match secs.checked_mul(1000) {
        Some(ms) if current.info.is_seekable && ms <= current.info.length => ms,
        _ => {
            let reply = tr(&ctx, "err", "unseekable", &[("input", position)]).await;
            ctx.say(reply).await?;
            return Ok(());
        }
    };

    player.set_position(Duration::from_secs(secs)).await?;
    let reply = tr(&ctx, "msg", "seeked", &[("position", ms_to_clock(target_ms))]).await;
    ctx.say(reply).await?;
    Ok(())
}

#[poise::command(prefix_command, slash_command, category = "Music", guild_only, aliases("vol"))]
pub async fn volume(
    ctx: Context<'_>,
    #[description = "Volume, 0-200"] volume: u16,
) -> Result<(), Error> {
    let Some(player) = player_or_reply(&ctx).await? else {
        return Ok(());
    };

    let volume = volume.min(MAX_VOLUME);
    player.set_volume(volume).await?;
    let reply = tr(&ctx, "msg", "set", &[("volume", volume.to_string())]).await;
    ctx.say(reply).await?;
    Ok(())
}

#[poise::command(prefix_command, slash_command, category = "Music", guild_only)]
pub async fn shuffle(ctx: Context<'_>) -> Result<(), Error> {
    let Some(player) = player_or_reply(&ctx).await? else {
        return Ok(());
    };

    let queue = player.get_queue();
    let mut tracks: Vec<TrackInQueue> = queue.get_queue().await?.into_iter().collect();
    if tracks.len() < 2 {
        let reply = tr(&ctx, "err", "too_short", &[]).await;
        ctx.say(reply).await?;
        return Ok(());
    }

    tracks.shuffle(&mut rand::thread_rng());
    queue.clear()?;
    queue.append(tracks.into())?;

    let reply = tr(&ctx, "msg", "shuffled", &[]).await;
    ctx.say(reply).await?;
    Ok(())
}

/// Removes the queued track at a 1-based position.
#[poise::command(prefix_command, slash_command, category = "Music", guild_only)]
pub async fn remove(
    ctx: Context<'_>,
    #[description = "Queue position to remove, starting at 1"] position: usize,
) -> Result<(), Error> {
    let Some(player) = player_or_reply(&ctx).await? else {
        return Ok(());
    };

    let queue = player.get_queue();
    let count = queue.get_count().await?;
    if position == 0 || position > count {
        let reply = tr(
            &ctx,
            "err",
            "out_of_range",
            &[("position", position.to_string()), ("count", count.to_string())],
        )
        .await;
        ctx.say(reply).await?;
        return Ok(());
    }

    let title = queue
        .get_track(position - 1)
        .await?
        .map(|t| t.track.info.title)
        .unwrap_or_default();
    queue.remove(position - 1)?;

    let reply = tr(&ctx, "msg", "removed", &[("title", title)]).await;
    ctx.say(reply).await?;
    Ok(())
}

#[poise::command(prefix_command, slash_command, category = "Music", guild_only, aliases("np"))]
pub async fn nowplaying(ctx: Context<'_>) -> Result<(), Error> {
    let Some(player) = player_or_reply(&ctx).await? else {
        return Ok(());
    };

    let data = player.get_player().await?;
    let Some(track) = data.track else {
        let reply = common(&ctx, "err", "nothing_playing", &[]).await;
        ctx.say(reply).await?;
        return Ok(());
    };

    let info = &track.info;
    let link = match &info.uri {
        Some(uri) => format!("[{}]({uri})", info.title),
        None => info.title.clone(),
    };
    let position = data.state.position;
    let progress = if info.is_stream {
        tr(&ctx, "msg", "live", &[]).await
    } else {
        format!(
            "`{}` {} `{}`",
            ms_to_clock(position),
            progress_bar(position, info.length),
            ms_to_clock(info.length)
        )
    };

    let title = tr(&ctx, "msg", "title", &[]).await;
    let mut embed = serenity::CreateEmbed::new()
        .title(title)
        .description(format!("{link}\n{}\n\n{progress}", info.author))
        .color(EMBED_COLOR);
    if let Some(meta) = track
        .user_data
        .clone()
        .and_then(|v| serde_json::from_value::<TrackMeta>(v).ok())
    {
        let requested_by = tr(&ctx, "msg", "requested_by", &[]).await;
        embed = embed.field(requested_by, format!("<@{}>", meta.requester_id), true);
    }

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Shows the queue, ten tracks per page.
#[poise::command(prefix_command, slash_command, category = "Music", guild_only, aliases("q"))]
pub async fn queue(
    ctx: Context<'_>,
    #[description = "Page to show"] page: Option<usize>,
) -> Result<(), Error> {
    let Some(player) = player_or_reply(&ctx).await? else {
        return Ok(());
    };

    let tracks: Vec<TrackInQueue> = player.get_queue().get_queue().await?.into_iter().collect();
    if tracks.is_empty() {
        let reply = tr(&ctx, "msg", "empty", &[]).await;
        ctx.say(reply).await?;
        return Ok(());
    }

    let pages = tracks.len().div_ceil(QUEUE_PAGE_SIZE);
    let page = page.unwrap_or(1).clamp(1, pages);
    let start = (page - 1) * QUEUE_PAGE_SIZE;

    let body = tracks
        .iter()
        .enumerate()
        .skip(start)
        .take(QUEUE_PAGE_SIZE)
        .map(|(i, queued)| {
            let info = &queued.track.info;
            format!("`{}.` {} — {}", i + 1, info.title, ms_to_clock(info.length))
        })
        .collect::<Vec<_>>()
        .join("\n");

    let title = tr(
        &ctx,
        "msg",
        "title",
        &[
            ("count", tracks.len().to_string()),
            ("page", page.to_string()),
            ("pages", pages.to_string()),
        ],
    )
    .await;
    let embed = serenity::CreateEmbed::new()
        .title(title)
        .description(body)
        .color(EMBED_COLOR);
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Lyrics for the current track, or for an explicit search.
#[poise::command(prefix_command, slash_command, category = "Music", guild_only)]
pub async fn lyrics(
    ctx: Context<'_>,
    #[rest]
    #[description = "Song to look up instead of the current track"]
    song: Option<String>,
) -> Result<(), Error> {
    let Some(genius) = &ctx.data().lyrics else {
        let reply = tr(&ctx, "err", "not_configured", &[]).await;
        ctx.say(reply).await?;
        return Ok(());
    };

    let query = match song {
        Some(song) => song,
        None => {
            let Some(track) = current_track(&ctx).await else {
                let reply = common(&ctx, "err", "nothing_playing", &[]).await;
                ctx.say(reply).await?;
                return Ok(());
            };
            format!("{} {}", track.info.title, track.info.author)
        }
    };

    ctx.defer().await?;
    let found = match genius.lyrics(&query).await {
        Ok(found) => found,
        Err(crate::scrape::ScrapeError::NotFound) => {
            let reply = tr(&ctx, "err", "not_found", &[("query", query)]).await;
            ctx.say(reply).await?;
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let mut text = found.text;
    if text.chars().count() > MAX_LYRICS_CHARS {
        text = text.chars().take(MAX_LYRICS_CHARS).collect();
        text.push('…');
    }

    let embed = serenity::CreateEmbed::new()
        .title(query)
        .url(found.url)
        .description(text)
        .color(EMBED_COLOR);
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Spotify statistics for the current track.
///
/// Play count, monthly listeners, release date and the explicit flag.
#[poise::command(prefix_command, slash_command, category = "Music", guild_only)]
pub async fn trackinfo(
    ctx: Context<'_>,
    #[description = "Spotify artist URL, when the player cannot provide one"]
    artist_url: Option<String>,
) -> Result<(), Error> {
    let Some(track) = current_track(&ctx).await else {
        let reply = common(&ctx, "err", "nothing_playing", &[]).await;
        ctx.say(reply).await?;
        return Ok(());
    };

    let Some(track_id) = track
        .info
        .uri
        .as_deref()
        .and_then(|uri| spotify_id(uri, "track"))
    else {
        let reply = tr(&ctx, "err", "not_spotify", &[]).await;
        ctx.say(reply).await?;
        return Ok(());
    };

    let artist_id = artist_url
        .as_deref()
        .or_else(|| {
            track
                .plugin_info
                .as_ref()
                .and_then(|info| info.get("artistUrl"))
                .and_then(serde_json::Value::as_str)
        })
        .and_then(|url| spotify_id(url, "artist"));
    let Some(artist_id) = artist_id else {
        let reply = tr(&ctx, "err", "no_artist", &[]).await;
        ctx.say(reply).await?;
        return Ok(());
    };

    ctx.defer().await?;
    let stats = ctx.data().track_stats.stats(&artist_id, &track_id).await?;

    let explicit_key = if stats.explicit { "explicit" } else { "clean" };
    let fields = [
        (tr(&ctx, "msg", "play_count", &[]).await, stats.play_count),
        (
            tr(&ctx, "msg", "monthly_listeners", &[]).await,
            stats.monthly_listeners,
        ),
        (tr(&ctx, "msg", "release_date", &[]).await, stats.release_date),
        (
            tr(&ctx, "msg", "rating", &[]).await,
            tr(&ctx, "msg", explicit_key, &[]).await,
        ),
    ];

    let mut embed = serenity::CreateEmbed::new()
        .title(track.info.title)
        .color(EMBED_COLOR);
    if let Some(uri) = &track.info.uri {
        embed = embed.url(uri);
    }
    for (name, value) in fields {
        embed = embed.field(name, value, true);
    }
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Nightcore filter: sped up and pitched up playback.
#[poise::command(prefix_command, slash_command, category = "Music", guild_only)]
pub async fn nightcore(
    ctx: Context<'_>,
    #[description = "Turn the filter on or off"] enabled: bool,
) -> Result<(), Error> {
    let Some(player) = player_or_reply(&ctx).await? else {
        return Ok(());
    };

    let filters = if enabled {
        Filters {
            timescale: Some(Timescale {
                speed: Some(1.2),
                pitch: Some(1.2),
                rate: Some(1.0),
            }),
            ..Default::default()
        }
    } else {
        Filters::default()
    };
    player.set_filters(filters).await?;

    let key = if enabled { "on" } else { "off" };
    let reply = tr(&ctx, "msg", key, &[]).await;
    ctx.say(reply).await?;
    Ok(())
}

/// Shared replies that are not tied to one command.
async fn common(ctx: &Context<'_>, kind: &str, key: &str, args: &[(&str, String)]) -> String {
    let locale = super::locale_of(ctx).await;
    ctx.data()
        .i18n
        .tr(locale, "music", "common", kind, key, args)
        .await
}

/// The guild's player context, replying when there is none.
async fn player_or_reply(ctx: &Context<'_>) -> Result<Option<PlayerContext>, Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(None);
    };
    match ctx.data().lavalink.get_player_context(guild_id) {
        Some(player) => Ok(Some(player)),
        None => {
            let reply = common(ctx, "err", "no_player", &[]).await;
            ctx.say(reply).await?;
            Ok(None)
        }
    }
}

async fn current_track(ctx: &Context<'_>) -> Option<lavalink_rs::model::track::TrackData> {
    let guild_id = ctx.guild_id()?;
    let player = ctx.data().lavalink.get_player_context(guild_id)?;
    player.get_player().await.ok()?.track
}

/// `90`, `1:30` and `1:02:03` all work.
pub fn parse_timestamp(input: &str) -> Option<u64> {
    let parts: Vec<&str> = input.trim().split(':').collect();
    if parts.is_empty() || parts.len() > 3 {
        return None;
    }

    let mut secs: u64 = 0;
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            return None;
        }
        let value: u64 = part.parse().ok()?;
        // Trailing units are bounded to 59 in clock notation.
        if parts.len() > 1 && i > 0 && value > 59 {
            return None;
        }
        secs = secs.checked_mul(60)?.checked_add(value)?;
    }
    Some(secs)
}

pub fn ms_to_clock(ms: u64) -> String {
    let total = ms / 1000;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}

/// Twenty-cell progress bar with a cursor at the playback position.
pub fn progress_bar(position_ms: u64, length_ms: u64) -> String {
    const CELLS: u64 = 20;
    let filled = if length_ms == 0 {
        0
    } else {
        (position_ms.min(length_ms) * CELLS / length_ms).min(CELLS - 1)
    };

    let mut bar = String::new();
    for i in 0..CELLS {
        bar.push(if i == filled { '🔘' } else { '▬' });
    }
    bar
}

/// The id out of an `open.spotify.com/<kind>/<id>` URL.
pub fn spotify_id(url: &str, kind: &str) -> Option<String> {
    let marker = format!("open.spotify.com/{kind}/");
    let start = url.find(&marker)? + marker.len();
    let id: String = url[start..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect();
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_parse_in_all_notations() {
        assert_eq!(parse_timestamp("90"), Some(90));
        assert_eq!(parse_timestamp("1:30"), Some(90));
        assert_eq!(parse_timestamp("1:02:03"), Some(3723));
        assert_eq!(parse_timestamp("0:00"), Some(0));
    }

    #[test]
    fn bad_timestamps_are_rejected() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("1:2:3:4"), None);
        assert_eq!(parse_timestamp("1:75"), None);
        assert_eq!(parse_timestamp("abc"), None);
        assert_eq!(parse_timestamp("1:"), None);
    }

    #[test]
    fn absurdly_large_timestamps_do_not_overflow() {
        assert_eq!(parse_timestamp("18000000000000000000:30"), None);
        assert_eq!(parse_timestamp("99999999999999999999"), None);
        // Large but representable values still parse.
        assert_eq!(parse_timestamp(&u64::MAX.to_string()), Some(u64::MAX));
    }

    #[test]
    fn clock_rendering_pads_units() {
        assert_eq!(ms_to_clock(0), "0:00");
        assert_eq!(ms_to_clock(62_000), "1:02");
        assert_eq!(ms_to_clock(3_723_000), "1:02:03");
    }

    #[test]
    fn progress_bar_cursor_tracks_position() {
        let start = progress_bar(0, 100_000);
        assert!(start.starts_with('🔘'));
        let end = progress_bar(100_000, 100_000);
        assert!(end.ends_with('🔘'));
        assert_eq!(progress_bar(0, 0).chars().filter(|c| *c == '🔘').count(), 1);
    }

    #[test]
    fn spotify_ids_are_extracted_from_urls() {
        assert_eq!(
            spotify_id(
                "https://open.spotify.com/track/3n3Ppam7vgaVa1iaRUc9Lp?si=abc",
                "track"
            ),
            Some("3n3Ppam7vgaVa1iaRUc9Lp".to_string())
        );
        assert_eq!(
            spotify_id("https://open.spotify.com/artist/0du5cEVh5yTK9QJze8zA0C", "artist"),
            Some("0du5cEVh5yTK9QJze8zA0C".to_string())
        );
        assert_eq!(spotify_id("https://example.com/track/x", "track"), None);
        assert_eq!(spotify_id("https://open.spotify.com/track/", "track"), None);
    }
}
