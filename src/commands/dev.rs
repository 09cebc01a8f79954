use std::collections::BTreeMap;

use poise::serenity_prelude as serenity;
use tracing::info;

use super::tr;
use crate::{Context, Error};

/// Command usage counters: persisted totals plus the not-yet-flushed
/// in-memory deltas.
#[poise::command(prefix_command, slash_command, category = "Dev", owners_only, hide_in_help)]
pub async fn usage(ctx: Context<'_>) -> Result<(), Error> {
    let data = ctx.data();
    let stored = data.db.command_usage().await?;
    let pending = data.metrics.snapshot().await;

    let mut totals: BTreeMap<String, i64> = stored.into_iter().collect();
    for (name, uses) in pending {
        *totals.entry(name).or_insert(0) += uses as i64;
    }

    if totals.is_empty() {
        let reply = tr(&ctx, "msg", "empty", &[]).await;
        ctx.say(reply).await?;
        return Ok(());
    }

    let mut rows: Vec<(String, i64)> = totals.into_iter().collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1));

    let body = rows
        .iter()
        .map(|(name, uses)| format!("`{name}`: {uses}"))
        .collect::<Vec<_>>()
        .join("\n");
    let title = tr(&ctx, "msg", "title", &[]).await;
    let embed = serenity::CreateEmbed::new()
        .title(title)
        .description(body)
        .color(0x5865F2);
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Reload switches for state that can change without a restart.
#[poise::command(
    prefix_command,
    slash_command,
    category = "Dev",
    owners_only,
    hide_in_help,
    subcommands("translations", "memes"),
    subcommand_required
)]
pub async fn reload(_: Context<'_>) -> Result<(), Error> {
    Ok(())
}

#[poise::command(prefix_command, slash_command, category = "Dev", owners_only, hide_in_help)]
async fn translations(ctx: Context<'_>) -> Result<(), Error> {
    let count = ctx.data().i18n.reload().await?;
    let reply = tr(&ctx, "msg", "done", &[("count", count.to_string())]).await;
    ctx.say(reply).await?;
    Ok(())
}

#[poise::command(prefix_command, slash_command, category = "Dev", owners_only, hide_in_help)]
async fn memes(ctx: Context<'_>) -> Result<(), Error> {
    ctx.defer().await?;
    let count = ctx.data().memes.refresh().await?;
    let reply = tr(&ctx, "msg", "done", &[("count", count.to_string())]).await;
    ctx.say(reply).await?;
    Ok(())
}

/// Re-registers the command set in the testing guild, where updates are
/// visible immediately.
#[poise::command(prefix_command, slash_command, category = "Dev", owners_only, hide_in_help)]
pub async fn sync(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = ctx.data().settings.testing_guild_id else {
        let reply = tr(&ctx, "err", "no_testing_guild", &[]).await;
        ctx.say(reply).await?;
        return Ok(());
    };

    poise::builtins::register_in_guild(
        ctx,
        &ctx.framework().options().commands,
        serenity::GuildId::new(guild_id),
    )
    .await?;

    let reply = tr(&ctx, "msg", "done", &[("guild", guild_id.to_string())]).await;
    ctx.say(reply).await?;
    Ok(())
}

/// Runs a download cache sweep right now instead of waiting for the
/// periodic one.
#[poise::command(prefix_command, slash_command, category = "Dev", owners_only, hide_in_help)]
pub async fn sweep(ctx: Context<'_>) -> Result<(), Error> {
    let report = ctx.data().downloads.sweep().await?;
    let reply = tr(
        &ctx,
        "msg",
        "done",
        &[
            ("evicted", report.files_evicted.to_string()),
            ("freed", report.bytes_freed.to_string()),
            ("kept", report.bytes_kept.to_string()),
        ],
    )
    .await;
    ctx.say(reply).await?;
    Ok(())
}

#[poise::command(prefix_command, slash_command, category = "Dev", owners_only, hide_in_help)]
pub async fn shutdown(ctx: Context<'_>) -> Result<(), Error> {
    info!("Shutdown requested by {}", ctx.author().name);
    let reply = tr(&ctx, "msg", "bye", &[]).await;
    ctx.say(reply).await?;
    ctx.serenity_context().shard.shutdown_clean();
    Ok(())
}
