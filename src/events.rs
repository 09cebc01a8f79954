use poise::serenity_prelude as serenity;
use serenity::FullEvent;
use tracing::{error, info};

use crate::{Data, Error};

pub async fn handler(
    ctx: &serenity::Context,
    event: &FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        FullEvent::Ready { data_about_bot, .. } => {
            ctx.set_activity(Some(serenity::ActivityData::listening("/help")));
            info!("Logged in as {}", data_about_bot.user.name);
        }

        FullEvent::GuildCreate { guild, is_new } => {
            if *is_new == Some(true) {
                info!("Joined guild {} (id {})", guild.name, guild.id);
                if let Err(e) = data.store.create_default(guild.id.get()).await {
                    error!("Failed to store defaults for guild {}: {e}", guild.id);
                }
            }
        }

        FullEvent::GuildDelete { incomplete, full } => {
            if incomplete.unavailable {
                info!("Guild {} became unavailable", incomplete.id);
            } else {
                let name = full.as_ref().map_or("unknown", |g| g.name.as_str());
                info!("Removed from guild {} (id {})", name, incomplete.id);
                if let Err(e) = data.store.remove(incomplete.id.get()).await {
                    error!("Failed to drop config for guild {}: {e}", incomplete.id);
                }
            }
        }

        _ => {}
    }

    Ok(())
}

/// Global command error handler. Precondition failures get a localized
/// reply; anything unclassified is logged with its chain and answered
/// generically. The process never dies on a command error.
pub async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!(
                "Command {} failed: {error}",
                ctx.command().qualified_name
            );
            let reply = generic_error(&ctx).await;
            if let Err(e) = ctx.say(reply).await {
                error!("Failed to report command error: {e}");
            }
        }

        poise::FrameworkError::NotAnOwner { ctx, .. } => {
            let reply = common_reply(&ctx, "owner_only").await;
            let _ = ctx.say(reply).await;
        }

        poise::FrameworkError::GuildOnly { ctx, .. } => {
            let reply = common_reply(&ctx, "guild_only").await;
            let _ = ctx.say(reply).await;
        }

        poise::FrameworkError::ArgumentParse { input, ctx, .. } => {
            let reply = common_reply_with(
                &ctx,
                "bad_argument",
                &[("input", input.unwrap_or_default())],
            )
            .await;
            let _ = ctx.say(reply).await;
        }

        poise::FrameworkError::CooldownHit { remaining_cooldown, ctx, .. } => {
            let reply = common_reply_with(
                &ctx,
                "cooldown",
                &[("seconds", remaining_cooldown.as_secs().to_string())],
            )
            .await;
            let _ = ctx.say(reply).await;
        }

        poise::FrameworkError::UnknownCommand { .. } => {}

        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                error!("Error handler itself failed: {e}");
            }
        }
    }
}

async fn generic_error(ctx: &crate::Context<'_>) -> String {
    common_reply(ctx, "unexpected").await
}

/// Errors that are not tied to one command live under the shared `common`
/// entry of the events catalog.
async fn common_reply(ctx: &crate::Context<'_>, key: &str) -> String {
    common_reply_with(ctx, key, &[]).await
}

async fn common_reply_with(
    ctx: &crate::Context<'_>,
    key: &str,
    args: &[(&str, String)],
) -> String {
    let locale = crate::commands::locale_of(ctx).await;
    ctx.data()
        .i18n
        .tr(locale, "events", "common", "err", key, args)
        .await
}
