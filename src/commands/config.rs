use tracing::warn;

use super::tr;
use crate::i18n::Locale;
use crate::store::{SbCategory, SettingChange};
use crate::{Context, Error};

const MAX_PREFIX_LEN: usize = 5;

/// Changes the text command prefix for this guild.
#[poise::command(
    prefix_command,
    slash_command,
    category = "Config",
    guild_only,
    aliases("setprefix")
)]
pub async fn prefix(
    ctx: Context<'_>,
    #[description = "New command prefix"] new_prefix: String,
) -> Result<(), Error> {
    let Some(guild) = ctx.guild_id() else {
        return Ok(());
    };
    let new_prefix = new_prefix.trim();

    if new_prefix.is_empty()
        || new_prefix.len() > MAX_PREFIX_LEN
        || new_prefix.chars().any(char::is_whitespace)
    {
        let reply = tr(&ctx, "err", "invalid", &[("max", MAX_PREFIX_LEN.to_string())]).await;
        ctx.say(reply).await?;
        return Ok(());
    }

    match ctx.data().store.set_prefix(guild.get(), new_prefix).await {
        SettingChange::Unchanged => {
            let reply = tr(&ctx, "msg", "already_set", &[("prefix", new_prefix.to_string())]).await;
            ctx.say(reply).await?;
        }
        SettingChange::Updated => {
            let reply = tr(&ctx, "msg", "updated", &[("prefix", new_prefix.to_string())]).await;
            let (persisted, sent) = tokio::join!(ctx.data().store.persist(guild.get()), ctx.say(reply));
            persisted?;
            sent?;
        }
    }
    Ok(())
}

/// Changes the reply language for this guild.
#[poise::command(
    prefix_command,
    slash_command,
    category = "Config",
    guild_only,
    aliases("lang")
)]
pub async fn language(
    ctx: Context<'_>,
    #[description = "Language code or name"] language: String,
) -> Result<(), Error> {
    let Some(guild) = ctx.guild_id() else {
        return Ok(());
    };

    let Some(locale) = Locale::parse(&language) else {
        let reply = tr(
            &ctx,
            "err",
            "unknown",
            &[
                ("lang", language.clone()),
                ("langs", Locale::accepted_names()),
            ],
        )
        .await;
        ctx.say(reply).await?;
        return Ok(());
    };

    match ctx.data().store.set_locale(guild.get(), locale).await {
        SettingChange::Unchanged => {
            let reply = tr(&ctx, "msg", "already_set", &[("lang", locale.display_name().to_string())]).await;
            ctx.say(reply).await?;
        }
        SettingChange::Updated => {
            let reply = tr(&ctx, "msg", "updated", &[("lang", locale.display_name().to_string())]).await;
            let (persisted, sent) = tokio::join!(ctx.data().store.persist(guild.get()), ctx.say(reply));
            persisted?;
            sent?;
        }
    }
    Ok(())
}

/// Sponsor-block settings for this guild.
///
/// Controls which segment categories the playback node skips and whether
/// skips are announced.
#[poise::command(
    prefix_command,
    slash_command,
    category = "Config",
    guild_only,
    subcommands("enable", "disable", "announce", "status"),
    subcommand_required,
    aliases("sb")
)]
pub async fn sponsorblock(_: Context<'_>) -> Result<(), Error> {
    Ok(())
}

#[poise::command(prefix_command, slash_command, guild_only, category = "Config")]
async fn enable(
    ctx: Context<'_>,
    #[description = "Segment category to skip"] category: String,
) -> Result<(), Error> {
    let Some(guild) = ctx.guild_id() else {
        return Ok(());
    };
    let Some(cat) = SbCategory::parse(&category) else {
        let reply = unknown_category(&ctx, &category).await;
        ctx.say(reply).await?;
        return Ok(());
    };

    match ctx.data().store.enable_category(guild.get(), cat).await {
        Err(_) => {
            let reply = tr(&ctx, "err", "already_enabled", &[("category", cat.as_str().to_string())]).await;
            ctx.say(reply).await?;
        }
        Ok(active) => {
            let reply = tr(&ctx, "msg", "enabled", &[("category", cat.as_str().to_string())]).await;
            let data = ctx.data();
            let (persisted, pushed, sent) = tokio::join!(
                data.store.persist(guild.get()),
                data.node.update_sponsorblock(guild.get(), &active),
                ctx.say(reply),
            );
            persisted?;
            sent?;
            if let Err(e) = pushed {
                // No session or no player yet; the categories apply once one exists.
                warn!("Sponsorblock update not pushed for guild {guild}: {e}");
            }
        }
    }
    Ok(())
}

#[poise::command(prefix_command, slash_command, guild_only, category = "Config")]
async fn disable(
    ctx: Context<'_>,
    #[description = "Segment category to stop skipping"] category: String,
) -> Result<(), Error> {
    let Some(guild) = ctx.guild_id() else {
        return Ok(());
    };
    let Some(cat) = SbCategory::parse(&category) else {
        let reply = unknown_category(&ctx, &category).await;
        ctx.say(reply).await?;
        return Ok(());
    };

    match ctx.data().store.disable_category(guild.get(), cat).await {
        Err(_) => {
            let reply = tr(&ctx, "err", "not_enabled", &[("category", cat.as_str().to_string())]).await;
            ctx.say(reply).await?;
        }
        Ok(active) => {
            let reply = tr(&ctx, "msg", "disabled", &[("category", cat.as_str().to_string())]).await;
            let data = ctx.data();
            let (persisted, pushed, sent) = tokio::join!(
                data.store.persist(guild.get()),
                data.node.update_sponsorblock(guild.get(), &active),
                ctx.say(reply),
            );
            persisted?;
            sent?;
            if let Err(e) = pushed {
                warn!("Sponsorblock update not pushed for guild {guild}: {e}");
            }
        }
    }
    Ok(())
}

#[poise::command(prefix_command, slash_command, guild_only, category = "Config")]
async fn announce(
    ctx: Context<'_>,
    #[description = "Announce skipped segments in chat"] enabled: bool,
) -> Result<(), Error> {
    let Some(guild) = ctx.guild_id() else {
        return Ok(());
    };

    let key = if enabled { "announce_on" } else { "announce_off" };
    match ctx.data().store.set_announce_skips(guild.get(), enabled).await {
        SettingChange::Unchanged => {
            let reply = tr(&ctx, "msg", "already_set", &[]).await;
            ctx.say(reply).await?;
        }
        SettingChange::Updated => {
            let reply = tr(&ctx, "msg", key, &[]).await;
            let (persisted, sent) = tokio::join!(ctx.data().store.persist(guild.get()), ctx.say(reply));
            persisted?;
            sent?;
        }
    }
    Ok(())
}

#[poise::command(prefix_command, slash_command, guild_only, category = "Config")]
async fn status(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild) = ctx.guild_id() else {
        return Ok(());
    };
    let config = ctx.data().store.get(guild.get()).await;

    let categories = if config.sponsorblock.categories.is_empty() {
        tr(&ctx, "msg", "none", &[]).await
    } else {
        config
            .sponsorblock
            .categories
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };
    let announce_key = if config.sponsorblock.announce_skips {
        "announce_on"
    } else {
        "announce_off"
    };
    let announce = tr(&ctx, "msg", announce_key, &[]).await;
    let reply = tr(
        &ctx,
        "msg",
        "status",
        &[("categories", categories), ("announce", announce)],
    )
    .await;
    ctx.say(reply).await?;
    Ok(())
}

async fn unknown_category(ctx: &Context<'_>, input: &str) -> String {
    let known = SbCategory::ALL
        .iter()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    tr(
        ctx,
        "err",
        "unknown_category",
        &[("category", input.to_string()), ("categories", known)],
    )
    .await
}
