use super::tr;
use crate::{Context, Error};

/// Gateway latency.
#[poise::command(prefix_command, slash_command, category = "Misc")]
pub async fn ping(ctx: Context<'_>) -> Result<(), Error> {
    let latency = ctx.ping().await;
    let reply = tr(&ctx, "msg", "pong", &[("ms", latency.as_millis().to_string())]).await;
    ctx.say(reply).await?;
    Ok(())
}

/// Link to invite the bot to another server.
#[poise::command(prefix_command, slash_command, category = "Misc")]
pub async fn invite(ctx: Context<'_>) -> Result<(), Error> {
    let reply = tr(
        &ctx,
        "msg",
        "link",
        &[("url", ctx.data().settings.invite_link.clone())],
    )
    .await;
    ctx.say(reply).await?;
    Ok(())
}

/// Link to the bot's source repository.
#[poise::command(prefix_command, slash_command, category = "Misc")]
pub async fn source(ctx: Context<'_>) -> Result<(), Error> {
    let reply = tr(
        &ctx,
        "msg",
        "link",
        &[("url", ctx.data().settings.source_link.clone())],
    )
    .await;
    ctx.say(reply).await?;
    Ok(())
}

/// How long the current process has been running.
#[poise::command(prefix_command, slash_command, category = "Misc")]
pub async fn uptime(ctx: Context<'_>) -> Result<(), Error> {
    let elapsed = ctx.data().started_at.elapsed();
    let reply = tr(&ctx, "msg", "up", &[("uptime", format_duration(elapsed.as_secs()))]).await;
    ctx.say(reply).await?;
    Ok(())
}

#[poise::command(prefix_command, slash_command, category = "Misc", track_edits)]
pub async fn help(
    ctx: Context<'_>,
    #[description = "Command to show help for"] command: Option<String>,
) -> Result<(), Error> {
    let bottom = tr(&ctx, "msg", "footer", &[]).await;
    poise::builtins::help(
        ctx,
        command.as_deref(),
        poise::builtins::HelpConfiguration {
            extra_text_at_bottom: &bottom,
            ..Default::default()
        },
    )
    .await?;
    Ok(())
}

pub fn format_duration(total_secs: u64) -> String {
    let days = total_secs / 86_400;
    let hours = (total_secs % 86_400) / 3_600;
    let minutes = (total_secs % 3_600) / 60;
    let seconds = total_secs % 60;

    if days > 0 {
        format!("{days}d {hours}h {minutes}m {seconds}s")
    } else if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

#[cfg(test)]
mod tests {
    use super::format_duration;

    #[test]
    fn duration_formatting_drops_leading_zero_units() {
        assert_eq!(format_duration(42), "42s");
        assert_eq!(format_duration(62), "1m 2s");
        assert_eq!(format_duration(3_661), "1h 1m 1s");
        assert_eq!(format_duration(90_061), "1d 1h 1m 1s");
    }
}
