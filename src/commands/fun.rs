use std::sync::OnceLock;

use poise::serenity_prelude as serenity;
use rand::Rng;
use regex::Regex;

use super::tr;
use crate::{Context, Error};

const MAX_DICE: u64 = 100;
const MAX_SIDES: u64 = 1000;

/// A random submission from the meme subreddit's weekly top listing.
#[poise::command(prefix_command, slash_command, category = "Fun")]
pub async fn meme(ctx: Context<'_>) -> Result<(), Error> {
    let Some(post) = ctx.data().memes.random().await else {
        let reply = tr(&ctx, "err", "empty_feed", &[]).await;
        ctx.say(reply).await?;
        return Ok(());
    };

    let embed = serenity::CreateEmbed::new()
        .title(post.title)
        .url(post.permalink)
        .image(post.url)
        .color(0xFF4500);
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Dice roller, standard `NdM` notation.
#[poise::command(prefix_command, slash_command, category = "Fun")]
pub async fn roll(
    ctx: Context<'_>,
    #[description = "Dice to roll, e.g. 2d6"] dice: String,
) -> Result<(), Error> {
    let Some((count, sides)) = parse_dice(&dice) else {
        let reply = tr(
            &ctx,
            "err",
            "bad_notation",
            &[
                ("input", dice.clone()),
                ("max_dice", MAX_DICE.to_string()),
                ("max_sides", MAX_SIDES.to_string()),
            ],
        )
        .await;
        ctx.say(reply).await?;
        return Ok(());
    };

    let rolls: Vec<u64> = {
        let mut rng = rand::thread_rng();
        (0..count).map(|_| rng.gen_range(1..=sides)).collect()
    };
    let total: u64 = rolls.iter().sum();
    let detail = rolls
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(" + ");

    let reply = tr(
        &ctx,
        "msg",
        "result",
        &[("detail", detail), ("total", total.to_string())],
    )
    .await;
    ctx.say(reply).await?;
    Ok(())
}

#[poise::command(prefix_command, slash_command, category = "Fun")]
pub async fn coinflip(ctx: Context<'_>) -> Result<(), Error> {
    let key = if rand::thread_rng().gen_bool(0.5) {
        "heads"
    } else {
        "tails"
    };
    let reply = tr(&ctx, "msg", key, &[]).await;
    ctx.say(reply).await?;
    Ok(())
}

/// Parses `NdM` into (count, sides), bounded to keep replies small. A bare
/// `dM` rolls one die.
pub fn parse_dice(input: &str) -> Option<(u64, u64)> {
    static NOTATION: OnceLock<Regex> = OnceLock::new();
    let re = NOTATION.get_or_init(|| Regex::new(r"^(\d*)d(\d+)$").unwrap());

    let caps = re.captures(input.trim())?;
    let count = match &caps[1] {
        "" => 1,
        digits => digits.parse().ok()?,
    };
    let sides: u64 = caps[2].parse().ok()?;

    if count == 0 || count > MAX_DICE || sides < 2 || sides > MAX_SIDES {
        return None;
    }
    Some((count, sides))
}

#[cfg(test)]
mod tests {
    use super::parse_dice;

    #[test]
    fn accepts_standard_notation() {
        assert_eq!(parse_dice("2d6"), Some((2, 6)));
        assert_eq!(parse_dice("d20"), Some((1, 20)));
        assert_eq!(parse_dice(" 100d1000 "), Some((100, 1000)));
    }

    #[test]
    fn rejects_degenerate_and_oversized_dice() {
        assert_eq!(parse_dice("0d6"), None);
        assert_eq!(parse_dice("2d1"), None);
        assert_eq!(parse_dice("101d6"), None);
        assert_eq!(parse_dice("2d1001"), None);
        assert_eq!(parse_dice("2x6"), None);
        assert_eq!(parse_dice("banana"), None);
    }
}
