pub mod config;
pub mod dev;
pub mod fun;
pub mod misc;
pub mod music;

use crate::i18n::Locale;
use crate::{Context, Data, Error};

/// Static command registry. Commands are declared once here; localized
/// names and descriptions are filled in before registration.
pub fn all(dev_mode: bool) -> Vec<poise::Command<Data, Error>> {
    let mut commands = vec![
        config::prefix(),
        config::language(),
        config::sponsorblock(),
        misc::ping(),
        misc::invite(),
        misc::source(),
        misc::uptime(),
        misc::help(),
        fun::meme(),
        fun::roll(),
        fun::coinflip(),
        dev::usage(),
        dev::reload(),
        dev::sweep(),
        music::play(),
        music::pause(),
        music::resume(),
        music::skip(),
        music::stop(),
        music::seek(),
        music::volume(),
        music::shuffle(),
        music::remove(),
        music::nowplaying(),
        music::queue(),
        music::lyrics(),
        music::trackinfo(),
        music::nightcore(),
    ];

    if dev_mode {
        commands.push(dev::sync());
        commands.push(dev::shutdown());
    }

    commands
}

pub async fn locale_of(ctx: &Context<'_>) -> Locale {
    match ctx.guild_id() {
        Some(guild) => ctx.data().store.locale(guild.get()).await,
        None => ctx.data().settings.default_locale,
    }
}

/// Resolves a reply template for the invoking command in the guild's
/// language: catalogs are keyed by (cog, command, kind, key).
pub async fn tr(ctx: &Context<'_>, kind: &str, key: &str, args: &[(&str, String)]) -> String {
    let locale = locale_of(ctx).await;
    let command = ctx.command();
    let cog = command.category.as_deref().unwrap_or("misc").to_lowercase();
    let name = command.qualified_name.replace(' ', "_");
    ctx.data().i18n.tr(locale, &cog, &name, kind, key, args).await
}
