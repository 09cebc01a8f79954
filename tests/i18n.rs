use encore::i18n::{Locale, Translations};

/// The real catalogs that ship with the bot.
async fn shipped() -> Translations {
    Translations::load(concat!(env!("CARGO_MANIFEST_DIR"), "/i18n"), Locale::En)
        .await
        .unwrap()
}

#[tokio::test]
async fn shipped_catalogs_resolve_in_both_languages() {
    let i18n = shipped().await;

    let en = i18n
        .tr(Locale::En, "music", "pause", "msg", "paused", &[])
        .await;
    assert_eq!(en, "Playback paused.");

    let pt = i18n
        .tr(Locale::Pt, "music", "pause", "msg", "paused", &[])
        .await;
    assert_eq!(pt, "Reprodução pausada.");
}

#[tokio::test]
async fn placeholders_are_interpolated() {
    let i18n = shipped().await;
    let reply = i18n
        .tr(
            Locale::En,
            "config",
            "prefix",
            "msg",
            "updated",
            &[("prefix", "!".to_string())],
        )
        .await;
    assert_eq!(reply, "Prefix changed to `!`.");
}

#[tokio::test]
async fn missing_keys_fall_back_to_default_language_then_path() {
    let dir = tempfile::tempdir().unwrap();
    let en = dir.path().join("en");
    std::fs::create_dir_all(&en).unwrap();
    std::fs::write(
        en.join("misc.json"),
        r#"{"ping": {"msg": {"pong": "english only"}}}"#,
    )
    .unwrap();
    // No pt directory at all.

    let i18n = Translations::load(dir.path(), Locale::En).await.unwrap();

    let fallback = i18n.tr(Locale::Pt, "misc", "ping", "msg", "pong", &[]).await;
    assert_eq!(fallback, "english only");

    let missing = i18n.tr(Locale::Pt, "misc", "ping", "msg", "nope", &[]).await;
    assert_eq!(missing, "misc.ping.msg.nope");
}

#[tokio::test]
async fn reload_picks_up_edited_catalogs() {
    let dir = tempfile::tempdir().unwrap();
    let en = dir.path().join("en");
    std::fs::create_dir_all(&en).unwrap();
    std::fs::write(en.join("misc.json"), r#"{"ping": {"msg": {"pong": "before"}}}"#).unwrap();

    let i18n = Translations::load(dir.path(), Locale::En).await.unwrap();
    assert_eq!(i18n.tr(Locale::En, "misc", "ping", "msg", "pong", &[]).await, "before");

    std::fs::write(en.join("misc.json"), r#"{"ping": {"msg": {"pong": "after"}}}"#).unwrap();
    i18n.reload().await.unwrap();
    assert_eq!(i18n.tr(Locale::En, "misc", "ping", "msg", "pong", &[]).await, "after");
}

#[tokio::test]
async fn command_meta_fills_discord_localizations() {
    let i18n = shipped().await;
    let mut commands = encore::commands::all(false);
    i18n.localize_commands(&mut commands).await;

    let play = commands.iter().find(|c| c.name == "play").unwrap();
    assert_eq!(
        play.name_localizations.get("pt-BR").map(String::as_str),
        Some("tocar")
    );
    // English names are the defaults, no localization entries expected.
    assert!(!play.name_localizations.contains_key("en-US"));

    let sponsorblock = commands.iter().find(|c| c.name == "sponsorblock").unwrap();
    let enable = sponsorblock
        .subcommands
        .iter()
        .find(|c| c.name == "enable")
        .unwrap();
    assert_eq!(
        enable.name_localizations.get("pt-BR").map(String::as_str),
        Some("ativar")
    );
}
