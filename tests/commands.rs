use std::collections::HashSet;

use encore::commands;

#[test]
fn registry_has_every_command_once() {
    let commands = commands::all(false);
    let names: Vec<&str> = commands.iter().map(|c| c.name.as_str()).collect();

    let unique: HashSet<&&str> = names.iter().collect();
    assert_eq!(unique.len(), names.len(), "duplicate command names: {names:?}");

    for expected in [
        "prefix",
        "language",
        "sponsorblock",
        "ping",
        "invite",
        "source",
        "uptime",
        "help",
        "meme",
        "roll",
        "coinflip",
        "usage",
        "reload",
        "sweep",
        "play",
        "pause",
        "resume",
        "skip",
        "stop",
        "seek",
        "volume",
        "shuffle",
        "remove",
        "nowplaying",
        "queue",
        "lyrics",
        "trackinfo",
        "nightcore",
    ] {
        assert!(names.contains(&expected), "missing command {expected}");
    }
}

#[test]
fn dev_mode_adds_sync_and_shutdown() {
    let normal = commands::all(false);
    let dev = commands::all(true);
    assert_eq!(dev.len(), normal.len() + 2);

    let names: Vec<&str> = dev.iter().map(|c| c.name.as_str()).collect();
    assert!(names.contains(&"sync"));
    assert!(names.contains(&"shutdown"));
    assert!(!normal.iter().any(|c| c.name == "sync"));
}

#[test]
fn every_command_is_exposed_as_slash_and_prefix() {
    for command in commands::all(true) {
        let has_subcommands = !command.subcommands.is_empty();
        assert!(
            command.slash_action.is_some() || has_subcommands,
            "{} has no slash action",
            command.name
        );
        assert!(
            command.prefix_action.is_some() || has_subcommands,
            "{} has no prefix action",
            command.name
        );
    }
}

#[test]
fn commands_are_grouped_into_known_categories() {
    let known = ["Config", "Misc", "Fun", "Dev", "Music"];
    for command in commands::all(true) {
        let category = command.category.as_deref().unwrap_or("");
        assert!(
            known.contains(&category),
            "{} has unexpected category {category:?}",
            command.name
        );
    }
}

#[test]
fn sponsorblock_group_has_all_subcommands() {
    let commands = commands::all(false);
    let group = commands.iter().find(|c| c.name == "sponsorblock").unwrap();
    let subs: Vec<&str> = group.subcommands.iter().map(|c| c.name.as_str()).collect();
    for expected in ["enable", "disable", "announce", "status"] {
        assert!(subs.contains(&expected), "missing subcommand {expected}");
    }
}
