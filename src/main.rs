use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context as _;
use poise::serenity_prelude as serenity;
use songbird::SerenityInit;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use encore::args::{LaunchArgs, USAGE};
use encore::commands;
use encore::db::BotDb;
use encore::downloads::{self, DownloadCache};
use encore::events;
use encore::i18n::Translations;
use encore::lavalink::{self, HookState, NodeHandle};
use encore::metrics::{self, CommandUsage};
use encore::reddit::MemeFeed;
use encore::scrape::genius::GeniusClient;
use encore::scrape::spotify::TrackStatsClient;
use encore::settings::Settings;
use encore::signal;
use encore::store::GuildStore;
use encore::{Data, Error};

const NODE_READY_TIMEOUT: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = match LaunchArgs::parse(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}\n\n{USAGE}");
            std::process::exit(2);
        }
    };
    if args.help {
        println!("{USAGE}");
        return Ok(());
    }

    // Load .env variables if it exists.
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut settings = Settings::from_env()?;
    settings.dev |= args.dev;
    if settings.dev {
        info!("Running in development mode");
    }

    let http = reqwest::Client::builder()
        .user_agent(settings.user_agent.clone())
        .build()
        .context("failed to build the http client")?;

    // Attach to an existing playback node, or spawn our own from the jar.
    let node = match &args.lavalink {
        Some(endpoint) => {
            info!("Connecting to playback node at {endpoint}");
            Arc::new(NodeHandle::connect(
                endpoint.clone(),
                settings.lavalink_password.clone(),
                http.clone(),
            ))
        }
        None => {
            let jar = args
                .lavalink_path
                .clone()
                .unwrap_or_else(|| settings.lavalink_jar.clone());
            Arc::new(NodeHandle::spawn(&jar, settings.lavalink_password.clone(), http.clone()).await?)
        }
    };
    node.wait_ready(NODE_READY_TIMEOUT).await?;

    let db = BotDb::connect(&settings.database_url).await?;
    db.apply_migrations(Path::new("./migrations")).await?;

    let store = Arc::new(GuildStore::new(
        db.clone(),
        settings.default_prefix.clone(),
        settings.default_locale,
    ));
    store.warm().await?;

    let i18n = Arc::new(Translations::load("./i18n", settings.default_locale).await?);

    let usage = Arc::new(CommandUsage::default());
    metrics::spawn_flush_task(db.clone(), usage.clone(), metrics::FLUSH_PERIOD);

    let memes = Arc::new(MemeFeed::new(
        http.clone(),
        settings.meme_subreddit.clone(),
        settings.user_agent.clone(),
    ));
    {
        // The meme feed is a nicety; startup does not depend on it.
        let memes = memes.clone();
        tokio::spawn(async move {
            if let Err(e) = memes.refresh().await {
                warn!("Could not fetch the meme feed: {e}");
            }
        });
    }

    let download_cache = Arc::new(DownloadCache::new(
        settings.download_dir.clone(),
        settings.download_cap_bytes,
    ));
    downloads::spawn_sweeper(download_cache.clone(), downloads::SWEEP_PERIOD);

    let mut bot_commands = commands::all(settings.dev);
    i18n.localize_commands(&mut bot_commands).await;

    let options = poise::FrameworkOptions {
        commands: bot_commands,
        prefix_options: poise::PrefixFrameworkOptions {
            dynamic_prefix: Some(|ctx| {
                Box::pin(async move {
                    let prefix = match ctx.guild_id {
                        Some(guild) => ctx.data.store.prefix(guild.get()).await,
                        None => ctx.data.settings.default_prefix.clone(),
                    };
                    Ok(Some(prefix))
                })
            }),
            ..Default::default()
        },
        post_command: |ctx| {
            Box::pin(async move {
                ctx.data().metrics.bump(&ctx.command().qualified_name).await;
            })
        },
        on_error: |err| Box::pin(events::on_error(err)),
        event_handler: |ctx, event, framework, data| {
            Box::pin(events::handler(ctx, event, framework, data))
        },
        ..Default::default()
    };

    let token = settings.discord_token.clone();
    let setup_node = node.clone();
    let setup_store = store.clone();
    let setup_i18n = i18n.clone();
    let setup_db = db.clone();
    let setup_usage = usage.clone();
    let setup_http = http.clone();

    let framework = poise::Framework::builder()
        .options(options)
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Connected as {}", ready.user.name);
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                let lava = lavalink::build_client(ready.user.id, &setup_node).await;
                lavalink::install_hook_state(HookState {
                    node: setup_node.clone(),
                    store: setup_store.clone(),
                    i18n: setup_i18n.clone(),
                });

                Ok::<Data, Error>(Data {
                    lyrics: settings
                        .genius_token
                        .clone()
                        .map(|token| GeniusClient::new(setup_http.clone(), token)),
                    track_stats: TrackStatsClient::new(setup_http.clone()),
                    settings,
                    db: setup_db,
                    store: setup_store,
                    i18n: setup_i18n,
                    metrics: setup_usage,
                    memes,
                    downloads: download_cache,
                    node: setup_node,
                    lavalink: lava,
                    started_at: Instant::now(),
                })
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged() | serenity::GatewayIntents::MESSAGE_CONTENT;
    let mut client = serenity::ClientBuilder::new(&token, intents)
        .framework(framework)
        .register_songbird()
        .await?;

    tokio::select! {
        result = client.start() => {
            if let Err(why) = result {
                error!("Client error: {why:?}");
            }
        }
        _ = signal::wait_for_signal() => {
            info!("Shutting down");
        }
    }

    // Counters accumulated since the last periodic flush.
    usage.flush(&db).await;
    node.shutdown().await;
    Ok(())
}
