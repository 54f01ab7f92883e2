use std::sync::Arc;

use clap::Parser;
use tokio::sync::mpsc::unbounded_channel;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

use volnabot_common::traits::voice_traits::StreamEnded;
use volnabot_core::catalog::StationCatalog;
use volnabot_core::icy::IcyTitleFetcher;
use volnabot_core::platforms::discord::{DiscordPlatform, DiscordSurface, SongbirdVoice};
use volnabot_core::services::context::BotContext;
use volnabot_core::services::discord::slashcommands::register_global_slash_commands;
use volnabot_core::services::playback::PlaybackCoordinator;
use volnabot_core::tasks::{control_refresh, track_updater};

#[derive(Parser, Debug, Clone)]
#[command(name = "volnabot")]
#[command(author, version, about = "Volnabot - internet-radio voice bot for Discord")]
struct Args {
    /// Bot token; falls back to the DISCORD_TOKEN environment variable.
    #[arg(long)]
    token: Option<String>,
}

fn init_tracing() {
    let filter = EnvFilter::from_default_env()
        .add_directive("volnabot=info".parse().unwrap_or_default());
    let sub = fmt().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(sub).expect("Failed to set global subscriber");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let args = Args::parse();
    let token = match args.token.or_else(|| std::env::var("DISCORD_TOKEN").ok()) {
        Some(token) if !token.is_empty() => token,
        _ => anyhow::bail!("no Discord token: pass --token or set DISCORD_TOKEN"),
    };

    let mut platform = DiscordPlatform::new(token);
    platform.connect().await?;

    let http = platform.http.clone().expect("http client after connect");
    let cache = platform.cache.clone().expect("cache after connect");
    let songbird = platform.songbird.clone().expect("songbird after connect");
    let application_id = platform.application_id.expect("application id after connect");
    let bot_user_id = platform.bot_user_id.expect("bot user id after connect");

    let (ended_tx, mut ended_rx) = unbounded_channel::<StreamEnded>();

    let catalog = Arc::new(StationCatalog::builtin());
    let icy = Arc::new(IcyTitleFetcher::new());
    let voice = Arc::new(SongbirdVoice::new(songbird.clone(), ended_tx));
    let surface = Arc::new(DiscordSurface::new(http.clone(), platform.senders()));
    let coordinator = Arc::new(PlaybackCoordinator::new(catalog, voice, surface, icy));

    register_global_slash_commands(&http, application_id).await?;
    info!("Registered global slash commands.");

    let ctx = Arc::new(BotContext {
        coordinator: coordinator.clone(),
        http,
        cache,
        songbird,
        application_id,
        bot_user_id,
    });

    platform.start(ctx);

    // Stream terminations funnel through one consumer; per-guild ordering
    // comes from the coordinator's guild lock.
    let end_consumer = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move {
            while let Some(ended) = ended_rx.recv().await {
                coordinator.handle_stream_end(ended).await;
            }
        })
    };

    let track_task = track_updater::spawn_track_updater(coordinator.clone());
    let refresh_task = control_refresh::spawn_control_refresh(coordinator.clone());

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received; stopping playback everywhere.");

    track_task.abort();
    refresh_task.abort();
    end_consumer.abort();
    coordinator.clear_all().await;
    platform.disconnect().await;

    Ok(())
}
