use anyhow::Result;
use serenity::{model::gateway::GatewayIntents, Client};
use songbird::{SerenityInit, Songbird};
use std::{sync::Arc, time::Duration};
use tracing::{error, info};

mod audio;
mod bot;
mod cache;
mod config;
mod error;
mod logging;
mod sources;
mod ui;

use crate::audio::controller::PlaybackController;
use crate::bot::{
    voice::{PresenceStatus, SongbirdGateway, SongbirdPlayerFactory},
    JukeboxBot,
};
use crate::config::Config;
use crate::sources::YtDlpResolver;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    logging::init(&config.log)?;

    info!("🎵 Starting Guild Jukebox v{}", env!("CARGO_PKG_VERSION"));

    let resolver = Arc::new(YtDlpResolver::new(
        config.ytdlp_path.clone(),
        config.search_results,
    ));

    if std::env::args().any(|arg| arg == "--health-check") {
        return health_check(&resolver).await;
    }

    info!("{}", config.summary());
    let config = Arc::new(config);

    let intents = GatewayIntents::GUILDS | GatewayIntents::GUILD_VOICE_STATES;

    let songbird = Songbird::serenity();
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;

    let presence = Arc::new(PresenceStatus::new());
    let controller = Arc::new(PlaybackController::new(
        Arc::new(SongbirdPlayerFactory::new(
            Arc::clone(&songbird),
            http,
            &config.ytdlp_path,
        )),
        Arc::new(SongbirdGateway::new(Arc::clone(&songbird))),
        presence.clone(),
    ));
    let handler = JukeboxBot::new(Arc::clone(&config), controller, resolver, presence);

    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .register_songbird_with(songbird)
        .await?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Could not listen for Ctrl+C: {:?}", e);
            return;
        }
        info!("⚠️ Shutdown signal received, closing...");
        shard_manager.shutdown_all().await;
    });

    info!("🚀 Bot started");
    if let Err(why) = client.start().await {
        error!("Client error: {:?}", why);
    }

    Ok(())
}

async fn health_check(resolver: &YtDlpResolver) -> Result<()> {
    let version = resolver.verify().await?;
    println!("OK (yt-dlp {version})");
    Ok(())
}
