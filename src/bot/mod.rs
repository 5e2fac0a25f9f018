//! # Bot Module
//!
//! Discord surface of the jukebox: slash command registration, interaction
//! dispatch and the songbird adapters the playback engine runs on.
//!
//! ## Architecture
//!
//! [`JukeboxBot`] implements Serenity's [`EventHandler`]. It owns:
//!
//! - the [`PlaybackController`] every command goes through
//! - the [`TrackResolver`] that turns `/play` queries into tracks
//! - the [`SelectionCache`] holding search candidates until a user picks one
//! - the [`PresenceStatus`] that shows the current track as the bot's activity

use anyhow::Result;
use serenity::{
    all::{Context, EventHandler, GuildId, Interaction, Ready, VoiceState},
    async_trait,
};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tracing::{debug, error, info, warn};

pub mod commands;
pub mod events;
pub mod handlers;
pub mod voice;

use crate::{
    audio::controller::PlaybackController,
    cache::SelectionCache,
    config::Config,
    error::PlaybackError,
    sources::TrackResolver,
};
use voice::PresenceStatus;

const MAINTENANCE_INTERVAL: Duration = Duration::from_secs(60);

pub struct JukeboxBot {
    config: Arc<Config>,
    controller: Arc<PlaybackController>,
    resolver: Arc<dyn TrackResolver>,
    selections: Arc<SelectionCache>,
    presence: Arc<PresenceStatus>,
    maintenance_started: AtomicBool,
}

impl JukeboxBot {
    pub fn new(
        config: Arc<Config>,
        controller: Arc<PlaybackController>,
        resolver: Arc<dyn TrackResolver>,
        presence: Arc<PresenceStatus>,
    ) -> Self {
        let selections = Arc::new(SelectionCache::new(
            config.selection_capacity,
            config.selection_ttl,
        ));

        Self {
            config,
            controller,
            resolver,
            selections,
            presence,
            maintenance_started: AtomicBool::new(false),
        }
    }

    /// Registers the slash commands, per guild when `GUILD_ID` is set.
    async fn register_commands(&self, ctx: &Context) -> Result<()> {
        info!("📝 Registering slash commands...");

        match self.config.guild_id {
            Some(guild_id) => {
                let guild_id = GuildId::new(guild_id);
                commands::register_guild_commands(ctx, guild_id).await?;
                info!("✅ Guild commands registered for {}", guild_id);
            }
            None => {
                commands::register_global_commands(ctx).await?;
                info!("✅ Global commands registered");
            }
        }

        Ok(())
    }
}

#[async_trait]
impl EventHandler for JukeboxBot {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🤖 {} is online!", ready.user.name);
        info!("📊 Connected to {} guilds", ready.guilds.len());

        self.presence.attach(ctx.clone());

        if let Err(e) = self.register_commands(&ctx).await {
            error!("Error registering commands: {:?}", e);
        }

        // `ready` fires again after every reconnect.
        if !self.maintenance_started.swap(true, Ordering::SeqCst) {
            let selections = Arc::clone(&self.selections);
            let controller = Arc::clone(&self.controller);
            tokio::spawn(async move {
                maintenance_tasks(selections, controller).await;
            });
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        match interaction {
            Interaction::Command(command) => {
                if let Err(e) = handlers::handle_command(&ctx, command, self).await {
                    error!("Error handling command: {:?}", e);
                }
            }
            Interaction::Component(component) => {
                if let Err(e) = handlers::handle_component(&ctx, component, self).await {
                    error!("Error handling component: {:?}", e);
                }
            }
            _ => {}
        }
    }

    /// Tears the guild's session down when the bot is kicked out of voice.
    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let current_user_id = ctx.cache.current_user().id;
        if new.user_id != current_user_id || old.is_none() || new.channel_id.is_some() {
            return;
        }
        let Some(guild_id) = new.guild_id else {
            return;
        };

        match self.controller.leave(guild_id).await {
            Ok(()) => info!("🔌 Disconnected from voice in guild {}, session closed", guild_id),
            // Our own /leave already closed it.
            Err(PlaybackError::NoActiveSession) => {}
            Err(e) => warn!("Error closing session after disconnect: {:?}", e),
        }
    }
}

/// Periodic housekeeping: expires stale track selections.
async fn maintenance_tasks(selections: Arc<SelectionCache>, controller: Arc<PlaybackController>) {
    let mut interval = tokio::time::interval(MAINTENANCE_INTERVAL);

    loop {
        interval.tick().await;

        let purged = selections.purge_expired();
        debug!(
            purged,
            pending = selections.len(),
            sessions = controller.active_sessions(),
            "🧹 maintenance pass"
        );
    }
}
