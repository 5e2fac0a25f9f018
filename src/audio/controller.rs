use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use serenity::model::id::{ChannelId, GuildId};
use std::{sync::Arc, time::Duration};
use tracing::{info, warn};

use crate::{
    audio::{
        player::{PlayerFactory, StatusBroadcaster},
        queue::RepeatMode,
        registry::SessionRegistry,
        session::{Enqueued, PlaybackSession, SeekMode, SkipScope},
        track::{Track, TrackSummary},
    },
    error::{PlaybackError, PlaybackResult},
};

/// Voice-channel side of the chat gateway.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VoiceGateway: Send + Sync {
    /// Channel the bot currently occupies in this guild, if any.
    async fn connected_channel(&self, guild_id: GuildId) -> Option<ChannelId>;

    async fn join(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<()>;

    async fn leave(&self, guild_id: GuildId) -> Result<()>;
}

/// Guild-scoped playback operations called by command handlers.
pub struct PlaybackController {
    registry: SessionRegistry,
    /// Serializes the connected check and the join per guild.
    connecting: DashMap<GuildId, Arc<tokio::sync::Mutex<()>>>,
    players: Arc<dyn PlayerFactory>,
    voice: Arc<dyn VoiceGateway>,
    status: Arc<dyn StatusBroadcaster>,
}

impl PlaybackController {
    pub fn new(
        players: Arc<dyn PlayerFactory>,
        voice: Arc<dyn VoiceGateway>,
        status: Arc<dyn StatusBroadcaster>,
    ) -> Self {
        Self {
            registry: SessionRegistry::new(),
            connecting: DashMap::new(),
            players,
            voice,
            status,
        }
    }

    /// Plays or queues `tracks`, joining the requester's voice channel first
    /// when the bot is not connected anywhere in the guild.
    pub async fn play(
        &self,
        guild_id: GuildId,
        requester_channel: Option<ChannelId>,
        tracks: Vec<Track>,
    ) -> PlaybackResult<Enqueued> {
        self.ensure_connected(guild_id, requester_channel).await?;

        let session =
            self.registry
                .get_or_create(guild_id, self.players.as_ref(), Arc::clone(&self.status))?;
        session.enqueue(tracks).await
    }

    pub async fn skip(&self, guild_id: GuildId, scope: SkipScope) -> PlaybackResult<Option<Track>> {
        self.session(guild_id)?.skip(scope).await
    }

    /// Tears the guild's session down and leaves voice. A second call fails
    /// with [`PlaybackError::NoActiveSession`].
    pub async fn leave(&self, guild_id: GuildId) -> PlaybackResult<()> {
        let session = self
            .registry
            .remove(guild_id)
            .ok_or(PlaybackError::NoActiveSession)?;

        let shutdown = session.shutdown().await;
        if let Err(e) = self.voice.leave(guild_id).await {
            warn!(%guild_id, error = ?e, "Error leaving voice channel");
        }
        shutdown
    }

    /// Parses and applies a repeat mode (`off`, `song`, `queue`).
    pub fn set_repeat_mode(&self, guild_id: GuildId, mode: &str) -> PlaybackResult<RepeatMode> {
        let mode: RepeatMode = mode.parse()?;
        self.session(guild_id)?.set_repeat_mode(mode);
        Ok(mode)
    }

    pub async fn seek(
        &self,
        guild_id: GuildId,
        mode: SeekMode,
        seconds: i64,
    ) -> PlaybackResult<Duration> {
        self.session(guild_id)?.seek(mode, seconds).await
    }

    pub fn query_queue(&self, guild_id: GuildId) -> PlaybackResult<Vec<TrackSummary>> {
        Ok(self
            .session(guild_id)?
            .snapshot()
            .iter()
            .map(Track::summary)
            .collect())
    }

    pub async fn is_playing(&self, guild_id: GuildId) -> PlaybackResult<bool> {
        self.session(guild_id)?.is_playing().await
    }

    pub async fn now_playing(&self, guild_id: GuildId) -> PlaybackResult<Option<Track>> {
        self.session(guild_id)?.now_playing().await
    }

    pub fn active_sessions(&self) -> usize {
        self.registry.len()
    }

    async fn ensure_connected(
        &self,
        guild_id: GuildId,
        requester_channel: Option<ChannelId>,
    ) -> PlaybackResult<()> {
        let lock = Arc::clone(self.connecting.entry(guild_id).or_default().value());
        let _guard = lock.lock().await;

        if self.voice.connected_channel(guild_id).await.is_some() {
            return Ok(());
        }
        let channel_id = requester_channel.ok_or(PlaybackError::NotConnected)?;
        self.voice
            .join(guild_id, channel_id)
            .await
            .map_err(PlaybackError::JoinFailed)?;
        info!(%guild_id, %channel_id, "🔊 joined voice channel");
        Ok(())
    }

    fn session(&self, guild_id: GuildId) -> PlaybackResult<Arc<PlaybackSession>> {
        self.registry
            .get(guild_id)
            .ok_or(PlaybackError::NoActiveSession)
    }
}
