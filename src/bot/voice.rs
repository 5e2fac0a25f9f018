//! Songbird-backed implementations of the engine's audio and voice seams.

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use serenity::{
    gateway::ActivityData,
    model::id::{ChannelId, GuildId},
    prelude::Context,
};
use songbird::{
    events::CoreEvent,
    input::{Input, YoutubeDl},
    tracks::{PlayMode, TrackHandle},
    Event as VoiceEvent, Songbird, TrackEvent,
};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Weak,
    },
    time::Duration,
};
use tracing::{debug, info};

use crate::{
    audio::{
        controller::VoiceGateway,
        player::{
            PlayerEventListener, PlayerFactory, PlayerHandle, StatusBroadcaster, TrackEndReason,
        },
        track::Track,
    },
    bot::events::{
        DriverDisconnectHandler, EndMarker, ListenerSlot, TrackEndHandler, TrackErrorHandler,
        TrackStartHandler,
    },
};

struct ActiveTrack {
    handle: TrackHandle,
    track: Track,
    ended_by: EndMarker,
}

impl ActiveTrack {
    /// Stops the songbird track, tagging the resulting end event with `reason`.
    fn end(&self, reason: TrackEndReason) {
        *self.ended_by.lock() = Some(reason);
        // Already finished tracks reject the stop; nothing left to do then.
        let _ = self.handle.stop();
    }
}

/// One guild's audio stream on top of a songbird [`songbird::Call`].
pub struct SongbirdPlayer {
    guild_id: GuildId,
    manager: Arc<Songbird>,
    http: reqwest::Client,
    ytdlp: &'static str,
    active: Mutex<Option<ActiveTrack>>,
    listener: ListenerSlot,
    disconnect_hooked: AtomicBool,
}

impl SongbirdPlayer {
    fn new(
        guild_id: GuildId,
        manager: Arc<Songbird>,
        http: reqwest::Client,
        ytdlp: &'static str,
    ) -> Self {
        Self {
            guild_id,
            manager,
            http,
            ytdlp,
            active: Mutex::new(None),
            listener: ListenerSlot::default(),
            disconnect_hooked: AtomicBool::new(false),
        }
    }

    fn active_handle(&self) -> Option<(TrackHandle, Track)> {
        self.active
            .lock()
            .as_ref()
            .map(|a| (a.handle.clone(), a.track.clone()))
    }

    fn end_active(&self, reason: TrackEndReason) {
        if let Some(active) = self.active.lock().take() {
            active.end(reason);
        }
    }
}

#[async_trait]
impl PlayerHandle for SongbirdPlayer {
    async fn play(&self, track: Track) -> Result<()> {
        let call = self
            .manager
            .get(self.guild_id)
            .context("not connected to a voice channel")?;

        let input: Input =
            YoutubeDl::new_ytdl_like(self.ytdlp, self.http.clone(), track.uri().to_string()).into();
        let ended_by = EndMarker::default();

        let handle = {
            let mut call = call.lock().await;
            if !self.disconnect_hooked.swap(true, Ordering::SeqCst) {
                call.add_global_event(
                    VoiceEvent::Core(CoreEvent::DriverDisconnect),
                    DriverDisconnectHandler {
                        guild_id: self.guild_id,
                        listener: self.listener.clone(),
                    },
                );
            }

            self.end_active(TrackEndReason::Replaced);
            call.play_input(input)
        };

        handle.add_event(
            VoiceEvent::Track(TrackEvent::Play),
            TrackStartHandler {
                listener: self.listener.clone(),
                track: track.clone(),
            },
        )?;
        handle.add_event(
            VoiceEvent::Track(TrackEvent::End),
            TrackEndHandler {
                listener: self.listener.clone(),
                track: track.clone(),
                ended_by: Arc::clone(&ended_by),
            },
        )?;
        handle.add_event(
            VoiceEvent::Track(TrackEvent::Error),
            TrackErrorHandler {
                listener: self.listener.clone(),
                track: track.clone(),
            },
        )?;

        debug!(guild_id = %self.guild_id, track = %track, "🎶 track handed to songbird");
        *self.active.lock() = Some(ActiveTrack {
            handle,
            track,
            ended_by,
        });
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.end_active(TrackEndReason::Stopped);
        Ok(())
    }

    async fn destroy(&self) -> Result<()> {
        self.end_active(TrackEndReason::Cleanup);
        self.listener.clear();
        Ok(())
    }

    async fn seek(&self, position: Duration) -> Result<()> {
        let (handle, _) = self.active_handle().context("no track loaded")?;
        handle.seek_async(position).await?;
        Ok(())
    }

    fn playing_track(&self) -> Option<Track> {
        self.active.lock().as_ref().map(|a| a.track.clone())
    }

    async fn position(&self) -> Result<Duration> {
        let Some((handle, track)) = self.active_handle() else {
            return Ok(Duration::ZERO);
        };

        // A finished songbird track refuses queries; report it as fully played.
        match handle.get_info().await {
            Ok(state) if matches!(state.playing, PlayMode::Play | PlayMode::Pause) => {
                Ok(state.position)
            }
            _ => Ok(track.duration()),
        }
    }

    fn set_listener(&self, listener: Weak<dyn PlayerEventListener>) {
        self.listener.set(listener);
    }
}

/// Creates a [`SongbirdPlayer`] per guild on a shared songbird instance.
pub struct SongbirdPlayerFactory {
    manager: Arc<Songbird>,
    http: reqwest::Client,
    ytdlp: &'static str,
}

impl SongbirdPlayerFactory {
    pub fn new(manager: Arc<Songbird>, http: reqwest::Client, ytdlp_path: &str) -> Self {
        Self {
            manager,
            http,
            // songbird wants a 'static program name; the factory lives for the whole process.
            ytdlp: Box::leak(ytdlp_path.to_owned().into_boxed_str()),
        }
    }
}

impl PlayerFactory for SongbirdPlayerFactory {
    fn create_player(&self, guild_id: GuildId) -> Result<Arc<dyn PlayerHandle>> {
        Ok(Arc::new(SongbirdPlayer::new(
            guild_id,
            Arc::clone(&self.manager),
            self.http.clone(),
            self.ytdlp,
        )))
    }
}

/// Joins and leaves voice channels through songbird.
pub struct SongbirdGateway {
    manager: Arc<Songbird>,
}

impl SongbirdGateway {
    pub fn new(manager: Arc<Songbird>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl VoiceGateway for SongbirdGateway {
    async fn connected_channel(&self, guild_id: GuildId) -> Option<ChannelId> {
        let call = self.manager.get(guild_id)?;
        let channel = call.lock().await.current_channel()?;
        Some(ChannelId::from(channel.0))
    }

    async fn join(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<()> {
        self.manager.join(guild_id, channel_id).await?;
        Ok(())
    }

    async fn leave(&self, guild_id: GuildId) -> Result<()> {
        self.manager.remove(guild_id).await?;
        info!(%guild_id, "👋 left voice channel");
        Ok(())
    }
}

/// Mirrors the now-playing title into the bot's activity.
#[derive(Default)]
pub struct PresenceStatus {
    ctx: Mutex<Option<Context>>,
}

impl PresenceStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches the gateway context. Updates before this are dropped.
    pub fn attach(&self, ctx: Context) {
        *self.ctx.lock() = Some(ctx);
    }
}

impl StatusBroadcaster for PresenceStatus {
    fn set_now_playing(&self, title: Option<&str>) {
        if let Some(ctx) = self.ctx.lock().as_ref() {
            ctx.set_activity(title.map(ActivityData::playing));
        }
    }
}
