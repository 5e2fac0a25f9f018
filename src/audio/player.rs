//! Boundary to the audio node.
//!
//! The engine never decodes or streams audio. It hands tracks to a
//! [`PlayerHandle`], reads back what the handle reports, and reacts to the
//! events the handle pushes into its [`PlayerEventListener`].

use anyhow::Result;
use async_trait::async_trait;
use serenity::model::id::GuildId;
use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use crate::audio::track::Track;

/// Why a track stopped playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackEndReason {
    /// Played to the end.
    Finished,
    /// Could not be loaded or broke mid-stream.
    LoadFailed,
    /// Stopped through the player.
    Stopped,
    /// Another track was started on the same player.
    Replaced,
    /// The player was torn down.
    Cleanup,
}

impl TrackEndReason {
    /// Whether the queue may advance on its own after this end.
    pub fn may_start_next(self) -> bool {
        matches!(self, Self::Finished | Self::LoadFailed)
    }
}

/// Callbacks pushed by a player handle, possibly from another task.
#[async_trait]
pub trait PlayerEventListener: Send + Sync {
    async fn on_track_start(&self, track: Track);

    async fn on_track_end(&self, track: Track, reason: TrackEndReason);

    async fn on_track_exception(&self, track: Track, message: String);

    async fn on_track_stuck(&self, track: Track, threshold: Duration);

    async fn on_websocket_closed(&self, code: u16, reason: String, by_remote: bool);
}

/// One audio stream bound to one guild.
#[async_trait]
pub trait PlayerHandle: Send + Sync {
    /// Starts `track`, replacing whatever is playing.
    async fn play(&self, track: Track) -> Result<()>;

    async fn stop(&self) -> Result<()>;

    /// Releases the handle. It must not be used afterwards.
    async fn destroy(&self) -> Result<()>;

    async fn seek(&self, position: Duration) -> Result<()>;

    /// The track the player last started. May be stale after a natural end
    /// until the next command arrives.
    fn playing_track(&self) -> Option<Track>;

    /// Current position inside [`PlayerHandle::playing_track`].
    async fn position(&self) -> Result<Duration>;

    /// Registers the receiver of this handle's events, replacing any
    /// previous one.
    fn set_listener(&self, listener: Weak<dyn PlayerEventListener>);
}

/// Hands out player handles scoped to a guild.
pub trait PlayerFactory: Send + Sync {
    fn create_player(&self, guild_id: GuildId) -> Result<Arc<dyn PlayerHandle>>;
}

/// Guild-visible "now playing" indicator.
pub trait StatusBroadcaster: Send + Sync {
    /// `Some(title)` while a track plays, `None` when idle.
    fn set_now_playing(&self, title: Option<&str>);
}
