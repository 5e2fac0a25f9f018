use async_trait::async_trait;
use parking_lot::Mutex;
use serenity::model::id::GuildId;
use std::{str::FromStr, sync::Arc, time::Duration};
use tracing::{debug, info, warn};

use crate::{
    audio::{
        player::{PlayerEventListener, PlayerHandle, StatusBroadcaster, TrackEndReason},
        queue::{RepeatMode, TrackQueue},
        track::Track,
    },
    error::{PlaybackError, PlaybackResult},
};

/// How much of the queue a skip discards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipScope {
    /// Only the current track.
    Single,
    /// The current track and everything queued behind it.
    All,
}

impl FromStr for SkipScope {
    type Err = PlaybackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" => Ok(Self::Single),
            "all" => Ok(Self::All),
            _ => Err(PlaybackError::UnsupportedMode(s.to_string())),
        }
    }
}

/// Whether a seek offset is measured from the start or from the current position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekMode {
    Absolute,
    Relative,
}

impl FromStr for SeekMode {
    type Err = PlaybackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "absolute" => Ok(Self::Absolute),
            "relative" => Ok(Self::Relative),
            _ => Err(PlaybackError::UnsupportedMode(s.to_string())),
        }
    }
}

/// Outcome of handing tracks to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Enqueued {
    /// The session was idle and this track started right away.
    Started(Track),
    /// Something was already playing; the tracks wait in a queue of this length.
    Queued { queue_len: usize },
}

/// Playback state of one guild: a player handle, its queue and repeat mode.
///
/// Every transition (enqueue, skip, seek, track end, shutdown) runs under
/// `transition`, so the "is anything playing" check and the queue mutation
/// that follows it are never interleaved with another transition.
pub struct PlaybackSession {
    guild_id: GuildId,
    player: Arc<dyn PlayerHandle>,
    queue: TrackQueue,
    repeat_mode: Mutex<RepeatMode>,
    status: Arc<dyn StatusBroadcaster>,
    transition: tokio::sync::Mutex<()>,
}

impl PlaybackSession {
    pub fn new(
        guild_id: GuildId,
        player: Arc<dyn PlayerHandle>,
        status: Arc<dyn StatusBroadcaster>,
    ) -> Self {
        Self {
            guild_id,
            player,
            queue: TrackQueue::new(),
            repeat_mode: Mutex::new(RepeatMode::Off),
            status,
            transition: tokio::sync::Mutex::new(()),
        }
    }

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    pub fn repeat_mode(&self) -> RepeatMode {
        *self.repeat_mode.lock()
    }

    pub fn set_repeat_mode(&self, mode: RepeatMode) {
        *self.repeat_mode.lock() = mode;
        info!(guild_id = %self.guild_id, %mode, "🔁 repeat mode changed");
    }

    pub fn snapshot(&self) -> Vec<Track> {
        self.queue.snapshot()
    }

    /// True only while the player reports a track whose position has not yet
    /// reached its duration.
    ///
    /// A handle keeps its last track after a natural end, so presence alone
    /// is not enough. Tracks without a known duration (zero) therefore never
    /// count as playing.
    pub async fn is_playing(&self) -> PlaybackResult<bool> {
        let _guard = self.transition.lock().await;
        Ok(self.active_track().await?.is_some())
    }

    pub async fn now_playing(&self) -> PlaybackResult<Option<Track>> {
        let _guard = self.transition.lock().await;
        Ok(self.active_track().await?.map(|(track, _)| track))
    }

    /// Queues `tracks`; if the session is idle the head starts immediately.
    pub async fn enqueue(&self, tracks: Vec<Track>) -> PlaybackResult<Enqueued> {
        let _guard = self.transition.lock().await;

        let idle = self.queue.peek_front().is_none() && self.active_track().await?.is_none();
        self.queue.append(tracks);

        if idle {
            if let Some(track) = self.queue.pop_front() {
                self.start(track.clone()).await?;
                return Ok(Enqueued::Started(track));
            }
        }

        Ok(Enqueued::Queued {
            queue_len: self.queue.len(),
        })
    }

    /// Skips the current track according to the repeat mode. `All` purges the
    /// queue first and then behaves as a skip with repeat off.
    ///
    /// With nothing playing, a skip still moves the queue: the head starts
    /// (or everything is purged for `All`). Only a session with neither a
    /// playing nor a queued track rejects it.
    ///
    /// Returns the track that started, or `None` when the player was stopped.
    pub async fn skip(&self, scope: SkipScope) -> PlaybackResult<Option<Track>> {
        let _guard = self.transition.lock().await;

        let current = self.active_track().await?.map(|(track, _)| track);
        if current.is_none() && self.queue.peek_front().is_none() {
            return Err(PlaybackError::NoTrackPlaying);
        }
        let mode = match scope {
            SkipScope::Single => self.repeat_mode(),
            SkipScope::All => {
                let purged = self.queue.purge();
                info!(guild_id = %self.guild_id, purged, "⏭️ skipping everything");
                RepeatMode::Off
            }
        };

        self.advance(mode, current, true).await
    }

    /// Jumps inside the current track, clamping the target into
    /// `[0, duration]`. Returns the position actually requested.
    pub async fn seek(&self, mode: SeekMode, seconds: i64) -> PlaybackResult<Duration> {
        let _guard = self.transition.lock().await;

        let (track, position) = self.active_track().await?.ok_or(PlaybackError::NoTrackPlaying)?;
        let base = match mode {
            SeekMode::Absolute => 0,
            SeekMode::Relative => position.as_millis() as i128,
        };
        let target = clamp_position(base + i128::from(seconds) * 1000, track.duration());

        self.player
            .seek(target)
            .await
            .map_err(|e| PlaybackError::player("seek", e))?;
        debug!(guild_id = %self.guild_id, ?mode, ?target, "⏩ seek");
        Ok(target)
    }

    /// Stops and releases the player and drops the queue.
    pub async fn shutdown(&self) -> PlaybackResult<()> {
        let _guard = self.transition.lock().await;

        let dropped = self.queue.purge();
        self.status.set_now_playing(None);

        let stopped = self
            .player
            .stop()
            .await
            .map_err(|e| PlaybackError::player("stop", e));
        let destroyed = self
            .player
            .destroy()
            .await
            .map_err(|e| PlaybackError::player("destroy", e));

        info!(guild_id = %self.guild_id, dropped, "👋 playback session closed");
        stopped.and(destroyed)
    }

    /// The playing track and its position, if the player is really playing.
    /// Callers must hold `transition`.
    async fn active_track(&self) -> PlaybackResult<Option<(Track, Duration)>> {
        let Some(track) = self.player.playing_track() else {
            return Ok(None);
        };
        let position = self
            .player
            .position()
            .await
            .map_err(|e| PlaybackError::player("position", e))?;

        Ok((position < track.duration()).then_some((track, position)))
    }

    /// Picks what follows `finished` under `mode` and plays it. When nothing
    /// follows, the player is stopped if `stop_when_empty` is set.
    /// Without a finished track, song and queue repeat fall back to the head.
    /// Callers must hold `transition`.
    async fn advance(
        &self,
        mode: RepeatMode,
        finished: Option<Track>,
        stop_when_empty: bool,
    ) -> PlaybackResult<Option<Track>> {
        let next = match (mode, finished) {
            (RepeatMode::Song, Some(finished)) => Some(finished),
            (RepeatMode::Queue, Some(finished)) => {
                self.queue.append([finished]);
                self.queue.pop_front()
            }
            _ => self.queue.pop_front(),
        };

        match next {
            Some(track) => {
                self.start(track.clone()).await?;
                Ok(Some(track))
            }
            None => {
                if stop_when_empty {
                    self.player
                        .stop()
                        .await
                        .map_err(|e| PlaybackError::player("stop", e))?;
                }
                self.status.set_now_playing(None);
                debug!(guild_id = %self.guild_id, "📭 queue exhausted");
                Ok(None)
            }
        }
    }

    async fn start(&self, track: Track) -> PlaybackResult<()> {
        let title = track.title().to_string();
        self.player
            .play(track)
            .await
            .map_err(|e| PlaybackError::player("play", e))?;
        self.status.set_now_playing(Some(&title));
        info!(guild_id = %self.guild_id, track = %title, "🎵 now playing");
        Ok(())
    }
}

#[async_trait]
impl PlayerEventListener for PlaybackSession {
    async fn on_track_start(&self, track: Track) {
        // The status was already set when the track was handed to the player.
        debug!(guild_id = %self.guild_id, track = %track, "▶️ track started");
    }

    async fn on_track_end(&self, track: Track, reason: TrackEndReason) {
        debug!(guild_id = %self.guild_id, track = %track, ?reason, "⏹️ track ended");
        if !reason.may_start_next() {
            return;
        }

        let _guard = self.transition.lock().await;
        let mode = self.repeat_mode();
        if let Err(e) = self.advance(mode, Some(track), false).await {
            warn!(guild_id = %self.guild_id, error = ?e, "Error playing next track");
        }
    }

    async fn on_track_exception(&self, track: Track, message: String) {
        warn!(guild_id = %self.guild_id, track = %track, %message, "❌ track exception");
    }

    async fn on_track_stuck(&self, track: Track, threshold: Duration) {
        warn!(guild_id = %self.guild_id, track = %track, ?threshold, "⚠️ track stuck");
    }

    async fn on_websocket_closed(&self, code: u16, reason: String, by_remote: bool) {
        warn!(
            guild_id = %self.guild_id,
            code,
            %reason,
            by_remote,
            "🔌 voice websocket closed"
        );
    }
}

fn clamp_position(target_ms: i128, duration: Duration) -> Duration {
    if target_ms <= 0 {
        Duration::ZERO
    } else if target_ms >= duration.as_millis() as i128 {
        duration
    } else {
        Duration::from_millis(target_ms as u64)
    }
}
