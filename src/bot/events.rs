use parking_lot::Mutex;
use serenity::{async_trait, model::id::GuildId};
use songbird::{
    events::context_data::DisconnectReason, Event as VoiceEvent, EventContext,
    EventHandler as VoiceEventHandler,
};
use std::sync::{Arc, Weak};
use tracing::{debug, error, info, warn};

use crate::audio::{
    player::{PlayerEventListener, TrackEndReason},
    track::Track,
};

/// Shared, replaceable pointer to whoever listens to a player's events.
#[derive(Clone, Default)]
pub struct ListenerSlot(Arc<Mutex<Option<Weak<dyn PlayerEventListener>>>>);

impl ListenerSlot {
    pub fn set(&self, listener: Weak<dyn PlayerEventListener>) {
        *self.0.lock() = Some(listener);
    }

    pub fn clear(&self) {
        *self.0.lock() = None;
    }

    /// The live listener, if it has not been dropped.
    pub fn get(&self) -> Option<Arc<dyn PlayerEventListener>> {
        self.0.lock().as_ref().and_then(Weak::upgrade)
    }
}

/// How a track ended when the end was requested through the player.
pub type EndMarker = Arc<Mutex<Option<TrackEndReason>>>;

/// Forwards songbird `Play` events.
pub struct TrackStartHandler {
    pub listener: ListenerSlot,
    pub track: Track,
}

#[async_trait]
impl VoiceEventHandler for TrackStartHandler {
    async fn act(&self, _ctx: &EventContext<'_>) -> Option<VoiceEvent> {
        debug!(track = %self.track, "▶️ songbird track started");
        if let Some(listener) = self.listener.get() {
            listener.on_track_start(self.track.clone()).await;
        }
        None
    }
}

/// Forwards songbird `End` events, natural or requested.
pub struct TrackEndHandler {
    pub listener: ListenerSlot,
    pub track: Track,
    pub ended_by: EndMarker,
}

#[async_trait]
impl VoiceEventHandler for TrackEndHandler {
    async fn act(&self, _ctx: &EventContext<'_>) -> Option<VoiceEvent> {
        let reason = self.ended_by.lock().take().unwrap_or(TrackEndReason::Finished);
        info!(track = %self.track, ?reason, "🎵 track ended");

        if let Some(listener) = self.listener.get() {
            listener.on_track_end(self.track.clone(), reason).await;
        }
        None
    }
}

/// Forwards songbird `Error` events as an exception followed by a failed end.
pub struct TrackErrorHandler {
    pub listener: ListenerSlot,
    pub track: Track,
}

#[async_trait]
impl VoiceEventHandler for TrackErrorHandler {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<VoiceEvent> {
        let mut message = String::from("playback failed");
        if let EventContext::Track(track_list) = ctx {
            if let Some((state, _handle)) = track_list.first() {
                message = format!("{:?}", state.playing);
            }
        }
        error!(track = %self.track, %message, "❌ track error");

        if let Some(listener) = self.listener.get() {
            listener.on_track_exception(self.track.clone(), message).await;
            listener
                .on_track_end(self.track.clone(), TrackEndReason::LoadFailed)
                .await;
        }
        None
    }
}

/// Forwards driver disconnects as a closed voice websocket.
pub struct DriverDisconnectHandler {
    pub guild_id: GuildId,
    pub listener: ListenerSlot,
}

#[async_trait]
impl VoiceEventHandler for DriverDisconnectHandler {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<VoiceEvent> {
        if let EventContext::DriverDisconnect(data) = ctx {
            warn!(guild_id = %self.guild_id, reason = ?data.reason, "🔌 voice driver disconnected");

            // Songbird does not expose the raw close code; 0 means "unknown".
            let by_remote = !matches!(data.reason, Some(DisconnectReason::Requested));
            let reason = data
                .reason
                .as_ref()
                .map_or_else(|| "unknown".to_string(), |r| format!("{r:?}"));

            if let Some(listener) = self.listener.get() {
                listener.on_websocket_closed(0, reason, by_remote).await;
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::track::track;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PlayerEventListener for Recorder {
        async fn on_track_start(&self, track: Track) {
            self.events.lock().push(format!("start {}", track.identifier()));
        }

        async fn on_track_end(&self, track: Track, reason: TrackEndReason) {
            self.events
                .lock()
                .push(format!("end {} {reason:?}", track.identifier()));
        }

        async fn on_track_exception(&self, track: Track, _message: String) {
            self.events.lock().push(format!("exception {}", track.identifier()));
        }

        async fn on_track_stuck(&self, _track: Track, _threshold: Duration) {}

        async fn on_websocket_closed(&self, _code: u16, _reason: String, _by_remote: bool) {}
    }

    fn slot_for(recorder: &Arc<Recorder>) -> ListenerSlot {
        let slot = ListenerSlot::default();
        let weak = Arc::downgrade(recorder);
        let listener: Weak<dyn PlayerEventListener> = weak;
        slot.set(listener);
        slot
    }

    #[tokio::test]
    async fn unmarked_end_is_a_natural_finish() {
        let recorder = Arc::new(Recorder::default());
        let handler = TrackEndHandler {
            listener: slot_for(&recorder),
            track: track("a", 60),
            ended_by: EndMarker::default(),
        };

        handler.act(&EventContext::Track(&[])).await;
        assert_eq!(*recorder.events.lock(), vec!["end a Finished"]);
    }

    #[tokio::test]
    async fn marked_end_reports_the_requested_reason_once() {
        let recorder = Arc::new(Recorder::default());
        let ended_by = EndMarker::default();
        *ended_by.lock() = Some(TrackEndReason::Replaced);
        let handler = TrackEndHandler {
            listener: slot_for(&recorder),
            track: track("a", 60),
            ended_by: Arc::clone(&ended_by),
        };

        handler.act(&EventContext::Track(&[])).await;
        assert_eq!(*recorder.events.lock(), vec!["end a Replaced"]);
        assert!(ended_by.lock().is_none());
    }

    #[tokio::test]
    async fn errors_surface_as_exception_then_failed_load() {
        let recorder = Arc::new(Recorder::default());
        let handler = TrackErrorHandler {
            listener: slot_for(&recorder),
            track: track("b", 60),
        };

        handler.act(&EventContext::Track(&[])).await;
        assert_eq!(
            *recorder.events.lock(),
            vec!["exception b", "end b LoadFailed"]
        );
    }

    #[tokio::test]
    async fn dropped_listener_is_ignored() {
        let recorder = Arc::new(Recorder::default());
        let slot = slot_for(&recorder);
        drop(recorder);

        assert!(slot.get().is_none());
        let handler = TrackStartHandler {
            listener: slot,
            track: track("a", 60),
        };
        assert!(handler.act(&EventContext::Track(&[])).await.is_none());
    }
}
