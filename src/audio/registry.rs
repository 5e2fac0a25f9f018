use dashmap::{mapref::entry::Entry, DashMap};
use serenity::model::id::GuildId;
use std::sync::{Arc, Weak};
use tracing::info;

use crate::{
    audio::{
        player::{PlayerEventListener, PlayerFactory, StatusBroadcaster},
        session::PlaybackSession,
    },
    error::{PlaybackError, PlaybackResult},
};

/// Guild → session map. At most one session (and one player handle) per guild.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<GuildId, Arc<PlaybackSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the guild's session, creating it on first use.
    ///
    /// The map entry stays locked while the player is acquired, so concurrent
    /// callers for the same guild wait and then see the one session created.
    /// `factory` must not call back into the registry.
    pub fn get_or_create(
        &self,
        guild_id: GuildId,
        factory: &dyn PlayerFactory,
        status: Arc<dyn StatusBroadcaster>,
    ) -> PlaybackResult<Arc<PlaybackSession>> {
        match self.sessions.entry(guild_id) {
            Entry::Occupied(entry) => Ok(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                let player = factory
                    .create_player(guild_id)
                    .map_err(PlaybackError::PlayerUnavailable)?;
                let session = Arc::new(PlaybackSession::new(guild_id, Arc::clone(&player), status));

                let weak = Arc::downgrade(&session);
                let listener: Weak<dyn PlayerEventListener> = weak;
                player.set_listener(listener);

                info!(%guild_id, "🆕 playback session created");
                Ok(Arc::clone(entry.insert(session).value()))
            }
        }
    }

    pub fn get(&self, guild_id: GuildId) -> Option<Arc<PlaybackSession>> {
        self.sessions.get(&guild_id).map(|s| Arc::clone(s.value()))
    }

    /// Detaches the guild's session. Absent guilds are a no-op.
    pub fn remove(&self, guild_id: GuildId) -> Option<Arc<PlaybackSession>> {
        self.sessions.remove(&guild_id).map(|(_, session)| session)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
