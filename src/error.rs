use thiserror::Error;

/// Failures surfaced by the playback engine to command handlers.
///
/// Every variant is recoverable: handlers turn it into a reply and keep
/// serving. Nothing here is retried by the engine.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// The guild has no playback session (never played, or already left).
    #[error("no active playback session for this guild")]
    NoActiveSession,

    /// Neither the bot nor the requesting user is in a voice channel.
    #[error("neither the bot nor the requester is connected to a voice channel")]
    NotConnected,

    /// A repeat mode, skip scope or seek mode string that is not recognised.
    #[error("unsupported mode: {0}")]
    UnsupportedMode(String),

    /// The audio player rejected a play/seek/stop/destroy command.
    #[error("player command `{command}` failed")]
    PlayerCommandFailed {
        command: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// Seek or skip attempted while nothing is playing.
    #[error("no track is currently playing")]
    NoTrackPlaying,

    /// The gateway refused to join the requester's voice channel.
    #[error("failed to join the voice channel")]
    JoinFailed(#[source] anyhow::Error),

    /// The player factory could not hand out a player for the guild.
    #[error("no audio player available for this guild")]
    PlayerUnavailable(#[source] anyhow::Error),
}

impl PlaybackError {
    pub(crate) fn player(command: &'static str, source: anyhow::Error) -> Self {
        Self::PlayerCommandFailed { command, source }
    }
}

pub type PlaybackResult<T> = std::result::Result<T, PlaybackError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn player_failure_keeps_its_source() {
        let err = PlaybackError::player("seek", anyhow::anyhow!("node timed out"));
        assert_eq!(err.to_string(), "player command `seek` failed");
        let source = err.source().expect("source is attached");
        assert_eq!(source.to_string(), "node timed out");
    }

    #[test]
    fn unsupported_mode_names_the_input() {
        let err = PlaybackError::UnsupportedMode("shuffle".into());
        assert_eq!(err.to_string(), "unsupported mode: shuffle");
    }
}
