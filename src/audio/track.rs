use std::{fmt, time::Duration};

/// A playable item resolved by the audio source.
///
/// The engine only reads these fields. Cloning yields an independent copy
/// that can be handed to the player again, which is what single-song repeat
/// relies on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    identifier: String,
    title: String,
    uri: String,
    duration: Duration,
}

impl Track {
    pub fn new(
        identifier: impl Into<String>,
        title: impl Into<String>,
        uri: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            title: title.into(),
            uri: uri.into(),
            duration,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Total length. Zero when the source did not report one (live streams).
    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn summary(&self) -> TrackSummary {
        TrackSummary {
            title: self.title.clone(),
            uri: self.uri.clone(),
            duration: self.duration,
        }
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

/// Display-only view of a queued track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackSummary {
    pub title: String,
    pub uri: String,
    pub duration: Duration,
}

#[cfg(test)]
pub(crate) fn track(id: &str, secs: u64) -> Track {
    Track::new(
        id,
        format!("Track {id}"),
        format!("https://www.youtube.com/watch?v={id}"),
        Duration::from_secs(secs),
    )
}
