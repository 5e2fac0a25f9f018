use parking_lot::Mutex;
use std::{collections::VecDeque, fmt, str::FromStr};
use tracing::debug;

use crate::{audio::track::Track, error::PlaybackError};

/// What happens to a track once it finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepeatMode {
    /// Advance through the queue.
    #[default]
    Off,
    /// Replay the finished track indefinitely.
    Song,
    /// Move the finished track to the tail, looping over the whole queue.
    Queue,
}

impl FromStr for RepeatMode {
    type Err = PlaybackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "song" | "single" => Ok(Self::Song),
            "queue" | "all" => Ok(Self::Queue),
            _ => Err(PlaybackError::UnsupportedMode(s.to_string())),
        }
    }
}

impl fmt::Display for RepeatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Off => "off",
            Self::Song => "song",
            Self::Queue => "queue",
        })
    }
}

/// FIFO of tracks waiting to be played for one guild.
///
/// Every method takes the queue lock for its whole duration, so an append
/// is never observed half-applied and a pop never races another pop.
#[derive(Debug, Default)]
pub struct TrackQueue {
    items: Mutex<VecDeque<Track>>,
}

impl TrackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends tracks to the tail in call order.
    pub fn append<I>(&self, tracks: I)
    where
        I: IntoIterator<Item = Track>,
    {
        let mut items = self.items.lock();
        let before = items.len();
        items.extend(tracks);
        let added = items.len() - before;
        if added > 0 {
            debug!(added, queued = items.len(), "➕ tracks appended to queue");
        }
    }

    pub fn pop_front(&self) -> Option<Track> {
        self.items.lock().pop_front()
    }

    pub fn peek_front(&self) -> Option<Track> {
        self.items.lock().front().cloned()
    }

    /// Empties the queue, returning how many tracks were dropped.
    pub fn purge(&self) -> usize {
        let mut items = self.items.lock();
        let removed = items.len();
        items.clear();
        if removed > 0 {
            debug!(removed, "🗑️ queue purged");
        }
        removed
    }

    /// Point-in-time copy of the queue, head first.
    pub fn snapshot(&self) -> Vec<Track> {
        self.items.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::track::track;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn ids(tracks: &[Track]) -> Vec<&str> {
        tracks.iter().map(Track::identifier).collect()
    }

    #[test]
    fn pop_on_empty_queue_yields_nothing() {
        let queue = TrackQueue::new();
        assert!(queue.pop_front().is_none());
        assert!(queue.peek_front().is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn peek_does_not_consume() {
        let queue = TrackQueue::new();
        queue.append([track("a", 10), track("b", 10)]);
        assert_eq!(queue.peek_front().map(|t| t.identifier().to_string()), Some("a".into()));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn purge_empties_and_reports_count() {
        let queue = TrackQueue::new();
        queue.append([track("a", 10), track("b", 10), track("c", 10)]);
        assert_eq!(queue.purge(), 3);
        assert!(queue.is_empty());
        assert_eq!(queue.purge(), 0);
    }

    #[test]
    fn snapshot_is_detached_from_the_queue() {
        let queue = TrackQueue::new();
        queue.append([track("a", 10)]);
        let mut snapshot = queue.snapshot();
        snapshot.push(track("z", 10));
        snapshot.clear();
        assert_eq!(ids(&queue.snapshot()), vec!["a"]);
    }

    #[test]
    fn empty_append_is_a_no_op() {
        let queue = TrackQueue::new();
        queue.append(Vec::new());
        assert!(queue.is_empty());
    }

    #[test]
    fn concurrent_appends_keep_each_batch_contiguous() {
        let queue = Arc::new(TrackQueue::new());
        let handles: Vec<_> = (0..8)
            .map(|batch| {
                let queue = Arc::clone(&queue);
                std::thread::spawn(move || {
                    let tracks = (0..16).map(|i| track(&format!("{batch}-{i}"), 10));
                    queue.append(tracks.collect::<Vec<_>>());
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = queue.snapshot();
        assert_eq!(snapshot.len(), 8 * 16);
        for chunk in snapshot.chunks(16) {
            let batch = chunk[0].identifier().split('-').next().unwrap().to_string();
            for (i, t) in chunk.iter().enumerate() {
                assert_eq!(t.identifier(), format!("{batch}-{i}"));
            }
        }
    }

    #[test]
    fn repeat_mode_parses_names_and_aliases() {
        assert_eq!("off".parse::<RepeatMode>().unwrap(), RepeatMode::Off);
        assert_eq!("Song".parse::<RepeatMode>().unwrap(), RepeatMode::Song);
        assert_eq!("single".parse::<RepeatMode>().unwrap(), RepeatMode::Song);
        assert_eq!("queue".parse::<RepeatMode>().unwrap(), RepeatMode::Queue);
        assert_eq!("all".parse::<RepeatMode>().unwrap(), RepeatMode::Queue);
        assert!(matches!(
            "shuffle".parse::<RepeatMode>(),
            Err(PlaybackError::UnsupportedMode(mode)) if mode == "shuffle"
        ));
    }

    proptest! {
        #[test]
        fn snapshot_preserves_append_order(batches in prop::collection::vec(
            prop::collection::vec("[a-z0-9]{1,8}", 0..6), 0..12)
        ) {
            let queue = TrackQueue::new();
            let mut expected = Vec::new();
            for batch in &batches {
                queue.append(batch.iter().map(|id| track(id, 60)).collect::<Vec<_>>());
                expected.extend(batch.iter().cloned());
            }
            let snapshot: Vec<String> = queue.snapshot().iter().map(|t| t.identifier().to_string()).collect();
            prop_assert_eq!(snapshot, expected);
        }

        #[test]
        fn pops_return_tracks_in_append_order(ids in prop::collection::vec("[a-z0-9]{1,8}", 0..32)) {
            let queue = TrackQueue::new();
            queue.append(ids.iter().map(|id| track(id, 60)).collect::<Vec<_>>());
            for (n, id) in ids.iter().enumerate() {
                let popped = queue.pop_front();
                prop_assert_eq!(popped.as_ref().map(Track::identifier), Some(id.as_str()));
                prop_assert_eq!(queue.len(), ids.len() - n - 1);
            }
            prop_assert!(queue.pop_front().is_none());
        }
    }
}
