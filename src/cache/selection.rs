use dashmap::{mapref::entry::Entry, DashMap};
use serenity::model::id::UserId;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::audio::track::Track;

/// Search candidates offered to one user.
#[derive(Debug, Clone)]
struct PendingSelection {
    tracks: Vec<Track>,
    created_at: Instant,
}

impl PendingSelection {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() >= ttl
    }
}

/// Outcome of answering a select menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Chosen(Track),
    /// The user has nothing pending (never searched, expired, or evicted).
    NoPendingSelection,
    /// The user has candidates, but none with this identifier.
    UnknownTrack,
}

/// Bounded, expiring map of user → pending search candidates.
///
/// A user has at most one pending selection; offering new candidates
/// replaces the old ones.
#[derive(Debug)]
pub struct SelectionCache {
    pending: DashMap<UserId, PendingSelection>,
    capacity: usize,
    ttl: Duration,
}

impl SelectionCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            pending: DashMap::new(),
            capacity: capacity.max(1),
            ttl,
        }
    }

    /// Stores `tracks` as the user's pending selection.
    pub fn offer(&self, user_id: UserId, tracks: Vec<Track>) {
        if !self.pending.contains_key(&user_id) && self.pending.len() >= self.capacity {
            self.purge_expired();
            if self.pending.len() >= self.capacity {
                self.evict_oldest();
            }
        }

        self.pending.insert(
            user_id,
            PendingSelection {
                tracks,
                created_at: Instant::now(),
            },
        );
    }

    /// Looks up `identifier` among the user's candidates. A successful pick
    /// consumes the whole pending selection.
    pub fn take(&self, user_id: UserId, identifier: &str) -> Selection {
        // The shard stays locked from lookup to removal, so a concurrent
        // offer for the same user is never removed in place of this one.
        let Entry::Occupied(entry) = self.pending.entry(user_id) else {
            return Selection::NoPendingSelection;
        };
        if entry.get().is_expired(self.ttl) {
            entry.remove();
            return Selection::NoPendingSelection;
        }

        let chosen = entry
            .get()
            .tracks
            .iter()
            .find(|t| t.identifier() == identifier)
            .cloned();

        match chosen {
            Some(track) => {
                entry.remove();
                Selection::Chosen(track)
            }
            None => Selection::UnknownTrack,
        }
    }

    /// Drops expired selections, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let before = self.pending.len();
        self.pending.retain(|_, pending| !pending.is_expired(self.ttl));
        let removed = before.saturating_sub(self.pending.len());
        if removed > 0 {
            debug!(removed, "🧹 expired selections purged");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn evict_oldest(&self) {
        let oldest = self
            .pending
            .iter()
            .min_by_key(|entry| entry.value().created_at)
            .map(|entry| *entry.key());

        if let Some(user_id) = oldest {
            self.pending.remove(&user_id);
            debug!(%user_id, "pending selection evicted");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::track::track;
    use pretty_assertions::assert_eq;

    const ALICE: UserId = UserId::new(1);
    const BOB: UserId = UserId::new(2);

    fn cache() -> SelectionCache {
        SelectionCache::new(10, Duration::from_secs(300))
    }

    #[test]
    fn picking_a_candidate_consumes_the_selection() {
        let cache = cache();
        cache.offer(ALICE, vec![track("a", 60), track("b", 60)]);

        assert_eq!(cache.take(ALICE, "b"), Selection::Chosen(track("b", 60)));
        assert_eq!(cache.take(ALICE, "a"), Selection::NoPendingSelection);
        assert!(cache.is_empty());
    }

    #[test]
    fn unknown_identifier_keeps_the_selection() {
        let cache = cache();
        cache.offer(ALICE, vec![track("a", 60)]);

        assert_eq!(cache.take(ALICE, "zzz"), Selection::UnknownTrack);
        assert_eq!(cache.take(ALICE, "a"), Selection::Chosen(track("a", 60)));
    }

    #[test]
    fn users_are_isolated() {
        let cache = cache();
        cache.offer(ALICE, vec![track("a", 60)]);

        assert_eq!(cache.take(BOB, "a"), Selection::NoPendingSelection);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn new_offer_replaces_the_previous_one() {
        let cache = cache();
        cache.offer(ALICE, vec![track("a", 60)]);
        cache.offer(ALICE, vec![track("b", 60)]);

        assert_eq!(cache.take(ALICE, "a"), Selection::UnknownTrack);
        assert_eq!(cache.take(ALICE, "b"), Selection::Chosen(track("b", 60)));
    }

    #[test]
    fn zero_ttl_expires_immediately() {
        let cache = SelectionCache::new(10, Duration::ZERO);
        cache.offer(ALICE, vec![track("a", 60)]);

        assert_eq!(cache.take(ALICE, "a"), Selection::NoPendingSelection);
        assert!(cache.is_empty());
    }

    #[test]
    fn purge_drops_only_expired_entries() {
        let expired = SelectionCache::new(10, Duration::ZERO);
        expired.offer(ALICE, vec![track("a", 60)]);
        expired.offer(BOB, vec![track("b", 60)]);
        assert_eq!(expired.purge_expired(), 2);

        let fresh = cache();
        fresh.offer(ALICE, vec![track("a", 60)]);
        assert_eq!(fresh.purge_expired(), 0);
        assert_eq!(fresh.len(), 1);
    }

    #[test]
    fn full_cache_evicts_the_oldest_selection() {
        let cache = SelectionCache::new(2, Duration::from_secs(300));
        cache.offer(UserId::new(1), vec![track("a", 60)]);
        std::thread::sleep(Duration::from_millis(2));
        cache.offer(UserId::new(2), vec![track("b", 60)]);
        std::thread::sleep(Duration::from_millis(2));
        cache.offer(UserId::new(3), vec![track("c", 60)]);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.take(UserId::new(1), "a"), Selection::NoPendingSelection);
        assert_eq!(cache.take(UserId::new(3), "c"), Selection::Chosen(track("c", 60)));
    }

    #[test]
    fn offer_racing_a_pick_is_never_lost() {
        let cache = cache();
        for _ in 0..500 {
            cache.offer(ALICE, vec![track("a", 60)]);
            std::thread::scope(|s| {
                s.spawn(|| cache.take(ALICE, "a"));
                s.spawn(|| cache.offer(ALICE, vec![track("b", 60)]));
            });

            assert_eq!(cache.take(ALICE, "b"), Selection::Chosen(track("b", 60)));
        }
    }

    #[test]
    fn replacing_in_a_full_cache_evicts_nobody() {
        let cache = SelectionCache::new(2, Duration::from_secs(300));
        cache.offer(UserId::new(1), vec![track("a", 60)]);
        cache.offer(UserId::new(2), vec![track("b", 60)]);
        cache.offer(UserId::new(2), vec![track("c", 60)]);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.take(UserId::new(1), "a"), Selection::Chosen(track("a", 60)));
    }
}
