//! Track resolution.
//!
//! Turns the free-text argument of `/play` into playable [`Track`]s. A query
//! that looks like a URL is loaded as-is; anything else becomes a search.

pub mod ytdlp;

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;

use crate::audio::track::Track;

pub use ytdlp::YtDlpResolver;

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://[-a-zA-Z0-9+&@#/%?=~_|!:,.;]*[-a-zA-Z0-9+&@#/%=~_|]?")
        .expect("URL pattern is a valid regex")
});

/// What a query resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadResult {
    /// A URL pointing at exactly one track.
    Track(Track),
    /// A URL pointing at a playlist; every entry is queued.
    Playlist { name: String, tracks: Vec<Track> },
    /// Candidates for a free-text query; the user picks one.
    Search(Vec<Track>),
    Empty,
}

/// Loads tracks for a user query.
#[async_trait]
pub trait TrackResolver: Send + Sync {
    async fn resolve(&self, query: &str) -> Result<LoadResult>;
}

pub fn is_url(query: &str) -> bool {
    URL_PATTERN.is_match(query.trim())
}

/// URL queries pass through untouched, everything else is searched.
pub fn search_query(query: &str, limit: usize) -> String {
    let query = query.trim();
    if is_url(query) {
        query.to_string()
    } else {
        format!("ytsearch{limit}:{query}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_http_and_https_urls() {
        assert!(is_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(is_url("http://example.com/song.mp3"));
        assert!(is_url("  https://youtu.be/abc  "));
    }

    #[test]
    fn plain_text_is_not_a_url() {
        assert!(!is_url("never gonna give you up"));
        assert!(!is_url("www.youtube.com/watch?v=abc"));
        assert!(!is_url("ftp://example.com/file"));
    }

    #[test]
    fn free_text_becomes_a_search() {
        assert_eq!(search_query(" lofi beats ", 5), "ytsearch5:lofi beats");
        assert_eq!(
            search_query("https://youtu.be/abc", 5),
            "https://youtu.be/abc"
        );
    }
}
