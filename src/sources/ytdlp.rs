use anyhow::{Context, Result};
use async_process::Command;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{is_url, search_query, LoadResult, TrackResolver};
use crate::audio::track::Track;

/// Resolver backed by the `yt-dlp` binary.
pub struct YtDlpResolver {
    binary: String,
    search_results: usize,
    // yt-dlp is slow and rate limited upstream; keep concurrent lookups low.
    permits: tokio::sync::Semaphore,
}

/// One line of `yt-dlp --dump-json --flat-playlist` output.
#[derive(Debug, Deserialize)]
struct YtDlpEntry {
    id: String,
    title: Option<String>,
    duration: Option<f64>,
    webpage_url: Option<String>,
    url: Option<String>,
    playlist_title: Option<String>,
    playlist: Option<String>,
}

impl YtDlpResolver {
    pub fn new(binary: impl Into<String>, search_results: usize) -> Self {
        Self {
            binary: binary.into(),
            search_results,
            permits: tokio::sync::Semaphore::new(3),
        }
    }

    /// Checks that the binary runs at all.
    pub async fn verify(&self) -> Result<String> {
        let output = Command::new(&self.binary)
            .arg("--version")
            .output()
            .await
            .with_context(|| format!("could not run {}", self.binary))?;

        if !output.status.success() {
            anyhow::bail!("{} --version exited with {}", self.binary, output.status);
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn dump(&self, target: &str) -> Result<String> {
        let _permit = self.permits.acquire().await?;

        let output = Command::new(&self.binary)
            .args([
                "--dump-json",
                "--flat-playlist",
                "--skip-download",
                "--no-warnings",
                target,
            ])
            .output()
            .await
            .context("Error running yt-dlp")?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("yt-dlp error: {}", error.trim());
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl TrackResolver for YtDlpResolver {
    async fn resolve(&self, query: &str) -> Result<LoadResult> {
        let searched = !is_url(query);
        let target = search_query(query, self.search_results);
        info!(query = %target, "🔍 resolving query");

        let stdout = self.dump(&target).await?;
        let result = parse_output(&stdout, searched);
        debug!(?result, "yt-dlp result");
        Ok(result)
    }
}

/// Interprets yt-dlp's line-delimited JSON. Unparseable lines are skipped.
fn parse_output(stdout: &str, searched: bool) -> LoadResult {
    let mut playlist_name = None;
    let mut tracks = Vec::new();

    for line in stdout.lines().filter(|l| !l.trim().is_empty()) {
        let entry = match serde_json::from_str::<YtDlpEntry>(line) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable yt-dlp line");
                continue;
            }
        };
        if playlist_name.is_none() {
            playlist_name = entry.playlist_title.clone().or_else(|| entry.playlist.clone());
        }
        if let Some(track) = entry.into_track() {
            tracks.push(track);
        }
    }

    match (searched, playlist_name, tracks.len()) {
        (_, _, 0) => LoadResult::Empty,
        (true, _, _) => LoadResult::Search(tracks),
        (false, Some(name), _) => LoadResult::Playlist { name, tracks },
        (false, None, 1) => LoadResult::Track(tracks.remove(0)),
        (false, None, _) => LoadResult::Playlist {
            name: "Untitled playlist".to_string(),
            tracks,
        },
    }
}

impl YtDlpEntry {
    fn into_track(self) -> Option<Track> {
        let uri = self.webpage_url.or(self.url)?;
        let title = self.title.unwrap_or_else(|| self.id.clone());
        let duration = self
            .duration
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .map(Duration::from_secs_f64)
            .unwrap_or_default();
        Some(Track::new(self.id, title, uri, duration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const VIDEO: &str = r#"{"id":"dQw4w9WgXcQ","title":"Never Gonna Give You Up","duration":212.0,"webpage_url":"https://www.youtube.com/watch?v=dQw4w9WgXcQ"}"#;

    #[test]
    fn single_url_yields_a_track() {
        let result = parse_output(VIDEO, false);
        assert_eq!(
            result,
            LoadResult::Track(Track::new(
                "dQw4w9WgXcQ",
                "Never Gonna Give You Up",
                "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
                Duration::from_secs(212),
            ))
        );
    }

    #[test]
    fn playlist_entries_keep_their_order_and_name() {
        let stdout = [
            r#"{"_type":"url","id":"a","title":"First","duration":60,"url":"https://www.youtube.com/watch?v=a","playlist_title":"Mix"}"#,
            r#"{"_type":"url","id":"b","title":"Second","duration":null,"url":"https://www.youtube.com/watch?v=b","playlist_title":"Mix"}"#,
        ]
        .join("\n");

        match parse_output(&stdout, false) {
            LoadResult::Playlist { name, tracks } => {
                assert_eq!(name, "Mix");
                let ids: Vec<_> = tracks.iter().map(Track::identifier).collect();
                assert_eq!(ids, vec!["a", "b"]);
                assert_eq!(tracks[1].duration(), Duration::ZERO);
            }
            other => panic!("expected playlist, got {other:?}"),
        }
    }

    #[test]
    fn searches_always_offer_candidates() {
        let stdout = format!("{VIDEO}\n{VIDEO}\n");
        match parse_output(&stdout, true) {
            LoadResult::Search(tracks) => assert_eq!(tracks.len(), 2),
            other => panic!("expected search, got {other:?}"),
        }
    }

    #[test]
    fn no_usable_lines_is_empty() {
        assert_eq!(parse_output("", true), LoadResult::Empty);
        assert_eq!(parse_output("not json\n{\"id\":\"x\"}", false), LoadResult::Empty);
    }

    #[test]
    fn missing_title_falls_back_to_identifier() {
        let result = parse_output(r#"{"id":"xyz","url":"https://example.com/xyz"}"#, false);
        match result {
            LoadResult::Track(track) => {
                assert_eq!(track.title(), "xyz");
                assert_eq!(track.duration(), Duration::ZERO);
            }
            other => panic!("expected track, got {other:?}"),
        }
    }
}
