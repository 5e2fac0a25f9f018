use serenity::builder::{CreateEmbed, CreateEmbedFooter};
use std::time::Duration;

use crate::audio::track::{Track, TrackSummary};
use crate::ui::buttons::keycap;

/// Queue entries shown by `/show`.
pub const SHOWN_QUEUE_ENTRIES: usize = 5;

/// Embed accent colors.
pub mod colors {
    use serenity::all::Colour;

    pub const SUCCESS_GREEN: Colour = Colour::from_rgb(67, 181, 129);
    pub const MUSIC_PURPLE: Colour = Colour::from_rgb(138, 43, 226);
}

const STANDARD_FOOTER: &str = "🎵 Guild Jukebox";

/// Head of the queue, numbered with keycaps, plus the current track if any.
pub fn create_queue_embed(now_playing: Option<&Track>, queued: &[TrackSummary]) -> CreateEmbed {
    let mut embed = CreateEmbed::new()
        .title("📋 Up next")
        .color(colors::MUSIC_PURPLE)
        .footer(CreateEmbedFooter::new(format!(
            "{STANDARD_FOOTER} • {} in queue",
            queued.len()
        )));

    if let Some(track) = now_playing {
        embed = embed.description(format!(
            "▶️ **{}** `[{}]`",
            track.title(),
            format_duration(track.duration())
        ));
    }

    for (i, entry) in queued.iter().take(SHOWN_QUEUE_ENTRIES).enumerate() {
        embed = embed.field(
            keycap(i + 1),
            format!("[{}]({}) `[{}]`", entry.title, entry.uri, format_duration(entry.duration)),
            false,
        );
    }

    embed
}

pub fn create_now_playing_embed(track: &Track) -> CreateEmbed {
    CreateEmbed::new()
        .title("🎵 Now playing")
        .description(format!("**{}**", track.title()))
        .url(track.uri())
        .field("⏱️ Duration", format_duration(track.duration()), true)
        .color(colors::SUCCESS_GREEN)
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

/// Track length as a clock; unknown lengths are shown as live.
pub fn format_duration(duration: Duration) -> String {
    if duration.is_zero() {
        return "🔴 Live".to_string();
    }
    format_position(duration)
}

/// `m:ss` or `h:mm:ss`.
pub fn format_position(position: Duration) -> String {
    let total_seconds = position.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}
