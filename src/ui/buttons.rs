use serenity::{
    all::ReactionType,
    builder::{
        CreateActionRow, CreateButton, CreateSelectMenu, CreateSelectMenuKind,
        CreateSelectMenuOption,
    },
};

use crate::audio::track::Track;

/// Custom ids of the interactive components the bot sends.
pub mod component_ids {
    pub const SELECT_TRACK: &str = "select_track";
}

const KEYCAPS: [&str; 10] = ["1️⃣", "2️⃣", "3️⃣", "4️⃣", "5️⃣", "6️⃣", "7️⃣", "8️⃣", "9️⃣", "🔟"];

/// Discord rejects select-menu labels longer than this.
const MAX_LABEL_CHARS: usize = 100;

/// Keycap emoji for a 1-based position; positions past ten fall back to digits.
pub fn keycap(position: usize) -> String {
    position
        .checked_sub(1)
        .and_then(|i| KEYCAPS.get(i))
        .map_or_else(|| format!("#{position}"), |k| k.to_string())
}

/// Single link button, e.g. to the track that was just queued.
pub fn create_link_row(label: &str, url: &str, emoji: &str) -> CreateActionRow {
    CreateActionRow::Buttons(vec![CreateButton::new_link(url)
        .label(label)
        .emoji(ReactionType::Unicode(emoji.to_string()))])
}

/// Select menu offering search candidates. Option values are track identifiers.
pub fn create_track_select_row(tracks: &[Track]) -> CreateActionRow {
    let options = tracks
        .iter()
        .take(KEYCAPS.len())
        .enumerate()
        .map(|(i, track)| {
            CreateSelectMenuOption::new(truncate(track.title()), track.identifier())
                .emoji(ReactionType::Unicode(keycap(i + 1)))
        })
        .collect();

    CreateActionRow::SelectMenu(
        CreateSelectMenu::new(
            component_ids::SELECT_TRACK,
            CreateSelectMenuKind::String { options },
        )
        .placeholder("Choose your song 👇"),
    )
}

fn truncate(label: &str) -> String {
    if label.chars().count() <= MAX_LABEL_CHARS {
        return label.to_string();
    }
    let mut cut: String = label.chars().take(MAX_LABEL_CHARS - 1).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::track::track;
    use pretty_assertions::assert_eq;

    #[test]
    fn keycaps_number_the_first_ten_positions() {
        assert_eq!(keycap(1), "1️⃣");
        assert_eq!(keycap(10), "🔟");
        assert_eq!(keycap(11), "#11");
        assert_eq!(keycap(0), "#0");
    }

    #[test]
    fn long_labels_are_cut_to_discord_limits() {
        let long = "a".repeat(150);
        let cut = truncate(&long);
        assert_eq!(cut.chars().count(), MAX_LABEL_CHARS);
        assert!(cut.ends_with('…'));
        assert_eq!(truncate("short"), "short");
    }

    #[test]
    fn select_menu_uses_identifiers_as_values() {
        let row = create_track_select_row(&[track("abc", 60), track("def", 60)]);
        let json = serde_json::to_value(row).unwrap();
        let menu = &json["components"][0];

        assert_eq!(menu["custom_id"], component_ids::SELECT_TRACK);
        assert_eq!(menu["options"][0]["value"], "abc");
        assert_eq!(menu["options"][1]["label"], "Track def");
        assert_eq!(menu["options"][1]["emoji"]["name"], "2️⃣");
    }
}
