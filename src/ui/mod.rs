//! Discord message building blocks: embeds, link buttons and the track
//! selection menu.

pub mod buttons;
pub mod embeds;
