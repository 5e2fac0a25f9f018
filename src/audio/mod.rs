//! # Audio Module
//!
//! Per-guild playback engine.
//!
//! ## Architecture
//!
//! ### [`queue`] - Track Queue
//! - FIFO of pending tracks behind its own lock
//! - Repeat modes (`off`, `song`, `queue`)
//!
//! ### [`session`] - Playback Session
//! - One queue, one player handle and one repeat mode per guild
//! - Reacts to track-end events and advances the queue
//!
//! ### [`registry`] / [`controller`]
//! - Lazily creates sessions, at most one per guild
//! - Guild-scoped operations used by the slash command handlers
//!
//! The actual audio transport lives behind the [`player::PlayerHandle`]
//! trait; the songbird-backed implementation is in `crate::bot::voice`.

pub mod controller;
pub mod player;
pub mod queue;
pub mod registry;
pub mod session;
pub mod track;
