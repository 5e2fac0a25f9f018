//! # Cache Module
//!
//! Short-lived per-user state kept between a `/play` search and the
//! select-menu interaction that answers it.
//!
//! ## Configuration
//!
//! ```env
//! SELECTION_TTL=300           # Seconds a pending selection stays valid
//! SELECTION_CAPACITY=1000     # Maximum number of pending selections
//! ```

pub mod selection;

pub use selection::{Selection, SelectionCache};
