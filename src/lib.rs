//! prerollr - schedule Plex pre-roll videos
//!
//! Resolves which pre-roll assets should be active for an instant from a
//! declarative YAML schedule, and saves the resulting listing to a Plex
//! server.

pub mod error;
pub mod plex;
pub mod schedule;

pub use error::{PrerollError, Result};
