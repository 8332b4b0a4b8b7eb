//! Plex server integration
//!
//! Persists the resolved listing to the server's pre-roll setting.

pub mod client;

pub use client::{ListingStore, MockListingStore, PlexClient, PlexConfig, PREROLL_SETTING};
