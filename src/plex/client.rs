//! Plex settings client
//!
//! The only server state touched is the `cinemaTrailersPrerollID` preference.
//! Failures are reported once and never retried.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use reqwest::{Client, Response};

use crate::error::{PrerollError, Result};
use crate::schedule::build_listing;

/// Plex preference holding the pre-roll listing
pub const PREROLL_SETTING: &str = "cinemaTrailersPrerollID";

/// Header carrying the Plex auth token
const TOKEN_HEADER: &str = "X-Plex-Token";

/// Server preferences endpoint, requires a valid token
const PREFS_PATH: &str = "/:/prefs";

/// Default request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Somewhere a listing can be saved
#[async_trait]
pub trait ListingStore: Send + Sync {
    /// Persist an already-joined listing string
    async fn save_listing(&self, listing: &str) -> Result<()>;

    /// Join `paths` and persist them
    async fn save_paths(&self, paths: &[String], play_all: bool) -> Result<()> {
        let listing = build_listing(paths, play_all);
        self.save_listing(&listing).await
    }
}

/// Connection settings for a Plex server
#[derive(Debug, Clone)]
pub struct PlexConfig {
    pub url: String,
    pub token: String,
    /// Reject invalid TLS certificates (self-signed servers need this off)
    pub verify_ssl: bool,
    pub timeout: Duration,
}

impl PlexConfig {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            verify_ssl: true,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// HTTP client for a single Plex server
pub struct PlexClient {
    client: Client,
    config: PlexConfig,
}

impl PlexClient {
    pub fn new(config: PlexConfig) -> Result<Self> {
        if config.url.trim().is_empty() || config.token.trim().is_empty() {
            return Err(PrerollError::Plex(
                "server url and token are required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(!config.verify_ssl)
            .build()
            .map_err(|e| PrerollError::Plex(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.url.trim_end_matches('/'), path)
    }

    async fn check(response: Response, action: &str) -> Result<()> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(PrerollError::Plex(format!("{} failed ({}): {}", action, status, body)))
    }

    /// Verify the server is reachable and the token accepted.
    ///
    /// Reads the preferences, which Plex only serves to authenticated
    /// clients, so a bad token fails here rather than at save time.
    pub async fn connect(&self) -> Result<()> {
        info!("Connecting to Plex server at {}", self.config.url);
        let response = self
            .client
            .get(self.endpoint(PREFS_PATH))
            .header(TOKEN_HEADER, &self.config.token)
            .send()
            .await
            .map_err(|e| PrerollError::Plex(format!("Error connecting to Plex: {}", e)))?;
        Self::check(response, "connect").await
    }
}

#[async_trait]
impl ListingStore for PlexClient {
    async fn save_listing(&self, listing: &str) -> Result<()> {
        debug!("PUT {}={:?}", PREROLL_SETTING, listing);
        let response = self
            .client
            .put(self.endpoint(PREFS_PATH))
            .header(TOKEN_HEADER, &self.config.token)
            .query(&[(PREROLL_SETTING, listing)])
            .send()
            .await
            .map_err(|e| PrerollError::Plex(format!("Failed to save pre-roll: {}", e)))?;
        Self::check(response, "save pre-roll").await?;
        info!("Saved pre-roll listing: \"{}\"", listing);
        Ok(())
    }
}

/// Records saved listings in memory
#[derive(Debug, Default)]
pub struct MockListingStore {
    saved: Mutex<Vec<String>>,
    fail: bool,
}

impl MockListingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose saves always fail
    pub fn failing() -> Self {
        Self {
            saved: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn saved(&self) -> Vec<String> {
        self.saved.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ListingStore for MockListingStore {
    async fn save_listing(&self, listing: &str) -> Result<()> {
        if self.fail {
            return Err(PrerollError::Plex("mock save failure".to_string()));
        }
        self.saved
            .lock()
            .map_err(|_| PrerollError::Plex("mock store poisoned".to_string()))?
            .push(listing.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plex_config_defaults() {
        let config = PlexConfig::new("http://plex:32400", "token");
        assert!(config.verify_ssl);
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_client_requires_url_and_token() {
        assert!(matches!(
            PlexClient::new(PlexConfig::new("", "token")),
            Err(PrerollError::Plex(_))
        ));
        assert!(matches!(
            PlexClient::new(PlexConfig::new("http://plex:32400", " ")),
            Err(PrerollError::Plex(_))
        ));
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let client = PlexClient::new(PlexConfig::new("http://plex:32400/", "token")).unwrap();
        assert_eq!(client.endpoint(PREFS_PATH), "http://plex:32400/:/prefs");
    }

    #[tokio::test]
    async fn test_mock_records_listing() {
        let store = MockListingStore::new();
        store.save_listing("a.mp4;b.mp4").await.unwrap();
        assert_eq!(store.saved(), vec!["a.mp4;b.mp4".to_string()]);
    }

    #[tokio::test]
    async fn test_save_paths_joins() {
        let store = MockListingStore::new();
        let paths = vec!["a.mp4".to_string(), "b.mp4".to_string()];
        store.save_paths(&paths, true).await.unwrap();
        store.save_paths(&paths, false).await.unwrap();
        assert_eq!(store.saved(), vec!["a.mp4,b.mp4".to_string(), "a.mp4;b.mp4".to_string()]);
    }

    #[tokio::test]
    async fn test_failing_mock() {
        let store = MockListingStore::failing();
        assert!(store.save_listing("a.mp4").await.is_err());
        assert!(store.saved().is_empty());
    }

    #[tokio::test]
    async fn test_connect_unreachable_server_fails() {
        let mut config = PlexConfig::new("http://127.0.0.1:1", "token");
        config.timeout = Duration::from_secs(2);
        let client = PlexClient::new(config).unwrap();
        assert!(matches!(client.connect().await, Err(PrerollError::Plex(_))));
    }
}
