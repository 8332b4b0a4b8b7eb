use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use prerollr::plex::PlexConfig;

const PLEX_URL_ENV: &str = "PLEX_URL";
const PLEX_TOKEN_ENV: &str = "PLEX_TOKEN";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub plex: PlexSection,
    pub schedule: ScheduleSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlexSection {
    pub url: String,
    pub token: String,
    pub verify_ssl: bool,
    pub timeout_ms: u64,
}

impl Default for PlexSection {
    fn default() -> Self {
        Self {
            url: String::new(),
            token: String::new(),
            verify_ssl: true,
            timeout_ms: 30000,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleSection {
    pub path: Option<PathBuf>,
    pub play_all: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            plex: PlexSection::default(),
            schedule: ScheduleSection::default(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let mut config = Self::locate(config_path)?;
        config.apply_env(std::env::var(PLEX_URL_ENV).ok(), std::env::var(PLEX_TOKEN_ENV).ok());
        Ok(config)
    }

    fn locate(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try primary location: ~/.config/<project>/<project>.yml
        let project_name = env!("CARGO_PKG_NAME");
        if let Some(config_dir) = dirs::config_dir() {
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        // Try fallback location: ./<project>.yml
        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        // No config file found, use defaults
        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Fill unset server settings from the environment
    fn apply_env(&mut self, url: Option<String>, token: Option<String>) {
        if self.plex.url.is_empty() {
            if let Some(url) = url {
                self.plex.url = url;
            }
        }
        if self.plex.token.is_empty() {
            if let Some(token) = token {
                self.plex.token = token;
            }
        }
    }

    /// Server settings, failing when url or token is missing
    pub fn plex_config(&self) -> Result<PlexConfig> {
        if self.plex.url.trim().is_empty() || self.plex.token.trim().is_empty() {
            eyre::bail!(
                "No Plex server configured: set plex.url and plex.token or {} and {}",
                PLEX_URL_ENV,
                PLEX_TOKEN_ENV
            );
        }
        Ok(PlexConfig {
            url: self.plex.url.clone(),
            token: self.plex.token.clone(),
            verify_ssl: self.plex.verify_ssl,
            timeout: Duration::from_millis(self.plex.timeout_ms),
        })
    }
}
