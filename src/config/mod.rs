use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub seasons: SeasonsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_web_base_url")]
    pub web_base_url: String,

    #[serde(default = "default_accounts_base_url")]
    pub accounts_base_url: String,

    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Spotify application client ID for the PKCE flow.
    #[serde(default)]
    pub client_id: String,

    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,

    #[serde(default)]
    pub access_token: String,

    #[serde(default)]
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonsConfig {
    /// Target track count for automatically sized seasons.
    #[serde(default = "default_ideal_length")]
    pub ideal_length: usize,

    /// Rankings a numbered season covers.
    #[serde(default = "default_autoseason_rankings")]
    pub autoseason_rankings: Vec<String>,

    /// Projects certified with any of these words never enter a season.
    #[serde(default)]
    pub exclusion_certifications: Vec<String>,
}

fn default_web_base_url() -> String {
    "https://api.spotify.com/v1".to_string()
}

fn default_accounts_base_url() -> String {
    "https://accounts.spotify.com".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_redirect_uri() -> String {
    "http://localhost:8888/callback".to_string()
}

fn default_ideal_length() -> usize {
    80
}

fn default_autoseason_rankings() -> Vec<String> {
    vec!["A".to_string(), "B".to_string()]
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            web_base_url: default_web_base_url(),
            accounts_base_url: default_accounts_base_url(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            redirect_uri: default_redirect_uri(),
            access_token: String::new(),
            refresh_token: String::new(),
        }
    }
}

impl Default for SeasonsConfig {
    fn default() -> Self {
        Self {
            ideal_length: default_ideal_length(),
            autoseason_rankings: default_autoseason_rankings(),
            exclusion_certifications: Vec::new(),
        }
    }
}

impl Config {
    /// Config directory path (~/.tunecapsule/), overridable with
    /// TUNECAPSULE_CONFIG_DIR for tests.
    pub fn config_dir() -> Result<PathBuf> {
        if let Ok(test_dir) = std::env::var("TUNECAPSULE_CONFIG_DIR") {
            return Ok(PathBuf::from(test_dir));
        }
        let home = dirs::home_dir().context("Could not find home directory")?;
        Ok(home.join(".tunecapsule"))
    }

    /// Config file path (~/.tunecapsule/config.toml)
    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from file
    pub fn load() -> Result<Self> {
        let config_file = Self::config_file()?;

        if !config_file.exists() {
            tracing::info!("Config file not found, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&config_file).context("Failed to read config file")?;
        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_dir = Self::config_dir()?;
        fs::create_dir_all(&config_dir).context("Failed to create config directory")?;

        let config_file = Self::config_file()?;
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&config_file, contents).context("Failed to write config file")?;
        Ok(())
    }

    /// Check if a Spotify account is connected
    pub fn is_authenticated(&self) -> bool {
        !self.auth.access_token.is_empty()
    }

    /// Update auth tokens
    pub fn set_tokens(&mut self, access_token: String, refresh_token: String) {
        self.auth.access_token = access_token;
        self.auth.refresh_token = refresh_token;
    }

    /// Clear auth tokens
    pub fn clear_tokens(&mut self) {
        self.auth.access_token.clear();
        self.auth.refresh_token.clear();
    }

    /// Ranking set for numbered seasons, parsed from config.
    pub fn autoseason_rankings(&self) -> Vec<crate::models::Ranking> {
        self.seasons
            .autoseason_rankings
            .iter()
            .filter_map(|word| word.parse().ok())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Ranking;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.web_base_url, "https://api.spotify.com/v1");
        assert_eq!(config.api.timeout_seconds, 30);
        assert_eq!(config.seasons.ideal_length, 80);
        assert_eq!(config.autoseason_rankings(), vec![Ranking::A, Ranking::B]);
        assert!(!config.is_authenticated());
    }

    #[test]
    fn test_config_serialization() {
        let mut config = Config::default();
        config.seasons.exclusion_certifications = vec!["🚫".to_string()];
        let serialized = toml::to_string(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();

        assert_eq!(config.api.web_base_url, deserialized.api.web_base_url);
        assert_eq!(
            config.seasons.exclusion_certifications,
            deserialized.seasons.exclusion_certifications
        );
    }

    #[test]
    fn test_token_lifecycle() {
        let mut config = Config::default();
        config.set_tokens("access".to_string(), "refresh".to_string());
        assert!(config.is_authenticated());
        config.clear_tokens();
        assert!(!config.is_authenticated());
    }
}
