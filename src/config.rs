use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{Config, ConfigBuilder, Environment, File, builder::DefaultState};
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str =
    "https://raw.githubusercontent.com/TomasGomezWagner/equipos-json/main";

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub source: SourceConfig,
    pub network: NetworkConfig,
}

#[derive(Deserialize, Clone)]
pub struct SourceConfig {
    /// Root the weekly `status/MM-month/semanaN.json` files live under
    pub base_url: String,
    /// Access token for private repositories
    pub token: Option<String>,
}

impl std::fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceConfig")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct NetworkConfig {
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 10,
            connect_timeout_secs: 5,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        // Load .env file (silently ignore if not present - production uses env vars directly)
        let _ = dotenvy::dotenv();

        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("camera-monitor");

        let builder = Self::defaults()?
            // 1. Local config file (optional, lowest priority)
            .add_source(File::from(PathBuf::from("config.toml")).required(false))
            // 2. User config directory (optional, overrides local)
            .add_source(File::from(config_dir.join("config.toml")).required(false))
            // 3. Environment variables (CAMERAS__SOURCE__BASE_URL=...)
            .add_source(Environment::with_prefix("CAMERAS").separator("__"));

        let s = builder.build().context("Failed to build configuration")?;
        s.try_deserialize().context("Invalid configuration")
    }

    /// Load the defaults overridden by a single, required config file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let s = Self::defaults()?
            .add_source(File::from(path.to_path_buf()).required(true))
            .build()
            .with_context(|| format!("Failed to read configuration from {}", path.display()))?;
        s.try_deserialize().context("Invalid configuration")
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>> {
        // The conventional GITHUB_TOKEN seeds the token; config files and
        // CAMERAS__SOURCE__TOKEN still take precedence.
        let token = std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty());

        let builder = Config::builder()
            // Source
            .set_default("source.base_url", DEFAULT_BASE_URL)?
            .set_default("source.token", token)?
            // Network
            .set_default("network.request_timeout_secs", 10)?
            .set_default("network.connect_timeout_secs", 5)?;

        Ok(builder)
    }
}
