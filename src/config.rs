use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use validator::Validate;

use crate::core::{DiscoverySettings, Lang};
use crate::models::ExclusionPolicy;
use crate::services::DEFAULT_API_VERSION;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub vk: VkSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VkSettings {
    #[serde(default = "default_vk_endpoint")]
    pub endpoint: String,
    pub access_token: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default)]
    pub lang: Lang,
    #[serde(default = "default_vk_timeout")]
    pub timeout_secs: u64,
}

impl VkSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_vk_endpoint() -> String { "https://api.vk.com".to_string() }
fn default_api_version() -> String { DEFAULT_API_VERSION.to_string() }
fn default_vk_timeout() -> u64 { 10 }

/// Without a URL the in-memory store is used
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheSettings {
    pub redis_url: Option<String>,
    pub ttl_secs: Option<u64>,
    pub l1_cache_size: Option<u64>,
}

/// Discovery tunables, range-checked when settings are loaded
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DiscoveryConfig {
    /// Bounded by the remote search window
    #[validate(range(min = 1, max = 1000))]
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[validate(range(min = 1, max = 1000))]
    #[serde(default = "default_max_empty_pages")]
    pub max_empty_pages: u32,
    #[validate(range(min = 1, max = 1000))]
    #[serde(default = "default_photo_count")]
    pub photo_count: u32,
    #[validate(range(max = 81))]
    #[serde(default = "default_age_radius")]
    pub default_age_radius: u8,
    #[serde(default)]
    pub exclude_liked: bool,
    #[serde(default)]
    pub exclude_skipped: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_empty_pages: default_max_empty_pages(),
            photo_count: default_photo_count(),
            default_age_radius: default_age_radius(),
            exclude_liked: false,
            exclude_skipped: false,
        }
    }
}

impl DiscoveryConfig {
    pub fn engine_settings(&self, lang: Lang) -> DiscoverySettings {
        DiscoverySettings {
            page_size: self.page_size,
            max_empty_pages: self.max_empty_pages,
            photo_count: self.photo_count,
            lang,
            exclusion: ExclusionPolicy {
                exclude_liked: self.exclude_liked,
                exclude_skipped: self.exclude_skipped,
            },
        }
    }
}

fn default_page_size() -> u32 { 50 }
fn default_max_empty_pages() -> u32 { 5 }
fn default_photo_count() -> u32 { 3 }
fn default_age_radius() -> u8 { 5 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

fn env_source() -> Environment {
    Environment::with_prefix("VKINDER")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration files (config/default.toml, config/local.toml)
    /// 3. Environment variables (prefixed with VKINDER__)
    /// 4. VK_API_TOKEN and DATABASE_URL
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            // Development overrides
            .add_source(File::with_name("config/local").required(false))
            // e.g. VKINDER__DISCOVERY__PAGE_SIZE -> discovery.page_size
            .add_source(env_source())
            .build()?;

        substitute_env_vars(settings)?
            .try_deserialize::<Self>()?
            .validated()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(env_source())
            .build()?;

        settings.try_deserialize::<Self>()?.validated()
    }

    /// Reject out-of-range tunables before anything is built from them
    fn validated(self) -> Result<Self, ConfigError> {
        self.discovery
            .validate()
            .map_err(|e| ConfigError::Message(format!("invalid discovery settings: {}", e)))?;
        Ok(self)
    }
}

/// Apply the conventional unprefixed variables on top of the layered config
fn substitute_env_vars(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let mut builder = Config::builder().add_source(settings);

    if let Ok(token) = env::var("VK_API_TOKEN") {
        builder = builder.set_override("vk.access_token", token)?;
    }
    if let Ok(url) = env::var("DATABASE_URL") {
        builder = builder.set_override("database.url", url)?;
    }

    builder.build()
}
