use crate::models::{ExpiryPolicy, ResolverStrategy};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    pub static_source: StaticSourceConfig,
    pub catalog: CatalogConfig,
    pub resolver: ResolverConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub image_dir: PathBuf,
    pub static_cache_file: PathBuf,
    pub search_cache_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticSourceConfig {
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub base_url: String,
    pub language: u16,
    pub page_limit: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    pub strategy: ResolverStrategy,
    pub window_size: usize,
    pub request_timeout_secs: u64,
    pub cache_ttl_days: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig {
                image_dir: PathBuf::from("./data/exercise-images"),
                static_cache_file: PathBuf::from("./data/exercise_images_v4.json"),
                search_cache_file: PathBuf::from("./data/wger_exercise_images.json"),
            },
            static_source: StaticSourceConfig {
                base_url: "https://raw.githubusercontent.com/yuhonas/free-exercise-db/main/exercises"
                    .to_string(),
            },
            catalog: CatalogConfig {
                base_url: "https://wger.de/api/v2".to_string(),
                language: 2,
                page_limit: 20,
            },
            resolver: ResolverConfig {
                strategy: ResolverStrategy::StaticMapping,
                window_size: 3,
                request_timeout_secs: 10,
                cache_ttl_days: 7,
            },
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_file =
            std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".to_string());
        Self::load_from(&config_file)
    }

    pub fn load_from(config_file: &str) -> Result<Self> {
        if std::path::Path::new(config_file).exists() {
            let contents = std::fs::read_to_string(config_file)?;
            Ok(toml::from_str(&contents)?)
        } else {
            let default_config = Self::default();
            let contents = toml::to_string_pretty(&default_config)?;
            std::fs::write(config_file, contents)?;
            Ok(default_config)
        }
    }
}

impl ResolverConfig {
    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }

    /// TTL policy for the catalog-search cache
    pub fn catalog_expiry(&self) -> ExpiryPolicy {
        ExpiryPolicy::After(chrono::Duration::days(self.cache_ttl_days))
    }
}
