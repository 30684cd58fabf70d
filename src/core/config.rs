use crate::core::asset::WalletId;
use crate::core::retry::RetryPolicy;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

pub const SPL_TOKEN_PROGRAM: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RpcProviderConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PriceProviderConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub rpc: RpcProviderConfig,
    pub prices: PriceProviderConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GoldConfig {
    pub mint: String,
    #[serde(default = "default_token_program")]
    pub token_program: String,
}

fn default_token_program() -> String {
    SPL_TOKEN_PROGRAM.to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct RefreshConfig {
    pub interval_ms: u64,
    pub startup_delays_ms: Vec<u64>,
    pub manual_followup_ms: u64,
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        RefreshConfig {
            interval_ms: 10_000,
            startup_delays_ms: vec![3_000, 10_000],
            manual_followup_ms: 2_000,
            max_attempts: 3,
            backoff_ms: 1_000,
        }
    }
}

impl RefreshConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.backoff_ms))
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub wallet: WalletId,
    pub providers: ProvidersConfig,
    pub gold: GoldConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "goldwatch", "goldwatch")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}
