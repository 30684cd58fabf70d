pub mod cli;
pub mod core;
pub mod providers;
pub mod scheduler;
pub mod store;

pub use crate::core::config;

use crate::core::asset::Asset;
use crate::core::config::AppConfig;
use crate::providers::{HttpPriceProvider, SolanaRpcProvider};
use crate::scheduler::{RefreshScheduler, ScheduleConfig};
use crate::store::{BalanceConfig, BalanceStore, PriceCache};
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};

pub enum AppCommand {
    Balance,
    Watch,
}

/// Wires the RPC ledger and the price feed into a scheduler for the configured assets.
pub fn build_scheduler(config: &AppConfig) -> Result<RefreshScheduler> {
    let ledger = Arc::new(SolanaRpcProvider::new(&config.providers.rpc.url)?);
    let price_provider = Arc::new(HttpPriceProvider::new(&config.providers.prices.url)?);
    let assets = Asset::ALL.to_vec();

    let balances = Arc::new(BalanceStore::new(
        ledger,
        BalanceConfig {
            assets: assets.clone(),
            gold_mint: config.gold.mint.clone(),
            token_program: config.gold.token_program.clone(),
            retry: config.refresh.retry_policy(),
        },
    ));
    let prices = Arc::new(PriceCache::new(price_provider, assets));

    Ok(RefreshScheduler::new(
        balances,
        prices,
        ScheduleConfig::from(&config.refresh),
    ))
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("goldwatch starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let scheduler = build_scheduler(&config)?;
    let wallet = config.wallet.clone();

    match command {
        AppCommand::Balance => {
            cli::balance::run(scheduler.balances(), scheduler.prices(), wallet).await
        }
        AppCommand::Watch => cli::watch::run(scheduler, wallet).await,
    }
}
