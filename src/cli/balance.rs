use super::ui;
use crate::core::asset::WalletId;
use crate::core::portfolio::calculate_portfolio_value;
use crate::store::balance::BalanceStore;
use crate::store::price::PriceCache;
use anyhow::Result;

/// Runs a single refresh cycle and prints the portfolio.
pub async fn run(balances: &BalanceStore, prices: &PriceCache, identity: WalletId) -> Result<()> {
    let pb = ui::new_spinner("Fetching balances...");

    balances.attach(identity.clone());
    let (published, price_snapshot) =
        tokio::join!(balances.refresh_all(&identity), prices.refresh());
    pb.finish_and_clear();

    let snapshot = published.unwrap_or_else(|| balances.snapshot());
    let value = calculate_portfolio_value(&snapshot, &price_snapshot);
    println!("{}", value.display_as_table());

    balances.detach();
    Ok(())
}
