//! Combines balance and price snapshots into USD values.
use crate::core::asset::{Asset, BalanceSnapshot, PriceSnapshot, WalletId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// Value of a single tracked asset.
#[derive(Debug, Clone, PartialEq)]
pub struct HoldingValue {
    pub asset: Asset,
    pub amount: Decimal,
    pub usd_price: f64,
    pub usd_value: f64,
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioValue {
    pub identity: Option<WalletId>,
    pub holdings: Vec<HoldingValue>,
    pub total_usd: f64,
    pub balances_at: Option<DateTime<Utc>>,
    pub prices_at: Option<DateTime<Utc>>,
}

/// Values every asset of the balance snapshot at the cached price.
///
/// Missing prices count as zero, so the total never includes stale or
/// unknown assets at a made up value.
pub fn calculate_portfolio_value(
    balances: &BalanceSnapshot,
    prices: &PriceSnapshot,
) -> PortfolioValue {
    let mut holdings: Vec<HoldingValue> = balances
        .balances
        .values()
        .map(|balance| {
            let amount = balance.amount();
            let usd_price = prices.price(balance.asset);
            HoldingValue {
                asset: balance.asset,
                amount,
                usd_price,
                usd_value: amount.to_f64().unwrap_or(0.0) * usd_price,
                weight: None,
            }
        })
        .collect();

    let total_usd: f64 = holdings.iter().map(|h| h.usd_value).sum();
    if total_usd > 0.0 {
        for holding in &mut holdings {
            holding.weight = Some(holding.usd_value / total_usd * 100.0);
        }
    }

    PortfolioValue {
        identity: balances.identity.clone(),
        holdings,
        total_usd,
        balances_at: balances.taken_at,
        prices_at: prices.fetched_at,
    }
}
