//! Tracked assets, wallet identities and the snapshots built from them

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Asset {
    Sol,
    Gold,
}

impl Asset {
    pub const ALL: [Asset; 2] = [Asset::Sol, Asset::Gold];

    /// Fixed on-chain precision of the asset.
    pub fn decimals(&self) -> u32 {
        match self {
            Asset::Sol => 9,
            Asset::Gold => 6,
        }
    }

    pub fn is_native(&self) -> bool {
        matches!(self, Asset::Sol)
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Asset::Sol => "SOL",
            Asset::Gold => "GOLD",
        }
    }
}

impl Display for Asset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl FromStr for Asset {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "SOL" => Ok(Asset::Sol),
            "GOLD" => Ok(Asset::Gold),
            _ => Err(anyhow!("Unknown asset symbol: {}", s)),
        }
    }
}

/// Public address of the connected wallet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WalletId(String);

impl WalletId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for WalletId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if !(32..=44).contains(&s.len()) {
            return Err(anyhow!("Invalid wallet address length: {}", s));
        }
        if let Some(c) = s.chars().find(|c| !BASE58_ALPHABET.contains(*c)) {
            return Err(anyhow!("Invalid character '{}' in wallet address: {}", c, s));
        }
        Ok(WalletId(s.to_string()))
    }
}

impl TryFrom<String> for WalletId {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<WalletId> for String {
    fn from(value: WalletId) -> Self {
        value.0
    }
}

impl Display for WalletId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetBalance {
    pub asset: Asset,
    pub raw: u64,
    pub decimals: u32,
}

impl AssetBalance {
    pub fn new(asset: Asset, raw: u64) -> Self {
        Self {
            asset,
            raw,
            decimals: asset.decimals(),
        }
    }

    pub fn zero(asset: Asset) -> Self {
        Self::new(asset, 0)
    }

    /// Human readable amount, `raw` scaled down by the asset's decimals.
    pub fn amount(&self) -> Decimal {
        Decimal::from_i128_with_scale(i128::from(self.raw), self.decimals)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BalanceSnapshot {
    pub identity: Option<WalletId>,
    pub balances: BTreeMap<Asset, AssetBalance>,
    pub taken_at: Option<DateTime<Utc>>,
}

impl BalanceSnapshot {
    /// A snapshot with every asset at zero.
    pub fn empty(identity: Option<WalletId>, assets: &[Asset]) -> Self {
        Self {
            identity,
            balances: assets
                .iter()
                .map(|asset| (*asset, AssetBalance::zero(*asset)))
                .collect(),
            taken_at: None,
        }
    }

    pub fn get(&self, asset: Asset) -> AssetBalance {
        self.balances
            .get(&asset)
            .copied()
            .unwrap_or_else(|| AssetBalance::zero(asset))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceQuote {
    pub asset: Asset,
    pub usd_price: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceSnapshot {
    pub quotes: BTreeMap<Asset, PriceQuote>,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl PriceSnapshot {
    pub fn empty(assets: &[Asset]) -> Self {
        Self {
            quotes: assets
                .iter()
                .map(|asset| {
                    (
                        *asset,
                        PriceQuote {
                            asset: *asset,
                            usd_price: 0.0,
                        },
                    )
                })
                .collect(),
            fetched_at: None,
        }
    }

    pub fn price(&self, asset: Asset) -> f64 {
        self.quotes.get(&asset).map_or(0.0, |q| q.usd_price)
    }
}
