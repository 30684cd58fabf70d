//! Pricing abstractions

use crate::core::asset::Asset;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;

#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// USD price per asset. Assets the feed does not quote are absent.
    async fn fetch_prices(&self) -> Result<HashMap<Asset, f64>>;
}
