use crate::core::asset::{Asset, PriceQuote, PriceSnapshot};
use crate::core::price::PriceProvider;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Last fetched USD price per tracked asset.
///
/// A failed refresh leaves the previous prices in place.
pub struct PriceCache {
    provider: Arc<dyn PriceProvider>,
    assets: Vec<Asset>,
    inner: Mutex<Arc<PriceSnapshot>>,
}

impl PriceCache {
    pub fn new(provider: Arc<dyn PriceProvider>, assets: Vec<Asset>) -> Self {
        let snapshot = Arc::new(PriceSnapshot::empty(&assets));
        Self {
            provider,
            assets,
            inner: Mutex::new(snapshot),
        }
    }

    pub async fn snapshot(&self) -> Arc<PriceSnapshot> {
        Arc::clone(&*self.inner.lock().await)
    }

    pub async fn refresh(&self) -> Arc<PriceSnapshot> {
        let prices = match self.provider.fetch_prices().await {
            Ok(prices) => prices,
            Err(e) => {
                warn!("Price refresh failed, keeping cached prices: {e:#}");
                return self.snapshot().await;
            }
        };

        let mut cached = self.inner.lock().await;
        let mut next = PriceSnapshot::clone(&cached);
        for asset in &self.assets {
            match prices.get(asset) {
                Some(price) => {
                    next.quotes.insert(
                        *asset,
                        PriceQuote {
                            asset: *asset,
                            usd_price: *price,
                        },
                    );
                }
                None => debug!(%asset, "No quote in response, keeping previous price"),
            }
        }
        next.fetched_at = Some(Utc::now());
        *cached = Arc::new(next);
        Arc::clone(&*cached)
    }
}
