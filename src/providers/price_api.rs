use crate::core::asset::Asset;
use crate::core::error::FetchError;
use crate::core::price::PriceProvider;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, instrument};

/// Price feed answering `{ success, data: { prices: [{ symbol, price }] } }`.
pub struct HttpPriceProvider {
    url: String,
    client: reqwest::Client,
}

impl HttpPriceProvider {
    pub fn new(url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("goldwatch/0.1")
            .build()?;
        Ok(HttpPriceProvider {
            url: url.to_string(),
            client,
        })
    }
}

#[derive(Debug, Deserialize)]
struct PriceResponse {
    success: bool,
    data: Option<PriceData>,
}

#[derive(Debug, Deserialize)]
struct PriceData {
    prices: Vec<PriceEntry>,
}

#[derive(Debug, Deserialize)]
struct PriceEntry {
    symbol: String,
    price: f64,
}

#[async_trait]
impl PriceProvider for HttpPriceProvider {
    #[instrument(name = "PriceFetch", skip(self))]
    async fn fetch_prices(&self) -> Result<HashMap<Asset, f64>> {
        debug!("Requesting prices from {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for URL: {}", e, self.url))?;

        if !response.status().is_success() {
            return Err(anyhow!("HTTP error: {} for prices", response.status()));
        }

        let text = response.text().await?;
        let body: PriceResponse = serde_json::from_str(&text).map_err(|e| {
            FetchError::MalformedResponse(format!("failed to parse price response: {e}"))
        })?;

        if !body.success {
            return Err(anyhow!("Price feed reported failure"));
        }
        let data = body
            .data
            .ok_or_else(|| FetchError::MalformedResponse("price response has no data".into()))?;

        let mut prices = HashMap::new();
        for entry in data.prices {
            let Ok(asset) = entry.symbol.parse::<Asset>() else {
                debug!("Ignoring price for untracked symbol {}", entry.symbol);
                continue;
            };
            if !entry.price.is_finite() || entry.price < 0.0 {
                return Err(FetchError::MalformedResponse(format!(
                    "invalid price {} for {}",
                    entry.price, entry.symbol
                ))
                .into());
            }
            prices.insert(asset, entry.price);
        }
        Ok(prices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn create_mock_server(status: u16, body: &str) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/prices"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&mock_server)
            .await;
        mock_server
    }

    fn provider(server: &MockServer) -> HttpPriceProvider {
        HttpPriceProvider::new(&format!("{}/api/prices", server.uri())).unwrap()
    }

    #[tokio::test]
    async fn test_successful_price_fetch() {
        let mock_response = r#"{
            "success": true,
            "data": {
                "prices": [
                    {"symbol": "SOL", "price": 152.31},
                    {"symbol": "gold", "price": 0.0041},
                    {"symbol": "BONK", "price": 0.00002}
                ]
            }
        }"#;
        let server = create_mock_server(200, mock_response).await;

        let prices = provider(&server).fetch_prices().await.unwrap();
        assert_eq!(prices.len(), 2);
        assert_eq!(prices[&Asset::Sol], 152.31);
        assert_eq!(prices[&Asset::Gold], 0.0041);
    }

    #[tokio::test]
    async fn test_unsuccessful_response() {
        let server = create_mock_server(200, r#"{"success": false, "data": null}"#).await;

        let result = provider(&server).fetch_prices().await;
        assert_eq!(result.unwrap_err().to_string(), "Price feed reported failure");
    }

    #[tokio::test]
    async fn test_server_error() {
        let server = create_mock_server(500, "").await;

        let result = provider(&server).fetch_prices().await;
        assert_eq!(
            result.unwrap_err().to_string(),
            "HTTP error: 500 Internal Server Error for prices"
        );
    }

    #[tokio::test]
    async fn test_malformed_response() {
        let server = create_mock_server(200, r#"{"success": true, "data": {"quotes": []}}"#).await;

        let err = provider(&server).fetch_prices().await.unwrap_err();
        assert!(err.to_string().contains("failed to parse price response"));
    }

    #[tokio::test]
    async fn test_negative_price_is_rejected() {
        let body = r#"{"success": true, "data": {"prices": [{"symbol": "SOL", "price": -1.0}]}}"#;
        let server = create_mock_server(200, body).await;

        let err = provider(&server).fetch_prices().await.unwrap_err();
        assert!(matches!(
            FetchError::from_provider(err),
            FetchError::MalformedResponse(_)
        ));
    }
}
