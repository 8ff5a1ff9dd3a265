//! Birdeye token overview client.

use super::{ServiceError, TokenInfo, TokenInfoSource};
use crate::domain::Mint;
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct BirdeyeClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl BirdeyeClient {
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl TokenInfoSource for BirdeyeClient {
    async fn token_info(&self, mint: &Mint) -> Result<TokenInfo, ServiceError> {
        let response = self
            .client
            .get(format!("{}/defi/token_overview", self.base_url))
            .query(&[("address", mint.as_str())])
            .header("X-API-KEY", &self.api_key)
            .header("x-chain", "solana")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::Http {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let body: serde_json::Value = response.json().await?;
        Ok(parse_overview(&body))
    }
}

fn parse_overview(body: &serde_json::Value) -> TokenInfo {
    let data = &body["data"];
    let number = |key: &str| -> Option<Decimal> {
        match &data[key] {
            serde_json::Value::Number(n) => n.as_f64().and_then(Decimal::from_f64_retain),
            serde_json::Value::String(s) => s.parse().ok(),
            _ => None,
        }
    };

    TokenInfo {
        symbol: data["symbol"].as_str().map(str::to_string),
        price: number("price"),
        market_cap: number("mc").or_else(|| number("marketCap")),
        liquidity: number("liquidity"),
        volume_5m: number("v5mUSD").or_else(|| number("v_5m")),
    }
}
