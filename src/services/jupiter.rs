//! Jupiter v6 swap API client.

use super::{Quote, ServiceError, SwapAggregator};
use crate::domain::Mint;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// Error codes Jupiter returns when no route exists for a pair.
const NO_ROUTE_CODES: [&str; 2] = ["COULD_NOT_FIND_ANY_ROUTE", "NO_ROUTES_FOUND"];

#[derive(Debug, Clone)]
pub struct JupiterClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SwapResponse {
    swap_transaction: String,
}

impl JupiterClient {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl SwapAggregator for JupiterClient {
    async fn quote(
        &self,
        input: &Mint,
        output: &Mint,
        amount: u64,
        slippage_bps: u16,
    ) -> Result<Option<Quote>, ServiceError> {
        debug!(
            "Requesting quote {} {} -> {} (slippage {}bps)",
            amount, input, output, slippage_bps
        );

        let amount = amount.to_string();
        let slippage_bps = slippage_bps.to_string();
        let response = self
            .client
            .get(format!("{}/quote", self.base_url))
            .query(&[
                ("inputMint", input.as_str()),
                ("outputMint", output.as_str()),
                ("amount", amount.as_str()),
                ("slippageBps", slippage_bps.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ServiceError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if NO_ROUTE_CODES.iter().any(|code| body.contains(code)) {
                debug!("No route {} -> {}: {}", input, output, body);
                return Ok(None);
            }
            return Err(ServiceError::Http {
                status: status.as_u16(),
                message: body,
            });
        }

        let route: serde_json::Value = response.json().await?;
        parse_quote(route, input, output)
    }

    async fn build_swap_transaction(
        &self,
        quote: &Quote,
        signer: &str,
    ) -> Result<String, ServiceError> {
        let payload = json!({
            "quoteResponse": quote.route,
            "userPublicKey": signer,
            "wrapAndUnwrapSol": true,
            "dynamicComputeUnitLimit": true,
        });

        let response = self
            .client
            .post(format!("{}/swap", self.base_url))
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::Http {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let swap: SwapResponse = response.json().await?;
        Ok(swap.swap_transaction)
    }
}

/// Turn a quote response into a [`Quote`]; a zero or missing output estimate
/// means the pair has no usable route.
fn parse_quote(
    route: serde_json::Value,
    input: &Mint,
    output: &Mint,
) -> Result<Option<Quote>, ServiceError> {
    let amount_field = |key: &str| -> Option<u64> {
        match route.get(key)? {
            serde_json::Value::String(s) => s.parse().ok(),
            serde_json::Value::Number(n) => n.as_u64(),
            _ => None,
        }
    };

    let out_amount = match amount_field("outAmount") {
        Some(0) | None => return Ok(None),
        Some(v) => v,
    };
    let in_amount = amount_field("inAmount")
        .ok_or_else(|| ServiceError::Parse("Missing inAmount field".to_string()))?;
    let price_impact_pct = route
        .get("priceImpactPct")
        .and_then(|v| v.as_str())
        .map(str::to_string);

    Ok(Some(Quote {
        input_mint: input.clone(),
        output_mint: output.clone(),
        in_amount,
        out_amount,
        price_impact_pct,
        route,
    }))
}
