//! End-to-end replication through the webhook router with mock services.
//!
//! Covers:
//! 1. A monitored wallet's buy is replicated with the stable asset first
//! 2. Redelivery of the same signature is never executed twice
//! 3. Fallback to the native asset when the stable asset has no route
//! 4. Background acknowledgement still processes the batch

use axum::http::StatusCode;
use mirror_bot::api::{self, AppState};
use mirror_bot::domain::{Address, Mint};
use mirror_bot::engine::{BuyDetector, EventDeduplicator, SwapRouter, TradeExecutor};
use mirror_bot::services::{MockAggregator, MockNotifier, MockSubmitter};
use mirror_bot::{Config, OperatorWallet, WebhookIngestor};
use serde_json::json;
use solana_sdk::signature::Keypair;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt;

const W1: &str = "W1";

struct Harness {
    app: axum::Router,
    aggregator: MockAggregator,
    submitter: MockSubmitter,
    notifier: MockNotifier,
}

fn test_config() -> Config {
    let mut env = HashMap::new();
    env.insert("PRIVATE_KEY".to_string(), "[0]".to_string());
    env.insert("MONITORED_WALLETS".to_string(), W1.to_string());
    Config::from_env_map(env).unwrap()
}

fn harness(aggregator: MockAggregator, inline: bool) -> Harness {
    let config = test_config();
    let submitter = MockSubmitter::new();
    let notifier = MockNotifier::new();

    let router = SwapRouter::new(
        Arc::new(aggregator.clone()),
        Arc::new(submitter.clone()),
        OperatorWallet::new(Keypair::new()),
        config.slippage_bps,
    )
    .with_submit_max_retries(config.submit_max_retries);
    let executor = TradeExecutor::new(router, config.funding_instruments())
        .with_notifier(Arc::new(notifier.clone()));
    let ingestor = WebhookIngestor::new(
        Arc::new(EventDeduplicator::unbounded()),
        BuyDetector::new(config.monitored_wallets.iter().cloned().map(Address::new)),
        Arc::new(executor),
    );

    Harness {
        app: api::create_router(AppState::new(Arc::new(ingestor)).with_process_inline(inline)),
        aggregator,
        submitter,
        notifier,
    }
}

fn tx_001() -> serde_json::Value {
    json!({
        "signature": "tx-001",
        "type": "SWAP",
        "source": "JUPITER",
        "accountData": [{
            "account": "TokenAccount1",
            "tokenBalanceChanges": [{
                "userAccount": W1,
                "mint": "TKN",
                "decimals": 6,
                "rawTokenAmount": "500000"
            }]
        }]
    })
}

async fn deliver(app: &axum::Router, payload: &serde_json::Value) -> String {
    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/helius")
        .header("content-type", "application/json")
        .body(axum::body::Body::from(payload.to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

#[tokio::test]
async fn test_buy_is_replicated_once_with_stable_first() {
    let h = harness(
        MockAggregator::new()
            .with_route(Mint::new(Mint::USDC), 1_000)
            .with_route(Mint::native(), 2_000),
        true,
    );

    assert_eq!(deliver(&h.app, &json!([tx_001()])).await, "OK");

    let quotes = h.aggregator.quote_calls();
    assert_eq!(quotes.len(), 1);
    assert_eq!(quotes[0].0, Mint::new(Mint::USDC));
    assert_eq!(quotes[0].1, Mint::new("TKN"));
    assert_eq!(quotes[0].2, 2_000_000);
    assert_eq!(quotes[0].3, 300);

    assert_eq!(h.submitter.submissions().len(), 1);
    let messages = h.notifier.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("TKN"));
    assert!(messages[0].contains(&h.submitter.submissions()[0].0));

    // Redelivery, as a single object this time.
    assert_eq!(deliver(&h.app, &tx_001()).await, "DUPLICATE");
    assert_eq!(h.aggregator.quote_calls().len(), 1);
    assert_eq!(h.submitter.submissions().len(), 1);
    assert_eq!(h.notifier.messages().len(), 1);
}

#[tokio::test]
async fn test_repeated_delivery_executes_once() {
    let h = harness(
        MockAggregator::new().with_route(Mint::new(Mint::USDC), 1_000),
        true,
    );

    for _ in 0..5 {
        deliver(&h.app, &json!([tx_001(), tx_001()])).await;
    }
    assert_eq!(h.submitter.submissions().len(), 1);
    assert_eq!(h.notifier.messages().len(), 1);
}

#[tokio::test]
async fn test_fallback_to_native_when_stable_has_no_route() {
    let h = harness(
        MockAggregator::new()
            .with_no_route(Mint::new(Mint::USDC))
            .with_route(Mint::native(), 2_000),
        true,
    );

    assert_eq!(deliver(&h.app, &json!([tx_001()])).await, "OK");

    let inputs: Vec<Mint> = h.aggregator.quote_calls().into_iter().map(|q| q.0).collect();
    assert_eq!(inputs, vec![Mint::new(Mint::USDC), Mint::native()]);
    assert_eq!(h.submitter.submissions().len(), 1);
    assert!(h.notifier.messages()[0].contains("SOL"));
}

#[tokio::test]
async fn test_untradeable_token_is_not_notified() {
    let h = harness(MockAggregator::new(), true);

    assert_eq!(deliver(&h.app, &json!([tx_001()])).await, "OK");
    assert_eq!(h.aggregator.quote_calls().len(), 2);
    assert!(h.submitter.submissions().is_empty());
    assert!(h.notifier.messages().is_empty());
}

#[tokio::test]
async fn test_unmonitored_and_nft_changes_are_ignored() {
    let h = harness(
        MockAggregator::new().with_route(Mint::new(Mint::USDC), 1_000),
        true,
    );

    let payload = json!([{
        "signature": "tx-ignore",
        "accountData": [{
            "account": "A",
            "tokenBalanceChanges": [
                { "userAccount": "SOMEONE", "mint": "TKN", "decimals": 6, "rawTokenAmount": "1" },
                { "userAccount": W1, "mint": "NFT", "decimals": 13, "rawTokenAmount": "1" },
                { "userAccount": W1, "mint": "SOLD", "decimals": 6, "rawTokenAmount": "-1" }
            ]
        }]
    }]);
    assert_eq!(deliver(&h.app, &payload).await, "NOT_SWAP");
    assert!(h.aggregator.quote_calls().is_empty());
}

#[tokio::test]
async fn test_background_mode_acknowledges_then_processes() {
    let h = harness(
        MockAggregator::new().with_route(Mint::new(Mint::USDC), 1_000),
        false,
    );

    assert_eq!(deliver(&h.app, &json!([tx_001()])).await, "OK");

    for _ in 0..100 {
        if !h.notifier.messages().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(h.notifier.messages().len(), 1);
}
