//! Webhook batch pipeline: dedup -> parse -> classify -> detect -> execute.

use crate::domain::{Outcome, TransactionEvent};
use crate::engine::{classify, BuyDetector, EventDeduplicator, TradeExecutor, TxKind};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn, Instrument};

/// Short status token returned to the webhook sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    Ok,
    NoTx,
    Duplicate,
    NotSwap,
    Error,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Ok => "OK",
            BatchStatus::NoTx => "NO_TX",
            BatchStatus::Duplicate => "DUPLICATE",
            BatchStatus::NotSwap => "NOT_SWAP",
            BatchStatus::Error => "ERROR",
        }
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters for one processed batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub received: usize,
    pub duplicates: usize,
    pub malformed: usize,
    pub signals: usize,
    pub executed: usize,
    pub no_route: usize,
    pub failed: usize,
}

impl BatchReport {
    pub fn status(&self) -> BatchStatus {
        if self.received == 0 {
            BatchStatus::NoTx
        } else if self.duplicates == self.received {
            BatchStatus::Duplicate
        } else if self.signals == 0 {
            BatchStatus::NotSwap
        } else {
            BatchStatus::Ok
        }
    }
}

/// Normalize a webhook body to a list of events: an array is taken as is,
/// a single object becomes a one-element batch, anything else is empty.
pub fn normalize_payload(payload: Value) -> Vec<Value> {
    match payload {
        Value::Array(events) => events,
        Value::Object(_) => vec![payload],
        _ => Vec::new(),
    }
}

pub struct WebhookIngestor {
    dedup: Arc<EventDeduplicator>,
    detector: BuyDetector,
    executor: Arc<TradeExecutor>,
}

impl WebhookIngestor {
    pub fn new(
        dedup: Arc<EventDeduplicator>,
        detector: BuyDetector,
        executor: Arc<TradeExecutor>,
    ) -> Self {
        Self {
            dedup,
            detector,
            executor,
        }
    }

    pub fn monitored_wallets(&self) -> usize {
        self.detector.monitored().len()
    }

    pub fn seen_signatures(&self) -> usize {
        self.dedup.len()
    }

    /// Process a batch sequentially. Never fails: every per-event fault is
    /// logged and counted.
    pub async fn process_batch(&self, events: Vec<Value>) -> BatchReport {
        let batch_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("batch", id = %batch_id, size = events.len());

        async move {
            let mut report = BatchReport {
                received: events.len(),
                ..Default::default()
            };
            for raw in &events {
                self.process_event(raw, &mut report).await;
            }
            info!(
                status = %report.status(),
                duplicates = report.duplicates,
                malformed = report.malformed,
                signals = report.signals,
                executed = report.executed,
                no_route = report.no_route,
                failed = report.failed,
                "Batch processed"
            );
            report
        }
        .instrument(span)
        .await
    }

    async fn process_event(&self, raw: &Value, report: &mut BatchReport) {
        let signature = match TransactionEvent::signature_of(raw) {
            Ok(signature) => signature,
            Err(e) => {
                warn!("Dropping event: {}", e);
                report.malformed += 1;
                return;
            }
        };

        // Mark before any detection or execution so a concurrent redelivery
        // is rejected rather than executed twice.
        if !self.dedup.is_new(&signature) {
            report.duplicates += 1;
            return;
        }

        let event = match TransactionEvent::from_json(raw) {
            Ok(event) => event,
            Err(e) => {
                warn!(signature = %signature, "Dropping event: {}", e);
                report.malformed += 1;
                return;
            }
        };

        let kind = classify(&event);
        match kind {
            TxKind::Unknown => warn!(
                signature = %signature,
                tx_type = ?event.tx_type,
                "Unclassified transaction, inspecting balances anyway"
            ),
            _ => debug!(signature = %signature, kind = %kind, "Classified transaction"),
        }

        let signals = self.detector.detect(&event);
        report.signals += signals.len();

        for signal in &signals {
            match self.executor.execute(signal).await {
                Outcome::Executed(_) => report.executed += 1,
                Outcome::NoRoute => report.no_route += 1,
                Outcome::Failed { .. } => report.failed += 1,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Address, FundingInstrument, Mint};
    use crate::engine::SwapRouter;
    use crate::services::{MockAggregator, MockNotifier, MockSubmitter};
    use crate::wallet::OperatorWallet;
    use serde_json::json;
    use solana_sdk::signature::Keypair;

    fn ingestor(aggregator: MockAggregator, notifier: MockNotifier) -> WebhookIngestor {
        let router = SwapRouter::new(
            Arc::new(aggregator),
            Arc::new(MockSubmitter::new()),
            OperatorWallet::new(Keypair::new()),
            300,
        );
        let executor = TradeExecutor::new(
            router,
            vec![
                FundingInstrument::new("USDC", Mint::new(Mint::USDC), 2_000_000),
                FundingInstrument::new("SOL", Mint::native(), 15_000_000),
            ],
        )
        .with_notifier(Arc::new(notifier));
        WebhookIngestor::new(
            Arc::new(EventDeduplicator::unbounded()),
            BuyDetector::new([Address::new("W1")]),
            Arc::new(executor),
        )
    }

    fn buy_event(signature: &str) -> Value {
        json!({
            "signature": signature,
            "accountData": [{
                "account": "ACC1",
                "tokenBalanceChanges": [{
                    "userAccount": "W1",
                    "mint": "TKN",
                    "decimals": 6,
                    "rawTokenAmount": "500000"
                }]
            }]
        })
    }

    #[test]
    fn test_normalize_payload() {
        assert_eq!(normalize_payload(json!([1, 2])).len(), 2);
        assert_eq!(normalize_payload(json!({ "signature": "s" })).len(), 1);
        assert!(normalize_payload(json!(null)).is_empty());
        assert!(normalize_payload(json!("text")).is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_within_batch_executes_once() {
        let notifier = MockNotifier::new();
        let ingestor = ingestor(
            MockAggregator::new().with_route(Mint::new(Mint::USDC), 10),
            notifier.clone(),
        );

        let report = ingestor
            .process_batch(vec![buy_event("tx-001"), buy_event("tx-001")])
            .await;
        assert_eq!(report.executed, 1);
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.status(), BatchStatus::Ok);
        assert_eq!(notifier.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_event_does_not_block_batch() {
        let notifier = MockNotifier::new();
        let ingestor = ingestor(
            MockAggregator::new().with_route(Mint::new(Mint::USDC), 10),
            notifier.clone(),
        );

        let report = ingestor
            .process_batch(vec![
                json!({ "accountData": [] }),
                json!(42),
                json!({ "signature": "tx-bad", "accountData": "garbage" }),
                buy_event("tx-002"),
            ])
            .await;
        assert_eq!(report.malformed, 2);
        assert_eq!(report.executed, 1);
        assert_eq!(notifier.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_extreme_raw_balance_does_not_abort_batch() {
        let notifier = MockNotifier::new();
        let ingestor = ingestor(
            MockAggregator::new().with_route(Mint::new(Mint::USDC), 10),
            notifier.clone(),
        );

        let extreme = json!({
            "transaction": { "signatures": ["raw-extreme"], "message": { "accountKeys": ["K0"] } },
            "meta": {
                "preTokenBalances": [{ "accountIndex": 0, "owner": "W9", "mint": "TKN",
                    "uiTokenAmount": { "amount": "-170141183460469231731687303715884105728", "decimals": 6 } }],
                "postTokenBalances": [{ "accountIndex": 0, "owner": "W9", "mint": "TKN",
                    "uiTokenAmount": { "amount": "1", "decimals": 6 } }]
            }
        });

        let report = ingestor
            .process_batch(vec![extreme, buy_event("good")])
            .await;
        assert_eq!(report.executed, 1);
        assert_eq!(notifier.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_status_tokens() {
        let ingestor = ingestor(MockAggregator::new(), MockNotifier::new());

        assert_eq!(ingestor.process_batch(vec![]).await.status(), BatchStatus::NoTx);
        assert_eq!(
            ingestor
                .process_batch(vec![json!({ "signature": "tx-none" })])
                .await
                .status(),
            BatchStatus::NotSwap
        );
        assert_eq!(
            ingestor
                .process_batch(vec![json!({ "signature": "tx-none" })])
                .await
                .status(),
            BatchStatus::Duplicate
        );

        let report = ingestor.process_batch(vec![buy_event("tx-nr")]).await;
        assert_eq!(report.no_route, 1);
        assert_eq!(report.status(), BatchStatus::Ok);
    }
}
