//! Mock services for testing without network calls.

use super::{
    LedgerSubmitter, Notifier, Quote, ServiceError, SwapAggregator, TokenInfo, TokenInfoSource,
};
use crate::domain::Mint;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use solana_sdk::message::{Message, VersionedMessage};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::VersionedTransaction;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

/// How the mock aggregator answers a quote for one input mint.
#[derive(Debug, Clone)]
pub enum QuoteBehavior {
    Route { out_amount: u64 },
    NoRoute,
    Fail(ServiceError),
}

/// Mock aggregator with per-input-mint quote behavior. Unknown input mints
/// have no route. Built transactions are real unsigned legacy transactions
/// whose fee payer is the requested signer.
#[derive(Debug, Clone, Default)]
pub struct MockAggregator {
    behaviors: HashMap<Mint, QuoteBehavior>,
    build_error: Option<ServiceError>,
    quote_calls: Arc<Mutex<Vec<(Mint, Mint, u64, u16)>>>,
    build_calls: Arc<Mutex<Vec<String>>>,
}

impl MockAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Quotes from `input` succeed with `out_amount`.
    pub fn with_route(mut self, input: Mint, out_amount: u64) -> Self {
        self.behaviors
            .insert(input, QuoteBehavior::Route { out_amount });
        self
    }

    /// Quotes from `input` return no route.
    pub fn with_no_route(mut self, input: Mint) -> Self {
        self.behaviors.insert(input, QuoteBehavior::NoRoute);
        self
    }

    /// Quotes from `input` fail with `error`.
    pub fn with_quote_error(mut self, input: Mint, error: ServiceError) -> Self {
        self.behaviors.insert(input, QuoteBehavior::Fail(error));
        self
    }

    /// Every build request fails with `error`.
    pub fn with_build_error(mut self, error: ServiceError) -> Self {
        self.build_error = Some(error);
        self
    }

    /// Recorded quote requests as (input, output, amount, slippage_bps).
    pub fn quote_calls(&self) -> Vec<(Mint, Mint, u64, u16)> {
        self.quote_calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Signers of recorded build requests.
    pub fn build_calls(&self) -> Vec<String> {
        self.build_calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl SwapAggregator for MockAggregator {
    async fn quote(
        &self,
        input: &Mint,
        output: &Mint,
        amount: u64,
        slippage_bps: u16,
    ) -> Result<Option<Quote>, ServiceError> {
        if let Ok(mut calls) = self.quote_calls.lock() {
            calls.push((input.clone(), output.clone(), amount, slippage_bps));
        }

        match self.behaviors.get(input) {
            Some(QuoteBehavior::Route { out_amount }) => Ok(Some(Quote {
                input_mint: input.clone(),
                output_mint: output.clone(),
                in_amount: amount,
                out_amount: *out_amount,
                price_impact_pct: Some("0".to_string()),
                route: serde_json::json!({
                    "inputMint": input.as_str(),
                    "outputMint": output.as_str(),
                    "inAmount": amount.to_string(),
                    "outAmount": out_amount.to_string(),
                }),
            })),
            Some(QuoteBehavior::Fail(e)) => Err(e.clone()),
            Some(QuoteBehavior::NoRoute) | None => Ok(None),
        }
    }

    async fn build_swap_transaction(
        &self,
        _quote: &Quote,
        signer: &str,
    ) -> Result<String, ServiceError> {
        if let Ok(mut calls) = self.build_calls.lock() {
            calls.push(signer.to_string());
        }
        if let Some(e) = &self.build_error {
            return Err(e.clone());
        }

        let payer = Pubkey::from_str(signer).map_err(|e| ServiceError::Rejected(e.to_string()))?;
        let message = Message::new(&[], Some(&payer));
        let transaction = VersionedTransaction {
            signatures: vec![
                Signature::default();
                usize::from(message.header.num_required_signatures)
            ],
            message: VersionedMessage::Legacy(message),
        };
        let bytes =
            bincode::serialize(&transaction).map_err(|e| ServiceError::Parse(e.to_string()))?;
        Ok(STANDARD.encode(bytes))
    }
}

/// Mock ledger submitter. Returns the transaction's first signature as the
/// settlement reference.
#[derive(Debug, Clone, Default)]
pub struct MockSubmitter {
    error: Option<ServiceError>,
    submissions: Arc<Mutex<Vec<(String, usize)>>>,
}

impl MockSubmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every submission fails with `error`, as if retries were exhausted.
    pub fn failing(error: ServiceError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }

    /// Recorded submissions as (signature, max_retries).
    pub fn submissions(&self) -> Vec<(String, usize)> {
        self.submissions.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LedgerSubmitter for MockSubmitter {
    async fn submit(
        &self,
        transaction: &VersionedTransaction,
        max_retries: usize,
    ) -> Result<String, ServiceError> {
        let signature = transaction
            .signatures
            .first()
            .map(|s| s.to_string())
            .unwrap_or_default();
        if let Ok(mut submissions) = self.submissions.lock() {
            submissions.push((signature.clone(), max_retries));
        }
        match &self.error {
            Some(e) => Err(e.clone()),
            None => Ok(signature),
        }
    }
}

/// Mock notifier that records messages.
#[derive(Debug, Clone, Default)]
pub struct MockNotifier {
    fail: bool,
    messages: Arc<Mutex<Vec<String>>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records messages but reports every delivery as failed.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().map(|m| m.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn notify(&self, message: &str) -> Result<(), ServiceError> {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message.to_string());
        }
        if self.fail {
            return Err(ServiceError::Network("notifier unreachable".to_string()));
        }
        Ok(())
    }
}

/// Mock token info source returning a fixed overview.
#[derive(Debug, Clone, Default)]
pub struct MockTokenInfo {
    info: Option<TokenInfo>,
}

impl MockTokenInfo {
    pub fn new(info: TokenInfo) -> Self {
        Self { info: Some(info) }
    }

    /// Every lookup fails.
    pub fn unavailable() -> Self {
        Self { info: None }
    }
}

#[async_trait]
impl TokenInfoSource for MockTokenInfo {
    async fn token_info(&self, _mint: &Mint) -> Result<TokenInfo, ServiceError> {
        self.info
            .clone()
            .ok_or_else(|| ServiceError::Http {
                status: 404,
                message: "token not found".to_string(),
            })
    }
}
