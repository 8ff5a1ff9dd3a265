//! External services consumed by the pipeline: swap aggregator, ledger
//! broadcast, operator notifications and token metadata.

use crate::domain::Mint;
use async_trait::async_trait;
use rust_decimal::Decimal;
use solana_sdk::transaction::VersionedTransaction;
use std::fmt;
use thiserror::Error;

pub mod birdeye;
pub mod jupiter;
pub mod mock;
pub mod retry;
pub mod rpc;
pub mod telegram;

pub use birdeye::BirdeyeClient;
pub use jupiter::JupiterClient;
pub use mock::{MockAggregator, MockNotifier, MockSubmitter, MockTokenInfo};
pub use rpc::RpcSubmitter;
pub use telegram::TelegramNotifier;

/// A price quote for swapping `in_amount` of one mint into another.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub input_mint: Mint,
    pub output_mint: Mint,
    pub in_amount: u64,
    /// Estimated output in base units of `output_mint`.
    pub out_amount: u64,
    pub price_impact_pct: Option<String>,
    /// Opaque route plan, handed back to the aggregator when building.
    pub route: serde_json::Value,
}

/// Swap quote and transaction-building service.
#[async_trait]
pub trait SwapAggregator: Send + Sync + fmt::Debug {
    /// Quote `amount` of `input` into `output`.
    ///
    /// # Returns
    /// `None` when no route with a usable output exists.
    async fn quote(
        &self,
        input: &Mint,
        output: &Mint,
        amount: u64,
        slippage_bps: u16,
    ) -> Result<Option<Quote>, ServiceError>;

    /// Build the unsigned swap transaction for a quote.
    ///
    /// # Returns
    /// The base64-encoded serialized transaction, to be signed by `signer`.
    async fn build_swap_transaction(
        &self,
        quote: &Quote,
        signer: &str,
    ) -> Result<String, ServiceError>;
}

/// Ledger broadcast.
#[async_trait]
pub trait LedgerSubmitter: Send + Sync {
    /// Submit a signed transaction, retrying transient failures at most
    /// `max_retries` times in total.
    ///
    /// # Returns
    /// The transaction signature (settlement reference).
    async fn submit(
        &self,
        transaction: &VersionedTransaction,
        max_retries: usize,
    ) -> Result<String, ServiceError>;
}

/// Best-effort operator notification channel.
#[async_trait]
pub trait Notifier: Send + Sync + fmt::Debug {
    async fn notify(&self, message: &str) -> Result<(), ServiceError>;
}

/// Token market overview used to enrich notifications.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenInfo {
    pub symbol: Option<String>,
    pub price: Option<Decimal>,
    pub market_cap: Option<Decimal>,
    pub liquidity: Option<Decimal>,
    pub volume_5m: Option<Decimal>,
}

#[async_trait]
pub trait TokenInfoSource: Send + Sync + fmt::Debug {
    async fn token_info(&self, mint: &Mint) -> Result<TokenInfo, ServiceError>;
}

/// Error type for external service calls.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    /// Connection failure, timeout, DNS.
    #[error("Network error: {0}")]
    Network(String),
    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Rate limited")]
    RateLimited,
    /// The remote side refused the request (e.g. preflight failure).
    #[error("Rejected: {0}")]
    Rejected(String),
}

impl ServiceError {
    /// Whether repeating the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ServiceError::Network(_) | ServiceError::RateLimited => true,
            ServiceError::Http { status, .. } => *status >= 500,
            ServiceError::Parse(_) | ServiceError::Rejected(_) => false,
        }
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) if status.as_u16() == 429 => ServiceError::RateLimited,
            Some(status) => ServiceError::Http {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None if err.is_decode() => ServiceError::Parse(err.to_string()),
            None => ServiceError::Network(err.to_string()),
        }
    }
}
