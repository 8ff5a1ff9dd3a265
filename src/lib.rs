pub mod api;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;
pub mod services;
pub mod wallet;

pub use config::Config;
pub use domain::{
    AccountDelta, Address, BuySignal, FundingInstrument, Mint, Outcome, Settlement,
    TokenBalanceChange, TransactionEvent, TxSignature,
};
pub use engine::{BuyDetector, EventDeduplicator, SwapRouter, TradeExecutor};
pub use error::AppError;
pub use orchestration::{BatchReport, BatchStatus, WebhookIngestor};
pub use services::{LedgerSubmitter, Notifier, ServiceError, SwapAggregator, TokenInfoSource};
pub use wallet::OperatorWallet;
