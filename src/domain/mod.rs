//! Domain types for the copy-trading pipeline.
//!
//! This module provides:
//! - Primitives: Address, Mint, TxSignature
//! - The inbound event model with lenient JSON parsing
//! - Buy signals, funding instruments and trade outcomes

pub mod event;
pub mod primitives;
pub mod signal;

pub use event::{
    AccountDelta, EventParseError, TokenBalanceChange, TransactionEvent, MAX_FUNGIBLE_DECIMALS,
};
pub use primitives::{Address, Mint, TxSignature};
pub use signal::{AttemptResult, BuySignal, FundingInstrument, Outcome, Settlement, SwapAttempt};
