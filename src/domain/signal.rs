//! Buy signals and the trade outcomes they produce.

use super::{Address, Mint, TxSignature};
use rust_decimal::Decimal;
use serde::Serialize;

/// A monitored wallet received a fungible token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuySignal {
    pub wallet: Address,
    pub mint: Mint,
    /// Amount received, in base units.
    pub amount: u128,
    pub decimals: u8,
    /// Transaction the signal was detected in.
    pub source_signature: TxSignature,
}

impl BuySignal {
    /// Amount in whole-token units, if it fits a Decimal.
    pub fn ui_amount(&self) -> Option<Decimal> {
        let raw = i64::try_from(self.amount).ok()?;
        Decimal::try_from_i128_with_scale(i128::from(raw), u32::from(self.decimals)).ok()
    }
}

/// A funding asset and the fixed notional spent from it per replication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FundingInstrument {
    pub label: String,
    pub mint: Mint,
    /// Input amount in base units of `mint`.
    pub amount: u64,
}

impl FundingInstrument {
    pub fn new(label: impl Into<String>, mint: Mint, amount: u64) -> Self {
        Self {
            label: label.into(),
            mint,
            amount,
        }
    }
}

/// Result of one funding-route attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptResult {
    Submitted { reference: String },
    /// The instrument is the target token itself.
    Skipped,
    NoQuote,
    QuoteFailed(String),
    BuildFailed(String),
    SubmitFailed(String),
}

/// Transient record of one funding-route attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapAttempt {
    pub instrument: FundingInstrument,
    pub output_mint: Mint,
    pub slippage_bps: u16,
    pub result: AttemptResult,
}

/// A submitted replication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settlement {
    /// Ledger signature of the submitted swap.
    pub reference: String,
    pub instrument: FundingInstrument,
    pub output_mint: Mint,
    pub out_amount_estimate: u64,
}

/// Terminal state of one buy signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Executed(Settlement),
    NoRoute,
    Failed { reason: String },
}

impl Outcome {
    pub fn is_executed(&self) -> bool {
        matches!(self, Outcome::Executed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_ui_amount_applies_decimals() {
        let signal = BuySignal {
            wallet: Address::new("W1"),
            mint: Mint::new("TKN"),
            amount: 500_000,
            decimals: 6,
            source_signature: TxSignature::new("tx-001"),
        };
        assert_eq!(signal.ui_amount(), Some(Decimal::from_str("0.5").unwrap()));
    }

    #[test]
    fn test_ui_amount_out_of_range() {
        let signal = BuySignal {
            wallet: Address::new("W1"),
            mint: Mint::new("TKN"),
            amount: u128::MAX,
            decimals: 6,
            source_signature: TxSignature::new("tx-001"),
        };
        assert_eq!(signal.ui_amount(), None);
    }
}
