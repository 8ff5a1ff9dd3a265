//! Buy detection over per-account token balance changes.

use crate::domain::{Address, BuySignal, TransactionEvent};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Extracts buy signals for a fixed set of monitored wallets.
#[derive(Debug, Clone)]
pub struct BuyDetector {
    monitored: Arc<HashSet<Address>>,
}

impl BuyDetector {
    pub fn new(wallets: impl IntoIterator<Item = Address>) -> Self {
        Self {
            monitored: Arc::new(wallets.into_iter().collect()),
        }
    }

    pub fn monitored(&self) -> &HashSet<Address> {
        &self.monitored
    }

    pub fn detect(&self, event: &TransactionEvent) -> Vec<BuySignal> {
        detect_buys(event, &self.monitored)
    }
}

/// A change is a buy iff it is fungible, positive, and owned by a monitored
/// wallet. Output keeps the event's delta/change order.
pub fn detect_buys(event: &TransactionEvent, monitored: &HashSet<Address>) -> Vec<BuySignal> {
    let signals: Vec<BuySignal> = event
        .account_deltas
        .iter()
        .flat_map(|delta| delta.token_balance_changes.iter())
        .filter(|change| change.is_fungible())
        .filter(|change| change.raw_amount > 0)
        .filter(|change| monitored.contains(&change.user_account))
        .filter_map(|change| {
            Some(BuySignal {
                wallet: change.user_account.clone(),
                mint: change.mint.clone(),
                amount: u128::try_from(change.raw_amount).ok()?,
                decimals: change.decimals,
                source_signature: event.signature.clone(),
            })
        })
        .collect();

    debug!(
        signature = %event.signature,
        signals = signals.len(),
        "Buy detection complete"
    );
    signals
}
