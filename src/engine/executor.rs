//! Replicates detected buys through the swap router.

use super::router::SwapRouter;
use crate::domain::{BuySignal, FundingInstrument, Outcome, Settlement};
use crate::services::{Notifier, TokenInfo, TokenInfoSource};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

pub struct TradeExecutor {
    router: SwapRouter,
    instruments: Vec<FundingInstrument>,
    notifier: Option<Arc<dyn Notifier>>,
    token_info: Option<Arc<dyn TokenInfoSource>>,
    /// Serializes swaps spending from the operator balance.
    lane: Mutex<()>,
}

impl TradeExecutor {
    /// `instruments` is the fallback order, e.g. stable asset then native.
    pub fn new(router: SwapRouter, instruments: Vec<FundingInstrument>) -> Self {
        Self {
            router,
            instruments,
            notifier: None,
            token_info: None,
            lane: Mutex::new(()),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_token_info(mut self, token_info: Arc<dyn TokenInfoSource>) -> Self {
        self.token_info = Some(token_info);
        self
    }

    pub fn instruments(&self) -> &[FundingInstrument] {
        &self.instruments
    }

    /// Detected -> Routing -> {Executed | NoRoute | Failed}, in one pass.
    pub async fn execute(&self, signal: &BuySignal) -> Outcome {
        info!(
            wallet = %signal.wallet,
            mint = %signal.mint,
            amount = %signal.amount,
            source = %signal.source_signature,
            "Replicating buy"
        );

        let routed = {
            let _lane = self.lane.lock().await;
            self.router.route(&signal.mint, &self.instruments).await
        };

        let outcome = match routed {
            Ok(report) => match report.settlement {
                Some(settlement) => Outcome::Executed(settlement),
                None => {
                    info!(
                        mint = %signal.mint,
                        attempts = report.attempts.len(),
                        "No route for any funding instrument"
                    );
                    Outcome::NoRoute
                }
            },
            Err(e) => {
                error!(mint = %signal.mint, "Replication failed: {}", e);
                Outcome::Failed {
                    reason: e.to_string(),
                }
            }
        };

        if let Outcome::Executed(settlement) = &outcome {
            self.notify_executed(signal, settlement).await;
        }
        outcome
    }

    async fn notify_executed(&self, signal: &BuySignal, settlement: &Settlement) {
        let Some(notifier) = &self.notifier else {
            return;
        };

        let info = match &self.token_info {
            Some(source) => source.token_info(&signal.mint).await.unwrap_or_else(|e| {
                warn!(mint = %signal.mint, "Token info unavailable: {}", e);
                TokenInfo::default()
            }),
            None => TokenInfo::default(),
        };

        let message = format_executed(signal, settlement, &info);
        if let Err(e) = notifier.notify(&message).await {
            warn!(reference = %settlement.reference, "Notification failed: {}", e);
        }
    }
}

fn or_na(value: Option<Decimal>) -> String {
    value
        .map(|v| v.round_dp(6).normalize().to_string())
        .unwrap_or_else(|| "N/A".to_string())
}

/// Escape the entity markers of Telegram's legacy Markdown.
fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Markdown notification for a replicated buy.
pub fn format_executed(signal: &BuySignal, settlement: &Settlement, info: &TokenInfo) -> String {
    let symbol = escape_markdown(info.symbol.as_deref().unwrap_or("???"));
    let source_amount = signal
        .ui_amount()
        .map(|a| a.normalize().to_string())
        .unwrap_or_else(|| signal.amount.to_string());

    format!(
        "*Copy trade executed*\n\n\
         Token: *${symbol}*\n\
         Mint: `{mint}`\n\
         Source wallet: `{wallet}` bought {source_amount}\n\n\
         Price: ${price}\n\
         Market cap: ${mc}\n\
         Liquidity: ${liquidity}\n\
         Volume (5m): ${volume}\n\n\
         Paid: {paid} {instrument} (raw)\n\
         Tx: https://solscan.io/tx/{reference}\n\
         _{time}_",
        mint = signal.mint,
        wallet = signal.wallet,
        price = or_na(info.price),
        mc = or_na(info.market_cap),
        liquidity = or_na(info.liquidity),
        volume = or_na(info.volume_5m),
        paid = settlement.instrument.amount,
        instrument = settlement.instrument.label,
        reference = settlement.reference,
        time = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
    )
}
