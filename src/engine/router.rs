//! Ordered-fallback swap routing.
//!
//! Each funding instrument is tried once, in order. A missing quote, a
//! failed quote request or a failed build advances to the next instrument;
//! nothing has been signed at that point. Once a transaction is signed and
//! handed to the submitter the router stops: either it settles, or the
//! failure is surfaced without trying another instrument, since a failed
//! submission may still land.

use crate::domain::{AttemptResult, FundingInstrument, Mint, Settlement, SwapAttempt};
use crate::services::{LedgerSubmitter, ServiceError, SwapAggregator};
use crate::wallet::{OperatorWallet, WalletError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const DEFAULT_SUBMIT_MAX_RETRIES: usize = 5;

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("signing failed for {instrument}: {source}")]
    Signing {
        instrument: String,
        #[source]
        source: WalletError,
    },
    #[error("submission failed for {instrument}: {source}")]
    Submission {
        instrument: String,
        #[source]
        source: ServiceError,
    },
}

/// What a routing call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteReport {
    /// `None` means no instrument had a route.
    pub settlement: Option<Settlement>,
    pub attempts: Vec<SwapAttempt>,
}

#[derive(Clone)]
pub struct SwapRouter {
    aggregator: Arc<dyn SwapAggregator>,
    submitter: Arc<dyn LedgerSubmitter>,
    wallet: OperatorWallet,
    slippage_bps: u16,
    submit_max_retries: usize,
}

impl SwapRouter {
    pub fn new(
        aggregator: Arc<dyn SwapAggregator>,
        submitter: Arc<dyn LedgerSubmitter>,
        wallet: OperatorWallet,
        slippage_bps: u16,
    ) -> Self {
        Self {
            aggregator,
            submitter,
            wallet,
            slippage_bps,
            submit_max_retries: DEFAULT_SUBMIT_MAX_RETRIES,
        }
    }

    pub fn with_submit_max_retries(mut self, max_retries: usize) -> Self {
        self.submit_max_retries = max_retries;
        self
    }

    /// Buy `output` with the first instrument that yields a settlement.
    pub async fn route(
        &self,
        output: &Mint,
        instruments: &[FundingInstrument],
    ) -> Result<RouteReport, RouteError> {
        let mut attempts = Vec::with_capacity(instruments.len());

        for instrument in instruments {
            let mut record = |result: AttemptResult| {
                attempts.push(SwapAttempt {
                    instrument: instrument.clone(),
                    output_mint: output.clone(),
                    slippage_bps: self.slippage_bps,
                    result,
                });
            };

            if &instrument.mint == output {
                debug!(instrument = %instrument.label, "Skipping instrument equal to target");
                record(AttemptResult::Skipped);
                continue;
            }

            let quote = match self
                .aggregator
                .quote(&instrument.mint, output, instrument.amount, self.slippage_bps)
                .await
            {
                Ok(Some(quote)) if quote.out_amount > 0 => quote,
                Ok(_) => {
                    info!(instrument = %instrument.label, mint = %output, "No route");
                    record(AttemptResult::NoQuote);
                    continue;
                }
                Err(e) => {
                    warn!(instrument = %instrument.label, mint = %output, "Quote failed: {}", e);
                    record(AttemptResult::QuoteFailed(e.to_string()));
                    continue;
                }
            };

            let encoded = match self
                .aggregator
                .build_swap_transaction(&quote, &self.wallet.address())
                .await
            {
                Ok(encoded) => encoded,
                Err(e) => {
                    warn!(instrument = %instrument.label, mint = %output, "Build failed: {}", e);
                    record(AttemptResult::BuildFailed(e.to_string()));
                    continue;
                }
            };

            let transaction =
                self.wallet
                    .sign_encoded(&encoded)
                    .map_err(|source| RouteError::Signing {
                        instrument: instrument.label.clone(),
                        source,
                    })?;

            return match self
                .submitter
                .submit(&transaction, self.submit_max_retries)
                .await
            {
                Ok(reference) => {
                    info!(
                        instrument = %instrument.label,
                        mint = %output,
                        reference = %reference,
                        in_amount = quote.in_amount,
                        out_amount = quote.out_amount,
                        price_impact_pct = quote.price_impact_pct.as_deref().unwrap_or("?"),
                        "Swap submitted"
                    );
                    record(AttemptResult::Submitted {
                        reference: reference.clone(),
                    });
                    Ok(RouteReport {
                        settlement: Some(Settlement {
                            reference,
                            instrument: instrument.clone(),
                            output_mint: output.clone(),
                            out_amount_estimate: quote.out_amount,
                        }),
                        attempts,
                    })
                }
                Err(source) => {
                    record(AttemptResult::SubmitFailed(source.to_string()));
                    Err(RouteError::Submission {
                        instrument: instrument.label.clone(),
                        source,
                    })
                }
            };
        }

        Ok(RouteReport {
            settlement: None,
            attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{MockAggregator, MockSubmitter};
    use solana_sdk::signature::Keypair;

    fn usdc() -> Mint {
        Mint::new(Mint::USDC)
    }

    fn instruments() -> Vec<FundingInstrument> {
        vec![
            FundingInstrument::new("USDC", usdc(), 2_000_000),
            FundingInstrument::new("SOL", Mint::native(), 15_000_000),
        ]
    }

    fn router(aggregator: MockAggregator, submitter: MockSubmitter) -> SwapRouter {
        SwapRouter::new(
            Arc::new(aggregator),
            Arc::new(submitter),
            OperatorWallet::new(Keypair::new()),
            300,
        )
    }

    #[tokio::test]
    async fn test_first_instrument_short_circuits() {
        let aggregator = MockAggregator::new()
            .with_route(usdc(), 1_000)
            .with_route(Mint::native(), 2_000);
        let submitter = MockSubmitter::new();
        let report = router(aggregator.clone(), submitter.clone())
            .route(&Mint::new("TKN"), &instruments())
            .await
            .unwrap();

        let settlement = report.settlement.unwrap();
        assert_eq!(settlement.instrument.label, "USDC");
        assert_eq!(settlement.out_amount_estimate, 1_000);
        assert_eq!(aggregator.quote_calls().len(), 1);
        assert_eq!(submitter.submissions().len(), 1);
        assert_eq!(submitter.submissions()[0].1, DEFAULT_SUBMIT_MAX_RETRIES);
        assert_eq!(settlement.reference, submitter.submissions()[0].0);
    }

    #[tokio::test]
    async fn test_falls_back_without_retrying_first_instrument() {
        let aggregator = MockAggregator::new()
            .with_no_route(usdc())
            .with_route(Mint::native(), 2_000);
        let report = router(aggregator.clone(), MockSubmitter::new())
            .route(&Mint::new("TKN"), &instruments())
            .await
            .unwrap();

        assert_eq!(report.settlement.unwrap().instrument.label, "SOL");
        let inputs: Vec<Mint> = aggregator.quote_calls().into_iter().map(|c| c.0).collect();
        assert_eq!(inputs, vec![usdc(), Mint::native()]);
        assert_eq!(report.attempts[0].result, AttemptResult::NoQuote);
        assert_eq!(report.attempts[0].slippage_bps, 300);
    }

    #[tokio::test]
    async fn test_zero_output_quote_is_no_route() {
        let aggregator = MockAggregator::new()
            .with_route(usdc(), 0)
            .with_route(Mint::native(), 5);
        let submitter = MockSubmitter::new();
        let report = router(aggregator.clone(), submitter.clone())
            .route(&Mint::new("TKN"), &instruments())
            .await
            .unwrap();

        assert_eq!(report.attempts[0].result, AttemptResult::NoQuote);
        assert_eq!(report.settlement.unwrap().instrument.label, "SOL");
        assert_eq!(aggregator.build_calls().len(), 1);
        assert_eq!(submitter.submissions().len(), 1);
    }

    #[tokio::test]
    async fn test_quote_and_build_errors_advance() {
        let aggregator = MockAggregator::new()
            .with_quote_error(usdc(), ServiceError::Network("timeout".into()))
            .with_no_route(Mint::native());
        let report = router(aggregator, MockSubmitter::new())
            .route(&Mint::new("TKN"), &instruments())
            .await
            .unwrap();
        assert!(report.settlement.is_none());
        assert!(matches!(report.attempts[0].result, AttemptResult::QuoteFailed(_)));

        let aggregator = MockAggregator::new()
            .with_route(usdc(), 1)
            .with_route(Mint::native(), 1)
            .with_build_error(ServiceError::Http {
                status: 500,
                message: "oops".into(),
            });
        let submitter = MockSubmitter::new();
        let report = router(aggregator.clone(), submitter.clone())
            .route(&Mint::new("TKN"), &instruments())
            .await
            .unwrap();
        assert!(report.settlement.is_none());
        assert_eq!(aggregator.build_calls().len(), 2);
        assert!(submitter.submissions().is_empty());
    }

    #[tokio::test]
    async fn test_no_instruments_route_is_no_route() {
        let report = router(MockAggregator::new(), MockSubmitter::new())
            .route(&Mint::new("TKN"), &instruments())
            .await
            .unwrap();
        assert!(report.settlement.is_none());
        assert_eq!(report.attempts.len(), 2);
    }

    #[tokio::test]
    async fn test_submission_failure_does_not_fall_back() {
        let aggregator = MockAggregator::new()
            .with_route(usdc(), 1)
            .with_route(Mint::native(), 1);
        let submitter = MockSubmitter::failing(ServiceError::Network("congested".into()));
        let err = router(aggregator.clone(), submitter.clone())
            .route(&Mint::new("TKN"), &instruments())
            .await
            .unwrap_err();

        assert!(matches!(err, RouteError::Submission { ref instrument, .. } if instrument == "USDC"));
        assert_eq!(aggregator.quote_calls().len(), 1);
        assert_eq!(submitter.submissions().len(), 1);
    }

    #[tokio::test]
    async fn test_target_equal_to_instrument_is_skipped() {
        let aggregator = MockAggregator::new()
            .with_route(usdc(), 1)
            .with_route(Mint::native(), 5);
        let report = router(aggregator.clone(), MockSubmitter::new())
            .route(&usdc(), &instruments())
            .await
            .unwrap();

        assert_eq!(report.attempts[0].result, AttemptResult::Skipped);
        assert_eq!(report.settlement.unwrap().instrument.label, "SOL");
        assert_eq!(aggregator.quote_calls().len(), 1);
    }
}
