//! Transaction broadcast through a Solana JSON-RPC node.

use super::retry::retry_bounded;
use super::{LedgerSubmitter, ServiceError};
use async_trait::async_trait;
use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcSendTransactionConfig;
use solana_sdk::transaction::VersionedTransaction;
use std::fmt;
use std::time::Duration;
use tracing::debug;

pub struct RpcSubmitter {
    client: RpcClient,
    retry_interval: Duration,
}

impl RpcSubmitter {
    pub fn new(rpc_url: String, timeout: Duration) -> Self {
        Self {
            client: RpcClient::new_with_timeout(rpc_url, timeout),
            retry_interval: Duration::from_millis(250),
        }
    }
}

impl fmt::Debug for RpcSubmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcSubmitter")
            .field("url", &self.client.url())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl LedgerSubmitter for RpcSubmitter {
    async fn submit(
        &self,
        transaction: &VersionedTransaction,
        max_retries: usize,
    ) -> Result<String, ServiceError> {
        // The node rebroadcasts on its side as well; preflight is skipped
        // because the aggregator already simulated the route.
        let config = RpcSendTransactionConfig {
            skip_preflight: true,
            max_retries: Some(max_retries),
            ..Default::default()
        };

        let signature = retry_bounded(max_retries, self.retry_interval, move || async move {
            self.client
                .send_transaction_with_config(transaction, config)
                .await
                .map_err(map_client_error)
        })
        .await?;

        debug!("Submitted transaction {}", signature);
        Ok(signature.to_string())
    }
}

fn map_client_error(err: ClientError) -> ServiceError {
    match err.kind() {
        ClientErrorKind::Io(_) | ClientErrorKind::Reqwest(_) => {
            ServiceError::Network(err.to_string())
        }
        ClientErrorKind::SerdeJson(_) => ServiceError::Parse(err.to_string()),
        _ => ServiceError::Rejected(err.to_string()),
    }
}
