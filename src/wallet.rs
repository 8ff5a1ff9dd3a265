//! Operator signing key.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use solana_sdk::signature::{Keypair, Signer};
use solana_sdk::transaction::VersionedTransaction;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("Invalid private key: {0}")]
    InvalidKey(String),
    #[error("Invalid transaction encoding: {0}")]
    Decode(String),
    #[error("Signing failed: {0}")]
    Signing(String),
}

/// The operator's keypair. Read-only after load; signing needs no locking.
#[derive(Clone)]
pub struct OperatorWallet {
    keypair: Arc<Keypair>,
}

impl OperatorWallet {
    pub fn new(keypair: Keypair) -> Self {
        Self {
            keypair: Arc::new(keypair),
        }
    }

    /// Load from a JSON array of 64 secret-key bytes (the `solana-keygen`
    /// file format).
    pub fn from_json_bytes(raw: &str) -> Result<Self, WalletError> {
        let bytes: Vec<u8> =
            serde_json::from_str(raw.trim()).map_err(|e| WalletError::InvalidKey(e.to_string()))?;
        let keypair =
            Keypair::from_bytes(&bytes).map_err(|e| WalletError::InvalidKey(e.to_string()))?;
        Ok(Self::new(keypair))
    }

    pub fn address(&self) -> String {
        self.keypair.pubkey().to_string()
    }

    /// Decode a base64 serialized transaction and sign it as the operator.
    pub fn sign_encoded(&self, encoded: &str) -> Result<VersionedTransaction, WalletError> {
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| WalletError::Decode(e.to_string()))?;
        let unsigned: VersionedTransaction =
            bincode::deserialize(&bytes).map_err(|e| WalletError::Decode(e.to_string()))?;
        VersionedTransaction::try_new(unsigned.message, &[self.keypair.as_ref()])
            .map_err(|e| WalletError::Signing(e.to_string()))
    }
}

impl fmt::Debug for OperatorWallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorWallet")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}
