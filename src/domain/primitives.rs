//! Domain primitives: Address, Mint, TxSignature.

use serde::{Deserialize, Serialize};

/// Wallet (owner) address, base58 encoded.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(pub String);

impl Address {
    /// Create an Address from a string.
    pub fn new(addr: impl Into<String>) -> Self {
        Address(addr.into())
    }

    /// Get the address as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Token mint address.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Mint(pub String);

impl Mint {
    /// Wrapped SOL, the ledger's native asset as seen by swap aggregators.
    pub const NATIVE: &'static str = "So11111111111111111111111111111111111111112";
    /// USDC.
    pub const USDC: &'static str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

    pub fn new(mint: impl Into<String>) -> Self {
        Mint(mint.into())
    }

    pub fn native() -> Self {
        Mint(Self::NATIVE.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Mint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transaction signature as delivered by the webhook sender.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxSignature(pub String);

impl TxSignature {
    pub fn new(sig: impl Into<String>) -> Self {
        TxSignature(sig.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TxSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
