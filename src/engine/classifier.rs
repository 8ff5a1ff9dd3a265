//! Best-effort classification of what kind of transaction an event is.
//!
//! Informational only: detection never depends on it, so a misclassified
//! swap cannot hide a buy.

use crate::domain::TransactionEvent;
use std::fmt;

/// Known swap venues, matched on exact program ids.
const VENUE_PROGRAMS: [(&str, Venue); 5] = [
    ("JUP6LkbZbjS1jKKwapdHNy74zcZ3tLUZoi5QNyVTaV4", Venue::Jupiter),
    ("675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8", Venue::Raydium),
    ("CAMMCzo5YL8w4VFF8KVHrK22GGUsp5VTaW7grrKgrWqK", Venue::Raydium),
    ("whirLbMiicVdio4qvUfM5KAg6Ct8VwpYzGff3uctyCc", Venue::Orca),
    ("6EF8rrecthR5Dkzon8Nwu78hRvfCKubJ14M5uBEwF6P", Venue::PumpFun),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Venue {
    Jupiter,
    Raydium,
    Orca,
    PumpFun,
    Other,
}

impl Venue {
    fn from_source(source: &str) -> Self {
        match source.to_ascii_uppercase().as_str() {
            "JUPITER" => Venue::Jupiter,
            s if s.starts_with("RAYDIUM") => Venue::Raydium,
            s if s.starts_with("ORCA") => Venue::Orca,
            "PUMP_FUN" | "PUMP_AMM" => Venue::PumpFun,
            _ => Venue::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxKind {
    Swap(Venue),
    Transfer,
    Unknown,
}

impl fmt::Display for TxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxKind::Swap(venue) => write!(f, "swap({:?})", venue),
            TxKind::Transfer => write!(f, "transfer"),
            TxKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// Classify from the upstream type tag first, then from instruction
/// program ids.
pub fn classify(event: &TransactionEvent) -> TxKind {
    let venue_from_source = || {
        event
            .source
            .as_deref()
            .map(Venue::from_source)
            .unwrap_or(Venue::Other)
    };

    match event.tx_type.as_deref().map(str::to_ascii_uppercase).as_deref() {
        Some("SWAP") | Some("BUY") | Some("SELL") => return TxKind::Swap(venue_from_source()),
        Some("TRANSFER") => return TxKind::Transfer,
        _ => {}
    }

    for program_id in &event.program_ids {
        if let Some((_, venue)) = VENUE_PROGRAMS.iter().find(|(id, _)| *id == program_id.as_str()) {
            return TxKind::Swap(*venue);
        }
    }

    TxKind::Unknown
}
