//! Transaction events as delivered by the webhook sender.
//!
//! Two payload shapes are accepted:
//! - enhanced: `accountData[].tokenBalanceChanges[]`, where `rawTokenAmount`
//!   may be a string, a number, or a `{tokenAmount, decimals}` object
//! - raw: `meta.preTokenBalances` / `meta.postTokenBalances`, diffed per
//!   token account
//!
//! Parsing is lenient below the event level: a malformed delta or change is
//! logged and skipped, never failing the whole event.

use super::{Address, Mint, TxSignature};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;
use tracing::warn;

/// Highest decimal precision still treated as a fungible token.
pub const MAX_FUNGIBLE_DECIMALS: u8 = 12;

/// One token balance change inside an account delta.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBalanceChange {
    pub user_account: Address,
    pub mint: Mint,
    /// Signed amount in base units; negative for a send.
    pub raw_amount: i128,
    pub decimals: u8,
}

impl TokenBalanceChange {
    pub fn is_fungible(&self) -> bool {
        self.decimals <= MAX_FUNGIBLE_DECIMALS
    }
}

/// One account's token balance changes within a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountDelta {
    pub account: Address,
    pub token_balance_changes: Vec<TokenBalanceChange>,
}

/// A single ledger transaction, immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionEvent {
    pub signature: TxSignature,
    pub account_deltas: Vec<AccountDelta>,
    /// Upstream transaction type tag (e.g. "SWAP"), when present.
    pub tx_type: Option<String>,
    /// Upstream source tag (e.g. "JUPITER"), when present.
    pub source: Option<String>,
    pub program_ids: Vec<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventParseError {
    #[error("event is not a JSON object")]
    NotAnObject,
    #[error("event has no transaction signature")]
    MissingSignature,
    #[error("missing field {0}")]
    MissingField(&'static str),
    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

impl TransactionEvent {
    /// Extract only the signature, so deduplication can run before the rest
    /// of the payload is inspected.
    pub fn signature_of(value: &Value) -> Result<TxSignature, EventParseError> {
        if !value.is_object() {
            return Err(EventParseError::NotAnObject);
        }
        value
            .get("signature")
            .and_then(|v| v.as_str())
            .or_else(|| {
                value
                    .pointer("/transaction/signatures/0")
                    .and_then(|v| v.as_str())
            })
            .filter(|s| !s.is_empty())
            .map(TxSignature::new)
            .ok_or(EventParseError::MissingSignature)
    }

    /// Parse an event. Fails only when the signature is unusable; a missing
    /// balance-change list yields an event with no deltas.
    pub fn from_json(value: &Value) -> Result<Self, EventParseError> {
        let signature = Self::signature_of(value)?;

        let account_deltas = if let Some(account_data) = value.get("accountData") {
            parse_enhanced_deltas(&signature, account_data)
        } else if let Some(meta) = value.get("meta") {
            parse_raw_deltas(&signature, meta, value.pointer("/transaction/message/accountKeys"))
        } else {
            warn!(signature = %signature, "Event has no balance-change list");
            Vec::new()
        };

        let program_ids = value
            .get("instructions")
            .and_then(|v| v.as_array())
            .map(|ixs| {
                ixs.iter()
                    .filter_map(|ix| ix.get("programId").and_then(|p| p.as_str()))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(TransactionEvent {
            signature,
            account_deltas,
            tx_type: string_field(value, "type"),
            source: string_field(value, "source"),
            program_ids,
        })
    }
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

fn parse_enhanced_deltas(signature: &TxSignature, account_data: &Value) -> Vec<AccountDelta> {
    let Some(entries) = account_data.as_array() else {
        warn!(signature = %signature, "accountData is not an array");
        return Vec::new();
    };

    let mut deltas = Vec::with_capacity(entries.len());
    for entry in entries {
        let Some(account) = entry.get("account").and_then(|v| v.as_str()) else {
            warn!(signature = %signature, "Skipping account delta without account");
            continue;
        };

        let changes = entry
            .get("tokenBalanceChanges")
            .and_then(|v| v.as_array())
            .map(|changes| {
                changes
                    .iter()
                    .filter_map(|change| match parse_token_change(change) {
                        Ok(c) => Some(c),
                        Err(e) => {
                            warn!(signature = %signature, account, "Skipping token change: {}", e);
                            None
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        deltas.push(AccountDelta {
            account: Address::new(account),
            token_balance_changes: changes,
        });
    }
    deltas
}

fn parse_token_change(change: &Value) -> Result<TokenBalanceChange, EventParseError> {
    let user_account = change
        .get("userAccount")
        .and_then(|v| v.as_str())
        .ok_or(EventParseError::MissingField("userAccount"))?;

    let mint = change
        .get("mint")
        .and_then(|v| v.as_str())
        .ok_or(EventParseError::MissingField("mint"))?;

    let raw = change
        .get("rawTokenAmount")
        .ok_or(EventParseError::MissingField("rawTokenAmount"))?;

    let raw_amount = match raw {
        Value::Object(obj) => obj.get("tokenAmount").and_then(parse_amount),
        other => parse_amount(other),
    }
    .ok_or_else(|| EventParseError::InvalidField {
        field: "rawTokenAmount",
        reason: raw.to_string(),
    })?;

    let decimals = change
        .get("decimals")
        .or_else(|| raw.get("decimals"))
        .ok_or(EventParseError::MissingField("decimals"))
        .and_then(parse_decimals)?;

    Ok(TokenBalanceChange {
        user_account: Address::new(user_account),
        mint: Mint::new(mint),
        raw_amount,
        decimals,
    })
}

fn parse_amount(value: &Value) -> Option<i128> {
    match value {
        Value::String(s) => s.trim().parse::<i128>().ok(),
        Value::Number(n) => n
            .as_i64()
            .map(i128::from)
            .or_else(|| n.as_u64().map(i128::from)),
        _ => None,
    }
}

fn parse_balance(value: &Value) -> Option<u64> {
    match value {
        Value::String(s) => s.trim().parse::<u64>().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

fn parse_decimals(value: &Value) -> Result<u8, EventParseError> {
    value
        .as_u64()
        .and_then(|d| u8::try_from(d).ok())
        .ok_or_else(|| EventParseError::InvalidField {
            field: "decimals",
            reason: value.to_string(),
        })
}

/// A token account balance from `meta.pre/postTokenBalances`.
struct RawBalance {
    owner: String,
    mint: String,
    amount: u64,
    decimals: u8,
}

fn parse_raw_balance(entry: &Value) -> Result<(u64, RawBalance), EventParseError> {
    let index = entry
        .get("accountIndex")
        .and_then(|v| v.as_u64())
        .ok_or(EventParseError::MissingField("accountIndex"))?;
    let owner = entry
        .get("owner")
        .and_then(|v| v.as_str())
        .ok_or(EventParseError::MissingField("owner"))?;
    let mint = entry
        .get("mint")
        .and_then(|v| v.as_str())
        .ok_or(EventParseError::MissingField("mint"))?;
    let ui = entry
        .get("uiTokenAmount")
        .ok_or(EventParseError::MissingField("uiTokenAmount"))?;
    // Token account balances are unsigned 64-bit on chain.
    let raw_amount = ui
        .get("amount")
        .ok_or(EventParseError::MissingField("uiTokenAmount.amount"))?;
    let amount = parse_balance(raw_amount).ok_or_else(|| EventParseError::InvalidField {
        field: "uiTokenAmount.amount",
        reason: raw_amount.to_string(),
    })?;
    let decimals = ui
        .get("decimals")
        .ok_or(EventParseError::MissingField("uiTokenAmount.decimals"))
        .and_then(parse_decimals)?;

    Ok((
        index,
        RawBalance {
            owner: owner.to_string(),
            mint: mint.to_string(),
            amount,
            decimals,
        },
    ))
}

fn parse_raw_deltas(
    signature: &TxSignature,
    meta: &Value,
    account_keys: Option<&Value>,
) -> Vec<AccountDelta> {
    let collect = |key: &str| -> Vec<(u64, RawBalance)> {
        meta.get(key)
            .and_then(|v| v.as_array())
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| match parse_raw_balance(entry) {
                        Ok(b) => Some(b),
                        Err(e) => {
                            warn!(signature = %signature, "Skipping {} entry: {}", key, e);
                            None
                        }
                    })
                    .collect()
            })
            .unwrap_or_default()
    };

    let pre = collect("preTokenBalances");
    let post = collect("postTokenBalances");
    if pre.is_empty() && post.is_empty() {
        warn!(signature = %signature, "Raw event has no token balances");
        return Vec::new();
    }

    let account_at = |index: u64| -> Address {
        account_keys
            .and_then(|keys| keys.get(index as usize))
            .and_then(|key| key.as_str().or_else(|| key.get("pubkey").and_then(|p| p.as_str())))
            .map(Address::new)
            .unwrap_or_else(|| Address::new(format!("#{}", index)))
    };

    let mut pre_by_index: HashMap<u64, RawBalance> = pre.into_iter().collect();
    let mut deltas = Vec::new();

    for (index, after) in post {
        let before = pre_by_index.remove(&index).map(|b| b.amount).unwrap_or(0);
        deltas.push(AccountDelta {
            account: account_at(index),
            token_balance_changes: vec![TokenBalanceChange {
                user_account: Address::new(after.owner),
                mint: Mint::new(after.mint),
                raw_amount: i128::from(after.amount) - i128::from(before),
                decimals: after.decimals,
            }],
        });
    }

    // Token accounts closed within the transaction only appear in `pre`.
    let mut closed: Vec<(u64, RawBalance)> = pre_by_index.into_iter().collect();
    closed.sort_by_key(|(index, _)| *index);
    for (index, before) in closed {
        deltas.push(AccountDelta {
            account: account_at(index),
            token_balance_changes: vec![TokenBalanceChange {
                user_account: Address::new(before.owner),
                mint: Mint::new(before.mint),
                raw_amount: -i128::from(before.amount),
                decimals: before.decimals,
            }],
        });
    }

    deltas
}
