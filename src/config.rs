use crate::domain::{FundingInstrument, Mint};
use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub bind_addr: IpAddr,
    pub rpc_url: String,
    pub jupiter_api_url: String,
    pub private_key: Secret,
    pub monitored_wallets: Vec<String>,
    pub slippage_bps: u16,
    pub stable_mint: String,
    /// Stable-asset notional per replication, in base units.
    pub stable_amount: u64,
    /// Native-asset notional per replication, in lamports.
    pub native_amount: u64,
    pub submit_max_retries: usize,
    pub telegram: Option<TelegramConfig>,
    pub telegram_api_url: String,
    pub token_info_enabled: bool,
    pub birdeye_api_url: String,
    pub birdeye_api_key: String,
    pub http_timeout_ms: u64,
    pub dedup_ttl_secs: Option<u64>,
    pub dedup_capacity: Option<usize>,
    pub webhook_auth_token: Option<Secret>,
    pub process_inline: bool,
}

/// A credential that never shows up in Debug output.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Secret(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret(***)")
    }
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub token: Secret,
    pub chat_id: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = parse_or(&env_map, "PORT", 8080u16)?;
        let bind_addr = parse_or(&env_map, "BIND_ADDR", IpAddr::from([0, 0, 0, 0]))?;

        let private_key = env_map
            .get("PRIVATE_KEY")
            .filter(|s| !s.trim().is_empty())
            .map(Secret::new)
            .ok_or_else(|| ConfigError::MissingEnv("PRIVATE_KEY".to_string()))?;

        let monitored_wallets = parse_monitored_wallets_from_map(&env_map)?;
        if monitored_wallets.is_empty() {
            return Err(ConfigError::MissingEnv("MONITORED_WALLETS".to_string()));
        }

        let slippage_bps = parse_or(&env_map, "SLIPPAGE_BPS", 300u16)?;
        if slippage_bps > 10_000 {
            return Err(ConfigError::InvalidValue(
                "SLIPPAGE_BPS".to_string(),
                format!("must be at most 10000, got {}", slippage_bps),
            ));
        }

        let telegram = match (env_map.get("TELEGRAM_TOKEN"), env_map.get("TELEGRAM_CHAT")) {
            (Some(token), Some(chat_id)) => Some(TelegramConfig {
                token: Secret::new(token.clone()),
                chat_id: chat_id.clone(),
            }),
            (None, None) => None,
            _ => {
                return Err(ConfigError::InvalidValue(
                    "TELEGRAM_TOKEN".to_string(),
                    "TELEGRAM_TOKEN and TELEGRAM_CHAT must be set together".to_string(),
                ))
            }
        };

        Ok(Config {
            port,
            bind_addr,
            rpc_url: string_or(&env_map, "RPC_URL", "https://api.mainnet-beta.solana.com"),
            jupiter_api_url: string_or(&env_map, "JUPITER_API_URL", "https://quote-api.jup.ag/v6"),
            private_key,
            monitored_wallets,
            slippage_bps,
            stable_mint: string_or(&env_map, "STABLE_MINT", Mint::USDC),
            stable_amount: parse_or(&env_map, "STABLE_AMOUNT", 2_000_000u64)?,
            native_amount: parse_or(&env_map, "NATIVE_AMOUNT", 15_000_000u64)?,
            submit_max_retries: parse_or(&env_map, "SUBMIT_MAX_RETRIES", 5usize)?,
            telegram,
            telegram_api_url: string_or(&env_map, "TELEGRAM_API_URL", "https://api.telegram.org"),
            token_info_enabled: parse_or(&env_map, "TOKEN_INFO_ENABLED", true)?,
            birdeye_api_url: string_or(&env_map, "BIRDEYE_API_URL", "https://public-api.birdeye.so"),
            birdeye_api_key: string_or(&env_map, "BIRDEYE_API_KEY", "public"),
            http_timeout_ms: parse_or(&env_map, "HTTP_TIMEOUT_MS", 10_000u64)?,
            dedup_ttl_secs: parse_opt(&env_map, "DEDUP_TTL_SECS")?,
            dedup_capacity: parse_opt(&env_map, "DEDUP_CAPACITY")?,
            webhook_auth_token: env_map
                .get("WEBHOOK_AUTH_TOKEN")
                .filter(|s| !s.is_empty())
                .map(Secret::new),
            process_inline: parse_or(&env_map, "PROCESS_INLINE", false)?,
        })
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    /// Fallback order for funding a replication: stable asset, then native.
    pub fn funding_instruments(&self) -> Vec<FundingInstrument> {
        let stable_label = if self.stable_mint == Mint::USDC {
            "USDC"
        } else {
            "stable"
        };
        vec![
            FundingInstrument::new(stable_label, Mint::new(self.stable_mint.clone()), self.stable_amount),
            FundingInstrument::new("SOL", Mint::native(), self.native_amount),
        ]
    }
}

fn string_or(env_map: &HashMap<String, String>, key: &str, default: &str) -> String {
    env_map
        .get(key)
        .cloned()
        .unwrap_or_else(|| default.to_string())
}

fn parse_or<T: FromStr>(
    env_map: &HashMap<String, String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    Ok(parse_opt(env_map, key)?.unwrap_or(default))
}

fn parse_opt<T: FromStr>(
    env_map: &HashMap<String, String>,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    match env_map.get(key) {
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            ConfigError::InvalidValue(key.to_string(), format!("cannot parse {:?}", raw))
        }),
        None => Ok(None),
    }
}

fn parse_monitored_wallets_from_map(
    env_map: &HashMap<String, String>,
) -> Result<Vec<String>, ConfigError> {
    if let Some(wallets_str) = env_map.get("MONITORED_WALLETS") {
        Ok(wallets_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect())
    } else if let Some(file_path) = env_map.get("MONITORED_WALLETS_FILE") {
        let content = std::fs::read_to_string(file_path).map_err(|_| {
            ConfigError::InvalidValue(
                "MONITORED_WALLETS_FILE".to_string(),
                "file not found or unreadable".to_string(),
            )
        })?;
        Ok(content
            .lines()
            .map(|line| line.trim().to_string())
            .filter(|s| !s.is_empty() && !s.starts_with('#'))
            .collect())
    } else {
        Ok(Vec::new())
    }
}
