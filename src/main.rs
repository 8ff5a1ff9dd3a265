use anyhow::Context;
use mirror_bot::api::{self, AppState};
use mirror_bot::config::Config;
use mirror_bot::domain::Address;
use mirror_bot::engine::{BuyDetector, EventDeduplicator, SwapRouter, TradeExecutor};
use mirror_bot::services::{BirdeyeClient, JupiterClient, RpcSubmitter, TelegramNotifier};
use mirror_bot::{OperatorWallet, WebhookIngestor};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

fn build_state(config: &Config) -> anyhow::Result<AppState> {
    let wallet = OperatorWallet::from_json_bytes(config.private_key.expose())
        .context("Failed to load PRIVATE_KEY")?;
    tracing::info!("Operator wallet {}", wallet.address());

    let timeout = config.http_timeout();
    let aggregator = JupiterClient::new(config.jupiter_api_url.clone(), timeout)
        .context("Failed to create aggregator client")?;
    let submitter = RpcSubmitter::new(config.rpc_url.clone(), timeout);

    let router = SwapRouter::new(
        Arc::new(aggregator),
        Arc::new(submitter),
        wallet,
        config.slippage_bps,
    )
    .with_submit_max_retries(config.submit_max_retries);

    let mut executor = TradeExecutor::new(router, config.funding_instruments());
    if let Some(telegram) = &config.telegram {
        let notifier = TelegramNotifier::new(
            config.telegram_api_url.clone(),
            telegram.token.expose().to_string(),
            telegram.chat_id.clone(),
            timeout,
        )
        .context("Failed to create Telegram notifier")?;
        executor = executor.with_notifier(Arc::new(notifier));
    } else {
        tracing::info!("Telegram not configured, notifications disabled");
    }
    if config.token_info_enabled {
        let token_info = BirdeyeClient::new(
            config.birdeye_api_url.clone(),
            config.birdeye_api_key.clone(),
            timeout,
        )
        .context("Failed to create token info client")?;
        executor = executor.with_token_info(Arc::new(token_info));
    }

    let dedup = if config.dedup_ttl_secs.is_some() || config.dedup_capacity.is_some() {
        EventDeduplicator::bounded(
            config.dedup_ttl_secs.map(Duration::from_secs),
            config.dedup_capacity,
        )
    } else {
        EventDeduplicator::unbounded()
    };

    let detector = BuyDetector::new(config.monitored_wallets.iter().cloned().map(Address::new));
    tracing::info!("Monitoring {} wallet(s)", detector.monitored().len());

    let ingestor = WebhookIngestor::new(Arc::new(dedup), detector, Arc::new(executor));
    Ok(AppState::new(Arc::new(ingestor))
        .with_auth_token(config.webhook_auth_token.clone())
        .with_process_inline(config.process_inline))
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let state = match build_state(&config) {
        Ok(state) => state,
        Err(e) => {
            eprintln!("Startup error: {:#}", e);
            std::process::exit(1);
        }
    };

    let app = api::create_router(state);

    let addr = SocketAddr::new(config.bind_addr, config.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Server listening on {}", addr);

    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}
