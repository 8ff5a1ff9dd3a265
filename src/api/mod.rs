pub mod health;
pub mod webhook;

use crate::config::Secret;
use crate::orchestration::WebhookIngestor;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub ingestor: Arc<WebhookIngestor>,
    pub auth_token: Option<Secret>,
    /// Process batches before acknowledging instead of on a spawned task.
    pub process_inline: bool,
}

impl AppState {
    pub fn new(ingestor: Arc<WebhookIngestor>) -> Self {
        Self {
            ingestor,
            auth_token: None,
            process_inline: false,
        }
    }

    pub fn with_auth_token(mut self, token: Option<Secret>) -> Self {
        self.auth_token = token;
        self
    }

    pub fn with_process_inline(mut self, inline: bool) -> Self {
        self.process_inline = inline;
        self
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/webhook", post(webhook::receive))
        .route("/helius", post(webhook::receive))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
