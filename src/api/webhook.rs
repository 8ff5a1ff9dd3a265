use crate::api::AppState;
use crate::error::AppError;
use crate::orchestration::{normalize_payload, BatchStatus};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap};
use tracing::{debug, warn};

/// Webhook intake. Always answers 200 with a status token once the caller
/// is authorized; the sender retries anything else.
pub async fn receive(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<&'static str, AppError> {
    if let Some(expected) = &state.auth_token {
        let provided = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if provided != expected.expose() {
            return Err(AppError::Unauthorized);
        }
    }

    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(BatchStatus::NoTx.as_str());
    }

    let payload: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Unparseable webhook body: {}", e);
            return Ok(BatchStatus::Error.as_str());
        }
    };

    let events = normalize_payload(payload);
    if events.is_empty() {
        return Ok(BatchStatus::NoTx.as_str());
    }
    debug!(events = events.len(), "Webhook received");

    if state.process_inline {
        let report = state.ingestor.process_batch(events).await;
        return Ok(report.status().as_str());
    }

    let ingestor = state.ingestor.clone();
    tokio::spawn(async move {
        ingestor.process_batch(events).await;
    });
    Ok(BatchStatus::Ok.as_str())
}
