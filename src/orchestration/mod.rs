pub mod ingest;

pub use ingest::{normalize_payload, BatchReport, BatchStatus, WebhookIngestor};
