//! The replication pipeline stages: deduplication, classification, buy
//! detection, routing and execution.

pub mod classifier;
pub mod dedup;
pub mod detector;
pub mod executor;
pub mod router;

pub use classifier::{classify, TxKind, Venue};
pub use dedup::EventDeduplicator;
pub use detector::{detect_buys, BuyDetector};
pub use executor::TradeExecutor;
pub use router::{RouteError, RouteReport, SwapRouter};
