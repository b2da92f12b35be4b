//! Remote bot API
//!
//! Everything that crosses the network: the REST control/telemetry client,
//! its wire types and error taxonomy, and the WebSocket/backoff helpers used
//! by the log stream.

pub mod errors;
pub mod http;
pub mod shared;
pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use errors::{ClientError, ClientResult};
pub use http::HttpBotApi;
pub use traits::BotApi;
pub use types::{
    Accepted, Article, ExecutionMode, MarketData, NewsSnapshot, PositionSnapshot, RemoteStatus,
    SentimentBias, StrategySelector,
};
