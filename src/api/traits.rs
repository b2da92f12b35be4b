//! Remote bot API trait definition
//!
//! `BotApi` is the seam between the session layer and the network: the
//! session controller and pollers only ever talk to the bot through it, so
//! tests can script the remote side without a server.

use async_trait::async_trait;

use crate::api::errors::ClientResult;
use crate::api::types::{
    Accepted, ExecutionMode, MarketData, NewsSnapshot, PositionSnapshot, RemoteStatus,
    StrategySelector,
};

/// Request/response surface of the remote trading bot
#[async_trait]
pub trait BotApi: Send + Sync {
    /// Ask the bot to start trading
    ///
    /// One-shot, never retried. `Err(ClientError::Application)` carries the
    /// bot's own reason; transport failures map to `ClientError::Transport`.
    async fn start(&self, mode: ExecutionMode, strategy: &StrategySelector)
        -> ClientResult<Accepted>;

    /// Deliver the stop signal
    ///
    /// Acceptance means the signal was delivered, not that the bot stopped.
    async fn stop(&self) -> ClientResult<Accepted>;

    /// Fetch the authoritative run status
    async fn fetch_status(&self) -> ClientResult<RemoteStatus>;

    /// Fetch index level, volatility index and realized P&L
    async fn fetch_market_data(&self) -> ClientResult<MarketData>;

    /// Fetch the aggregate sentiment score in [-1, 1]
    async fn fetch_sentiment(&self) -> ClientResult<f64>;

    /// Fetch scored headlines
    async fn fetch_news(&self) -> ClientResult<NewsSnapshot>;

    /// Fetch the open position, `None` when flat
    async fn fetch_position(&self) -> ClientResult<Option<PositionSnapshot>>;
}
