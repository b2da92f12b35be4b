//! Periodic market, sentiment, position and news snapshots
//!
//! Independent of the run state. Every source keeps its last good value;
//! a failed fetch only bumps that source's failure counter.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, RwLock};
use tokio_util::task::AbortOnDropHandle;
use tracing::{debug, warn};

use crate::api::{BotApi, ClientResult, MarketData, NewsSnapshot, PositionSnapshot, SentimentBias};
use crate::config::PollingConfig;

use super::polling::poll_loop;

/// Default consecutive all-source failures before telemetry is stale
pub const DEFAULT_STALE_AFTER_FAILURES: u32 = 3;

/// Health of one polled source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceHealth {
    pub consecutive_failures: u32,
    pub last_success: Option<Instant>,
    pub last_error: Option<String>,
}

impl SourceHealth {
    fn succeeded(&mut self) {
        self.consecutive_failures = 0;
        self.last_success = Some(Instant::now());
        self.last_error = None;
    }

    fn failed(&mut self, error: String) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.last_error = Some(error);
    }
}

/// Latest market readings; `None` until first fetched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetrySnapshot {
    pub index_level: Option<f64>,
    pub volatility_index: Option<f64>,
    pub realized_pnl: Option<f64>,
    /// In [-1, 1]
    pub sentiment: Option<f64>,
}

impl TelemetrySnapshot {
    pub fn sentiment_bias(&self) -> Option<SentimentBias> {
        self.sentiment.map(SentimentBias::classify)
    }
}

/// Everything the telemetry pollers write
#[derive(Debug, Clone)]
pub struct TelemetryState {
    pub snapshot: TelemetrySnapshot,
    pub market: SourceHealth,
    pub sentiment: SourceHealth,
    pub position: Option<PositionSnapshot>,
    pub position_health: SourceHealth,
    pub news: Option<NewsSnapshot>,
    pub news_health: SourceHealth,
    stale_after_failures: u32,
}

impl Default for TelemetryState {
    fn default() -> Self {
        Self::new(DEFAULT_STALE_AFTER_FAILURES)
    }
}

impl TelemetryState {
    pub fn new(stale_after_failures: u32) -> Self {
        Self {
            snapshot: TelemetrySnapshot::default(),
            market: SourceHealth::default(),
            sentiment: SourceHealth::default(),
            position: None,
            position_health: SourceHealth::default(),
            news: None,
            news_health: SourceHealth::default(),
            stale_after_failures: stale_after_failures.max(1),
        }
    }

    /// Every snapshot source has failed for the threshold in a row
    pub fn is_stale(&self) -> bool {
        self.market.consecutive_failures >= self.stale_after_failures
            && self.sentiment.consecutive_failures >= self.stale_after_failures
    }

    pub fn apply_market(&mut self, result: ClientResult<MarketData>) {
        match result {
            Ok(data) => {
                self.snapshot.index_level = Some(data.index_level);
                self.snapshot.volatility_index = Some(data.volatility_index);
                self.snapshot.realized_pnl = Some(data.realized_pnl);
                self.market.succeeded();
            }
            Err(e) => {
                debug!(event_type = "TELEMETRY", source = "market", error = %e, "Fetch failed");
                self.market.failed(e.to_string());
            }
        }
    }

    pub fn apply_sentiment(&mut self, result: ClientResult<f64>) {
        match result {
            Ok(score) => {
                self.snapshot.sentiment = Some(score);
                self.sentiment.succeeded();
            }
            Err(e) => {
                debug!(event_type = "TELEMETRY", source = "sentiment", error = %e, "Fetch failed");
                self.sentiment.failed(e.to_string());
            }
        }
    }

    pub fn apply_position(&mut self, result: ClientResult<Option<PositionSnapshot>>) {
        match result {
            Ok(position) => {
                self.position = position;
                self.position_health.succeeded();
            }
            Err(e) => {
                debug!(event_type = "TELEMETRY", source = "position", error = %e, "Fetch failed");
                self.position_health.failed(e.to_string());
            }
        }
    }

    pub fn apply_news(&mut self, result: ClientResult<NewsSnapshot>) {
        match result {
            Ok(news) => {
                self.news = Some(news);
                self.news_health.succeeded();
            }
            Err(e) => {
                debug!(event_type = "TELEMETRY", source = "news", error = %e, "Fetch failed");
                self.news_health.failed(e.to_string());
            }
        }
    }
}

pub type SharedTelemetry = Arc<RwLock<TelemetryState>>;

/// Poll intervals for the three telemetry loops
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub snapshot_interval: Duration,
    pub position_interval: Duration,
    pub news_interval: Duration,
    pub stale_after_failures: u32,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self::from(&PollingConfig::default())
    }
}

impl From<&PollingConfig> for TelemetryConfig {
    fn from(polling: &PollingConfig) -> Self {
        Self {
            snapshot_interval: polling.telemetry_interval(),
            position_interval: polling.position_interval(),
            news_interval: polling.news_interval(),
            stale_after_failures: polling.stale_after_failures,
        }
    }
}

/// Owns the telemetry state and the tasks that refresh it
#[derive(Clone)]
pub struct TelemetryPoller {
    api: Arc<dyn BotApi>,
    state: SharedTelemetry,
    config: TelemetryConfig,
}

impl TelemetryPoller {
    pub fn new(api: Arc<dyn BotApi>, config: TelemetryConfig) -> Self {
        let state = Arc::new(RwLock::new(TelemetryState::new(config.stale_after_failures)));
        Self { api, state, config }
    }

    pub fn state(&self) -> SharedTelemetry {
        Arc::clone(&self.state)
    }

    /// Market data and sentiment, fetched concurrently and merged
    pub async fn poll_snapshot_once(&self) {
        let (market, sentiment) =
            tokio::join!(self.api.fetch_market_data(), self.api.fetch_sentiment());

        let mut state = self.state.write().await;
        let was_stale = state.is_stale();
        state.apply_market(market);
        state.apply_sentiment(sentiment);
        if state.is_stale() && !was_stale {
            warn!(
                event_type = "TELEMETRY",
                failures = state.market.consecutive_failures,
                "Telemetry is stale: every source is failing"
            );
        }
    }

    pub async fn poll_position_once(&self) {
        let result = self.api.fetch_position().await;
        self.state.write().await.apply_position(result);
    }

    pub async fn poll_news_once(&self) {
        let result = self.api.fetch_news().await;
        self.state.write().await.apply_news(result);
    }

    /// Spawn the snapshot, position and news loops. Each fires immediately
    /// and runs until shutdown; dropping the handles aborts them.
    pub fn spawn(&self, shutdown_tx: &broadcast::Sender<()>) -> Vec<AbortOnDropHandle<()>> {
        let snapshot = self.clone();
        let snapshot_rx = shutdown_tx.subscribe();
        let position = self.clone();
        let position_rx = shutdown_tx.subscribe();
        let news = self.clone();
        let news_rx = shutdown_tx.subscribe();

        vec![
            AbortOnDropHandle::new(tokio::spawn(async move {
                let period = snapshot.config.snapshot_interval;
                poll_loop("telemetry", period, snapshot_rx, || snapshot.poll_snapshot_once()).await
            })),
            AbortOnDropHandle::new(tokio::spawn(async move {
                let period = position.config.position_interval;
                poll_loop("position", period, position_rx, || position.poll_position_once()).await
            })),
            AbortOnDropHandle::new(tokio::spawn(async move {
                let period = news.config.news_interval;
                poll_loop("news", period, news_rx, || news.poll_news_once()).await
            })),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Accepted, ClientError, ExecutionMode, RemoteStatus, StrategySelector};
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn market(index: f64) -> MarketData {
        MarketData {
            index_level: index,
            volatility_index: 13.5,
            realized_pnl: 250.0,
            error: None,
        }
    }

    fn down() -> ClientError {
        ClientError::Transport("connection refused".into())
    }

    #[test]
    fn test_partial_failure_keeps_other_source() {
        let mut state = TelemetryState::default();
        state.apply_market(Ok(market(22_450.0)));
        state.apply_sentiment(Ok(0.4));

        state.apply_market(Err(down()));
        state.apply_sentiment(Ok(-0.2));

        assert_eq!(state.snapshot.index_level, Some(22_450.0));
        assert_eq!(state.snapshot.sentiment, Some(-0.2));
        assert_eq!(state.market.consecutive_failures, 1);
        assert_eq!(state.sentiment.consecutive_failures, 0);
        assert_eq!(state.snapshot.sentiment_bias(), Some(SentimentBias::Bearish));
        assert!(!state.is_stale());
    }

    #[test]
    fn test_stale_only_when_every_source_fails() {
        let mut state = TelemetryState::new(3);
        for _ in 0..3 {
            state.apply_market(Err(down()));
        }
        assert!(!state.is_stale());

        for _ in 0..2 {
            state.apply_sentiment(Err(down()));
        }
        assert!(!state.is_stale());
        state.apply_sentiment(Err(down()));
        assert!(state.is_stale());

        state.apply_sentiment(Ok(0.0));
        assert!(!state.is_stale());
        assert!(state.sentiment.last_success.is_some());
    }

    #[test]
    fn test_position_cleared_and_retained() {
        let mut state = TelemetryState::default();
        let pos = PositionSnapshot {
            symbol: "NIFTY24APR22500CE".into(),
            leg: "CE".into(),
            quantity: 65.0,
            entry_price: 112.5,
            sl_price: Some(90.0),
        };
        state.apply_position(Ok(Some(pos.clone())));
        state.apply_position(Err(down()));
        assert_eq!(state.position.as_ref(), Some(&pos));
        assert_eq!(state.position_health.consecutive_failures, 1);

        state.apply_position(Ok(None));
        assert!(state.position.is_none());
    }

    #[test]
    fn test_news_failure_retains_snapshot() {
        let mut state = TelemetryState::default();
        let news = NewsSnapshot {
            articles: vec![],
            sentiment: 0.12,
        };
        state.apply_news(Ok(news.clone()));
        state.apply_news(Err(ClientError::Application("HTTP 503".into())));
        assert_eq!(state.news, Some(news));
        assert_eq!(state.news_health.last_error.as_deref(), Some("Rejected by bot: HTTP 503"));
    }

    /// Market source down, sentiment up
    struct HalfDown {
        market_calls: Mutex<u32>,
    }

    #[async_trait]
    impl BotApi for HalfDown {
        async fn start(&self, _: ExecutionMode, _: &StrategySelector) -> ClientResult<Accepted> {
            Ok(Accepted::default())
        }
        async fn stop(&self) -> ClientResult<Accepted> {
            Ok(Accepted::default())
        }
        async fn fetch_status(&self) -> ClientResult<RemoteStatus> {
            Ok(RemoteStatus::Stopped)
        }
        async fn fetch_market_data(&self) -> ClientResult<MarketData> {
            *self.market_calls.lock().unwrap() += 1;
            Err(ClientError::Application("No API Connection".into()))
        }
        async fn fetch_sentiment(&self) -> ClientResult<f64> {
            Ok(0.3)
        }
        async fn fetch_news(&self) -> ClientResult<NewsSnapshot> {
            Ok(NewsSnapshot::default())
        }
        async fn fetch_position(&self) -> ClientResult<Option<PositionSnapshot>> {
            Ok(None)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_pollers_run_until_shutdown() {
        let api = Arc::new(HalfDown {
            market_calls: Mutex::new(0),
        });
        let poller = TelemetryPoller::new(api.clone(), TelemetryConfig::default());
        let (shutdown_tx, _) = broadcast::channel(1);
        let handles = poller.spawn(&shutdown_tx);

        // Immediate tick, then 2s and 4s
        tokio::time::sleep(Duration::from_millis(4_100)).await;
        {
            let state = poller.state();
            let state = state.read().await;
            assert_eq!(state.snapshot.sentiment, Some(0.3));
            assert!(state.snapshot.index_level.is_none());
            assert_eq!(state.market.consecutive_failures, 3);
            assert!(state.news.is_some());
            assert!(state.position_health.last_success.is_some());
        }
        assert_eq!(*api.market_calls.lock().unwrap(), 3);

        shutdown_tx.send(()).unwrap();
        for handle in handles {
            handle.await.unwrap();
        }
    }
}
