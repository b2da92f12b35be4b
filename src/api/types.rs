//! Wire types for the remote bot HTTP API
//!
//! Field names follow the bot's JSON payloads; Rust-side names are renamed
//! where the wire name is market-specific (e.g. `nifty` → `index_level`).

use serde::{Deserialize, Serialize};

// =============================================================================
// Control plane
// =============================================================================

/// Whether the bot trades on paper or with real capital
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExecutionMode {
    #[default]
    Simulated,
    Live,
}

impl ExecutionMode {
    pub fn is_dry_run(self) -> bool {
        self == ExecutionMode::Simulated
    }

    pub fn toggled(self) -> Self {
        match self {
            ExecutionMode::Simulated => ExecutionMode::Live,
            ExecutionMode::Live => ExecutionMode::Simulated,
        }
    }
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionMode::Simulated => write!(f, "SIMULATED"),
            ExecutionMode::Live => write!(f, "LIVE"),
        }
    }
}

/// Strategy the bot should run; passed through to the bot unvalidated
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StrategySelector(String);

/// Strategy used when the operator does not pick one
pub const DEFAULT_STRATEGY: &str = "MOMENTUM";

impl StrategySelector {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for StrategySelector {
    fn default() -> Self {
        Self(DEFAULT_STRATEGY.to_string())
    }
}

impl From<&str> for StrategySelector {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl std::fmt::Display for StrategySelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Run status reported by `GET /api/status`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RemoteStatus {
    Running,
    Stopped,
    /// Anything else the bot may report; never drives a transition
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for RemoteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoteStatus::Running => write!(f, "RUNNING"),
            RemoteStatus::Stopped => write!(f, "STOPPED"),
            RemoteStatus::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Body of `GET /api/status`
#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    pub status: RemoteStatus,
    #[serde(default)]
    pub strategy: Option<String>,
}

/// Body of `POST /api/start`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StartRequest {
    pub strategy: String,
    pub dry_run: bool,
}

impl StartRequest {
    pub fn new(mode: ExecutionMode, strategy: &StrategySelector) -> Self {
        Self {
            strategy: strategy.as_str().to_string(),
            dry_run: mode.is_dry_run(),
        }
    }
}

/// Body returned by `POST /api/start` and `POST /api/stop`
///
/// Success and failure share one shape; FastAPI errors arrive as `{detail}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommandResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

impl CommandResponse {
    pub fn is_error(&self) -> bool {
        self.status.as_deref() == Some("error")
    }

    /// Best human-readable reason carried by the body
    pub fn reason(&self) -> Option<String> {
        self.detail.clone().or_else(|| self.message.clone())
    }
}

/// A command the bot acknowledged
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Accepted {
    pub message: Option<String>,
}

// =============================================================================
// Telemetry
// =============================================================================

/// Body of `GET /api/market-data`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarketData {
    #[serde(rename = "nifty", default)]
    pub index_level: f64,
    #[serde(rename = "vix", default)]
    pub volatility_index: f64,
    #[serde(rename = "pnl", default)]
    pub realized_pnl: f64,
    /// Set by the bot when it could not reach its market data source
    #[serde(default)]
    pub error: Option<String>,
}

/// Body of `GET /api/sentiment`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SentimentResponse {
    #[serde(default)]
    pub score: f64,
}

/// Single headline from `GET /api/news`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Article {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub published: String,
    #[serde(default)]
    pub sentiment: f64,
    #[serde(default)]
    pub sentiment_label: String,
}

/// Body of `GET /api/news`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NewsSnapshot {
    #[serde(default)]
    pub articles: Vec<Article>,
    #[serde(default)]
    pub sentiment: f64,
}

/// Open position details from `GET /api/trade`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PositionSnapshot {
    pub symbol: String,
    /// Leg side, e.g. `CE` / `PE`
    pub leg: String,
    #[serde(rename = "qty")]
    pub quantity: f64,
    pub entry_price: f64,
    #[serde(default)]
    pub sl_price: Option<f64>,
}

impl PositionSnapshot {
    pub fn invested_value(&self) -> f64 {
        self.entry_price * self.quantity
    }
}

/// Body of `GET /api/trade`
#[derive(Debug, Clone, Deserialize)]
pub struct TradeResponse {
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub details: Option<PositionSnapshot>,
}

impl TradeResponse {
    /// Collapse into the position to display (None when flat)
    pub fn into_position(self) -> Option<PositionSnapshot> {
        if self.active {
            self.details
        } else {
            None
        }
    }
}

/// Directional reading of a sentiment score in [-1, 1]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentimentBias {
    Bullish,
    Neutral,
    Bearish,
}

/// Scores within this distance of zero are neutral
pub const SENTIMENT_NEUTRAL_BAND: f64 = 0.05;

impl SentimentBias {
    pub fn classify(score: f64) -> Self {
        if score > SENTIMENT_NEUTRAL_BAND {
            SentimentBias::Bullish
        } else if score < -SENTIMENT_NEUTRAL_BAND {
            SentimentBias::Bearish
        } else {
            SentimentBias::Neutral
        }
    }
}

impl std::fmt::Display for SentimentBias {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SentimentBias::Bullish => write!(f, "BULLISH"),
            SentimentBias::Neutral => write!(f, "NEUTRAL"),
            SentimentBias::Bearish => write!(f, "BEARISH"),
        }
    }
}
