//! HTTP implementation of [`BotApi`]
//!
//! Talks to the bot's REST control plane with a single pooled
//! `reqwest::Client`. Response bodies are interpreted here so callers only
//! ever see `Accepted` or a classified [`ClientError`].

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::api::errors::{ClientError, ClientResult};
use crate::api::traits::BotApi;
use crate::api::types::{
    Accepted, CommandResponse, ExecutionMode, MarketData, NewsSnapshot, PositionSnapshot,
    RemoteStatus, SentimentResponse, StartRequest, StatusResponse, StrategySelector,
    TradeResponse,
};

// =============================================================================
// HTTP Client Constants
// =============================================================================

/// HTTP request timeout (seconds); start can block while the bot logs in
const HTTP_TIMEOUT_SECS: u64 = 15;
/// HTTP connection timeout (milliseconds)
const HTTP_CONNECT_TIMEOUT_MS: u64 = 3000;
/// Max idle connections per host in connection pool
const HTTP_POOL_MAX_IDLE: usize = 4;
/// How long idle connections stay in the pool (seconds)
const HTTP_POOL_IDLE_TIMEOUT_SECS: u64 = 60;
/// TCP keepalive interval (seconds)
const HTTP_TCP_KEEPALIVE_SECS: u64 = 30;

/// Create the shared HTTP client used for every bot endpoint
pub fn create_http_client() -> reqwest::Client {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .connect_timeout(Duration::from_millis(HTTP_CONNECT_TIMEOUT_MS))
        .pool_max_idle_per_host(HTTP_POOL_MAX_IDLE)
        .pool_idle_timeout(Duration::from_secs(HTTP_POOL_IDLE_TIMEOUT_SECS))
        .tcp_keepalive(Duration::from_secs(HTTP_TCP_KEEPALIVE_SECS))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new());
    debug!(
        phase = "init",
        timeout_s = HTTP_TIMEOUT_SECS,
        connect_timeout_ms = HTTP_CONNECT_TIMEOUT_MS,
        "HTTP client configured"
    );
    client
}

/// REST client for the remote bot
#[derive(Clone)]
pub struct HttpBotApi {
    base_url: String,
    http_client: reqwest::Client,
}

impl HttpBotApi {
    /// `base_url` is scheme + host + port, e.g. `http://localhost:8000`
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            http_client: create_http_client(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET a JSON endpoint; non-2xx statuses are application errors
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let response = self.http_client.get(self.url(path)).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Application(rejection_reason(status, &body)));
        }
        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| ClientError::Protocol(format!("GET {}: {}", path, e)))
    }

    /// Interpret a start/stop response
    async fn command_result(
        command: &str,
        response: reqwest::Response,
        empty_is_accepted: bool,
    ) -> ClientResult<Accepted> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ClientError::Application(rejection_reason(status, &body)));
        }

        if body.trim().is_empty() || body.trim() == "null" {
            return if empty_is_accepted {
                Ok(Accepted::default())
            } else {
                Err(ClientError::Protocol(format!("{}: empty response body", command)))
            };
        }

        let parsed: CommandResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(_) if empty_is_accepted => return Ok(Accepted::default()),
            Err(e) => {
                return Err(ClientError::Protocol(format!("{}: {}", command, e)));
            }
        };

        if parsed.is_error() {
            let reason = parsed
                .reason()
                .unwrap_or_else(|| format!("{} reported an error", command));
            return Err(ClientError::Application(reason));
        }

        match parsed.status.as_deref() {
            Some("success") => Ok(Accepted {
                message: parsed.message,
            }),
            _ if empty_is_accepted => Ok(Accepted {
                message: parsed.message,
            }),
            other => Err(ClientError::Protocol(format!(
                "{}: unexpected status {:?}",
                command, other
            ))),
        }
    }
}

/// Pull the most useful reason out of a failed response
fn rejection_reason(status: reqwest::StatusCode, body: &str) -> String {
    serde_json::from_str::<CommandResponse>(body)
        .ok()
        .and_then(|r| r.reason())
        .unwrap_or_else(|| format!("HTTP {}", status))
}

#[async_trait]
impl BotApi for HttpBotApi {
    async fn start(
        &self,
        mode: ExecutionMode,
        strategy: &StrategySelector,
    ) -> ClientResult<Accepted> {
        let request = StartRequest::new(mode, strategy);
        info!(
            event_type = "COMMAND",
            strategy = %strategy,
            mode = %mode,
            "Sending start command"
        );
        let response = self
            .http_client
            .post(self.url("/api/start"))
            .json(&request)
            .send()
            .await?;
        let result = Self::command_result("start", response, false).await;
        if let Err(ref e) = result {
            warn!(event_type = "COMMAND", error = %e, "Start command rejected");
        }
        result
    }

    async fn stop(&self) -> ClientResult<Accepted> {
        info!(event_type = "COMMAND", "Sending stop command");
        let response = self.http_client.post(self.url("/api/stop")).send().await?;
        let result = Self::command_result("stop", response, true).await;
        if let Err(ref e) = result {
            warn!(event_type = "COMMAND", error = %e, "Stop command rejected");
        }
        result
    }

    async fn fetch_status(&self) -> ClientResult<RemoteStatus> {
        let resp: StatusResponse = self.get_json("/api/status").await?;
        Ok(resp.status)
    }

    async fn fetch_market_data(&self) -> ClientResult<MarketData> {
        let data: MarketData = self.get_json("/api/market-data").await?;
        match data.error {
            Some(reason) => Err(ClientError::Application(reason)),
            None => Ok(data),
        }
    }

    async fn fetch_sentiment(&self) -> ClientResult<f64> {
        let resp: SentimentResponse = self.get_json("/api/sentiment").await?;
        Ok(resp.score.clamp(-1.0, 1.0))
    }

    async fn fetch_news(&self) -> ClientResult<NewsSnapshot> {
        self.get_json("/api/news").await
    }

    async fn fetch_position(&self) -> ClientResult<Option<PositionSnapshot>> {
        let resp: TradeResponse = self.get_json("/api/trade").await?;
        Ok(resp.into_position())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_start_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/start")
            .match_body(mockito::Matcher::Json(serde_json::json!({
                "strategy": "MOMENTUM",
                "dry_run": true
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status":"success","message":"Bot started in DRY RUN mode."}"#)
            .create_async()
            .await;

        let api = HttpBotApi::new(server.url());
        let accepted = api
            .start(ExecutionMode::Simulated, &StrategySelector::default())
            .await
            .unwrap();
        assert_eq!(
            accepted.message.as_deref(),
            Some("Bot started in DRY RUN mode.")
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_start_http_400_detail_is_application_error() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/start")
            .with_status(400)
            .with_body(r#"{"detail":"Bot is already running."}"#)
            .create_async()
            .await;

        let api = HttpBotApi::new(server.url());
        let err = api
            .start(ExecutionMode::Live, &StrategySelector::default())
            .await
            .unwrap_err();
        match err {
            ClientError::Application(reason) => assert_eq!(reason, "Bot is already running."),
            other => panic!("Expected Application error, got {:?}", other),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_start_error_status_in_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/start")
            .with_status(200)
            .with_body(r#"{"status":"error","message":"Login Failed"}"#)
            .create_async()
            .await;

        let api = HttpBotApi::new(server.url());
        let err = api
            .start(ExecutionMode::Simulated, &StrategySelector::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Application(ref r) if r == "Login Failed"));
    }

    #[tokio::test]
    async fn test_start_unreachable_is_transport_error() {
        // Port 9 (discard) on localhost is not listening in test environments
        let api = HttpBotApi::new("http://127.0.0.1:9");
        let err = api
            .start(ExecutionMode::Simulated, &StrategySelector::default())
            .await
            .unwrap_err();
        assert!(err.is_transport(), "Got: {:?}", err);
    }

    #[tokio::test]
    async fn test_stop_acknowledgment_variants() {
        let mut server = mockito::Server::new_async().await;
        let _ok = server
            .mock("POST", "/api/stop")
            .with_status(200)
            .with_body(r#"{"status":"success","message":"Stop signal sent."}"#)
            .create_async()
            .await;
        let api = HttpBotApi::new(server.url());
        let accepted = api.stop().await.unwrap();
        assert_eq!(accepted.message.as_deref(), Some("Stop signal sent."));
    }

    #[tokio::test]
    async fn test_stop_empty_body_is_accepted() {
        let mut server = mockito::Server::new_async().await;
        let _ok = server
            .mock("POST", "/api/stop")
            .with_status(200)
            .create_async()
            .await;
        let api = HttpBotApi::new(server.url());
        assert!(api.stop().await.is_ok());
    }

    #[tokio::test]
    async fn test_stop_not_running_is_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/stop")
            .with_status(200)
            .with_body(r#"{"status":"error","message":"Bot is not running."}"#)
            .create_async()
            .await;
        let api = HttpBotApi::new(server.url());
        let err = api.stop().await.unwrap_err();
        assert!(matches!(err, ClientError::Application(_)));
    }

    #[tokio::test]
    async fn test_fetch_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/status")
            .with_status(200)
            .with_body(r#"{"status":"STOPPED","strategy":null}"#)
            .create_async()
            .await;
        let api = HttpBotApi::new(format!("{}/", server.url()));
        assert_eq!(api.fetch_status().await.unwrap(), RemoteStatus::Stopped);
    }

    #[tokio::test]
    async fn test_fetch_status_malformed_is_protocol_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/status")
            .with_status(200)
            .with_body("<html>gateway</html>")
            .create_async()
            .await;
        let api = HttpBotApi::new(server.url());
        let err = api.fetch_status().await.unwrap_err();
        assert!(matches!(err, ClientError::Protocol(_)));
    }

    #[tokio::test]
    async fn test_fetch_market_data_with_error_field_fails() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/market-data")
            .with_status(200)
            .with_body(r#"{"nifty":0,"vix":0,"pnl":0,"error":"No API Connection"}"#)
            .create_async()
            .await;
        let api = HttpBotApi::new(server.url());
        let err = api.fetch_market_data().await.unwrap_err();
        assert!(matches!(err, ClientError::Application(ref r) if r == "No API Connection"));
    }

    #[tokio::test]
    async fn test_fetch_position_and_sentiment() {
        let mut server = mockito::Server::new_async().await;
        let _trade = server
            .mock("GET", "/api/trade")
            .with_status(200)
            .with_body(
                r#"{"active":true,"details":{"symbol":"NIFTY22500PE","leg":"PE","qty":65,"entry_price":98.0}}"#,
            )
            .create_async()
            .await;
        let _sent = server
            .mock("GET", "/api/sentiment")
            .with_status(200)
            .with_body(r#"{"score":1.7}"#)
            .create_async()
            .await;

        let api = HttpBotApi::new(server.url());
        let pos = api.fetch_position().await.unwrap().unwrap();
        assert_eq!(pos.symbol, "NIFTY22500PE");
        assert_eq!(pos.leg, "PE");
        assert_eq!(api.fetch_sentiment().await.unwrap(), 1.0);
    }

    #[tokio::test]
    async fn test_fetch_news_server_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/news")
            .with_status(503)
            .create_async()
            .await;
        let api = HttpBotApi::new(server.url());
        let err = api.fetch_news().await.unwrap_err();
        match err {
            ClientError::Application(reason) => assert!(reason.contains("503"), "Got: {}", reason),
            other => panic!("Expected Application error, got {:?}", other),
        }
    }
}
