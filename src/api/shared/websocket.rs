//! WebSocket connection helpers
//!
//! `ws://` endpoints are opened directly; `wss://` endpoints go through a
//! native-tls connector pinned to TLSv1.2 minimum.

use tokio_tungstenite::{
    connect_async, connect_async_tls_with_config, Connector, MaybeTlsStream, WebSocketStream,
};

use crate::api::errors::{ClientError, ClientResult};

/// Type alias for the (possibly TLS) WebSocket stream
pub type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Open a WebSocket to `url`, using TLS for `wss://`
pub async fn connect_ws(url: &str) -> ClientResult<WsStream> {
    if url.starts_with("wss://") {
        return connect_tls(url).await;
    }

    let (ws_stream, _response) = connect_async(url).await?;
    Ok(ws_stream)
}

/// Connect to a WebSocket endpoint with TLS (TLSv1.2 minimum)
async fn connect_tls(url: &str) -> ClientResult<WsStream> {
    let tls = native_tls::TlsConnector::builder()
        .min_protocol_version(Some(native_tls::Protocol::Tlsv12))
        .build()
        .map_err(|e| ClientError::Transport(format!("TLS error: {}", e)))?;

    let (ws_stream, _response) =
        connect_async_tls_with_config(url, None, false, Some(Connector::NativeTls(tls))).await?;

    Ok(ws_stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_refused_is_transport() {
        let err = connect_ws("ws://127.0.0.1:9/ws/logs").await.unwrap_err();
        assert!(err.is_transport(), "Got: {:?}", err);
    }

    #[tokio::test]
    async fn test_connect_invalid_url() {
        let err = connect_ws("not a url").await.unwrap_err();
        assert!(matches!(err, ClientError::WebSocket(_)));
    }
}
