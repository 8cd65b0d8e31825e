//! tokio-tungstenite transport.

use crate::error::{WsError, WsResult};
use crate::transport::{BoxFuture, Connector, FeedTransport, TransportEvent};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async_tls_with_config, tungstenite::Message, MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connector opening real WebSocket connections.
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteConnector;

impl TungsteniteConnector {
    pub fn new() -> Self {
        Self
    }
}

impl Connector for TungsteniteConnector {
    fn connect<'a>(&'a self, url: &'a str) -> BoxFuture<'a, WsResult<Box<dyn FeedTransport>>> {
        Box::pin(async move {
            info!(url = %url, "Connecting to WebSocket");

            // TCP_NODELAY: book updates are small and latency-sensitive.
            let (stream, _response) = connect_async_tls_with_config(url, None, true, None)
                .await
                .map_err(|e| WsError::ConnectionFailed(e.to_string()))?;

            info!(url = %url, "WebSocket connected");
            Ok(Box::new(TungsteniteTransport { stream }) as Box<dyn FeedTransport>)
        })
    }
}

/// An open tokio-tungstenite connection.
pub struct TungsteniteTransport {
    stream: WsStream,
}

impl FeedTransport for TungsteniteTransport {
    fn send_text(&mut self, text: String) -> BoxFuture<'_, WsResult<()>> {
        Box::pin(async move {
            self.stream.send(Message::Text(text)).await?;
            Ok(())
        })
    }

    fn send_ping(&mut self) -> BoxFuture<'_, WsResult<()>> {
        Box::pin(async move {
            self.stream.send(Message::Ping(Vec::new())).await?;
            Ok(())
        })
    }

    fn next_event(&mut self) -> BoxFuture<'_, WsResult<TransportEvent>> {
        Box::pin(async move {
            loop {
                match self.stream.next().await {
                    Some(Ok(Message::Text(text))) => return Ok(TransportEvent::Text(text)),
                    Some(Ok(Message::Ping(data))) => {
                        debug!("Received ping, sending pong");
                        self.stream.send(Message::Pong(data)).await?;
                    }
                    Some(Ok(Message::Pong(_))) => return Ok(TransportEvent::Pong),
                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = frame
                            .map(|f| (f.code.into(), f.reason.to_string()))
                            .unwrap_or((1000, "Normal close".to_string()));
                        warn!(code, %reason, "WebSocket closed by server");
                        return Ok(TransportEvent::Closed { code, reason });
                    }
                    Some(Ok(Message::Binary(data))) => {
                        debug!(len = data.len(), "Ignoring binary frame");
                    }
                    Some(Ok(Message::Frame(_))) => {}
                    Some(Err(e)) => return Err(e.into()),
                    None => {
                        return Ok(TransportEvent::Closed {
                            code: 1006,
                            reason: "Stream ended".to_string(),
                        })
                    }
                }
            }
        })
    }

    fn close(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            if let Err(e) = self.stream.send(Message::Close(None)).await {
                debug!(?e, "Failed to send Close frame");
            }
        })
    }
}
