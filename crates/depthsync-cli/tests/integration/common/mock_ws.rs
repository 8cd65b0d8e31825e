//! Minimal scripted market-data WebSocket server.
//!
//! Acknowledges every SUBSCRIBE frame and then sends the scripted replies.
//! SUBSCRIBE frames can be rejected to exercise protocol errors.

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_tungstenite::{accept_async, tungstenite::Message};

pub struct MockFeedServer {
    addr: SocketAddr,
}

impl MockFeedServer {
    /// Start a server that acks subscriptions and then sends `replies`.
    pub async fn start(replies: Vec<String>) -> Self {
        Self::spawn(replies, true).await
    }

    /// Start a server that rejects every subscription.
    pub async fn rejecting() -> Self {
        Self::spawn(Vec::new(), false).await
    }

    async fn spawn(replies: Vec<String>, accept: bool) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let replies = Arc::new(replies);

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let replies = replies.clone();
                tokio::spawn(async move {
                    let Ok(ws) = accept_async(stream).await else {
                        return;
                    };
                    let (mut write, mut read) = ws.split();
                    while let Some(Ok(msg)) = read.next().await {
                        let Message::Text(text) = msg else {
                            continue;
                        };
                        let Ok(frame) = serde_json::from_str::<serde_json::Value>(&text) else {
                            continue;
                        };
                        if frame["method"] != "SUBSCRIBE" {
                            continue;
                        }
                        let ack = if accept {
                            serde_json::json!({ "id": frame["id"], "result": null })
                        } else {
                            serde_json::json!({
                                "id": frame["id"],
                                "error": { "code": 2, "msg": "Invalid symbol" }
                            })
                        };
                        let _ = write.send(Message::Text(ack.to_string())).await;
                        if accept {
                            for reply in replies.iter() {
                                let _ = write.send(Message::Text(reply.clone())).await;
                            }
                        }
                    }
                });
            }
        });

        Self { addr }
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }
}
