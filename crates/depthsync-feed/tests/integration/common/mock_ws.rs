//! Mock market-data WebSocket server for integration tests.
//!
//! Provides a simple WebSocket server that can:
//! - Accept connections
//! - Acknowledge SUBSCRIBE frames and reply with scripted market data
//! - Record received messages
//! - Close every open connection on demand

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex, Notify};
use tokio_tungstenite::{accept_async, tungstenite::Message};

/// A mock market-data server.
pub struct MockFeedServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    messages: Arc<Mutex<Vec<String>>>,
    connections: Arc<Mutex<u32>>,
    kick: Arc<Notify>,
}

impl MockFeedServer {
    /// Start a server that answers every SUBSCRIBE with an ack followed by `replies`.
    pub async fn start(replies: Vec<String>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let messages: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let connections: Arc<Mutex<u32>> = Arc::new(Mutex::new(0));
        let kick = Arc::new(Notify::new());
        let replies = Arc::new(replies);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let messages_clone = messages.clone();
        let connections_clone = connections.clone();
        let kick_clone = kick.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Ok((stream, _)) = listener.accept() => {
                        tokio::spawn(handle_connection(
                            stream,
                            messages_clone.clone(),
                            connections_clone.clone(),
                            kick_clone.clone(),
                            replies.clone(),
                        ));
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
        });

        Self {
            addr,
            shutdown_tx,
            messages,
            connections,
            kick,
        }
    }

    /// Get the server's WebSocket URL.
    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Get the number of connections received.
    pub async fn connection_count(&self) -> u32 {
        *self.connections.lock().await
    }

    /// Get all received messages.
    pub async fn received_messages(&self) -> Vec<String> {
        self.messages.lock().await.clone()
    }

    /// Close every currently open connection with a Close frame.
    pub fn disconnect_all(&self) {
        self.kick.notify_waiters();
    }

    /// Stop accepting connections.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

async fn handle_connection(
    stream: TcpStream,
    messages: Arc<Mutex<Vec<String>>>,
    connections: Arc<Mutex<u32>>,
    kick: Arc<Notify>,
    replies: Arc<Vec<String>>,
) {
    {
        let mut count = connections.lock().await;
        *count += 1;
    }

    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            eprintln!("WebSocket handshake failed: {}", e);
            return;
        }
    };

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            () = kick.notified() => {
                let _ = write.send(Message::Close(None)).await;
                break;
            }
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    messages.lock().await.push(text.clone());

                    let Ok(parsed) = serde_json::from_str::<serde_json::Value>(&text) else {
                        continue;
                    };
                    if parsed.get("method") != Some(&serde_json::json!("SUBSCRIBE")) {
                        continue;
                    }
                    let ack = serde_json::json!({ "id": parsed["id"], "result": null });
                    let _ = write.send(Message::Text(ack.to_string())).await;
                    for reply in replies.iter() {
                        let _ = write.send(Message::Text(reply.clone())).await;
                    }
                }
                Some(Ok(Message::Ping(data))) => {
                    let _ = write.send(Message::Pong(data)).await;
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                _ => {}
            }
        }
    }
}
