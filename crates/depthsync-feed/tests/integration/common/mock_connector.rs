//! Scripted in-process connector.
//!
//! Each `connect` call consumes the next [`ConnectPlan`] (falling back to a
//! default once the script runs out). Accepted connections hand the test a
//! [`MockLink`], the server side of the transport: it injects events and
//! observes what the client sent.

use depthsync_ws::{BoxFuture, Connector, FeedTransport, TransportEvent, WsError, WsResult};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Upper bound for any single wait in a test (virtual time when paused).
const WAIT: Duration = Duration::from_secs(300);

/// What the next connection attempt does.
#[derive(Debug, Clone)]
pub enum ConnectPlan {
    Accept,
    Fail(String),
    /// Never completes; exercises the connect timeout.
    Hang,
}

impl ConnectPlan {
    pub fn fail(reason: &str) -> Self {
        Self::Fail(reason.to_string())
    }
}

pub struct MockConnector {
    plans: Mutex<VecDeque<ConnectPlan>>,
    fallback: Mutex<ConnectPlan>,
    attempts: Mutex<Vec<Instant>>,
    urls: Mutex<Vec<String>>,
    links_tx: mpsc::UnboundedSender<MockLink>,
    links_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<MockLink>>,
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConnector {
    /// Every attempt fails until plans are queued.
    pub fn new() -> Self {
        let (links_tx, links_rx) = mpsc::unbounded_channel();
        Self {
            plans: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(ConnectPlan::fail("connection refused")),
            attempts: Mutex::new(Vec::new()),
            urls: Mutex::new(Vec::new()),
            links_tx,
            links_rx: tokio::sync::Mutex::new(links_rx),
        }
    }

    pub fn with_plans(plans: impl IntoIterator<Item = ConnectPlan>) -> Self {
        let connector = Self::new();
        connector.plans.lock().extend(plans);
        connector
    }

    pub fn push_plan(&self, plan: ConnectPlan) {
        self.plans.lock().push_back(plan);
    }

    pub fn set_fallback(&self, plan: ConnectPlan) {
        *self.fallback.lock() = plan;
    }

    /// Instants at which `connect` was called.
    pub fn attempts(&self) -> Vec<Instant> {
        self.attempts.lock().clone()
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.lock().len()
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().clone()
    }

    /// Wait for the next accepted connection.
    pub async fn next_link(&self) -> MockLink {
        let mut rx = self.links_rx.lock().await;
        tokio::time::timeout(WAIT, rx.recv())
            .await
            .expect("timed out waiting for a connection")
            .expect("connector dropped")
    }

    fn next_plan(&self) -> ConnectPlan {
        self.plans
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.lock().clone())
    }
}

impl Connector for MockConnector {
    fn connect<'a>(&'a self, url: &'a str) -> BoxFuture<'a, WsResult<Box<dyn FeedTransport>>> {
        Box::pin(async move {
            self.attempts.lock().push(Instant::now());
            self.urls.lock().push(url.to_string());

            match self.next_plan() {
                ConnectPlan::Accept => {
                    let (events_tx, events_rx) = mpsc::unbounded_channel();
                    let (sent_tx, sent_rx) = mpsc::unbounded_channel();
                    let pings = Arc::new(AtomicUsize::new(0));
                    let closed = Arc::new(AtomicBool::new(false));

                    let _ = self.links_tx.send(MockLink {
                        events: events_tx,
                        sent: sent_rx,
                        pings: pings.clone(),
                        closed: closed.clone(),
                    });
                    Ok(Box::new(MockTransport {
                        events: events_rx,
                        sent: sent_tx,
                        pings,
                        closed,
                    }) as Box<dyn FeedTransport>)
                }
                ConnectPlan::Fail(reason) => Err(WsError::ConnectionFailed(reason)),
                ConnectPlan::Hang => std::future::pending().await,
            }
        })
    }
}

/// Server side of one accepted mock connection.
pub struct MockLink {
    events: mpsc::UnboundedSender<TransportEvent>,
    sent: mpsc::UnboundedReceiver<String>,
    pings: Arc<AtomicUsize>,
    closed: Arc<AtomicBool>,
}

impl MockLink {
    /// Deliver a text frame to the client.
    pub fn push(&self, text: impl Into<String>) {
        let _ = self.events.send(TransportEvent::Text(text.into()));
    }

    pub fn push_pong(&self) {
        let _ = self.events.send(TransportEvent::Pong);
    }

    /// Simulate the server closing the connection.
    pub fn close(&self, code: u16, reason: &str) {
        let _ = self.events.send(TransportEvent::Closed {
            code,
            reason: reason.to_string(),
        });
    }

    /// Next frame the client sent.
    pub async fn next_sent(&mut self) -> String {
        tokio::time::timeout(WAIT, self.sent.recv())
            .await
            .expect("timed out waiting for a client frame")
            .expect("transport dropped")
    }

    /// Next frame the client sent, parsed as JSON.
    pub async fn next_sent_json(&mut self) -> serde_json::Value {
        let text = self.next_sent().await;
        serde_json::from_str(&text).expect("client sent invalid JSON")
    }

    pub fn pings(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }

    /// Whether the client closed this connection gracefully.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

struct MockTransport {
    events: mpsc::UnboundedReceiver<TransportEvent>,
    sent: mpsc::UnboundedSender<String>,
    pings: Arc<AtomicUsize>,
    closed: Arc<AtomicBool>,
}

impl FeedTransport for MockTransport {
    fn send_text(&mut self, text: String) -> BoxFuture<'_, WsResult<()>> {
        Box::pin(async move {
            let _ = self.sent.send(text);
            Ok(())
        })
    }

    fn send_ping(&mut self) -> BoxFuture<'_, WsResult<()>> {
        Box::pin(async move {
            self.pings.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    fn next_event(&mut self) -> BoxFuture<'_, WsResult<TransportEvent>> {
        Box::pin(async move {
            Ok(self.events.recv().await.unwrap_or(TransportEvent::Closed {
                code: 1006,
                reason: "link dropped".to_string(),
            }))
        })
    }

    fn close(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.closed.store(true, Ordering::SeqCst);
        })
    }
}
