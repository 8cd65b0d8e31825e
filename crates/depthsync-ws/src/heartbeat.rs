//! Heartbeat monitoring for WebSocket connections.
//!
//! A ping is due once the link has been idle for one interval. The link is
//! considered dead when nothing at all (data or pong) has arrived for two
//! intervals.

use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Liveness tracker for one connection. An interval of zero disables it.
#[derive(Debug)]
pub struct HeartbeatMonitor {
    interval: Duration,
    last_ping: Option<Instant>,
    last_activity: Instant,
    waiting_for_pong: bool,
}

impl HeartbeatMonitor {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_ping: None,
            last_activity: Instant::now(),
            waiting_for_pong: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.interval.is_zero()
    }

    /// Record that a ping was sent.
    pub fn record_ping(&mut self) {
        self.last_ping = Some(Instant::now());
        self.waiting_for_pong = true;
    }

    /// Record that a pong was received.
    pub fn record_pong(&mut self) {
        let now = Instant::now();
        self.last_activity = now;
        self.waiting_for_pong = false;
        if let Some(ping) = self.last_ping {
            debug!(rtt_ms = (now - ping).as_millis() as u64, "Received pong");
        }
    }

    /// Record that any message was received.
    pub fn record_message(&mut self) {
        self.last_activity = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_activity.elapsed()
    }

    /// No traffic for two intervals.
    pub fn is_timed_out(&self) -> bool {
        self.is_enabled() && self.idle_for() >= self.interval * 2
    }

    /// Idle for one interval and no ping outstanding.
    pub fn should_send_ping(&self) -> bool {
        self.is_enabled() && !self.waiting_for_pong && self.idle_for() >= self.interval
    }

    /// Wait for the next heartbeat check. Never completes when disabled.
    pub async fn wait_for_check(&self) {
        if self.is_enabled() {
            tokio::time::sleep(self.interval / 2).await;
        } else {
            std::future::pending::<()>().await;
        }
    }
}
