//! WebSocket error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WsError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Connection closed: code={code}, reason={reason}")]
    ConnectionClosed { code: u16, reason: String },

    #[error("Connect timed out after {0}ms")]
    ConnectTimeout(u64),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Heartbeat timeout")]
    HeartbeatTimeout,

    #[error("Malformed message: {0}")]
    Malformed(String),

    #[error("Unknown message type: {0}")]
    UnknownMessage(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Tungstenite error: {0}")]
    Tungstenite(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WsError {
    /// Transport-level failure that the reconnect policy should absorb.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed(_)
                | Self::ConnectionClosed { .. }
                | Self::ConnectTimeout(_)
                | Self::SendFailed(_)
                | Self::HeartbeatTimeout
                | Self::Tungstenite(_)
        )
    }

    /// Message that should be dropped without touching connection state.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::Malformed(_) | Self::UnknownMessage(_) | Self::Json(_)
        )
    }

    /// Short label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::ConnectionFailed(_) => "connect_failed",
            Self::ConnectionClosed { .. } => "closed",
            Self::ConnectTimeout(_) => "connect_timeout",
            Self::SendFailed(_) => "send_failed",
            Self::HeartbeatTimeout => "heartbeat_timeout",
            Self::Malformed(_) => "malformed",
            Self::UnknownMessage(_) => "unknown_type",
            Self::Protocol(_) => "protocol",
            Self::Tungstenite(_) => "transport",
            Self::Json(_) => "invalid_json",
        }
    }
}

pub type WsResult<T> = Result<T, WsError>;
