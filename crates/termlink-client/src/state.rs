//! Connection and stream state types exposed to collaborators.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Not connected and not trying to.
    #[default]
    Initial,
    /// Socket opening.
    Connecting,
    /// Socket open.
    Connected,
    /// Waiting out a retry delay.
    Backoff,
    /// Retry delay elapsed; about to open a new socket.
    Reconnecting,
    /// Socket reports open but liveness traffic stopped.
    Stale,
    /// Reconnect attempts exhausted; waiting for an explicit retry.
    Failed,
    /// Deliberately paused by the host.
    Suspended,
}

impl ConnectionState {
    /// Whether the socket is open and writable.
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected | Self::Stale)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Backoff => "backoff",
            Self::Reconnecting => "reconnecting",
            Self::Stale => "stale",
            Self::Failed => "failed",
            Self::Suspended => "suspended",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the stream reassembly position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StreamSnapshot {
    pub last_contiguous_seq: u64,
    /// Number of buffered out-of-order entries.
    pub pending_chunks: usize,
    pub last_acked_seq: u64,
}

/// Reconnect and queue counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ConnectionInfo {
    pub reconnect_attempt: u32,
    pub max_reconnect_attempts: u32,
    pub queued_message_count: usize,
}
