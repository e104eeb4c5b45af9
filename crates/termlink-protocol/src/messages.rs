//! Wire messages exchanged over the session WebSocket.

use serde::{Deserialize, Serialize};

/// Message from client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// (Re)synchronize stream position and terminal size.
    SyncRequest { last_seq: u64, cols: u16, rows: u16 },
    /// Batched acknowledgement of contiguous progress.
    Ack { ack_seq: u64 },
    /// Liveness probe.
    Ping { timestamp: u64 },
    /// Reply to a server-initiated ping.
    Pong {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<u64>,
    },
    /// Propose a terminal size.
    NegotiateDimensions(NegotiateDimensions),
    /// Raw user input.
    Input { data: String },
    /// Input destined for the interactive terminal.
    TerminalInput { data: String },
    /// Explicit resize of the remote terminal.
    Resize { cols: u16, rows: u16 },
    /// Interrupt the running process.
    Interrupt,
}

impl ClientMessage {
    /// Create an input message.
    #[must_use]
    pub fn input(data: impl Into<String>) -> Self {
        Self::Input { data: data.into() }
    }

    /// Create a terminal input message.
    #[must_use]
    pub fn terminal_input(data: impl Into<String>) -> Self {
        Self::TerminalInput { data: data.into() }
    }

    /// Wire discriminator of this message.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::SyncRequest { .. } => "sync_request",
            Self::Ack { .. } => "ack",
            Self::Ping { .. } => "ping",
            Self::Pong { .. } => "pong",
            Self::NegotiateDimensions(_) => "negotiate_dimensions",
            Self::Input { .. } => "input",
            Self::TerminalInput { .. } => "terminal_input",
            Self::Resize { .. } => "resize",
            Self::Interrupt => "interrupt",
        }
    }
}

/// How much the client trusts its proposed size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DimensionConfidence {
    High,
    Medium,
    Low,
}

/// Where the proposed size came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DimensionSource {
    /// Measured by the terminal's fit addon.
    FitAddon,
    /// Derived from the container element.
    Container,
    /// Estimated from font metrics.
    Estimation,
    /// Nothing better was available.
    Defaults,
}

/// Payload of a `negotiate_dimensions` message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NegotiateDimensions {
    pub cols: u16,
    pub rows: u16,
    pub confidence: DimensionConfidence,
    pub source: DimensionSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cell_width: Option<f64>,
    #[serde(default)]
    pub font_loaded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_hint: Option<String>,
}

/// Message from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Authoritative resync point.
    SyncResponse(SyncResponse),
    /// Incremental output.
    TerminalChunk(TerminalChunk),
    /// Bulk backfill of consecutive chunks.
    ChunkBatch(ChunkBatch),
    /// Server discarded history the client had not consumed.
    BufferOverflow(BufferOverflow),
    /// Server-initiated liveness probe.
    Ping {
        #[serde(default)]
        timestamp: Option<u64>,
    },
    /// Reply to a client ping.
    Pong {
        #[serde(default)]
        timestamp: Option<u64>,
    },
    /// Size negotiation accepted (possibly adjusted).
    DimensionsConfirmed(DimensionsConfirmed),
    /// Size negotiation refused.
    DimensionsRejected(DimensionsRejected),
}

impl ServerMessage {
    /// Wire discriminators this enum knows how to decode.
    pub const KNOWN_TYPES: [&'static str; 8] = [
        "sync_response",
        "terminal_chunk",
        "chunk_batch",
        "buffer_overflow",
        "ping",
        "pong",
        "dimensions_confirmed",
        "dimensions_rejected",
    ];

    /// Whether `kind` is decoded into a typed variant.
    #[must_use]
    pub fn is_known_type(kind: &str) -> bool {
        Self::KNOWN_TYPES.iter().any(|known| *known == kind)
    }
}

/// Payload of a `sync_response` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResponse {
    pub buffer_start_seq: u64,
    pub buffer_end_seq: u64,
    #[serde(default)]
    pub cols: Option<u16>,
    #[serde(default)]
    pub rows: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_buffer: Option<String>,
}

/// Payload of a `terminal_chunk` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalChunk {
    pub seq: u64,
    pub data: String,
}

/// Payload of a `chunk_batch` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkBatch {
    pub start_seq: u64,
    pub chunk_count: u64,
    pub data: String,
}

/// Payload of a `buffer_overflow` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferOverflow {
    pub new_start_seq: u64,
    #[serde(default)]
    pub requires_resync: bool,
}

/// Payload of a `dimensions_confirmed` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionsConfirmed {
    pub cols: u16,
    pub rows: u16,
    #[serde(default)]
    pub adjusted: bool,
}

/// Payload of a `dimensions_rejected` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionsRejected {
    pub reason: String,
    #[serde(default)]
    pub suggested_cols: Option<u16>,
    #[serde(default)]
    pub suggested_rows: Option<u16>,
}
