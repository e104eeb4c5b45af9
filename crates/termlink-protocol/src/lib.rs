//! Wire protocol for sequenced terminal streaming.
//!
//! Provides:
//! - Client-to-server messages (`ClientMessage`)
//! - Server-to-client messages (`ServerMessage`) and their payloads
//! - Frame parsing with an unrecognized fallback (`InboundFrame`)

pub mod frame;
pub mod messages;

pub use frame::{InboundFrame, ProtocolError, encode_frame, parse_server_frame};
pub use messages::{
    BufferOverflow, ChunkBatch, ClientMessage, DimensionConfidence, DimensionSource,
    DimensionsConfirmed, DimensionsRejected, NegotiateDimensions, ServerMessage, SyncResponse,
    TerminalChunk,
};
