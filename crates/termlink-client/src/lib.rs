//! Reliable terminal stream client over a reconnecting WebSocket.
//!
//! Provides:
//! - `ConnectionManager` - Per-session state machine, reassembly, acks and heartbeat
//! - `SessionDriver` / `SessionHandle` - Async host for a manager
//! - WebSocket transport (feature: websocket)

pub mod ack;
pub mod clock;
pub mod config;
pub mod dimensions;
pub mod driver;
pub mod error;
pub mod events;
pub mod heartbeat;
pub mod manager;
pub mod queue;
pub mod reassembler;
pub mod reconnect;
pub mod scheduler;
pub mod state;
pub mod transport;

#[cfg(feature = "websocket")]
pub mod websocket;

pub use config::{GapRecovery, SessionConfig};
pub use driver::{SessionDriver, SessionHandle};
pub use error::{ClientError, ConfigError, TransportError};
pub use events::{ChannelEvents, EventLog, SessionEvent, SessionEvents};
pub use manager::ConnectionManager;
pub use queue::SendOutcome;
pub use state::{ConnectionInfo, ConnectionState, StreamSnapshot};
pub use transport::{Transport, TransportEvent, TransportFrame};

#[cfg(feature = "websocket")]
pub use websocket::{WebSocketSession, WsTransport, spawn_session};
