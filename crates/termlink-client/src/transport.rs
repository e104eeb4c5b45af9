//! Transport adapter seam.
//!
//! The manager drives one socket at a time through `Transport` and learns
//! what happened through `TransportFrame`s fed back by the host. Each open
//! carries a generation number so frames from a superseded socket can be
//! recognised and ignored.

use crate::error::TransportError;

/// Normal closure.
pub const CLOSE_NORMAL: u16 = 1000;
/// Closed without a close frame.
pub const CLOSE_ABNORMAL: u16 = 1006;
/// Closed by the client after missed heartbeats.
pub const CLOSE_HEARTBEAT_TIMEOUT: u16 = 4000;
/// Closed by the client after the transport reported an error.
pub const CLOSE_TRANSPORT_ERROR: u16 = 4001;

/// Raw socket event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Opened,
    /// One text frame.
    Message(String),
    Closed {
        code: u16,
        reason: String,
        /// Orderly closure; no retry is wanted.
        clean: bool,
    },
    Error(String),
}

impl TransportEvent {
    /// A close event, clean when `code` is a normal closure.
    #[must_use]
    pub fn closed(code: u16, reason: impl Into<String>) -> Self {
        Self::Closed {
            code,
            reason: reason.into(),
            clean: code == CLOSE_NORMAL,
        }
    }
}

/// A socket event tagged with the socket it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportFrame {
    pub generation: u64,
    pub event: TransportEvent,
}

/// One socket at a time.
pub trait Transport {
    /// Start opening a socket. Completion is reported as `Opened` (or
    /// `Error`/`Closed`) tagged with `generation`.
    ///
    /// # Errors
    /// Returns error if the socket cannot even be started.
    fn open(&mut self, generation: u64) -> Result<(), TransportError>;

    /// Write one text frame to the open socket.
    ///
    /// # Errors
    /// Returns error if no socket is open.
    fn send(&mut self, text: String) -> Result<(), TransportError>;

    /// Close the current socket, if any.
    fn close(&mut self, code: u16, reason: &str);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_clean_flag_follows_code() {
        assert!(matches!(
            TransportEvent::closed(CLOSE_NORMAL, "bye"),
            TransportEvent::Closed { clean: true, .. }
        ));
        assert!(matches!(
            TransportEvent::closed(CLOSE_ABNORMAL, ""),
            TransportEvent::Closed { clean: false, .. }
        ));
    }
}
