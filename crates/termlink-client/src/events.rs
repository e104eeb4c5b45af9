//! Callbacks from the manager to its collaborator.

use serde_json::Value;
use termlink_protocol::{DimensionsConfirmed, DimensionsRejected, SyncResponse};
use tokio::sync::mpsc;

use crate::state::ConnectionState;

/// Named event handlers invoked synchronously by the manager.
///
/// Every method has a no-op default so collaborators implement only what
/// they render.
pub trait SessionEvents {
    /// The connection state changed.
    fn on_state_change(&mut self, _state: ConnectionState) {}

    /// A message the core does not handle itself.
    fn on_message(&mut self, _message: &Value) {}

    /// Terminal output, in sequence order, each chunk once.
    fn on_terminal_data(&mut self, _data: &str) {}

    /// The server answered a sync request. Fires before any `full_buffer`
    /// backfill is delivered through `on_terminal_data`.
    fn on_sync_response(&mut self, _response: &SyncResponse) {}

    /// The connection stopped exchanging liveness traffic.
    fn on_stale(&mut self) {}

    fn on_dimensions_confirmed(&mut self, _confirmed: &DimensionsConfirmed) {}

    fn on_dimensions_rejected(&mut self, _rejected: &DimensionsRejected) {}
}

/// Owned form of every callback.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StateChanged(ConnectionState),
    Message(Value),
    TerminalData(String),
    SyncResponse(SyncResponse),
    Stale,
    DimensionsConfirmed(DimensionsConfirmed),
    DimensionsRejected(DimensionsRejected),
}

/// Forwards every callback over a channel.
#[derive(Debug, Clone)]
pub struct ChannelEvents {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl ChannelEvents {
    /// Create the event sink and the receiving end for the collaborator.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn emit(&self, event: SessionEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("Session event receiver dropped");
        }
    }
}

impl SessionEvents for ChannelEvents {
    fn on_state_change(&mut self, state: ConnectionState) {
        self.emit(SessionEvent::StateChanged(state));
    }

    fn on_message(&mut self, message: &Value) {
        self.emit(SessionEvent::Message(message.clone()));
    }

    fn on_terminal_data(&mut self, data: &str) {
        self.emit(SessionEvent::TerminalData(data.to_string()));
    }

    fn on_sync_response(&mut self, response: &SyncResponse) {
        self.emit(SessionEvent::SyncResponse(response.clone()));
    }

    fn on_stale(&mut self) {
        self.emit(SessionEvent::Stale);
    }

    fn on_dimensions_confirmed(&mut self, confirmed: &DimensionsConfirmed) {
        self.emit(SessionEvent::DimensionsConfirmed(confirmed.clone()));
    }

    fn on_dimensions_rejected(&mut self, rejected: &DimensionsRejected) {
        self.emit(SessionEvent::DimensionsRejected(rejected.clone()));
    }
}

/// Records every callback in order.
#[derive(Debug, Default)]
pub struct EventLog {
    pub events: Vec<SessionEvent>,
}

impl EventLog {
    /// Terminal payloads received so far.
    #[must_use]
    pub fn terminal_data(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|event| match event {
                SessionEvent::TerminalData(data) => Some(data.as_str()),
                _ => None,
            })
            .collect()
    }

    /// State transitions observed so far.
    #[must_use]
    pub fn states(&self) -> Vec<ConnectionState> {
        self.events
            .iter()
            .filter_map(|event| match event {
                SessionEvent::StateChanged(state) => Some(*state),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl SessionEvents for EventLog {
    fn on_state_change(&mut self, state: ConnectionState) {
        self.events.push(SessionEvent::StateChanged(state));
    }

    fn on_message(&mut self, message: &Value) {
        self.events.push(SessionEvent::Message(message.clone()));
    }

    fn on_terminal_data(&mut self, data: &str) {
        self.events.push(SessionEvent::TerminalData(data.to_string()));
    }

    fn on_sync_response(&mut self, response: &SyncResponse) {
        self.events.push(SessionEvent::SyncResponse(response.clone()));
    }

    fn on_stale(&mut self) {
        self.events.push(SessionEvent::Stale);
    }

    fn on_dimensions_confirmed(&mut self, confirmed: &DimensionsConfirmed) {
        self.events
            .push(SessionEvent::DimensionsConfirmed(confirmed.clone()));
    }

    fn on_dimensions_rejected(&mut self, rejected: &DimensionsRejected) {
        self.events.push(SessionEvent::DimensionsRejected(rejected.clone()));
    }
}
