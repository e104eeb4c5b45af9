//! Async host for a `ConnectionManager`.
//!
//! The driver owns the manager on a tokio task and serializes everything
//! that touches it: commands from `SessionHandle`s, transport frames and
//! timer deadlines.

use std::time::Instant;

use serde::Serialize;
use serde_json::Value;
use termlink_protocol::{ClientMessage, NegotiateDimensions};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};

use crate::{
    error::ClientError,
    events::SessionEvents,
    manager::ConnectionManager,
    queue::SendOutcome,
    state::{ConnectionInfo, ConnectionState, StreamSnapshot},
    transport::{Transport, TransportFrame},
};

enum Command {
    Connect,
    Disconnect,
    Suspend,
    Resume,
    Retry,
    RequestResync,
    SetDimensions {
        cols: u16,
        rows: u16,
    },
    Send {
        message: Value,
        reply: oneshot::Sender<SendOutcome>,
    },
    Negotiate {
        params: NegotiateDimensions,
        reply: oneshot::Sender<bool>,
    },
    State(oneshot::Sender<ConnectionState>),
    StreamState(oneshot::Sender<StreamSnapshot>),
    ConnectionInfo(oneshot::Sender<ConnectionInfo>),
    Shutdown,
}

/// Cloneable handle to a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Connect => "Connect",
            Self::Disconnect => "Disconnect",
            Self::Suspend => "Suspend",
            Self::Resume => "Resume",
            Self::Retry => "Retry",
            Self::RequestResync => "RequestResync",
            Self::SetDimensions { .. } => "SetDimensions",
            Self::Send { .. } => "Send",
            Self::Negotiate { .. } => "Negotiate",
            Self::State(_) => "State",
            Self::StreamState(_) => "StreamState",
            Self::ConnectionInfo(_) => "ConnectionInfo",
            Self::Shutdown => "Shutdown",
        };
        f.write_str(name)
    }
}

impl SessionHandle {
    fn command(&self, command: Command) -> Result<(), ClientError> {
        self.commands
            .send(command)
            .map_err(|_| ClientError::DriverStopped)
    }

    async fn query<R>(
        &self,
        make: impl FnOnce(oneshot::Sender<R>) -> Command,
    ) -> Result<R, ClientError> {
        let (reply, rx) = oneshot::channel();
        self.command(make(reply))?;
        rx.await.map_err(|_| ClientError::DriverStopped)
    }

    /// # Errors
    /// Returns error if the driver has stopped.
    pub fn connect(&self) -> Result<(), ClientError> {
        self.command(Command::Connect)
    }

    /// # Errors
    /// Returns error if the driver has stopped.
    pub fn disconnect(&self) -> Result<(), ClientError> {
        self.command(Command::Disconnect)
    }

    /// # Errors
    /// Returns error if the driver has stopped.
    pub fn suspend(&self) -> Result<(), ClientError> {
        self.command(Command::Suspend)
    }

    /// # Errors
    /// Returns error if the driver has stopped.
    pub fn resume(&self) -> Result<(), ClientError> {
        self.command(Command::Resume)
    }

    /// # Errors
    /// Returns error if the driver has stopped.
    pub fn retry(&self) -> Result<(), ClientError> {
        self.command(Command::Retry)
    }

    /// # Errors
    /// Returns error if the driver has stopped.
    pub fn request_resync(&self) -> Result<(), ClientError> {
        self.command(Command::RequestResync)
    }

    /// # Errors
    /// Returns error if the driver has stopped.
    pub fn set_terminal_dimensions(&self, cols: u16, rows: u16) -> Result<(), ClientError> {
        self.command(Command::SetDimensions { cols, rows })
    }

    /// Send an arbitrary message, queueing it while disconnected.
    ///
    /// # Errors
    /// Returns error if the message cannot be serialized or the driver has stopped.
    pub async fn send<M: Serialize + ?Sized>(&self, message: &M) -> Result<SendOutcome, ClientError> {
        let message = serde_json::to_value(message)?;
        self.query(|reply| Command::Send { message, reply }).await
    }

    /// Send user input.
    ///
    /// # Errors
    /// Returns error if the driver has stopped.
    pub async fn send_input(&self, data: impl Into<String>) -> Result<SendOutcome, ClientError> {
        self.send(&ClientMessage::input(data)).await
    }

    /// # Errors
    /// Returns error if the driver has stopped.
    pub async fn negotiate_dimensions(
        &self,
        params: NegotiateDimensions,
    ) -> Result<bool, ClientError> {
        self.query(|reply| Command::Negotiate { params, reply }).await
    }

    /// # Errors
    /// Returns error if the driver has stopped.
    pub async fn state(&self) -> Result<ConnectionState, ClientError> {
        self.query(Command::State).await
    }

    /// # Errors
    /// Returns error if the driver has stopped.
    pub async fn stream_state(&self) -> Result<StreamSnapshot, ClientError> {
        self.query(Command::StreamState).await
    }

    /// # Errors
    /// Returns error if the driver has stopped.
    pub async fn connection_info(&self) -> Result<ConnectionInfo, ClientError> {
        self.query(Command::ConnectionInfo).await
    }

    /// Disconnect and stop the driver task.
    ///
    /// # Errors
    /// Returns error if the driver has already stopped.
    pub fn shutdown(&self) -> Result<(), ClientError> {
        self.command(Command::Shutdown)
    }
}

/// Runs a manager on a tokio task.
pub struct SessionDriver;

impl SessionDriver {
    /// Spawn `manager` onto the current runtime.
    ///
    /// `frames` must receive every event the manager's transport produces.
    /// The task ends after `shutdown()` or once every handle is dropped, and
    /// yields the manager back.
    pub fn spawn<T, E>(
        manager: ConnectionManager<T, E>,
        frames: mpsc::UnboundedReceiver<TransportFrame>,
    ) -> (SessionHandle, JoinHandle<ConnectionManager<T, E>>)
    where
        T: Transport + Send + 'static,
        E: SessionEvents + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(manager, rx, frames));
        (SessionHandle { commands: tx }, task)
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline.into()).await,
        None => std::future::pending().await,
    }
}

async fn run<T, E>(
    mut manager: ConnectionManager<T, E>,
    mut commands: mpsc::UnboundedReceiver<Command>,
    mut frames: mpsc::UnboundedReceiver<TransportFrame>,
) -> ConnectionManager<T, E>
where
    T: Transport,
    E: SessionEvents,
{
    tracing::debug!(client_id = %manager.client_id(), "Session driver started");
    loop {
        let deadline = manager.next_deadline();
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else {
                    manager.disconnect();
                    break;
                };
                if matches!(command, Command::Shutdown) {
                    manager.disconnect();
                    break;
                }
                apply(&mut manager, command);
            }
            Some(frame) = frames.recv() => manager.handle_transport_frame(frame),
            () = sleep_until(deadline) => {
                manager.fire_due_timers();
            }
        }
    }
    tracing::debug!(client_id = %manager.client_id(), "Session driver stopped");
    manager
}

fn apply<T, E>(manager: &mut ConnectionManager<T, E>, command: Command)
where
    T: Transport,
    E: SessionEvents,
{
    tracing::trace!(?command, "Driver command");
    match command {
        Command::Connect => manager.connect(),
        Command::Disconnect => manager.disconnect(),
        Command::Suspend => manager.suspend(),
        Command::Resume => manager.resume(),
        Command::Retry => manager.retry(),
        Command::RequestResync => manager.request_resync(),
        Command::SetDimensions { cols, rows } => manager.set_terminal_dimensions(cols, rows),
        Command::Send { message, reply } => {
            let _ = reply.send(manager.dispatch(&message));
        }
        Command::Negotiate { params, reply } => {
            let _ = reply.send(manager.negotiate_dimensions(params));
        }
        Command::State(reply) => {
            let _ = reply.send(manager.state());
        }
        Command::StreamState(reply) => {
            let _ = reply.send(manager.stream_state());
        }
        Command::ConnectionInfo(reply) => {
            let _ = reply.send(manager.connection_info());
        }
        Command::Shutdown => {}
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio_test::assert_ok;

    use super::*;
    use crate::{config::SessionConfig, error::TransportError, events::EventLog, transport::TransportEvent};

    /// Loops every open straight back as `Opened`.
    struct LoopbackTransport {
        frames: mpsc::UnboundedSender<TransportFrame>,
        sent: mpsc::UnboundedSender<String>,
    }

    impl Transport for LoopbackTransport {
        fn open(&mut self, generation: u64) -> Result<(), TransportError> {
            self.frames
                .send(TransportFrame {
                    generation,
                    event: TransportEvent::Opened,
                })
                .map_err(|_| TransportError::ChannelClosed)
        }

        fn send(&mut self, text: String) -> Result<(), TransportError> {
            self.sent.send(text).map_err(|_| TransportError::ChannelClosed)
        }

        fn close(&mut self, _code: u16, _reason: &str) {}
    }

    fn spawn_loopback() -> (
        SessionHandle,
        JoinHandle<ConnectionManager<LoopbackTransport, EventLog>>,
        mpsc::UnboundedReceiver<String>,
    ) {
        let (frames_tx, frames_rx) = mpsc::unbounded_channel();
        let (sent_tx, sent_rx) = mpsc::unbounded_channel();
        let transport = LoopbackTransport {
            frames: frames_tx,
            sent: sent_tx,
        };
        let manager =
            ConnectionManager::new(SessionConfig::new("ws://loopback"), transport, EventLog::default());
        let (handle, task) = SessionDriver::spawn(manager, frames_rx);
        (handle, task, sent_rx)
    }

    #[tokio::test]
    async fn test_handle_drives_manager() {
        let (handle, task, mut sent) = spawn_loopback();

        assert_eq!(handle.state().await.unwrap(), ConnectionState::Initial);
        assert_ok!(handle.connect());

        let sync: Value = serde_json::from_str(&sent.recv().await.unwrap()).unwrap();
        assert_eq!(sync["type"], "sync_request");
        assert_eq!(handle.state().await.unwrap(), ConnectionState::Connected);

        let outcome = handle.send(&json!({"type": "input", "data": "ls"})).await.unwrap();
        assert_eq!(outcome, SendOutcome::Sent);

        assert_ok!(handle.shutdown());
        let manager = task.await.unwrap();
        assert_eq!(manager.state(), ConnectionState::Initial);
        assert_eq!(
            manager.events().states(),
            vec![
                ConnectionState::Connecting,
                ConnectionState::Connected,
                ConnectionState::Initial
            ]
        );
    }

    #[tokio::test]
    async fn test_queries_fail_after_shutdown() {
        let (handle, task, _sent) = spawn_loopback();
        handle.shutdown().unwrap();
        task.await.unwrap();

        assert!(matches!(handle.state().await, Err(ClientError::DriverStopped)));
        assert!(matches!(handle.connect(), Err(ClientError::DriverStopped)));
    }

    #[tokio::test]
    async fn test_send_queues_while_disconnected() {
        let (handle, _task, _sent) = spawn_loopback();
        let outcome = handle.send_input("pending").await.unwrap();
        assert_eq!(outcome, SendOutcome::Queued);
        assert_eq!(handle.connection_info().await.unwrap().queued_message_count, 1);
    }
}
