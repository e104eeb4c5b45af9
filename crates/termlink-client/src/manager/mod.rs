//! Per-session connection manager.
//!
//! One `ConnectionManager` owns every piece of mutable state for one logical
//! session: the connection state machine, stream reassembly, ack batching,
//! heartbeat, the outbound queue and dimension negotiation. It is driven
//! from a single thread by three kinds of input: public API calls,
//! transport frames (`handle_transport_frame`) and elapsed timers
//! (`fire_due_timers`). It never blocks and never spawns.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use termlink_protocol::{
    BufferOverflow, ClientMessage, InboundFrame, NegotiateDimensions, ServerMessage, SyncResponse,
    encode_frame, parse_server_frame,
};
use uuid::Uuid;

use crate::{
    ack::AckBatcher,
    clock::{Clock, SystemClock},
    config::{GapRecovery, SessionConfig},
    dimensions::DimensionNegotiator,
    events::SessionEvents,
    heartbeat::{HeartbeatMonitor, PongVerdict},
    queue::{OutboundQueue, SendOutcome},
    reassembler::{ChunkOutcome, GapCheck, ResyncReason, SequenceReassembler},
    reconnect::{ReconnectPolicy, RetryDecision},
    scheduler::{Scheduler, TimerKind},
    state::{ConnectionInfo, ConnectionState, StreamSnapshot},
    transport::{
        CLOSE_HEARTBEAT_TIMEOUT, CLOSE_NORMAL, CLOSE_TRANSPORT_ERROR, Transport, TransportEvent,
        TransportFrame,
    },
};


/// Connection manager for one session.
pub struct ConnectionManager<T, E>
where
    T: Transport,
    E: SessionEvents,
{
    config: SessionConfig,
    client_id: Uuid,
    transport: T,
    events: E,
    clock: Arc<dyn Clock>,
    state: ConnectionState,
    scheduler: Scheduler,
    reconnect: ReconnectPolicy,
    reassembler: SequenceReassembler,
    acks: AckBatcher,
    heartbeat: HeartbeatMonitor,
    queue: OutboundQueue,
    dimensions: DimensionNegotiator,
    /// Generation handed to the most recent `Transport::open`.
    last_generation: u64,
    /// Generation of the socket that is opening or open.
    active_socket: Option<u64>,
    /// A resume-style gap recovery was already tried for the current gap.
    gap_resume_sent: bool,
}

impl<T, E> ConnectionManager<T, E>
where
    T: Transport,
    E: SessionEvents,
{
    /// Create a manager using the system clock.
    #[must_use]
    pub fn new(config: SessionConfig, transport: T, events: E) -> Self {
        Self::with_clock(config, transport, events, Arc::new(SystemClock))
    }

    /// Create a manager with an explicit time source.
    #[must_use]
    pub fn with_clock(
        config: SessionConfig,
        transport: T,
        events: E,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            client_id: Uuid::new_v4(),
            transport,
            events,
            clock,
            state: ConnectionState::Initial,
            scheduler: Scheduler::new(),
            reconnect: ReconnectPolicy::from_config(&config),
            reassembler: SequenceReassembler::new(config.max_pending_chunks),
            acks: AckBatcher::new(),
            heartbeat: HeartbeatMonitor::new(config.max_missed_pongs, config.stale_threshold()),
            queue: OutboundQueue::new(config.max_queue_size),
            dimensions: DimensionNegotiator::new(config.initial_cols, config.initial_rows),
            last_generation: 0,
            active_socket: None,
            gap_resume_sent: false,
            config,
        }
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    #[must_use]
    pub fn stream_state(&self) -> StreamSnapshot {
        StreamSnapshot {
            last_contiguous_seq: self.reassembler.last_contiguous(),
            pending_chunks: self.reassembler.pending_len(),
            last_acked_seq: self.acks.last_acked(),
        }
    }

    #[must_use]
    pub fn connection_info(&self) -> ConnectionInfo {
        ConnectionInfo {
            reconnect_attempt: self.reconnect.attempt(),
            max_reconnect_attempts: self.reconnect.max_attempts(),
            queued_message_count: self.queue.len(),
        }
    }

    /// Current local terminal size.
    #[must_use]
    pub const fn dimensions(&self) -> (u16, u16) {
        self.dimensions.dimensions()
    }

    #[must_use]
    pub const fn client_id(&self) -> Uuid {
        self.client_id
    }

    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[must_use]
    pub const fn events(&self) -> &E {
        &self.events
    }

    pub const fn events_mut(&mut self) -> &mut E {
        &mut self.events
    }

    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    pub const fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// When the host should next call `fire_due_timers`.
    #[must_use]
    pub fn next_deadline(&self) -> Option<std::time::Instant> {
        self.scheduler.next_deadline()
    }

    // ---------------------------------------------------------------------
    // Lifecycle commands
    // ---------------------------------------------------------------------

    /// Start connecting. Acts from `initial`, and from `backoff` by skipping
    /// the remaining wait.
    pub fn connect(&mut self) {
        match self.state {
            ConnectionState::Initial => {}
            ConnectionState::Backoff => {
                self.scheduler.cancel(TimerKind::Backoff);
            }
            state => {
                tracing::debug!(client_id = %self.client_id, %state, "connect() ignored");
                return;
            }
        }
        self.open_socket();
    }

    /// Abandon the session: cancel every timer, drop queued messages and
    /// close the socket.
    pub fn disconnect(&mut self) {
        let cancelled = self.scheduler.cancel_all();
        let dropped = self.queue.len();
        self.queue.clear();
        self.close_socket(CLOSE_NORMAL, "Client disconnect");
        self.heartbeat.stop();
        self.reconnect.reset();
        tracing::info!(
            client_id = %self.client_id,
            cancelled_timers = cancelled,
            dropped_messages = dropped,
            "Disconnected"
        );
        self.set_state(ConnectionState::Initial);
    }

    /// Pause the session. Idempotent.
    pub fn suspend(&mut self) {
        if self.state == ConnectionState::Suspended {
            tracing::debug!(client_id = %self.client_id, "Already suspended");
            return;
        }
        self.close_socket(CLOSE_NORMAL, "Client suspended");
        self.scheduler.cancel_all();
        self.heartbeat.stop();
        self.set_state(ConnectionState::Suspended);
    }

    /// Leave `suspended` by reconnecting. No-op in any other state.
    pub fn resume(&mut self) {
        if self.state != ConnectionState::Suspended {
            tracing::debug!(client_id = %self.client_id, state = %self.state, "resume() ignored");
            return;
        }
        self.open_socket();
    }

    /// Leave `failed` by reconnecting. The attempt counter is kept until a
    /// connection succeeds.
    pub fn retry(&mut self) {
        if self.state != ConnectionState::Failed {
            tracing::debug!(client_id = %self.client_id, state = %self.state, "retry() ignored");
            return;
        }
        self.open_socket();
    }

    // ---------------------------------------------------------------------
    // Outbound
    // ---------------------------------------------------------------------

    /// Send `message`, queueing it while disconnected.
    ///
    /// Returns `false` if it was dropped.
    pub fn send<M: Serialize + ?Sized>(&mut self, message: &M) -> bool {
        self.dispatch(message).is_accepted()
    }

    /// Send `message` and report what happened to it.
    pub fn dispatch<M: Serialize + ?Sized>(&mut self, message: &M) -> SendOutcome {
        let value = match serde_json::to_value(message) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!(client_id = %self.client_id, "Failed to serialize message: {e}");
                return SendOutcome::Dropped;
            }
        };

        if self.state.is_connected() {
            match encode_frame(&value) {
                Ok(text) => match self.transport.send(text) {
                    Ok(()) => return SendOutcome::Sent,
                    Err(e) => {
                        tracing::warn!(client_id = %self.client_id, "Send failed, queueing: {e}");
                    }
                },
                Err(e) => {
                    tracing::error!(client_id = %self.client_id, "{e}");
                    return SendOutcome::Dropped;
                }
            }
        }

        if self.queue.push(value) {
            tracing::debug!(queued = self.queue.len(), "Queued outbound message");
            SendOutcome::Queued
        } else {
            tracing::warn!(
                client_id = %self.client_id,
                capacity = self.queue.capacity(),
                "Outbound queue full, dropping message"
            );
            SendOutcome::Dropped
        }
    }

    /// Record a local terminal size change. Acted on after the debounce
    /// window; only triggers a sync before the current sync cycle completes.
    pub fn set_terminal_dimensions(&mut self, cols: u16, rows: u16) {
        if !self.dimensions.set_local(cols, rows) {
            tracing::trace!(cols, rows, "Terminal size unchanged");
            return;
        }
        let deadline = self.clock.now() + self.config.resize_debounce();
        self.scheduler.arm(TimerKind::DimensionDebounce, deadline);
    }

    /// Propose a terminal size to the server.
    ///
    /// Returns `false` without sending anything when not connected.
    pub fn negotiate_dimensions(&mut self, params: NegotiateDimensions) -> bool {
        if !self.state.is_connected() {
            tracing::debug!(client_id = %self.client_id, state = %self.state, "Not connected, skipping negotiation");
            return false;
        }
        if self.dimensions.set_local(params.cols, params.rows) {
            tracing::debug!(cols = params.cols, rows = params.rows, "Negotiating new terminal size");
        }
        self.write(&ClientMessage::NegotiateDimensions(params))
    }

    /// Throw away local stream state and restart from the server's buffer.
    pub fn request_resync(&mut self) {
        if !self.state.is_connected() {
            tracing::debug!(client_id = %self.client_id, "Not connected, resync deferred to next open");
            return;
        }
        self.full_resync(ResyncReason::Requested);
    }

    // ---------------------------------------------------------------------
    // Host-driven input
    // ---------------------------------------------------------------------

    /// Feed one transport event.
    pub fn handle_transport_frame(&mut self, frame: TransportFrame) {
        if self.active_socket != Some(frame.generation) {
            tracing::debug!(
                generation = frame.generation,
                active = ?self.active_socket,
                "Ignoring event from superseded socket"
            );
            return;
        }

        match frame.event {
            TransportEvent::Opened => self.on_open(),
            TransportEvent::Message(text) => self.on_text(&text),
            TransportEvent::Closed {
                code,
                reason,
                clean,
            } => {
                self.active_socket = None;
                if clean {
                    tracing::info!(client_id = %self.client_id, code, %reason, "Socket closed cleanly");
                    self.teardown_connection();
                    self.set_state(ConnectionState::Initial);
                } else {
                    tracing::warn!(client_id = %self.client_id, code, %reason, "Socket closed unexpectedly");
                    self.connection_lost();
                }
            }
            TransportEvent::Error(message) => {
                tracing::warn!(client_id = %self.client_id, "Transport error: {message}");
                self.close_socket(CLOSE_TRANSPORT_ERROR, "Transport error");
                self.connection_lost();
            }
        }
    }

    /// Run every timer that is due. Returns how many fired.
    pub fn fire_due_timers(&mut self) -> usize {
        let mut fired = 0;
        while let Some((kind, id)) = self.scheduler.pop_due(self.clock.now()) {
            tracing::trace!(?kind, %id, "Timer fired");
            self.on_timer(kind);
            fired += 1;
        }
        fired
    }

    // ---------------------------------------------------------------------
    // State machine
    // ---------------------------------------------------------------------

    fn set_state(&mut self, next: ConnectionState) {
        if self.state == next {
            return;
        }
        let previous = std::mem::replace(&mut self.state, next);
        tracing::info!(client_id = %self.client_id, from = %previous, to = %next, "Connection state changed");
        self.events.on_state_change(next);
    }

    fn open_socket(&mut self) {
        self.last_generation += 1;
        let generation = self.last_generation;
        self.active_socket = Some(generation);
        self.set_state(ConnectionState::Connecting);
        tracing::info!(client_id = %self.client_id, generation, url = %self.config.url, "Opening socket");

        if let Err(e) = self.transport.open(generation) {
            tracing::warn!(client_id = %self.client_id, generation, "Failed to open socket: {e}");
            self.active_socket = None;
            self.connection_lost();
        }
    }

    fn close_socket(&mut self, code: u16, reason: &str) {
        if let Some(generation) = self.active_socket.take() {
            tracing::debug!(generation, code, reason, "Closing socket");
            self.transport.close(code, reason);
        }
    }

    fn teardown_connection(&mut self) {
        for kind in TimerKind::CONNECTION_SCOPED {
            self.scheduler.cancel(kind);
        }
        self.heartbeat.stop();
    }

    /// Unclean loss: back off, or give up once attempts are exhausted.
    fn connection_lost(&mut self) {
        self.teardown_connection();
        match self.reconnect.record_failure() {
            RetryDecision::GiveUp => {
                tracing::warn!(
                    client_id = %self.client_id,
                    attempts = self.reconnect.attempt(),
                    "Reconnect attempts exhausted"
                );
                self.set_state(ConnectionState::Failed);
            }
            RetryDecision::Retry(delay) => {
                tracing::info!(
                    client_id = %self.client_id,
                    attempt = self.reconnect.attempt(),
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "Scheduling reconnect"
                );
                self.scheduler
                    .arm(TimerKind::Backoff, self.clock.now() + delay);
                self.set_state(ConnectionState::Backoff);
            }
        }
    }

    /// Heartbeat failure: drop the socket and reconnect without waiting.
    fn force_reconnect(&mut self) {
        self.close_socket(CLOSE_HEARTBEAT_TIMEOUT, "Heartbeat timeout");
        self.teardown_connection();
        match self.reconnect.record_failure() {
            RetryDecision::GiveUp => self.set_state(ConnectionState::Failed),
            RetryDecision::Retry(_) => {
                self.set_state(ConnectionState::Reconnecting);
                self.open_socket();
            }
        }
    }

    fn on_open(&mut self) {
        if self.state != ConnectionState::Connecting {
            tracing::debug!(state = %self.state, "Open event outside connecting");
            return;
        }
        self.reconnect.reset();
        self.set_state(ConnectionState::Connected);

        let now = self.clock.now();
        self.heartbeat.start(now);
        self.scheduler
            .arm(TimerKind::Ping, now + self.config.ping_interval());
        self.dimensions.begin_cycle();

        self.flush_queue();
        self.send_sync_request(self.reassembler.last_contiguous());
    }

    fn flush_queue(&mut self) {
        let mut pending = self.queue.take_all();
        let total = pending.len();
        while let Some(message) = pending.pop_front() {
            let sent = match encode_frame(&message) {
                Ok(text) => self.transport.send(text).is_ok(),
                Err(e) => {
                    tracing::error!("Dropping unencodable queued message: {e}");
                    continue;
                }
            };
            if !sent {
                tracing::warn!(remaining = pending.len() + 1, "Flush interrupted, re-queueing");
                self.queue.push(message);
                for rest in pending {
                    self.queue.push(rest);
                }
                return;
            }
        }
        if total > 0 {
            tracing::debug!(flushed = total, "Flushed outbound queue");
        }
    }

    fn write(&mut self, message: &ClientMessage) -> bool {
        let text = match encode_frame(message) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(kind = message.kind(), "{e}");
                return false;
            }
        };
        match self.transport.send(text) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(kind = message.kind(), "Write failed: {e}");
                false
            }
        }
    }

    fn send_sync_request(&mut self, last_seq: u64) {
        let (cols, rows) = self.dimensions.dimensions();
        tracing::debug!(last_seq, cols, rows, "Sending sync request");
        self.write(&ClientMessage::SyncRequest {
            last_seq,
            cols,
            rows,
        });
    }

    // ---------------------------------------------------------------------
    // Inbound
    // ---------------------------------------------------------------------

    fn on_text(&mut self, text: &str) {
        match parse_server_frame(text) {
            Ok(InboundFrame::Message(message)) => self.on_server_message(message),
            Ok(InboundFrame::Unrecognized(value)) => self.on_unrecognized(&value),
            Err(e) => {
                tracing::warn!(client_id = %self.client_id, "Dropping frame: {e}");
            }
        }
    }

    fn on_unrecognized(&mut self, value: &Value) {
        self.events.on_message(value);
    }

    fn on_server_message(&mut self, message: ServerMessage) {
        match message {
            ServerMessage::SyncResponse(response) => self.on_sync_response(&response),
            ServerMessage::TerminalChunk(chunk) => {
                let outcome = self.reassembler.on_chunk(chunk);
                self.apply_chunk_outcome(outcome);
            }
            ServerMessage::ChunkBatch(batch) => {
                let outcome = self.reassembler.on_batch(batch);
                self.apply_chunk_outcome(outcome);
            }
            ServerMessage::BufferOverflow(overflow) => self.on_buffer_overflow(&overflow),
            ServerMessage::Ping { timestamp } => {
                self.write(&ClientMessage::Pong { timestamp });
            }
            ServerMessage::Pong { .. } => self.on_pong(),
            ServerMessage::DimensionsConfirmed(confirmed) => {
                self.events.on_dimensions_confirmed(&confirmed);
            }
            ServerMessage::DimensionsRejected(rejected) => {
                self.events.on_dimensions_rejected(&rejected);
            }
        }
    }

    fn on_sync_response(&mut self, response: &SyncResponse) {
        tracing::info!(
            client_id = %self.client_id,
            start = response.buffer_start_seq,
            end = response.buffer_end_seq,
            full_buffer = response.full_buffer.is_some(),
            "Sync response"
        );
        self.dimensions.complete_cycle();
        self.gap_resume_sent = false;
        self.events.on_sync_response(response);

        if let Some(full_buffer) = response.full_buffer.as_deref().filter(|b| !b.is_empty()) {
            self.events.on_terminal_data(full_buffer);
        }
        let outcome = self.reassembler.apply_sync(response.buffer_end_seq);
        self.acks.clamp(self.reassembler.last_contiguous());
        self.apply_chunk_outcome(outcome);
    }

    fn apply_chunk_outcome(&mut self, outcome: ChunkOutcome) {
        match outcome {
            ChunkOutcome::Duplicate => {
                tracing::trace!("Discarded duplicate chunk");
            }
            ChunkOutcome::Delivered(chunks) => {
                for data in &chunks {
                    self.events.on_terminal_data(data);
                }
                self.refresh_gap_timer();
                self.schedule_ack();
            }
            ChunkOutcome::DeliveredThenResync(chunks, reason) => {
                for data in &chunks {
                    self.events.on_terminal_data(data);
                }
                self.full_resync(reason);
            }
            ChunkOutcome::Buffered { .. } => self.refresh_gap_timer(),
            ChunkOutcome::ResyncNeeded(reason) => self.full_resync(reason),
        }
    }

    fn on_buffer_overflow(&mut self, overflow: &BufferOverflow) {
        let anchor = overflow.new_start_seq.saturating_sub(1);
        tracing::warn!(
            client_id = %self.client_id,
            new_start_seq = overflow.new_start_seq,
            requires_resync = overflow.requires_resync,
            "Server discarded unconsumed history"
        );
        self.reassembler.reset(anchor);
        self.acks.reset(anchor);
        self.scheduler.cancel(TimerKind::GapRecovery);
        self.scheduler.cancel(TimerKind::AckFlush);
        if overflow.requires_resync {
            self.full_resync(ResyncReason::ServerOverflow);
        }
    }

    fn on_pong(&mut self) {
        self.heartbeat.pong_received(self.clock.now());
        self.scheduler.cancel(TimerKind::PongTimeout);
        if self.state == ConnectionState::Stale {
            self.set_state(ConnectionState::Connected);
        }
    }

    // ---------------------------------------------------------------------
    // Stream bookkeeping
    // ---------------------------------------------------------------------

    /// Arm the gap timer while a gap is open; cancel it once nothing is buffered.
    fn refresh_gap_timer(&mut self) {
        if self.reassembler.pending_len() == 0 {
            self.scheduler.cancel(TimerKind::GapRecovery);
            self.gap_resume_sent = false;
        } else if !self.scheduler.is_armed(TimerKind::GapRecovery) {
            self.arm_gap_timer();
        }
    }

    fn arm_gap_timer(&mut self) {
        self.reassembler.mark_gap();
        let deadline = self.clock.now() + self.config.gap_timeout();
        self.scheduler.arm(TimerKind::GapRecovery, deadline);
    }

    fn schedule_ack(&mut self) {
        if self.acks.is_behind(self.reassembler.last_contiguous())
            && !self.scheduler.is_armed(TimerKind::AckFlush)
        {
            let deadline = self.clock.now() + self.config.ack_interval();
            self.scheduler.arm(TimerKind::AckFlush, deadline);
        }
    }

    fn full_resync(&mut self, reason: ResyncReason) {
        tracing::warn!(client_id = %self.client_id, ?reason, "Requesting full resync");
        self.reassembler.reset(0);
        self.acks.reset(0);
        self.gap_resume_sent = false;
        self.scheduler.cancel(TimerKind::GapRecovery);
        self.scheduler.cancel(TimerKind::AckFlush);
        if self.state.is_connected() {
            self.send_sync_request(0);
        }
    }

    // ---------------------------------------------------------------------
    // Timers
    // ---------------------------------------------------------------------

    fn on_timer(&mut self, kind: TimerKind) {
        match kind {
            TimerKind::Backoff => self.on_backoff_elapsed(),
            TimerKind::AckFlush => self.on_ack_flush(),
            TimerKind::Ping => self.on_ping_tick(),
            TimerKind::PongTimeout => self.on_pong_timeout(),
            TimerKind::GapRecovery => self.on_gap_timeout(),
            TimerKind::DimensionDebounce => self.on_resize_settled(),
        }
    }

    fn on_backoff_elapsed(&mut self) {
        if self.state != ConnectionState::Backoff {
            return;
        }
        self.set_state(ConnectionState::Reconnecting);
        self.open_socket();
    }

    fn on_ack_flush(&mut self) {
        if !self.state.is_connected() {
            return;
        }
        let last = self.reassembler.last_contiguous();
        if self.acks.is_behind(last) && self.write(&ClientMessage::Ack { ack_seq: last }) {
            self.acks.record(last);
            tracing::debug!(ack_seq = last, "Acknowledged progress");
        }
    }

    fn on_ping_tick(&mut self) {
        if !self.state.is_connected() {
            return;
        }
        let now = self.clock.now();
        if self.write(&ClientMessage::Ping {
            timestamp: self.clock.unix_millis(),
        }) {
            self.scheduler
                .arm(TimerKind::PongTimeout, now + self.config.pong_timeout());
        }
        self.scheduler
            .arm(TimerKind::Ping, now + self.config.ping_interval());
        self.check_staleness();
    }

    fn on_pong_timeout(&mut self) {
        if !self.state.is_connected() {
            return;
        }
        self.check_staleness();
        match self.heartbeat.pong_timed_out() {
            PongVerdict::Tolerated { missed } => {
                tracing::debug!(client_id = %self.client_id, missed, "Pong overdue");
            }
            PongVerdict::ForceReconnect { missed } => {
                tracing::warn!(client_id = %self.client_id, missed, "Heartbeat lost, forcing reconnect");
                self.force_reconnect();
            }
        }
    }

    fn check_staleness(&mut self) {
        if self.state == ConnectionState::Connected && self.heartbeat.is_stale(self.clock.now()) {
            self.set_state(ConnectionState::Stale);
            self.events.on_stale();
        }
    }

    fn on_gap_timeout(&mut self) {
        match self.reassembler.check_gap() {
            GapCheck::Closed => {
                self.gap_resume_sent = false;
            }
            GapCheck::Progressed => self.arm_gap_timer(),
            GapCheck::Stalled => {
                let last = self.reassembler.last_contiguous();
                let resume = self.config.gap_recovery == GapRecovery::Resume
                    && !self.gap_resume_sent
                    && self.state.is_connected();
                if resume {
                    tracing::warn!(
                        client_id = %self.client_id,
                        last_contiguous = last,
                        earliest_pending = ?self.reassembler.earliest_pending(),
                        "Gap stalled, requesting replay"
                    );
                    self.gap_resume_sent = true;
                    self.send_sync_request(last);
                    self.arm_gap_timer();
                } else {
                    self.full_resync(ResyncReason::GapTimeout);
                }
            }
        }
    }

    fn on_resize_settled(&mut self) {
        if !self.state.is_connected() {
            return;
        }
        if self.dimensions.resize_needs_sync() {
            self.send_sync_request(self.reassembler.last_contiguous());
        } else {
            let (cols, rows) = self.dimensions.dimensions();
            tracing::debug!(cols, rows, "Resize after sync, awaiting explicit negotiation");
        }
    }
}
