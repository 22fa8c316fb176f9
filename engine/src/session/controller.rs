//! Engine session state machine.
//!
//! Some engines crash when they receive `position`, `go` or `setoption`
//! while a search is running. The controller therefore routes every such
//! command through a `stop` → `bestmove` → `isready` → `readyok` round trip
//! and keeps caller requests in a queue until the engine has settled.
//!
//! ```text
//!   (handshake) ──uciok──► CONFIGURING
//!   IDLE        ──go────► SEARCHING
//!   SEARCHING   ──stop──► STOPPING
//!   SEARCHING | STOPPING ──bestmove──► CONFIGURING
//!   CONFIGURING ──readyok──► IDLE, then drain the queue
//!   IDLE        ──setoption + isready──► CONFIGURING
//! ```

use std::collections::VecDeque;

use tokio::sync::broadcast;

use super::events::{UciDirection, UciLogEntry};
use super::store::{SessionReader, SessionState, SessionStore};
use crate::transport::EngineTransport;
use crate::uci::{parse_event, UciCommand, UciEvent};

/// Engine option controlling the number of ranked lines.
const LINE_COUNT_OPTION: &str = "MultiPV";

const UCI_LOG_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionPhase {
    /// Safe to send anything.
    Idle,
    /// `go` sent, no `bestmove` yet.
    Searching,
    /// `stop` sent, waiting for `bestmove`.
    Stopping,
    /// `isready` sent, waiting for `readyok` before draining the queue.
    Configuring,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PendingAction {
    AnalyzePosition { fen: String },
    ChangeOption { name: String, value: String },
}

/// Serializes all interaction with one engine process.
///
/// Single owner: the controller is the only writer of its phase and of the
/// [`SessionStore`]. It never blocks; inbound lines are fed in through
/// [`EngineSession::handle_line`] in the order the engine produced them.
pub struct EngineSession<T: EngineTransport> {
    transport: Option<T>,
    phase: SessionPhase,
    ready: bool,
    queue: VecDeque<PendingAction>,
    /// Last position sent for analysis, re-analyzed after option changes.
    current_fen: Option<String>,
    store: SessionStore,
    uci_log: broadcast::Sender<UciLogEntry>,
}

impl<T: EngineTransport> EngineSession<T> {
    pub fn new(transport: T, initial: SessionState) -> Self {
        let (uci_log, _) = broadcast::channel(UCI_LOG_CAPACITY);
        Self {
            transport: Some(transport),
            phase: SessionPhase::Idle,
            ready: false,
            queue: VecDeque::new(),
            current_fen: None,
            store: SessionStore::new(initial),
            uci_log,
        }
    }

    pub fn reader(&self) -> SessionReader {
        self.store.reader()
    }

    pub fn subscribe_uci(&self) -> broadcast::Receiver<UciLogEntry> {
        self.uci_log.subscribe()
    }

    pub(crate) fn uci_log_sender(&self) -> broadcast::Sender<UciLogEntry> {
        self.uci_log.clone()
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// True once [`EngineSession::shutdown`] has run.
    pub fn is_closed(&self) -> bool {
        self.transport.is_none()
    }

    #[cfg(test)]
    pub(crate) fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Send the handshake request.
    pub fn start(&mut self) {
        tracing::info!("Starting engine handshake");
        self.send(UciCommand::Uci);
    }

    /// Ask for `fen` to be analyzed. Only the last position requested before
    /// the queue next drains is actually searched.
    pub fn request_position(&mut self, fen: impl Into<String>) {
        if self.is_closed() {
            return;
        }
        let fen = fen.into();
        tracing::debug!(phase = ?self.phase, "Position requested: {}", fen);
        self.enqueue(PendingAction::AnalyzePosition { fen });
        self.dispatch();
    }

    /// Cancel all queued work and stop a running search.
    pub fn request_stop(&mut self) {
        if self.is_closed() {
            return;
        }
        tracing::debug!(phase = ?self.phase, dropped = self.queue.len(), "Stop requested");
        self.queue.clear();
        if self.phase == SessionPhase::Searching {
            self.stop_search();
        }
        self.store.set_running(false);
    }

    /// Change an engine option. The store reflects the new value at once; the
    /// engine receives it once it is safe to send.
    pub fn request_option_change(&mut self, name: impl Into<String>, value: impl Into<String>) {
        if self.is_closed() {
            return;
        }
        let name = name.into();
        let value = value.into();
        tracing::debug!(phase = ?self.phase, "Option change requested: {} = {}", name, value);

        if name.eq_ignore_ascii_case(LINE_COUNT_OPTION) {
            if let Ok(count) = value.trim().parse() {
                self.store.set_configured_line_count(count);
            }
        }

        self.enqueue(PendingAction::ChangeOption { name, value });
        self.dispatch();
    }

    /// Depth for subsequent searches. Not an engine option, so nothing is sent.
    pub fn set_search_depth(&mut self, depth: u32) {
        if self.is_closed() {
            return;
        }
        self.store.set_configured_depth(depth);
    }

    /// Analyze the last analyzed position again, if there is one.
    pub fn resume_analysis(&mut self) {
        if let Some(fen) = self.current_fen.clone() {
            self.request_position(fen);
        }
    }

    /// Process one raw line of engine output.
    pub fn handle_line(&mut self, line: &str) {
        if self.is_closed() {
            return;
        }
        tracing::trace!("UCI << {}", line);
        self.log(UciDirection::FromEngine, line.to_string());

        match parse_event(line) {
            Some(UciEvent::HandshakeAck) => self.on_handshake(),
            Some(UciEvent::ReadyAck) => self.on_ready(),
            Some(UciEvent::Progress(line)) => self.store.update_line(line),
            Some(UciEvent::SearchFinished { best_move, .. }) => self.on_search_finished(best_move),
            None => {}
        }
    }

    /// The engine failed outside the protocol. No restart is attempted.
    pub fn handle_fatal(&mut self, message: impl Into<String>) {
        if self.is_closed() {
            return;
        }
        let message = message.into();
        tracing::error!(phase = ?self.phase, "Engine error: {}", message);
        self.ready = false;
        self.phase = SessionPhase::Idle;
        self.queue.clear();
        self.current_fen = None;
        self.store.reset_with_error(message);
    }

    /// Tear the session down. Terminal: later lines and requests are ignored.
    pub fn shutdown(&mut self) {
        if self.ready {
            self.send(UciCommand::Quit);
        }
        let Some(mut transport) = self.transport.take() else {
            return;
        };
        tracing::info!("Shutting down engine session");
        transport.terminate();
        self.ready = false;
        self.phase = SessionPhase::Idle;
        self.queue.clear();
        self.current_fen = None;
        self.store.mark_closed();
    }

    fn on_handshake(&mut self) {
        if self.ready {
            tracing::debug!("Ignoring repeated uciok");
            return;
        }
        tracing::info!("Engine handshake complete");
        self.ready = true;
        self.store.set_ready(true);
        self.store.set_error(None);

        let line_count = self.store.read(|s| s.configured_line_count);
        if !self.send(UciCommand::SetOption {
            name: LINE_COUNT_OPTION.to_string(),
            value: line_count.to_string(),
        }) {
            return;
        }
        self.request_settle();
    }

    fn on_ready(&mut self) {
        if self.phase != SessionPhase::Configuring {
            tracing::debug!(phase = ?self.phase, "Ignoring stray readyok");
            return;
        }
        self.set_phase(SessionPhase::Idle);
        self.drain_queue();
    }

    fn on_search_finished(&mut self, best_move: Option<String>) {
        self.store.set_running(false);
        match self.phase {
            SessionPhase::Searching | SessionPhase::Stopping => {
                tracing::debug!("Search finished, best move {:?}", best_move);
                self.request_settle();
            }
            phase => tracing::debug!(?phase, "Ignoring bestmove outside a search"),
        }
    }

    /// Queue a request, replacing what it supersedes: any earlier position,
    /// or an earlier value for the same option. The queue holds at most one
    /// position plus one entry per option name, even while the engine is gone.
    fn enqueue(&mut self, action: PendingAction) {
        self.queue.retain(|queued| match (queued, &action) {
            (PendingAction::AnalyzePosition { .. }, PendingAction::AnalyzePosition { .. }) => false,
            (
                PendingAction::ChangeOption { name: old, .. },
                PendingAction::ChangeOption { name: new, .. },
            ) => !old.eq_ignore_ascii_case(new),
            _ => true,
        });
        self.queue.push_back(action);
    }

    /// Route a new request according to the current phase.
    fn dispatch(&mut self) {
        match self.phase {
            SessionPhase::Searching => self.stop_search(),
            SessionPhase::Idle if self.ready => self.drain_queue(),
            // Stopping/Configuring drain once `readyok` arrives; before the
            // handshake the bootstrap round trip drains.
            _ => {}
        }
    }

    /// Apply every queued option change in order, then analyze the queued
    /// position.
    fn drain_queue(&mut self) {
        debug_assert_eq!(self.phase, SessionPhase::Idle);

        let mut options = Vec::new();
        let mut position = None;
        for action in self.queue.drain(..) {
            match action {
                PendingAction::ChangeOption { name, value } => options.push((name, value)),
                PendingAction::AnalyzePosition { fen } => position = Some(fen),
            }
        }

        let options_changed = !options.is_empty();
        for (name, value) in options {
            if !self.send(UciCommand::SetOption { name, value }) {
                return;
            }
        }

        if let Some(fen) = position {
            self.begin_search(fen);
        } else if options_changed {
            // Re-evaluate the current position under the new configuration.
            if let Some(fen) = self.current_fen.clone() {
                self.queue
                    .push_back(PendingAction::AnalyzePosition { fen });
            }
            self.request_settle();
        }
    }

    fn begin_search(&mut self, fen: String) {
        self.store.clear_lines();
        let depth = self.store.read(|s| s.configured_depth);

        if !self.send(UciCommand::Position { fen: fen.clone() }) {
            return;
        }
        if !self.send(UciCommand::Go { depth }) {
            return;
        }

        tracing::info!(depth, "Analyzing {}", fen);
        self.current_fen = Some(fen);
        self.set_phase(SessionPhase::Searching);
        self.store.set_running(true);
    }

    fn stop_search(&mut self) {
        if self.send(UciCommand::Stop) {
            self.set_phase(SessionPhase::Stopping);
            self.store.set_running(false);
        }
    }

    fn request_settle(&mut self) {
        if self.send(UciCommand::IsReady) {
            self.set_phase(SessionPhase::Configuring);
        }
    }

    fn set_phase(&mut self, phase: SessionPhase) {
        tracing::debug!("Phase {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    /// The single choke point for outbound traffic. Returns `false` if the
    /// command was not delivered; a transport failure is handled as fatal.
    fn send(&mut self, cmd: UciCommand) -> bool {
        if !self.ready && cmd != UciCommand::Uci {
            tracing::warn!("Refusing to send '{}' before the handshake", cmd);
            return false;
        }
        let Some(transport) = self.transport.as_mut() else {
            return false;
        };

        let line = cmd.to_string();
        tracing::trace!("UCI >> {}", line);
        match transport.send(&line) {
            Ok(()) => {
                self.log(UciDirection::ToEngine, line);
                true
            }
            Err(e) => {
                self.handle_fatal(format!("Failed to send '{}': {}", line, e));
                false
            }
        }
    }

    fn log(&self, direction: UciDirection, message: String) {
        let _ = self.uci_log.send(UciLogEntry { direction, message });
    }
}
