//! In-memory transport for tests.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use super::{EngineTransport, TransportError, TransportEvent};

type SendObserver = Box<dyn FnMut(&str) + Send>;

/// Records every line sent to it. The paired [`MockEngine`] plays the engine
/// side by injecting inbound events.
pub struct MockTransport {
    sent: Arc<Mutex<Vec<String>>>,
    terminated: Arc<Mutex<bool>>,
    observer: Option<SendObserver>,
    fail_sends: bool,
}

/// Test-side view of a [`MockTransport`].
#[derive(Clone)]
pub struct MockEngine {
    sent: Arc<Mutex<Vec<String>>>,
    terminated: Arc<Mutex<bool>>,
    event_tx: mpsc::UnboundedSender<TransportEvent>,
}

impl MockTransport {
    pub fn new() -> (Self, MockEngine, mpsc::UnboundedReceiver<TransportEvent>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let terminated = Arc::new(Mutex::new(false));
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let transport = Self {
            sent: sent.clone(),
            terminated: terminated.clone(),
            observer: None,
            fail_sends: false,
        };
        let engine = MockEngine {
            sent,
            terminated,
            event_tx,
        };
        (transport, engine, event_rx)
    }

    /// Run `observer` on every line just before it is recorded.
    pub fn with_observer(mut self, observer: impl FnMut(&str) + Send + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Make every send fail as if the process had died.
    pub fn failing(mut self) -> Self {
        self.fail_sends = true;
        self
    }
}

impl EngineTransport for MockTransport {
    fn send(&mut self, line: &str) -> Result<(), TransportError> {
        if self.fail_sends || *self.terminated.lock().unwrap() {
            return Err(TransportError::Closed);
        }
        if let Some(observer) = self.observer.as_mut() {
            observer(line);
        }
        self.sent.lock().unwrap().push(line.to_string());
        Ok(())
    }

    fn terminate(&mut self) {
        *self.terminated.lock().unwrap() = true;
    }
}

impl MockEngine {
    /// All lines sent so far.
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    /// Return and forget the lines sent so far.
    pub fn take_sent(&self) -> Vec<String> {
        std::mem::take(&mut *self.sent.lock().unwrap())
    }

    pub fn is_terminated(&self) -> bool {
        *self.terminated.lock().unwrap()
    }

    /// Deliver one line of engine output.
    pub fn emit(&self, line: &str) {
        let _ = self.event_tx.send(TransportEvent::Line(line.to_string()));
    }

    /// Report a process-level failure.
    pub fn fail(&self, message: &str) {
        let _ = self.event_tx.send(TransportEvent::Failed(message.to_string()));
    }
}
