use std::collections::BTreeMap;

use serde::Serialize;
use tokio::sync::watch;

use crate::EngineLine;

/// Default search depth for `go depth`.
pub const DEFAULT_SEARCH_DEPTH: u32 = 22;
/// Default number of ranked lines (`MultiPV`).
pub const DEFAULT_LINE_COUNT: u32 = 3;

/// Observable projection of an engine session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionState {
    pub ready: bool,
    pub running: bool,
    pub last_error: Option<String>,
    pub configured_depth: u32,
    pub configured_line_count: u32,
    /// Latest line per rank, ascending by rank.
    pub lines: BTreeMap<u32, EngineLine>,
    /// Deepest depth seen since the current position began.
    pub observed_depth: u32,
}

impl SessionState {
    pub fn new(configured_depth: u32, configured_line_count: u32) -> Self {
        Self {
            ready: false,
            running: false,
            last_error: None,
            configured_depth,
            configured_line_count,
            lines: BTreeMap::new(),
            observed_depth: 0,
        }
    }

    /// Lines in display order (rank 1 first).
    pub fn ranked_lines(&self) -> impl Iterator<Item = &EngineLine> {
        self.lines.values()
    }

    pub fn best_line(&self) -> Option<&EngineLine> {
        self.lines.get(&1)
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_DEPTH, DEFAULT_LINE_COUNT)
    }
}

/// Write side of the session projection.
///
/// Only the session controller holds one. Every mutation is one watch
/// update, so readers never observe a half-applied change.
#[derive(Debug)]
pub struct SessionStore {
    tx: watch::Sender<SessionState>,
}

/// Read side of the session projection. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SessionReader {
    rx: watch::Receiver<SessionState>,
}

impl SessionStore {
    pub fn new(initial: SessionState) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    pub fn reader(&self) -> SessionReader {
        SessionReader {
            rx: self.tx.subscribe(),
        }
    }

    pub fn snapshot(&self) -> SessionState {
        self.tx.borrow().clone()
    }

    /// Read one value without cloning the whole state.
    pub fn read<R>(&self, f: impl FnOnce(&SessionState) -> R) -> R {
        f(&self.tx.borrow())
    }

    pub fn set_ready(&self, ready: bool) {
        self.tx.send_if_modified(|s| replace(&mut s.ready, ready));
    }

    pub fn set_running(&self, running: bool) {
        self.tx.send_if_modified(|s| replace(&mut s.running, running));
    }

    pub fn set_error(&self, error: Option<String>) {
        self.tx.send_if_modified(|s| replace(&mut s.last_error, error));
    }

    pub fn set_configured_depth(&self, depth: u32) {
        self.tx
            .send_if_modified(|s| replace(&mut s.configured_depth, depth));
    }

    pub fn set_configured_line_count(&self, count: u32) {
        self.tx
            .send_if_modified(|s| replace(&mut s.configured_line_count, count));
    }

    /// Insert or replace the line for its rank and raise the observed depth.
    pub fn update_line(&self, line: EngineLine) {
        self.tx.send_modify(|s| {
            s.observed_depth = s.observed_depth.max(line.depth);
            s.lines.insert(line.multipv, line);
        });
    }

    /// Forget all lines and reset the observed depth.
    pub fn clear_lines(&self) {
        self.tx.send_if_modified(|s| {
            let changed = !s.lines.is_empty() || s.observed_depth != 0;
            s.lines.clear();
            s.observed_depth = 0;
            changed
        });
    }

    /// Reset after a fatal process error. Configuration is kept; the
    /// message is recorded for display.
    pub fn reset_with_error(&self, message: String) {
        self.tx.send_modify(|s| {
            s.ready = false;
            s.running = false;
            s.lines.clear();
            s.observed_depth = 0;
            s.last_error = Some(message);
        });
    }

    /// Mark the session as torn down.
    pub fn mark_closed(&self) {
        self.tx.send_modify(|s| {
            s.ready = false;
            s.running = false;
        });
    }
}

impl SessionReader {
    pub fn snapshot(&self) -> SessionState {
        self.rx.borrow().clone()
    }

    /// Wait for the next change. Returns `false` once the session is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// Wait until `predicate` holds, returning the matching snapshot, or
    /// `None` if the session ends first.
    pub async fn wait_until(
        &mut self,
        mut predicate: impl FnMut(&SessionState) -> bool,
    ) -> Option<SessionState> {
        self.rx
            .wait_for(|s| predicate(s))
            .await
            .ok()
            .map(|s| SessionState::clone(&s))
    }

    /// Snapshot of the current state, marking it as seen.
    pub fn snapshot_and_mark_seen(&mut self) -> SessionState {
        self.rx.borrow_and_update().clone()
    }
}

/// Assign `value` to `slot`, reporting whether it changed.
fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}
