pub mod actor;
pub mod commands;
pub mod controller;
pub mod events;
pub mod handle;
pub mod store;

use tokio::sync::mpsc;

use crate::transport::{EngineTransport, TransportEvent};
use actor::run_session_actor;
pub use commands::{SessionConfig, SessionError};
pub use controller::EngineSession;
pub use events::{UciDirection, UciLogEntry};
pub use handle::SessionHandle;
pub use store::{SessionReader, SessionState, SessionStore};

/// Start a session actor over `transport`. The handshake is sent right away;
/// requests made before it completes are queued.
///
/// Must be called from within a tokio runtime.
pub fn spawn_session<T: EngineTransport>(
    transport: T,
    events: mpsc::UnboundedReceiver<TransportEvent>,
    config: SessionConfig,
) -> SessionHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel(32);
    let session = EngineSession::new(
        transport,
        SessionState::new(config.search_depth, config.line_count),
    );
    let handle = SessionHandle::new(cmd_tx, session.reader(), session.uci_log_sender());

    tokio::spawn(run_session_actor(
        session,
        cmd_rx,
        events,
        config.handshake_timeout,
        config.label,
    ));

    handle
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::transport::mock::{MockEngine, MockTransport};

    const WAIT: Duration = Duration::from_secs(2);

    fn spawn_test_session(config: SessionConfig) -> (SessionHandle, MockEngine) {
        let (transport, engine, events) = MockTransport::new();
        (spawn_session(transport, events, config), engine)
    }

    async fn wait_for(
        handle: &SessionHandle,
        predicate: impl FnMut(&SessionState) -> bool,
    ) -> SessionState {
        let mut reader = handle.reader();
        tokio::time::timeout(WAIT, reader.wait_until(predicate))
            .await
            .expect("timed out waiting for session state")
            .expect("session closed")
    }

    /// Wait until the mock has received `line`.
    async fn wait_for_sent(engine: &MockEngine, line: &str) {
        tokio::time::timeout(WAIT, async {
            while !engine.sent().iter().any(|l| l == line) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("timed out waiting for outbound line");
    }

    async fn handshake(handle: &SessionHandle, engine: &MockEngine) {
        wait_for_sent(engine, "uci").await;
        engine.emit("uciok");
        wait_for(handle, |s| s.ready).await;
        wait_for_sent(engine, "isready").await;
        engine.emit("readyok");
        engine.take_sent();
    }

    #[tokio::test]
    async fn test_actor_end_to_end() {
        let (handle, engine) = spawn_test_session(SessionConfig {
            search_depth: 16,
            line_count: 2,
            ..Default::default()
        });
        handshake(&handle, &engine).await;

        handle.request_position("start-fen").await.unwrap();
        wait_for_sent(&engine, "go depth 16").await;
        assert_eq!(
            engine.take_sent(),
            vec!["position fen start-fen", "go depth 16"]
        );
        wait_for(&handle, |s| s.running).await;

        engine.emit("info depth 10 multipv 2 score cp -12 nodes 10 nps 10 pv d2d4");
        engine.emit("info depth 10 multipv 1 score mate 4 nodes 10 nps 10 pv e2e4 e7e5");
        let snap = wait_for(&handle, |s| s.lines.len() == 2).await;
        let ranks: Vec<u32> = snap.ranked_lines().map(|l| l.multipv).collect();
        assert_eq!(ranks, vec![1, 2]);
        assert_eq!(snap.best_line().unwrap().display_score(), "M4");
        assert_eq!(snap.observed_depth, 10);

        handle.request_position("other-fen").await.unwrap();
        assert_eq!(engine.take_sent(), vec!["stop"]);
        engine.emit("bestmove e2e4");
        wait_for_sent(&engine, "isready").await;
        engine.emit("readyok");
        wait_for_sent(&engine, "position fen other-fen").await;
        let snap = wait_for(&handle, |s| s.running).await;
        assert!(snap.lines.is_empty());

        handle.shutdown().await;
        assert!(engine.is_terminated());
        assert!(engine.sent().iter().any(|l| l == "quit"));
        assert!(handle.request_position("late-fen").await.is_err());
    }

    #[tokio::test]
    async fn test_handshake_timeout_is_fatal() {
        let (handle, engine) = spawn_test_session(SessionConfig {
            handshake_timeout: Duration::from_millis(50),
            ..Default::default()
        });
        let snap = wait_for(&handle, |s| s.last_error.is_some()).await;
        assert!(!snap.ready);
        assert!(snap.last_error.unwrap().contains("Timeout"));
        assert_eq!(engine.sent(), vec!["uci"]);
    }

    #[tokio::test]
    async fn test_process_failure_is_reported() {
        let (handle, engine) = spawn_test_session(SessionConfig::default());
        handshake(&handle, &engine).await;
        handle.request_position("start-fen").await.unwrap();

        engine.fail("Engine process exited");
        let snap = wait_for(&handle, |s| s.last_error.is_some()).await;
        assert!(!snap.ready);
        assert!(!snap.running);
        assert_eq!(snap.last_error.as_deref(), Some("Engine process exited"));
    }

    #[tokio::test]
    async fn test_dropping_handles_tears_down() {
        let (handle, engine) = spawn_test_session(SessionConfig::default());
        let mut reader = handle.reader();
        handshake(&handle, &engine).await;
        drop(handle);

        tokio::time::timeout(WAIT, async { while reader.changed().await {} })
            .await
            .expect("session did not shut down");
        assert!(engine.is_terminated());
        assert!(!reader.snapshot().ready);
    }

    #[tokio::test]
    async fn test_uci_log_subscription() {
        let (handle, engine) = spawn_test_session(SessionConfig::default());
        let mut log = handle.subscribe_uci();
        wait_for_sent(&engine, "uci").await;
        engine.emit("uciok");

        let entry = tokio::time::timeout(WAIT, async {
            loop {
                let entry = log.recv().await.unwrap();
                if entry.direction == UciDirection::FromEngine {
                    return entry;
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(entry.message, "uciok");
    }
}
