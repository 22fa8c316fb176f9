use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time;
use tracing::Instrument;

use super::commands::SessionCommand;
use super::controller::EngineSession;
use crate::transport::{EngineTransport, TransportEvent};

/// The session actor loop.
/// Owns the controller. Processes caller commands and engine output sequentially.
pub(crate) async fn run_session_actor<T: EngineTransport>(
    session: EngineSession<T>,
    cmd_rx: mpsc::Receiver<SessionCommand>,
    events: mpsc::UnboundedReceiver<TransportEvent>,
    handshake_timeout: Duration,
    label: String,
) {
    run_session_actor_inner(session, cmd_rx, events, handshake_timeout)
        .instrument(tracing::info_span!("engine_session", label = %label))
        .await;
}

async fn run_session_actor_inner<T: EngineTransport>(
    mut session: EngineSession<T>,
    mut cmd_rx: mpsc::Receiver<SessionCommand>,
    mut events: mpsc::UnboundedReceiver<TransportEvent>,
    handshake_timeout: Duration,
) {
    tracing::info!("Session actor started");
    session.start();

    let handshake_deadline = time::sleep(handshake_timeout);
    tokio::pin!(handshake_deadline);
    let mut awaiting_handshake = true;
    let mut events_open = true;

    loop {
        tokio::select! {
            biased;

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(SessionCommand::Shutdown { reply }) => {
                        tracing::info!("Session actor shutting down");
                        session.shutdown();
                        let _ = reply.send(());
                        break;
                    }
                    None => {
                        tracing::info!("All session handles dropped, shutting down");
                        session.shutdown();
                        break;
                    }
                    Some(cmd) => handle_command(&mut session, cmd),
                }
            }

            event = events.recv(), if events_open => {
                match event {
                    Some(TransportEvent::Line(line)) => {
                        session.handle_line(&line);
                        if session.is_ready() {
                            awaiting_handshake = false;
                        }
                    }
                    Some(TransportEvent::Failed(message)) => {
                        awaiting_handshake = false;
                        session.handle_fatal(message);
                    }
                    None => {
                        events_open = false;
                        if session.is_ready() {
                            session.handle_fatal("Engine event stream closed");
                        }
                    }
                }
            }

            _ = &mut handshake_deadline, if awaiting_handshake => {
                awaiting_handshake = false;
                tracing::error!("Timeout waiting for uciok");
                session.handle_fatal("Timeout waiting for engine to respond");
            }
        }
    }

    tracing::info!("Session actor exited");
}

fn handle_command<T: EngineTransport>(session: &mut EngineSession<T>, cmd: SessionCommand) {
    match cmd {
        SessionCommand::AnalyzePosition { fen, reply } => {
            session.request_position(fen);
            let _ = reply.send(());
        }
        SessionCommand::ChangeOption { name, value, reply } => {
            session.request_option_change(name, value);
            let _ = reply.send(());
        }
        SessionCommand::SetSearchDepth { depth, reply } => {
            session.set_search_depth(depth);
            let _ = reply.send(());
        }
        SessionCommand::ResumeAnalysis { reply } => {
            session.resume_analysis();
            let _ = reply.send(());
        }
        SessionCommand::Stop { reply } => {
            session.request_stop();
            let _ = reply.send(());
        }
        SessionCommand::Shutdown { .. } => unreachable!(),
    }
}
