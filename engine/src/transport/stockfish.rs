use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::mpsc;
use tokio_stream::wrappers::LinesStream;
use tokio_stream::StreamExt;

use super::{EngineTransport, TransportError, TransportEvent};

/// How long a terminated engine may take to exit on its own before it is killed.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

const ENGINE_BINARY: &str = "stockfish";

/// A UCI engine running as a child process with piped stdio.
///
/// Outbound lines go through an unbounded channel to a writer task, so
/// [`EngineTransport::send`] never waits on the pipe. A reader task turns
/// stdout into [`TransportEvent::Line`]s and reports EOF or read errors as
/// [`TransportEvent::Failed`].
pub struct StockfishProcess {
    child: Option<Child>,
    stdin_tx: Option<mpsc::UnboundedSender<String>>,
}

impl StockfishProcess {
    /// Spawn the engine at `path`. Must be called from within a tokio runtime.
    #[tracing::instrument(level = "info")]
    pub fn spawn(
        path: &Path,
    ) -> Result<(Self, mpsc::UnboundedReceiver<TransportEvent>), TransportError> {
        tracing::debug!("Spawning engine process");
        let mut child = Command::new(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                tracing::error!("Failed to spawn engine: {}", e);
                TransportError::Spawn(e)
            })?;

        let stdin = child.stdin.take().ok_or(TransportError::NoStdin)?;
        let stdout = child.stdout.take().ok_or(TransportError::NoStdout)?;

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (stdin_tx, stdin_rx) = mpsc::unbounded_channel();

        tokio::spawn(write_stdin(stdin, stdin_rx, event_tx.clone()));
        tokio::spawn(read_stdout(stdout, event_tx));

        tracing::info!(pid = ?child.id(), "Engine process spawned");
        Ok((
            Self {
                child: Some(child),
                stdin_tx: Some(stdin_tx),
            },
            event_rx,
        ))
    }
}

impl EngineTransport for StockfishProcess {
    fn send(&mut self, line: &str) -> Result<(), TransportError> {
        let tx = self.stdin_tx.as_ref().ok_or(TransportError::Closed)?;
        tx.send(format!("{}\n", line))
            .map_err(|_| TransportError::Closed)
    }

    fn terminate(&mut self) {
        // Dropping the sender lets the writer flush what is queued (normally
        // `quit`) and then close stdin.
        self.stdin_tx = None;

        let Some(mut child) = self.child.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    if tokio::time::timeout(SHUTDOWN_GRACE, child.wait())
                        .await
                        .is_err()
                    {
                        tracing::warn!("Engine did not exit after quit, killing it");
                        let _ = child.kill().await;
                    }
                });
            }
            Err(_) => {
                let _ = child.start_kill();
            }
        }
    }
}

async fn write_stdin(
    mut stdin: ChildStdin,
    mut stdin_rx: mpsc::UnboundedReceiver<String>,
    event_tx: mpsc::UnboundedSender<TransportEvent>,
) {
    while let Some(cmd) = stdin_rx.recv().await {
        let result = async {
            stdin.write_all(cmd.as_bytes()).await?;
            stdin.flush().await
        }
        .await;

        if let Err(e) = result {
            tracing::error!("Failed to write to engine stdin: {}", e);
            let _ = event_tx.send(TransportEvent::Failed(format!(
                "Failed to write to engine: {}",
                e
            )));
            break;
        }
    }
    tracing::debug!("Stdin writer task exiting");
}

async fn read_stdout(stdout: ChildStdout, event_tx: mpsc::UnboundedSender<TransportEvent>) {
    let mut lines = LinesStream::new(BufReader::new(stdout).lines());

    while let Some(line) = lines.next().await {
        match line {
            Ok(line) => {
                if event_tx.send(TransportEvent::Line(line)).is_err() {
                    tracing::debug!("Event receiver dropped, stopping reader");
                    return;
                }
            }
            Err(e) => {
                tracing::error!("Error reading from engine stdout: {}", e);
                let _ = event_tx.send(TransportEvent::Failed(format!(
                    "Error reading engine output: {}",
                    e
                )));
                return;
            }
        }
    }

    tracing::warn!("Engine stdout EOF - engine closed");
    let _ = event_tx.send(TransportEvent::Failed("Engine process exited".to_string()));
}

/// Find an engine executable in common install locations, then on `PATH`.
pub fn find_engine_path() -> Option<PathBuf> {
    let common = [
        "/usr/local/bin/stockfish",
        "/usr/bin/stockfish",
        "/opt/homebrew/bin/stockfish",
        "/usr/games/stockfish",
    ];

    if let Some(found) = common.iter().map(Path::new).find(|p| p.is_file()) {
        return Some(found.to_path_buf());
    }

    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(ENGINE_BINARY))
        .find(|candidate| candidate.is_file())
}
