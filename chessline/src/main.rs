//! chessline - live UCI engine analysis from the command line.
//!
//! Spawns a UCI engine (Stockfish by default), drives it through an
//! [`engine::SessionHandle`], and prints ranked candidate lines either once
//! (`analyze`) or continuously while positions are entered (`repl`).

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use engine::{spawn_session, SessionConfig, SessionHandle, StockfishProcess};
use tokio::sync::broadcast::error::RecvError;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod position;
mod render;
mod repl;

use position::Position;
use render::{render_json, render_text};

#[derive(Parser)]
#[command(name = "chessline", about = "Live UCI engine analysis in the terminal")]
struct Cli {
    /// Engine executable. Defaults to `CHESSLINE_ENGINE_PATH`, then common install locations.
    #[arg(long, global = true)]
    engine: Option<PathBuf>,

    /// Search depth for each position.
    #[arg(long, global = true)]
    depth: Option<u32>,

    /// Number of ranked lines (MultiPV).
    #[arg(long, global = true)]
    lines: Option<u32>,

    /// Print snapshots as JSON.
    #[arg(long, global = true)]
    json: bool,

    /// Echo raw UCI traffic to stderr.
    #[arg(long, global = true)]
    uci_log: bool,

    /// Defaults to `repl`.
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one position to the configured depth and exit.
    Analyze {
        /// Starting position. Defaults to the initial position.
        #[arg(long)]
        fen: Option<String>,

        /// UCI moves played from the starting position.
        #[arg(long, num_args = 1..)]
        moves: Vec<String>,
    },
    /// Read commands from stdin and print analysis as it deepens.
    Repl,
}

/// Log to `CHESSLINE_LOG_DIR` when set, otherwise to stderr.
fn init_tracing() -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match config::get_log_dir() {
        Some(log_dir) => {
            std::fs::create_dir_all(&log_dir).ok();
            let file_appender = tracing_appender::rolling::daily(log_dir, "chessline");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(false)
                        .with_target(true)
                        .with_line_number(true),
                )
                .with(filter)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(std::io::stderr))
                .with(filter)
                .init();
            None
        }
    }
}

fn echo_uci_traffic(session: &SessionHandle) {
    let mut log = session.subscribe_uci();
    tokio::spawn(async move {
        loop {
            match log.recv().await {
                Ok(entry) => eprintln!("{}", entry),
                Err(RecvError::Lagged(n)) => eprintln!("-- {} UCI lines skipped", n),
                Err(RecvError::Closed) => break,
            }
        }
    });
}

async fn analyze(
    session: &SessionHandle,
    fen: Option<String>,
    moves: Vec<String>,
    json: bool,
) -> anyhow::Result<()> {
    let mut position = match fen {
        Some(fen) => Position::from_fen(&fen)?,
        None => Position::startpos(),
    };
    for mv in &moves {
        position.play_uci(mv)?;
    }
    if !position.has_legal_moves() {
        anyhow::bail!("No legal moves in {}", position.fen());
    }

    let mut reader = session.reader();
    session.request_position(position.fen()).await?;

    // Lines are cleared when the search starts, so a finished search is the
    // first idle snapshot that has lines.
    let done = reader
        .wait_until(|s| s.last_error.is_some() || (!s.running && !s.lines.is_empty()))
        .await
        .context("Engine session closed")?;

    if json {
        println!("{}", render_json(&done, Some(&position.fen()))?);
    } else {
        println!("{}", position.fen());
        println!("{}", render_text(&done));
    }
    match done.last_error {
        Some(err) => anyhow::bail!("Engine error: {}", err),
        None => Ok(()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing();

    let engine_path = cli
        .engine
        .or_else(config::get_engine_path)
        .or_else(engine::find_engine_path)
        .context("No UCI engine found; pass --engine or set CHESSLINE_ENGINE_PATH")?;
    tracing::info!("Using engine at {}", engine_path.display());

    let (process, events) = StockfishProcess::spawn(&engine_path)
        .with_context(|| format!("Failed to start {}", engine_path.display()))?;
    let session = spawn_session(
        process,
        events,
        SessionConfig {
            search_depth: cli.depth.unwrap_or_else(config::get_search_depth),
            line_count: cli.lines.unwrap_or_else(config::get_line_count),
            handshake_timeout: config::get_handshake_timeout(),
            ..Default::default()
        },
    );
    if cli.uci_log {
        echo_uci_traffic(&session);
    }

    let result = match cli.command.unwrap_or(Commands::Repl) {
        Commands::Analyze { fen, moves } => analyze(&session, fen, moves, cli.json).await,
        Commands::Repl => repl::run(session.clone(), cli.json).await,
    };

    session.shutdown().await;
    result
}
