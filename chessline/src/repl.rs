//! Interactive analysis loop.
//!
//! Commands are read line by line from stdin and turned into session requests.
//! Analysis updates are printed whenever a search iteration completes.

use std::str::FromStr;

use engine::{SessionError, SessionHandle, SessionState};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::wrappers::LinesStream;
use tokio_stream::StreamExt;

use crate::position::Position;
use crate::render::{render_json, render_text};

const HELP: &str = "\
commands:
  startpos                          analyze the initial position
  fen <FEN>                         analyze a position
  moves <m1> <m2> ...               play UCI moves on the current board
  undo                              take back the last move
  setoption name <N> value <V>      change an engine option
  depth <N>                         change the search depth
  stop                              stop searching
  go                                analyze the current position again
  show                              print the current position and lines
  quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    StartPos,
    Fen(String),
    Moves(Vec<String>),
    Undo,
    SetOption { name: String, value: String },
    Depth(u32),
    Stop,
    Go,
    Show,
    Help,
    Quit,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ReplParseError {
    #[error("Unknown command: {0} (try `help`)")]
    Unknown(String),
    #[error("Usage: {0}")]
    Usage(&'static str),
}

impl FromStr for ReplCommand {
    type Err = ReplParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut tokens = line.split_whitespace();
        let keyword = tokens.next().unwrap_or_default();
        let rest: Vec<&str> = tokens.collect();

        match keyword {
            "startpos" => Ok(Self::StartPos),
            "fen" if !rest.is_empty() => Ok(Self::Fen(rest.join(" "))),
            "fen" => Err(ReplParseError::Usage("fen <FEN>")),
            "moves" if !rest.is_empty() => {
                Ok(Self::Moves(rest.iter().map(|m| m.to_string()).collect()))
            }
            "moves" => Err(ReplParseError::Usage("moves <m1> <m2> ...")),
            "undo" => Ok(Self::Undo),
            "setoption" => parse_setoption(&rest),
            "depth" => match rest.as_slice() {
                [n] => n
                    .parse::<u32>()
                    .ok()
                    .filter(|d| *d > 0)
                    .map(Self::Depth)
                    .ok_or(ReplParseError::Usage("depth <N>")),
                _ => Err(ReplParseError::Usage("depth <N>")),
            },
            "stop" => Ok(Self::Stop),
            "go" => Ok(Self::Go),
            "show" => Ok(Self::Show),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            other => Err(ReplParseError::Unknown(other.to_string())),
        }
    }
}

/// `setoption name <N...> value <V...>`; names and values may contain spaces.
fn parse_setoption(tokens: &[&str]) -> Result<ReplCommand, ReplParseError> {
    const USAGE: &str = "setoption name <N> value <V>";

    if tokens.first() != Some(&"name") {
        return Err(ReplParseError::Usage(USAGE));
    }
    let value_at = tokens
        .iter()
        .position(|t| *t == "value")
        .ok_or(ReplParseError::Usage(USAGE))?;
    let name = tokens[1..value_at].join(" ");
    let value = tokens[value_at + 1..].join(" ");
    if name.is_empty() || value.is_empty() {
        return Err(ReplParseError::Usage(USAGE));
    }
    Ok(ReplCommand::SetOption { name, value })
}

/// Identity of the last printed update, so unchanged snapshots are skipped.
#[derive(Debug, Default, PartialEq, Eq)]
struct Shown {
    depth: u32,
    running: bool,
    error: Option<String>,
}

impl Shown {
    fn of(state: &SessionState) -> Self {
        Self {
            depth: state.observed_depth,
            running: state.running,
            error: state.last_error.clone(),
        }
    }
}

/// Whether every line in the snapshot belongs to the deepest iteration.
fn iteration_complete(state: &SessionState) -> bool {
    !state.lines.is_empty()
        && state
            .lines
            .values()
            .all(|line| line.depth >= state.observed_depth)
}

pub struct Repl {
    session: SessionHandle,
    position: Position,
    json: bool,
}

impl Repl {
    pub fn new(session: SessionHandle, json: bool) -> Self {
        Self {
            session,
            position: Position::startpos(),
            json,
        }
    }

    /// Apply one command. Position errors leave the board untouched.
    pub async fn apply(&mut self, command: ReplCommand) -> anyhow::Result<()> {
        match command {
            ReplCommand::StartPos => self.replace_position(Position::startpos()).await?,
            ReplCommand::Fen(fen) => self.replace_position(Position::from_fen(&fen)?).await?,
            ReplCommand::Moves(moves) => {
                let mut next = self.position.clone();
                for mv in &moves {
                    next.play_uci(mv)?;
                }
                self.replace_position(next).await?;
            }
            ReplCommand::Undo => {
                let mut next = self.position.clone();
                next.undo()?;
                self.replace_position(next).await?;
            }
            ReplCommand::SetOption { name, value } => {
                self.session.request_option_change(name, value).await?;
            }
            ReplCommand::Depth(depth) => {
                self.session.set_search_depth(depth).await?;
                self.session.resume_analysis().await?;
            }
            ReplCommand::Stop => self.session.request_stop().await?,
            ReplCommand::Go => self.session.resume_analysis().await?,
            ReplCommand::Show => {
                if !self.json {
                    println!(
                        "{}  ({} moves played)",
                        self.position.fen(),
                        self.position.move_count()
                    );
                }
                self.print(&self.session.snapshot())?;
            }
            ReplCommand::Help => println!("{}", HELP),
            ReplCommand::Quit => {}
        }
        Ok(())
    }

    async fn replace_position(&mut self, position: Position) -> Result<(), SessionError> {
        if !position.has_legal_moves() {
            eprintln!("No legal moves in this position");
        }
        let fen = position.fen();
        self.position = position;
        tracing::debug!(%fen, "Requesting analysis");
        self.session.request_position(fen).await
    }

    fn print(&self, state: &SessionState) -> anyhow::Result<()> {
        if self.json {
            println!("{}", render_json(state, Some(&self.position.fen()))?);
        } else {
            println!("{}\n", render_text(state));
        }
        Ok(())
    }
}

/// Run the interactive loop until `quit`, end of input, or session loss.
pub async fn run(session: SessionHandle, json: bool) -> anyhow::Result<()> {
    let mut reader = session.reader();
    let mut repl = Repl::new(session, json);
    let mut input = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());
    let mut shown = Shown::default();

    eprintln!("Type `help` for commands.");
    repl.apply(ReplCommand::StartPos).await?;

    loop {
        tokio::select! {
            line = input.next() => {
                let Some(line) = line else { break };
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<ReplCommand>() {
                    Ok(ReplCommand::Quit) => break,
                    Ok(command) => {
                        if let Err(err) = repl.apply(command).await {
                            if err.is::<SessionError>() {
                                return Err(err);
                            }
                            eprintln!("{}", err);
                        }
                    }
                    Err(err) => eprintln!("{}", err),
                }
            }

            changed = reader.changed() => {
                if !changed {
                    anyhow::bail!("Engine session closed");
                }
                let state = reader.snapshot_and_mark_seen();
                let current = Shown::of(&state);
                let worth_showing = iteration_complete(&state)
                    || current.error != shown.error
                    || (!current.running && shown.running);
                if worth_showing && current != shown {
                    repl.print(&state)?;
                    shown = current;
                }
            }
        }
    }

    Ok(())
}
