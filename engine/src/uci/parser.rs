use crate::{EngineLine, ScoreKind};

/// Inbound engine output the session cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UciEvent {
    /// `uciok`: the handshake is complete.
    HandshakeAck,
    /// `readyok`: the engine has settled.
    ReadyAck,
    /// An `info` line carrying a score and a principal variation.
    Progress(EngineLine),
    /// `bestmove`: the current search is over.
    SearchFinished {
        best_move: Option<String>,
        ponder: Option<String>,
    },
}

/// Parse one raw line of engine output.
///
/// Returns `None` for anything that is not one of the recognized events; a
/// live engine prints plenty of lines (`id`, `option`, `info string`, ...)
/// the session ignores.
pub fn parse_event(line: &str) -> Option<UciEvent> {
    let line = line.trim();
    match line {
        "uciok" => return Some(UciEvent::HandshakeAck),
        "readyok" => return Some(UciEvent::ReadyAck),
        _ => {}
    }

    let tokens: Vec<&str> = line.split_whitespace().collect();
    match tokens.first() {
        Some(&"bestmove") => Some(parse_bestmove(&tokens[1..])),
        Some(&"info") => parse_progress(&tokens[1..]).map(UciEvent::Progress),
        _ => None,
    }
}

fn parse_bestmove(tokens: &[&str]) -> UciEvent {
    let best_move = tokens
        .first()
        .filter(|mv| **mv != "(none)")
        .map(|mv| mv.to_string());
    let ponder = match tokens {
        [_, "ponder", mv, ..] => Some(mv.to_string()),
        _ => None,
    };
    UciEvent::SearchFinished { best_move, ponder }
}

/// Parse the tokens after `info`. Only lines with both `score` and `pv` are
/// progress samples; numeric fields that fail to parse become zero.
fn parse_progress(tokens: &[&str]) -> Option<EngineLine> {
    if tokens.first() == Some(&"string") {
        return None;
    }
    if !tokens.contains(&"score") || !tokens.contains(&"pv") {
        return None;
    }

    let mut line = EngineLine {
        multipv: 1,
        ..Default::default()
    };
    let mut i = 0;

    while i < tokens.len() {
        match tokens[i] {
            "depth" => {
                i += 1;
                line.depth = number(tokens.get(i));
            }
            "multipv" => {
                i += 1;
                line.multipv = number(tokens.get(i));
            }
            "nodes" => {
                i += 1;
                line.nodes = number(tokens.get(i));
            }
            "nps" => {
                i += 1;
                line.nps = number(tokens.get(i));
            }
            "score" => {
                i += 1;
                line.score_kind = match tokens.get(i) {
                    Some(&"mate") => ScoreKind::Mate,
                    _ => ScoreKind::Centipawn,
                };
                i += 1;
                line.score = number(tokens.get(i));
            }
            "pv" => {
                // The principal variation runs to the end of the line.
                line.pv = tokens[i + 1..].iter().map(|mv| mv.to_string()).collect();
                line.raw_pv = line.pv.join(" ");
                break;
            }
            _ => {}
        }
        i += 1;
    }

    Some(line)
}

fn number<T: std::str::FromStr + Default>(token: Option<&&str>) -> T {
    token.and_then(|s| s.parse().ok()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_handshake_and_ready() {
        assert_eq!(parse_event("uciok"), Some(UciEvent::HandshakeAck));
        assert_eq!(parse_event("readyok\r\n"), Some(UciEvent::ReadyAck));
        assert_eq!(parse_event("readyokay"), None);
    }

    #[test]
    fn test_parse_info() {
        let event = parse_event(
            "info depth 20 seldepth 30 multipv 1 score cp 32 nodes 1234567 nps 2345678 pv e2e4 e7e5",
        );
        match event {
            Some(UciEvent::Progress(line)) => {
                assert_eq!(line.depth, 20);
                assert_eq!(line.multipv, 1);
                assert_eq!(line.score, 32);
                assert_eq!(line.score_kind, ScoreKind::Centipawn);
                assert_eq!(line.pv, vec!["e2e4", "e7e5"]);
                assert_eq!(line.raw_pv, "e2e4 e7e5");
                assert_eq!(line.nodes, 1234567);
                assert_eq!(line.nps, 2345678);
            }
            other => panic!("Wrong event: {:?}", other),
        }
    }

    #[test]
    fn test_parse_mate_without_multipv() {
        let Some(UciEvent::Progress(line)) =
            parse_event("info depth 7 score mate -3 nodes 900 pv h7h8 g6g7")
        else {
            panic!("expected progress");
        };
        assert_eq!(line.multipv, 1);
        assert_eq!(line.score, -3);
        assert_eq!(line.score_kind, ScoreKind::Mate);
    }

    #[test]
    fn test_parse_bound_and_malformed_numbers() {
        let Some(UciEvent::Progress(line)) = parse_event(
            "info depth x multipv 2 score cp 41 lowerbound nodes ?? nps 10 pv d2d4",
        ) else {
            panic!("expected progress");
        };
        assert_eq!(line.depth, 0);
        assert_eq!(line.multipv, 2);
        assert_eq!(line.score, 41);
        assert_eq!(line.nodes, 0);
        assert_eq!(line.nps, 10);
        assert_eq!(line.pv, vec!["d2d4"]);
    }

    #[test]
    fn test_info_without_score_or_pv_is_ignored() {
        assert_eq!(parse_event("info depth 5 currmove e2e4 currmovenumber 1"), None);
        assert_eq!(parse_event("info depth 5 score cp 10"), None);
        assert_eq!(parse_event("info string NNUE evaluation using score pv net"), None);
    }

    #[test]
    fn test_parse_bestmove() {
        assert_eq!(
            parse_event("bestmove e2e4 ponder e7e5"),
            Some(UciEvent::SearchFinished {
                best_move: Some("e2e4".into()),
                ponder: Some("e7e5".into()),
            })
        );
        assert_eq!(
            parse_event("bestmove (none)"),
            Some(UciEvent::SearchFinished {
                best_move: None,
                ponder: None,
            })
        );
    }

    #[test]
    fn test_noise_is_ignored() {
        assert_eq!(parse_event(""), None);
        assert_eq!(parse_event("id name Stockfish 17"), None);
        assert_eq!(parse_event("option name Hash type spin default 16 min 1 max 33554432"), None);
        assert_eq!(parse_event("Stockfish 17 by the Stockfish developers"), None);
    }
}
