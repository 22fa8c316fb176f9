//! Terminal output for session snapshots.

use engine::{EngineLine, ScoreClass, SessionState};
use serde::Serialize;

/// PV moves shown per line in text mode.
const PV_PREVIEW_MOVES: usize = 10;

fn class_marker(class: ScoreClass) -> char {
    match class {
        ScoreClass::Favorable => '+',
        ScoreClass::Unfavorable => '-',
        ScoreClass::Neutral => '=',
    }
}

fn render_line(line: &EngineLine) -> String {
    let mut pv = line
        .pv
        .iter()
        .take(PV_PREVIEW_MOVES)
        .cloned()
        .collect::<Vec<_>>()
        .join(" ");
    if line.pv.len() > PV_PREVIEW_MOVES {
        pv.push_str(" ...");
    }
    format!(
        "{:>2}. {:>7} {}  {}",
        line.multipv,
        line.display_score(),
        class_marker(line.score_class()),
        pv
    )
}

/// Human-readable snapshot: a status header followed by the ranked lines.
pub fn render_text(state: &SessionState) -> String {
    let status = match (state.ready, state.running) {
        (false, _) => "not ready",
        (true, true) => "searching",
        (true, false) => "idle",
    };
    let mut out = format!(
        "depth {}/{}  lines {}  [{}]",
        state.observed_depth, state.configured_depth, state.configured_line_count, status
    );
    if let Some(err) = &state.last_error {
        out.push_str(&format!("\nengine error: {}", err));
    }
    for line in state.ranked_lines() {
        out.push('\n');
        out.push_str(&render_line(line));
    }
    out
}

#[derive(Serialize)]
struct JsonSnapshot<'a> {
    fen: Option<&'a str>,
    #[serde(flatten)]
    state: &'a SessionState,
}

/// Single-line JSON snapshot, tagged with the analyzed position when known.
pub fn render_json(state: &SessionState, fen: Option<&str>) -> serde_json::Result<String> {
    serde_json::to_string(&JsonSnapshot { fen, state })
}
