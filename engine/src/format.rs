//! Display helpers for engine evaluations.

use serde::Serialize;

use crate::ScoreKind;

/// Centipawn margin beyond which a position counts as better for one side.
const NEUTRAL_MARGIN_CP: i32 = 15;

/// Qualitative reading of a score from the side to move's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreClass {
    Favorable,
    Unfavorable,
    Neutral,
}

/// Format a score for display.
///
/// Centipawns become pawns with two decimals and a `+` for positive values
/// (`32` → `+0.32`, `-150` → `-1.50`). Mate scores keep their own sign
/// (`3` → `M3`, `-2` → `M-2`).
pub fn format_score(value: i32, kind: ScoreKind) -> String {
    match kind {
        ScoreKind::Mate => format!("M{}", value),
        ScoreKind::Centipawn => {
            let sign = if value > 0 { "+" } else { "" };
            format!("{}{:.2}", sign, value as f64 / 100.0)
        }
    }
}

/// Classify a score as favorable, unfavorable or neutral.
pub fn score_class(value: i32, kind: ScoreKind) -> ScoreClass {
    match kind {
        ScoreKind::Mate if value > 0 => ScoreClass::Favorable,
        ScoreKind::Mate => ScoreClass::Unfavorable,
        ScoreKind::Centipawn if value > NEUTRAL_MARGIN_CP => ScoreClass::Favorable,
        ScoreKind::Centipawn if value < -NEUTRAL_MARGIN_CP => ScoreClass::Unfavorable,
        ScoreKind::Centipawn => ScoreClass::Neutral,
    }
}
