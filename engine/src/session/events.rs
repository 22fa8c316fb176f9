use std::fmt;

/// One line of protocol traffic, for debug views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UciLogEntry {
    pub direction: UciDirection,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UciDirection {
    ToEngine,
    FromEngine,
}

/// Renders as `>> go depth 20` for outbound and `<< bestmove e2e4` for inbound.
impl fmt::Display for UciLogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arrow = match self.direction {
            UciDirection::ToEngine => ">>",
            UciDirection::FromEngine => "<<",
        };
        write!(f, "{} {}", arrow, self.message)
    }
}
