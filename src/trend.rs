//! Trend classification — the pure reduction from a run's status set to a
//! single aggregate value.

use crate::extract::Status;

/// Aggregate classification of one analyze run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Buy,
    Sell,
    NeutralAll,
    /// Only produced for an empty status set; never persisted.
    Unknown,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Buy => "BUY",
            Trend::Sell => "SELL",
            Trend::NeutralAll => "NEUTRAL_ALL",
            Trend::Unknown => "UNKNOWN",
        }
    }

    /// Parse a persisted state-file token. Unrecognized input → `None`.
    pub fn from_token(token: &str) -> Option<Trend> {
        match token {
            "BUY" => Some(Trend::Buy),
            "SELL" => Some(Trend::Sell),
            "NEUTRAL_ALL" => Some(Trend::NeutralAll),
            _ => None,
        }
    }
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reduce a status set to its trend. Deterministic, no I/O.
///
/// An exact BUY/SELL tie collapses into `NeutralAll` together with the
/// genuine all-neutral case. That conflation is inherited behavior the
/// rest of the pipeline depends on; do not "fix" it here.
pub fn classify(statuses: &[Status]) -> Trend {
    if statuses.is_empty() {
        return Trend::Unknown;
    }
    let buys = statuses.iter().filter(|s| **s == Status::Buy).count();
    let sells = statuses.iter().filter(|s| **s == Status::Sell).count();
    if buys == 0 && sells == 0 {
        return Trend::NeutralAll;
    }
    if buys > sells {
        Trend::Buy
    } else if sells > buys {
        Trend::Sell
    } else {
        Trend::NeutralAll
    }
}
