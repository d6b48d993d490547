//! Status extraction — maps rendered-page text fragments to the closed
//! signal vocabulary, capped at [`STATUS_CAPACITY`] entries.
//!
//! Two-pass strategy: scan a short allow-list of structural containers first
//! (cheap, low-noise), fall back to a full-document scan only when that pass
//! comes up short. A naive full scan repeats the same label through every
//! nested wrapper and crawls on large DOMs; the structural pass avoids both,
//! the fallback keeps us working when the page layout shifts.

use std::time::Duration;

use tracing::debug;

use crate::error::SentryError;
use crate::session::{PageDriver, ProbePass};

/// The dashboard renders exactly six signal gauges. Fewer matches means the
/// page has not settled yet.
pub const STATUS_CAPACITY: usize = 6;

/// One classified sentiment token scraped from the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Buy,
    Sell,
    Neutral,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Buy => "BUY",
            Status::Sell => "SELL",
            Status::Neutral => "NEUTRAL",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// Checked in this order so "Strong Buy" / "Strong Sell" are claimed before
// the bare "neutral" needle gets a look at the fragment.
const LABEL_NEEDLES: &[(&str, Status)] = &[
    ("strong buy", Status::Buy),
    ("strong sell", Status::Sell),
    ("neutral", Status::Neutral),
];

/// The lowercase needles the in-page probe filters against, in match
/// priority order.
pub fn probe_needles() -> Vec<&'static str> {
    LABEL_NEEDLES.iter().map(|(needle, _)| *needle).collect()
}

/// Case-insensitive substring match of one text fragment against the label
/// vocabulary. Unmatched text yields `None`.
pub fn match_label(text: &str) -> Option<Status> {
    let lower = text.to_lowercase();
    LABEL_NEEDLES
        .iter()
        .find(|(needle, _)| lower.contains(needle))
        .map(|(_, status)| *status)
}

fn collect(texts: &[String]) -> Vec<Status> {
    texts
        .iter()
        .filter_map(|t| match_label(t))
        .take(STATUS_CAPACITY)
        .collect()
}

/// Wait for the page to settle, then scrape up to six statuses in document
/// order. Zero matches is an empty vec, not an error.
pub async fn extract(
    page: &dyn PageDriver,
    settle: Duration,
) -> Result<Vec<Status>, SentryError> {
    tokio::time::sleep(settle).await;

    let needles = probe_needles();
    let texts = page
        .probe(ProbePass::Structural, &needles, STATUS_CAPACITY)
        .await?;
    let mut statuses = collect(&texts);

    if statuses.len() < STATUS_CAPACITY {
        debug!(
            "Structural pass found {}/{} signals; falling back to full-document scan",
            statuses.len(),
            STATUS_CAPACITY
        );
        let texts = page
            .probe(ProbePass::FullDocument, &needles, STATUS_CAPACITY)
            .await?;
        statuses = collect(&texts);
    }

    statuses.truncate(STATUS_CAPACITY);
    Ok(statuses)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_are_case_insensitive_substrings() {
        assert_eq!(match_label("Strong Buy"), Some(Status::Buy));
        assert_eq!(match_label("  STRONG SELL  "), Some(Status::Sell));
        assert_eq!(match_label("Signal: neutral"), Some(Status::Neutral));
        assert_eq!(match_label("Summary: Strong buy today"), Some(Status::Buy));
    }

    #[test]
    fn unmatched_text_yields_nothing() {
        assert_eq!(match_label("Buy"), None);
        assert_eq!(match_label("Sell now"), None);
        assert_eq!(match_label(""), None);
    }

    #[test]
    fn strong_labels_win_over_neutral_in_mixed_fragments() {
        // A fragment carrying both tokens resolves by priority order.
        assert_eq!(match_label("was Neutral, now Strong Buy"), Some(Status::Buy));
    }

    #[test]
    fn collect_caps_at_capacity() {
        let texts: Vec<String> = (0..10).map(|_| "Strong Buy".to_string()).collect();
        assert_eq!(collect(&texts).len(), STATUS_CAPACITY);
    }
}
