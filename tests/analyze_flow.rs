//! Analyze-task behavior against a canned page: change detection,
//! shortfall handling, neutral transitions, and state persistence.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use trend_sentry::task::{analyze_body, AnalyzeOutcome};
use trend_sentry::{Notify, PageDriver, ProbePass, SentryError, StateStore, Trend};

const URL: &str = "https://dashboard.example/bot";

/// Page double returning canned text fragments per probe pass.
struct FakePage {
    structural: Vec<&'static str>,
    full: Vec<&'static str>,
    clicks: Mutex<Vec<String>>,
}

impl FakePage {
    fn with_signals(fragments: Vec<&'static str>) -> Self {
        Self {
            structural: fragments.clone(),
            full: fragments,
            clicks: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl PageDriver for FakePage {
    async fn open(&self, _url: &str) -> Result<(), SentryError> {
        Ok(())
    }

    async fn click_control(&self, label: &str) -> Result<bool, SentryError> {
        self.clicks.lock().unwrap().push(label.to_string());
        Ok(true)
    }

    async fn probe(
        &self,
        pass: ProbePass,
        needles: &[&str],
        limit: usize,
    ) -> Result<Vec<String>, SentryError> {
        let source = match pass {
            ProbePass::Structural => &self.structural,
            ProbePass::FullDocument => &self.full,
        };
        Ok(source
            .iter()
            .filter(|t| {
                let lower = t.to_lowercase();
                needles.iter().any(|n| lower.contains(n))
            })
            .take(limit)
            .map(|t| t.to_string())
            .collect())
    }
}

struct RecordingNotifier {
    sent: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
        }
    }

    fn messages(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notify for RecordingNotifier {
    async fn notify(&self, text: &str) {
        self.sent.lock().unwrap().push(text.to_string());
    }
}

fn store_in(dir: &TempDir) -> StateStore {
    StateStore::new(dir.path().join("trend-state.txt"))
}

fn state_file_contents(dir: &TempDir) -> Option<String> {
    std::fs::read_to_string(dir.path().join("trend-state.txt")).ok()
}

async fn run_once(
    page: &FakePage,
    notifier: &RecordingNotifier,
    store: &StateStore,
) -> AnalyzeOutcome {
    analyze_body(page, notifier, store, URL, Duration::ZERO)
        .await
        .expect("analyze body should not error against the fake page")
}

#[tokio::test]
async fn buy_majority_from_no_prior_state_notifies_and_persists() {
    let page = FakePage::with_signals(vec![
        "Strong Buy",
        "Strong Buy",
        "Strong Buy",
        "Strong Sell",
        "Neutral",
        "Strong Buy",
    ]);
    let notifier = RecordingNotifier::new();
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    let outcome = run_once(&page, &notifier, &store).await;

    assert_eq!(
        outcome,
        AnalyzeOutcome::Notified {
            from: None,
            to: Trend::Buy
        }
    );
    let messages = notifier.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("BUY"));
    assert!(messages[0].contains("BUY, BUY, BUY, SELL, NEUTRAL, BUY"));
    assert_eq!(state_file_contents(&dir).as_deref(), Some("BUY\n"));
}

#[tokio::test]
async fn shortfall_has_no_side_effects() {
    let page = FakePage::with_signals(vec!["Strong Buy", "Strong Buy", "Neutral"]);
    let notifier = RecordingNotifier::new();
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    let outcome = run_once(&page, &notifier, &store).await;

    assert_eq!(outcome, AnalyzeOutcome::Shortfall(3));
    assert!(notifier.messages().is_empty());
    assert_eq!(state_file_contents(&dir), None);
}

#[tokio::test]
async fn empty_page_is_a_shortfall_too() {
    let page = FakePage::with_signals(vec!["Welcome", "Dashboard"]);
    let notifier = RecordingNotifier::new();
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    let outcome = run_once(&page, &notifier, &store).await;

    assert_eq!(outcome, AnalyzeOutcome::Shortfall(0));
    assert!(notifier.messages().is_empty());
    assert_eq!(state_file_contents(&dir), None);
}

#[tokio::test]
async fn second_identical_run_is_silent() {
    let page = FakePage::with_signals(vec![
        "Strong Sell",
        "Strong Sell",
        "Strong Sell",
        "Strong Sell",
        "Neutral",
        "Strong Buy",
    ]);
    let notifier = RecordingNotifier::new();
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    let first = run_once(&page, &notifier, &store).await;
    let second = run_once(&page, &notifier, &store).await;

    assert_eq!(
        first,
        AnalyzeOutcome::Notified {
            from: None,
            to: Trend::Sell
        }
    );
    assert_eq!(second, AnalyzeOutcome::Unchanged(Trend::Sell));
    assert_eq!(notifier.messages().len(), 1);
}

#[tokio::test]
async fn neutral_runs_never_notify_and_write_at_most_once() {
    let page = FakePage::with_signals(vec![
        "Neutral", "Neutral", "Neutral", "Neutral", "Neutral", "Neutral",
    ]);
    let notifier = RecordingNotifier::new();
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    let first = run_once(&page, &notifier, &store).await;
    let second = run_once(&page, &notifier, &store).await;

    assert_eq!(first, AnalyzeOutcome::NeutralAll { recorded: true });
    assert_eq!(second, AnalyzeOutcome::NeutralAll { recorded: false });
    assert!(notifier.messages().is_empty());
    assert_eq!(state_file_contents(&dir).as_deref(), Some("NEUTRAL_ALL\n"));
}

#[tokio::test]
async fn exact_tie_counts_as_neutral() {
    let page = FakePage::with_signals(vec![
        "Strong Buy",
        "Strong Buy",
        "Strong Buy",
        "Strong Sell",
        "Strong Sell",
        "Strong Sell",
    ]);
    let notifier = RecordingNotifier::new();
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    let outcome = run_once(&page, &notifier, &store).await;

    assert_eq!(outcome, AnalyzeOutcome::NeutralAll { recorded: true });
    assert!(notifier.messages().is_empty());
}

#[tokio::test]
async fn trend_reversal_from_stored_state_notifies() {
    let page = FakePage::with_signals(vec![
        "Strong Sell",
        "Strong Sell",
        "Strong Sell",
        "Strong Sell",
        "Strong Sell",
        "Neutral",
    ]);
    let notifier = RecordingNotifier::new();
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    store.save(Trend::Buy);

    let outcome = run_once(&page, &notifier, &store).await;

    assert_eq!(
        outcome,
        AnalyzeOutcome::Notified {
            from: Some(Trend::Buy),
            to: Trend::Sell
        }
    );
    let messages = notifier.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("SELL"));
    assert_eq!(state_file_contents(&dir).as_deref(), Some("SELL\n"));
}

#[tokio::test]
async fn structural_shortfall_falls_back_to_full_document_scan() {
    let page = FakePage {
        structural: vec!["Strong Buy", "Strong Buy"],
        full: vec![
            "Strong Buy",
            "Strong Buy",
            "Strong Buy",
            "Strong Buy",
            "Neutral",
            "Neutral",
        ],
        clicks: Mutex::new(Vec::new()),
    };
    let notifier = RecordingNotifier::new();
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    let outcome = run_once(&page, &notifier, &store).await;

    assert_eq!(
        outcome,
        AnalyzeOutcome::Notified {
            from: None,
            to: Trend::Buy
        }
    );
}

#[tokio::test]
async fn corrupt_state_file_is_treated_as_no_prior_trend() {
    let page = FakePage::with_signals(vec![
        "Strong Buy",
        "Strong Buy",
        "Strong Buy",
        "Strong Buy",
        "Neutral",
        "Neutral",
    ]);
    let notifier = RecordingNotifier::new();
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    std::fs::write(dir.path().join("trend-state.txt"), "garbage\n").unwrap();

    let outcome = run_once(&page, &notifier, &store).await;

    assert_eq!(
        outcome,
        AnalyzeOutcome::Notified {
            from: None,
            to: Trend::Buy
        }
    );
    assert_eq!(state_file_contents(&dir).as_deref(), Some("BUY\n"));
}

#[tokio::test]
async fn analyze_presses_the_start_control_defensively() {
    let page = FakePage::with_signals(vec![]);
    let notifier = RecordingNotifier::new();
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    let _ = run_once(&page, &notifier, &store).await;

    let clicks = page.clicks.lock().unwrap();
    assert_eq!(clicks.as_slice(), ["Start Bot"]);
}
