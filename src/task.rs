//! Task orchestration: selects the `start` or `analyze` task, runs it under
//! the global deadline, and guarantees the browser session is released on
//! every exit path.
//!
//! Failures inside the deadline are reported through the notification
//! channel and never crash the process; the exit code only reflects errors
//! the runner itself cannot catch.

use std::time::Duration;

use chrono::{DateTime, Timelike, Utc};
use tracing::{info, warn};

use crate::config;
use crate::error::SentryError;
use crate::extract::{self, Status, STATUS_CAPACITY};
use crate::notify::Notify;
use crate::session::{PageDriver, PageSession};
use crate::state::StateStore;
use crate::trend::{self, Trend};

/// Whole-task deadline covering the open+interact sequence.
pub const GLOBAL_DEADLINE_MS: u64 = 120_000;

/// Text of the control that starts the dashboard's bot.
pub const START_CONTROL_LABEL: &str = "Start Bot";

pub const START_OK_MESSAGE: &str = "✅ Bot started (hourly).";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Start,
    Analyze,
}

impl Task {
    /// Resolve the task from CLI arguments. Accepts a bare `start` /
    /// `analyze` / `auto` selector or the `--task=NAME` flag form; anything
    /// else (or nothing) defaults to `analyze`.
    pub fn from_args<I: IntoIterator<Item = String>>(args: I) -> Task {
        for arg in args {
            let selector = arg.strip_prefix("--task=").unwrap_or(&arg);
            match selector {
                "start" => return Task::Start,
                "analyze" => return Task::Analyze,
                "auto" => return Task::from_clock(Utc::now()),
                _ => {}
            }
        }
        Task::Analyze
    }

    /// `auto` selector: the top of the hour runs `start`, every other
    /// scheduler tick analyzes.
    pub fn from_clock(now: DateTime<Utc>) -> Task {
        if now.minute() == 0 {
            Task::Start
        } else {
            Task::Analyze
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Task::Start => "start",
            Task::Analyze => "analyze",
        }
    }
}

/// What one analyze pass did, for logging and tests.
#[derive(Debug, PartialEq, Eq)]
pub enum AnalyzeOutcome {
    /// Fewer than six signals present; the page has not settled. No
    /// notification, no state write.
    Shortfall(usize),
    /// Trend equals the stored value; nothing to do.
    Unchanged(Trend),
    /// All-neutral (or tied) classification. Never notified; `recorded` is
    /// true only for the first such run after a non-neutral trend.
    NeutralAll { recorded: bool },
    /// Trend changed: one notification sent, state updated.
    Notified { from: Option<Trend>, to: Trend },
}

fn trend_message(trend: Trend, statuses: &[Status]) -> String {
    let labels = statuses
        .iter()
        .map(Status::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "📊 Trend changed: <b>{}</b>\nSignals: {}",
        trend.as_str(),
        labels
    )
}

fn failure_message(task: Task, err: &SentryError) -> String {
    format!("⚠️ {} task failed: {}", task.name(), err)
}

/// Body of the `start` task: open the dashboard and press its start
/// control. A missing control is not an error — the bot is already running.
pub async fn start_body(page: &dyn PageDriver, url: &str) -> Result<(), SentryError> {
    page.open(url).await?;
    if page.click_control(START_CONTROL_LABEL).await? {
        info!("▶️ Clicked '{}'", START_CONTROL_LABEL);
    } else {
        info!("'{}' control not found; bot already running", START_CONTROL_LABEL);
    }
    Ok(())
}

/// Body of the `analyze` task: scrape, classify, compare against the stored
/// trend, and notify + persist only on a qualifying transition.
pub async fn analyze_body(
    page: &dyn PageDriver,
    notifier: &dyn Notify,
    store: &StateStore,
    url: &str,
    settle: Duration,
) -> Result<AnalyzeOutcome, SentryError> {
    page.open(url).await?;

    // Defensive: the dashboard only renders signals while its bot runs.
    if page.click_control(START_CONTROL_LABEL).await? {
        info!("▶️ Clicked '{}' before analyzing", START_CONTROL_LABEL);
    }

    let statuses = extract::extract(page, settle).await?;
    if statuses.len() < STATUS_CAPACITY {
        info!(
            "⏳ Only {}/{} signals present; page not settled, skipping this run",
            statuses.len(),
            STATUS_CAPACITY
        );
        return Ok(AnalyzeOutcome::Shortfall(statuses.len()));
    }

    let new = trend::classify(&statuses);

    // Hold the lock across load → compare → save.
    let _lock = store.lock();
    let last = store.load();
    info!("📈 Classified trend {} (last: {:?})", new, last);

    match (new, last) {
        (Trend::NeutralAll, Some(Trend::NeutralAll)) => {
            Ok(AnalyzeOutcome::NeutralAll { recorded: false })
        }
        (Trend::NeutralAll, _) => {
            store.save(Trend::NeutralAll);
            Ok(AnalyzeOutcome::NeutralAll { recorded: true })
        }
        (new, Some(last)) if new == last => Ok(AnalyzeOutcome::Unchanged(new)),
        (new, last) => {
            notifier.notify(&trend_message(new, &statuses)).await;
            store.save(new);
            Ok(AnalyzeOutcome::Notified { from: last, to: new })
        }
    }
}

/// Run one task end to end: acquire a session, race the body against the
/// global deadline, release the session unconditionally, then report.
pub async fn run(task: Task, notifier: &dyn Notify) -> anyhow::Result<()> {
    let Some(url) = config::target_url() else {
        warn!(
            "{} not set; skipping {} task",
            config::ENV_TARGET_URL,
            task.name()
        );
        return Ok(());
    };

    let store = StateStore::from_env();
    let settle = config::settle_delay();

    let session = match PageSession::launch().await {
        Ok(s) => s,
        Err(e) => {
            warn!("{}", e);
            notifier.notify(&failure_message(task, &e)).await;
            return Ok(());
        }
    };

    let deadline = Duration::from_millis(GLOBAL_DEADLINE_MS);
    let result = match task {
        Task::Start => tokio::time::timeout(deadline, start_body(&session, &url)).await,
        Task::Analyze => {
            tokio::time::timeout(deadline, async {
                analyze_body(&session, notifier, &store, &url, settle)
                    .await
                    .map(|outcome| info!("Analyze outcome: {:?}", outcome))
            })
            .await
        }
    };

    // Unconditional release. For a timed-out body the abandoned future may
    // have left the browser mid-operation; closing it is the cleanup.
    session.close().await;

    match result {
        Ok(Ok(())) => {
            if task == Task::Start {
                notifier.notify(START_OK_MESSAGE).await;
            }
            Ok(())
        }
        Ok(Err(e)) => {
            warn!("{} task failed: {}", task.name(), e);
            notifier.notify(&failure_message(task, &e)).await;
            Ok(())
        }
        Err(_) => {
            let e = SentryError::Deadline(GLOBAL_DEADLINE_MS);
            warn!("{} task hit the global deadline", task.name());
            notifier.notify(&failure_message(task, &e)).await;
            Ok(())
        }
    }
}
