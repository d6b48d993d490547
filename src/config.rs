//! Environment-variable configuration.
//!
//! Everything is optional: missing Telegram credentials silently disable
//! notifications, a missing `TARGET_URL` disables the navigation-dependent
//! tasks. Values are trimmed; empty strings count as unset.

use std::path::PathBuf;
use std::time::Duration;

pub const ENV_TELEGRAM_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
pub const ENV_TELEGRAM_CHAT_ID: &str = "TELEGRAM_CHAT_ID";
pub const ENV_TARGET_URL: &str = "TARGET_URL";
pub const ENV_STATE_FILE: &str = "STATE_FILE";
pub const ENV_SETTLE_DELAY_MS: &str = "SETTLE_DELAY_MS";
pub const ENV_CHROME_EXECUTABLE: &str = "CHROME_EXECUTABLE";

/// Fixed wait after navigation before scraping, so asynchronous dashboard
/// content can finish rendering.
pub const SETTLE_DELAY_DEFAULT_MS: u64 = 5_000;

const STATE_FILE_DEFAULT: &str = "trend-state.txt";

fn non_empty(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Telegram bot token. Never logged.
pub fn telegram_bot_token() -> Option<String> {
    non_empty(ENV_TELEGRAM_BOT_TOKEN)
}

pub fn telegram_chat_id() -> Option<String> {
    non_empty(ENV_TELEGRAM_CHAT_ID)
}

/// The dashboard URL the tasks operate on. `None` disables both tasks.
pub fn target_url() -> Option<String> {
    non_empty(ENV_TARGET_URL)
}

/// Path of the single-token trend state file (default: `trend-state.txt`
/// in the working directory).
pub fn state_file() -> PathBuf {
    non_empty(ENV_STATE_FILE)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(STATE_FILE_DEFAULT))
}

/// Settle delay before scraping: `SETTLE_DELAY_MS` env var → 5 000 ms.
pub fn settle_delay() -> Duration {
    let ms = non_empty(ENV_SETTLE_DELAY_MS)
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(SETTLE_DELAY_DEFAULT_MS);
    Duration::from_millis(ms)
}

/// Optional override for the Chromium-family browser executable.
///
/// Default behavior is auto-discovery (see [`crate::browser::find_chrome_executable`]).
/// This only returns a value when `CHROME_EXECUTABLE` points at an existing path.
pub fn chrome_executable_override() -> Option<String> {
    let p = non_empty(ENV_CHROME_EXECUTABLE)?;
    if std::path::Path::new(&p).exists() {
        Some(p)
    } else {
        None
    }
}
