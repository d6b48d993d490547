//! Persisted trend state — a plain-text file holding exactly the last
//! recorded trend token, plus an advisory lockfile so overlapping scheduled
//! runs cannot race the read-modify-write.
//!
//! Both directions fail soft: a missing or unreadable file loads as `None`,
//! and a failed write is logged and swallowed. A persistence hiccup must
//! never fail the run.

use std::fs::{File, OpenOptions};
use std::path::PathBuf;

use fs2::FileExt;
use tracing::{debug, warn};

use crate::config;
use crate::trend::Trend;

pub struct StateStore {
    path: PathBuf,
}

/// Exclusive advisory lock over the state file's read-modify-write window.
/// Released when dropped.
pub struct StateLock {
    _file: File,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_env() -> Self {
        Self::new(config::state_file())
    }

    /// Take the exclusive lock on a sibling `.lock` file. Failure to lock is
    /// itself soft: the run proceeds unguarded, as a scheduler that never
    /// overlaps runs needs no lock at all.
    pub fn lock(&self) -> Option<StateLock> {
        let lock_path = self.path.with_extension("lock");
        let file = match OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
        {
            Ok(f) => f,
            Err(e) => {
                warn!("Could not open lockfile {}: {}", lock_path.display(), e);
                return None;
            }
        };
        match file.lock_exclusive() {
            Ok(()) => Some(StateLock { _file: file }),
            Err(e) => {
                warn!("Could not lock {}: {}", lock_path.display(), e);
                None
            }
        }
    }

    /// Last recorded trend, or `None` when no prior run exists or the file
    /// is unreadable/corrupt.
    pub fn load(&self) -> Option<Trend> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(r) => r,
            Err(e) => {
                debug!("No prior state at {} ({})", self.path.display(), e);
                return None;
            }
        };
        let token = raw.trim();
        let trend = Trend::from_token(token);
        if trend.is_none() && !token.is_empty() {
            warn!(
                "State file {} holds unrecognized token '{}'; treating as no prior state",
                self.path.display(),
                token
            );
        }
        trend
    }

    /// Record `trend` as the new last-known value. Write errors are logged
    /// and swallowed.
    pub fn save(&self, trend: Trend) {
        if let Err(e) = std::fs::write(&self.path, format!("{}\n", trend.as_str())) {
            warn!(
                "Failed to persist trend {} to {}: {}",
                trend,
                self.path.display(),
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> StateStore {
        StateStore::new(dir.path().join("trend-state.txt"))
    }

    #[test]
    fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(store_in(&dir).load(), None);
    }

    #[test]
    fn corrupt_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        std::fs::write(dir.path().join("trend-state.txt"), "HOLD\n").unwrap();
        assert_eq!(store.load(), None);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save(Trend::Sell);
        assert_eq!(store.load(), Some(Trend::Sell));
        store.save(Trend::NeutralAll);
        assert_eq!(store.load(), Some(Trend::NeutralAll));
    }

    #[test]
    fn file_holds_exactly_one_token() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save(Trend::Buy);
        let raw = std::fs::read_to_string(dir.path().join("trend-state.txt")).unwrap();
        assert_eq!(raw, "BUY\n");
    }

    #[test]
    fn lock_is_acquirable_and_released_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let guard = store.lock();
        assert!(guard.is_some());
        drop(guard);
        assert!(store.lock().is_some());
    }
}
