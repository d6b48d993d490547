//! Error taxonomy for the failures a task can surface.
//!
//! Only navigation, launch, and global-deadline failures ever reach the user
//! (reported through the notification channel by the task runner).
//! Persistence and notification problems are soft-failed where they occur
//! and never show up here.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SentryError {
    #[error("Browser launch failed: {0}")]
    Launch(String),

    #[error("Navigation failed after {attempts} attempts: {url}")]
    Navigation { url: String, attempts: u32 },

    #[error("Page evaluation failed: {0}")]
    Evaluate(String),

    #[error("Task exceeded the {0} ms deadline")]
    Deadline(u64),
}
