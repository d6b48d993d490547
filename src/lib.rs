pub mod browser;
pub mod config;
pub mod error;
pub mod extract;
pub mod notify;
pub mod session;
pub mod state;
pub mod task;
pub mod trend;

pub use error::SentryError;
pub use extract::{Status, STATUS_CAPACITY};
pub use notify::{Notify, TelegramNotifier};
pub use session::{PageDriver, PageSession, ProbePass};
pub use state::StateStore;
pub use task::{AnalyzeOutcome, Task};
pub use trend::{classify, Trend};
