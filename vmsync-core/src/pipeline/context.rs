//! Pipeline context management.
//!
//! Provides the run context shared by every stage of one reconciliation
//! pass: its id (for log correlation) and its timestamp.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::logging::structured::LogContext;

/// Context for one reconciliation pass.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    /// Stamped onto every reconciled record of the pass.
    pub started_at: DateTime<Utc>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    /// Context with a fixed timestamp.
    pub fn at(started_at: DateTime<Utc>) -> Self {
        let run_id = format!("sync-{}", &Uuid::new_v4().to_string()[..8]);
        Self { run_id, started_at }
    }

    pub fn log_context(&self) -> LogContext {
        LogContext::new(&self.run_id)
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}
