//! Structured logging utilities.
//!
//! Provides context-aware logging with run_id, subscription and
//! resource group included in every log message.

use std::fmt;

/// Logging context for one reconciliation run.
#[derive(Debug, Clone)]
pub struct LogContext {
    pub run_id: String,
    pub subscription: Option<String>,
    pub resource_group: Option<String>,
}

impl LogContext {
    pub fn new(run_id: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            subscription: None,
            resource_group: None,
        }
    }

    pub fn with_subscription(&self, subscription_id: &str) -> Self {
        Self {
            run_id: self.run_id.clone(),
            subscription: Some(subscription_id.to_string()),
            resource_group: None,
        }
    }

    pub fn with_resource_group(&self, resource_group: &str) -> Self {
        Self {
            run_id: self.run_id.clone(),
            subscription: self.subscription.clone(),
            resource_group: Some(resource_group.to_string()),
        }
    }
}

impl fmt::Display for LogContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[run={}]", self.run_id)?;
        if let Some(sub) = &self.subscription {
            write!(f, " [sub={}]", sub)?;
        }
        if let Some(rg) = &self.resource_group {
            write!(f, " [rg={}]", rg)?;
        }
        Ok(())
    }
}

/// Log an info message with context.
#[macro_export]
macro_rules! log_info {
    ($ctx:expr, $event:expr, $($key:ident = $value:expr),* $(,)?) => {
        log::info!(
            "{} {} {}",
            $ctx,
            $event,
            format_args!(concat!($(stringify!($key), "={:?} "),*), $($value),*)
        );
    };
}

/// Log a warning message with context.
#[macro_export]
macro_rules! log_warn {
    ($ctx:expr, $event:expr, $($key:ident = $value:expr),* $(,)?) => {
        log::warn!(
            "{} {} {}",
            $ctx,
            $event,
            format_args!(concat!($(stringify!($key), "={:?} "),*), $($value),*)
        );
    };
}

/// Log an error message with context.
#[macro_export]
macro_rules! log_error {
    ($ctx:expr, $event:expr, $($key:ident = $value:expr),* $(,)?) => {
        log::error!(
            "{} {} {}",
            $ctx,
            $event,
            format_args!(concat!($(stringify!($key), "={:?} "),*), $($value),*)
        );
    };
}

/// Log a debug message with context.
#[macro_export]
macro_rules! log_debug {
    ($ctx:expr, $event:expr, $($key:ident = $value:expr),* $(,)?) => {
        log::debug!(
            "{} {} {}",
            $ctx,
            $event,
            format_args!(concat!($(stringify!($key), "={:?} "),*), $($value),*)
        );
    };
}
