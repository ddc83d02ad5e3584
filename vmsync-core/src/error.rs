//! Error types for the inventory reconciliation core.
//!
//! Every error is contained at the scope it occurs in. Systemic failures
//! (credential rejected, control plane unreachable) abort a reconciliation
//! pass only when they hit every subscription.

use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, InventoryError>;

/// Core error type for inventory operations.
#[derive(Error, Debug)]
pub enum InventoryError {
    /// Authorization was rejected or a token could not be acquired
    #[error("Credential error: {0}")]
    Credential(String),

    /// The control plane could not be reached at the transport level
    #[error("Control plane unreachable: {0}")]
    Unreachable(String),

    /// The control plane answered with a non-success status
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// Payload did not have the expected shape
    #[error("Decode error: {0}")]
    Decode(String),

    /// Stream-level failure while reading the spreadsheet
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] std::io::Error),

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Persistence boundary rejected the reconciled set
    #[error("Storage error: {0}")]
    Storage(String),
}

impl InventoryError {
    /// Credential or transport failure. Contained per scope like any other
    /// error; the pass aborts only when every subscription fails this way.
    pub fn is_systemic(&self) -> bool {
        matches!(self, Self::Credential(_) | Self::Unreachable(_))
    }

    /// Remediation hints shown alongside a failed sync.
    pub fn remediation(&self) -> Vec<&'static str> {
        match self {
            Self::Credential(_) => vec![
                "Verify AZURE_TENANT_ID, AZURE_CLIENT_ID and AZURE_CLIENT_SECRET",
                "Confirm the service principal has Reader access on every subscription",
                "If using an ambient token, refresh AZURE_ACCESS_TOKEN",
            ],
            Self::Unreachable(_) => vec![
                "Check outbound connectivity to the management endpoint",
                "Check proxy and firewall settings",
            ],
            Self::Api { status, .. } if *status == 404 => {
                vec!["Verify the subscription ids in AZURE_SUBSCRIPTIONS"]
            }
            Self::Config(_) => vec!["Review the environment configuration (.env)"],
            Self::Spreadsheet(_) => vec!["Check that SPREADSHEET_PATH is readable"],
            _ => vec!["Check the service logs for details"],
        }
    }
}

impl From<reqwest::Error> for InventoryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            return Self::Unreachable(err.to_string());
        }
        if err.is_decode() {
            return Self::Decode(err.to_string());
        }
        match err.status() {
            Some(status) if status.as_u16() == 401 || status.as_u16() == 403 => {
                Self::Credential(err.to_string())
            }
            Some(status) => Self::Api {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => Self::Unreachable(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for InventoryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_systemic_classification() {
        assert!(InventoryError::Credential("401".into()).is_systemic());
        assert!(InventoryError::Unreachable("dns".into()).is_systemic());
        assert!(!InventoryError::Api {
            status: 500,
            message: "boom".into()
        }
        .is_systemic());
        assert!(!InventoryError::Decode("bad".into()).is_systemic());
    }

    #[test]
    fn test_remediation_for_credentials() {
        let hints = InventoryError::Credential("rejected".into()).remediation();
        assert!(hints.iter().any(|h| h.contains("AZURE_CLIENT_ID")));
    }

    #[test]
    fn test_api_error_display() {
        let err = InventoryError::Api {
            status: 404,
            message: "SubscriptionNotFound".into(),
        };
        assert_eq!(
            err.to_string(),
            "API error (HTTP 404): SubscriptionNotFound"
        );
    }
}
