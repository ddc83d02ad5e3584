//! The `ServerRecord` shape shared by every stage.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::status::{PowerStatus, Provenance};

/// Environment value used when no rule can classify a server.
pub const UNKNOWN_ENVIRONMENT: &str = "Unknown";

/// One physical or virtual host, normalized from any source.
///
/// Every textual field defaults to an empty string so consumers can treat
/// the record as total.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ServerRecord {
    /// Case-insensitive identity key across sources.
    pub computer_name: String,
    pub power_status: PowerStatus,
    /// Status cell exactly as the spreadsheet had it. Only set on records
    /// read from the sheet; cloud and reconciled records use the label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_status_text: Option<String>,
    /// Uppercase classification (`DV`, `PR`, `DR`, ...) or `Unknown`.
    pub environment: String,
    pub app_name: String,
    pub owner: String,
    pub schedule: String,
    pub resource_group: String,
    pub subscription_id: String,
    pub location: String,
    pub size: String,
    /// Lowercased power token from the provider (`running`, `deallocated`).
    pub raw_power_state: String,
    pub os_type: String,
    pub provisioning_state: String,
    pub instance_id: String,
    pub created_time: Option<DateTime<Utc>>,
    pub zones: Vec<String>,
    pub all_tags: BTreeMap<String, String>,

    // Set only by the reconciler
    pub provenance: Option<Provenance>,
    pub last_reconciled_at: Option<DateTime<Utc>>,
}

impl ServerRecord {
    /// Natural join key: the lowercased host name.
    pub fn join_key(&self) -> String {
        self.computer_name.to_lowercase()
    }

    /// Status text to show and persist.
    pub fn status_label(&self) -> &str {
        self.power_status_text
            .as_deref()
            .unwrap_or(self.power_status.label())
    }

    pub fn zones_joined(&self) -> String {
        self.zones.join(",")
    }

    pub fn has_known_environment(&self) -> bool {
        !self.environment.is_empty() && self.environment != UNKNOWN_ENVIRONMENT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_record_is_total() {
        let record = ServerRecord::default();
        assert_eq!(record.app_name, "");
        assert_eq!(record.power_status, PowerStatus::Unknown);
        assert!(record.provenance.is_none());
        assert!(record.zones.is_empty());
    }

    #[test]
    fn test_join_key_is_case_insensitive() {
        let a = ServerRecord {
            computer_name: "WEB01".to_string(),
            ..Default::default()
        };
        let b = ServerRecord {
            computer_name: "web01".to_string(),
            ..Default::default()
        };
        assert_eq!(a.join_key(), b.join_key());
    }

    #[test]
    fn test_status_label_prefers_sheet_text() {
        let mut record = ServerRecord {
            power_status: PowerStatus::Inactive,
            ..Default::default()
        };
        assert_eq!(record.status_label(), "Inactivo");

        record.power_status_text = Some("Desligado".to_string());
        assert_eq!(record.status_label(), "Desligado");

        record.power_status_text = Some(String::new());
        assert_eq!(record.status_label(), "");
    }

    #[test]
    fn test_zones_joined() {
        let record = ServerRecord {
            zones: vec!["1".to_string(), "3".to_string()],
            ..Default::default()
        };
        assert_eq!(record.zones_joined(), "1,3");
    }

    #[test]
    fn test_known_environment() {
        let mut record = ServerRecord::default();
        assert!(!record.has_known_environment());
        record.environment = UNKNOWN_ENVIRONMENT.to_string();
        assert!(!record.has_known_environment());
        record.environment = "PR".to_string();
        assert!(record.has_known_environment());
    }
}
