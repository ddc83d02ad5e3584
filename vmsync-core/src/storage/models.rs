//! Database models for server storage.
//!
//! These models represent the structure of data in the `servers` table:
//! one row per record, every field a defaulted text column.

use serde::{Deserialize, Serialize};

use crate::record::{PowerStatus, ServerRecord};

/// Represents a server ready for storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerRow {
    pub estado_start_stop: String,
    pub ambiente: String,
    pub app_name: String,
    pub owner: String,
    pub computer_name: String,
    pub resource_group: String,
    pub subscription: String,
    pub location: String,
    pub size: String,
    pub schedule: String,

    // Cloud-only fields
    pub power_state: String,
    pub os_type: String,
    pub provisioning_state: String,
    pub vm_id: String,
    pub created_time: String,
    pub zones: String,
    pub all_tags: String, // JSON

    // Reconciliation stamp
    pub source: String,
    pub last_updated: String,
}

impl From<&ServerRecord> for ServerRow {
    fn from(record: &ServerRecord) -> Self {
        Self {
            estado_start_stop: record.status_label().to_string(),
            ambiente: record.environment.clone(),
            app_name: record.app_name.clone(),
            owner: record.owner.clone(),
            computer_name: record.computer_name.clone(),
            resource_group: record.resource_group.clone(),
            subscription: record.subscription_id.clone(),
            location: record.location.clone(),
            size: record.size.clone(),
            schedule: record.schedule.clone(),
            power_state: record.raw_power_state.clone(),
            os_type: record.os_type.clone(),
            provisioning_state: record.provisioning_state.clone(),
            vm_id: record.instance_id.clone(),
            created_time: record
                .created_time
                .map(|t| t.to_rfc3339())
                .unwrap_or_default(),
            zones: record.zones_joined(),
            all_tags: serde_json::to_string(&record.all_tags).unwrap_or_default(),
            source: record
                .provenance
                .map(|p| p.as_str().to_string())
                .unwrap_or_default(),
            last_updated: record
                .last_reconciled_at
                .map(|t| t.to_rfc3339())
                .unwrap_or_default(),
        }
    }
}

impl ServerRow {
    /// Values in `SERVER_COLUMNS` order.
    pub fn values(&self) -> Vec<&str> {
        vec![
            &self.estado_start_stop,
            &self.ambiente,
            &self.app_name,
            &self.owner,
            &self.computer_name,
            &self.resource_group,
            &self.subscription,
            &self.location,
            &self.size,
            &self.schedule,
            &self.power_state,
            &self.os_type,
            &self.provisioning_state,
            &self.vm_id,
            &self.created_time,
            &self.zones,
            &self.all_tags,
            &self.source,
            &self.last_updated,
        ]
    }
}

/// Dashboard search request. Empty fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerFilter {
    /// Case-insensitive substring over name, app and owner.
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default, rename = "ambiente")]
    pub environment: Option<String>,
    #[serde(default)]
    pub app_name: Option<String>,
    #[serde(default, rename = "estado")]
    pub status: Option<PowerStatus>,
    #[serde(default)]
    pub owner: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl ServerFilter {
    pub fn search_term(&self) -> Option<&str> {
        non_empty(&self.search)
    }

    pub fn environment(&self) -> Option<&str> {
        non_empty(&self.environment)
    }

    pub fn app_name(&self) -> Option<&str> {
        non_empty(&self.app_name)
    }

    pub fn owner(&self) -> Option<&str> {
        non_empty(&self.owner)
    }

    pub fn matches(&self, record: &ServerRecord) -> bool {
        if let Some(term) = self.search_term() {
            let term = term.to_lowercase();
            let hit = [&record.computer_name, &record.app_name, &record.owner]
                .iter()
                .any(|field| field.to_lowercase().contains(&term));
            if !hit {
                return false;
            }
        }
        if self.environment().is_some_and(|env| record.environment != env) {
            return false;
        }
        if self.app_name().is_some_and(|app| record.app_name != app) {
            return false;
        }
        if self.owner().is_some_and(|owner| record.owner != owner) {
            return false;
        }
        if self.status.is_some_and(|status| record.power_status != status) {
            return false;
        }
        true
    }
}
