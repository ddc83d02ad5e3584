//! Control-plane client abstraction.
//!
//! Raw payload types mirror the Resource Manager JSON closely; normalization
//! into `ServerRecord` happens in `extraction`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::Result;

/// One virtual machine as returned by the control plane.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawInstance {
    /// Hierarchical resource id (`/subscriptions/{s}/resourceGroups/{rg}/...`).
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub tags: Option<HashMap<String, String>>,
    #[serde(default)]
    pub zones: Option<Vec<String>>,
    #[serde(default)]
    pub properties: Option<InstanceProperties>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceProperties {
    #[serde(default)]
    pub vm_id: Option<String>,
    #[serde(default)]
    pub provisioning_state: Option<String>,
    #[serde(default)]
    pub time_created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub hardware_profile: Option<HardwareProfile>,
    #[serde(default)]
    pub storage_profile: Option<StorageProfile>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HardwareProfile {
    #[serde(default)]
    pub vm_size: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageProfile {
    #[serde(default)]
    pub os_disk: Option<OsDisk>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OsDisk {
    #[serde(default)]
    pub os_type: Option<String>,
}

/// Runtime status view of an instance.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct InstanceView {
    #[serde(default)]
    pub statuses: Option<Vec<InstanceStatus>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceStatus {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub display_status: Option<String>,
}

impl RawInstance {
    pub fn vm_size(&self) -> Option<&str> {
        self.properties
            .as_ref()?
            .hardware_profile
            .as_ref()?
            .vm_size
            .as_deref()
    }

    pub fn os_type(&self) -> Option<&str> {
        self.properties
            .as_ref()?
            .storage_profile
            .as_ref()?
            .os_disk
            .as_ref()?
            .os_type
            .as_deref()
    }
}

/// Per-subscription handle onto the compute control plane.
///
/// Every call may fail; the connector decides at which scope a failure is
/// contained.
#[async_trait]
pub trait ComputeClient: Send + Sync {
    /// Names of all resource groups in the subscription.
    async fn list_resource_groups(&self) -> Result<Vec<String>>;

    /// Instance summaries within one resource group.
    async fn list_instances(&self, resource_group: &str) -> Result<Vec<RawInstance>>;

    /// Full instance detail; `None` if the instance no longer exists.
    async fn get_instance(&self, resource_group: &str, name: &str) -> Result<Option<RawInstance>>;

    /// Runtime status view of one instance.
    async fn get_instance_view(&self, resource_group: &str, name: &str) -> Result<InstanceView>;
}
