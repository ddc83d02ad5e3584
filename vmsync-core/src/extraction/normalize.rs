//! Cloud instance normalization.
//!
//! Maps one raw control-plane instance plus its optional runtime status view
//! into a canonical `ServerRecord`. Pure apart from debug logging.

use std::collections::{BTreeMap, HashMap};

use crate::extraction::tags::{tag_or_empty, APP_NAME_KEYS, OWNER_KEYS, SCHEDULE_KEYS};
use crate::logging::structured::LogContext;
use crate::record::ServerRecord;
use crate::routing::environment::classify_environment;
use crate::routing::power::{power_display_status, resolve_power};
use crate::source::client::{InstanceView, RawInstance};

/// Slash-delimited segment of a resource id that holds the resource group.
const RESOURCE_GROUP_SEGMENT: usize = 4;

/// Placeholder for absent size / OS type.
const UNKNOWN_ATTRIBUTE: &str = "Unknown";

/// Normalize one instance.
///
/// Returns `None` if the instance has no name, since it could never be
/// joined against the spreadsheet.
pub fn normalize_instance(
    subscription_id: &str,
    instance: &RawInstance,
    view: Option<&InstanceView>,
    ctx: &LogContext,
) -> Option<ServerRecord> {
    if instance.name.trim().is_empty() {
        log::warn!(
            "{} NORMALIZE_SKIPPED reason=empty_name id={}",
            ctx,
            instance.id
        );
        return None;
    }

    let empty = HashMap::new();
    let tags = instance.tags.as_ref().unwrap_or(&empty);

    let (raw_power_state, power_status) = resolve_power(view);
    let environment = classify_environment(tags, subscription_id, &instance.name, ctx);
    let properties = instance.properties.as_ref();

    let record = ServerRecord {
        computer_name: instance.name.clone(),
        power_status,
        power_status_text: None,
        environment: environment.value,
        app_name: tag_or_empty(tags, APP_NAME_KEYS),
        owner: tag_or_empty(tags, OWNER_KEYS),
        schedule: tag_or_empty(tags, SCHEDULE_KEYS),
        resource_group: resource_group_from_id(&instance.id).to_string(),
        subscription_id: subscription_id.to_string(),
        location: instance.location.clone(),
        size: instance.vm_size().unwrap_or(UNKNOWN_ATTRIBUTE).to_string(),
        raw_power_state,
        os_type: instance.os_type().unwrap_or(UNKNOWN_ATTRIBUTE).to_string(),
        provisioning_state: properties
            .and_then(|p| p.provisioning_state.clone())
            .unwrap_or_default(),
        instance_id: properties.and_then(|p| p.vm_id.clone()).unwrap_or_default(),
        created_time: properties.and_then(|p| p.time_created),
        zones: instance.zones.clone().unwrap_or_default(),
        all_tags: tags
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect::<BTreeMap<_, _>>(),
        provenance: None,
        last_reconciled_at: None,
    };

    log::debug!(
        "{} INSTANCE_NORMALIZED name={} power={} raw={} display={:?} environment={}",
        ctx,
        record.computer_name,
        record.power_status.as_str(),
        record.raw_power_state,
        power_display_status(view).unwrap_or_default(),
        record.environment
    );

    Some(record)
}

/// Resource group segment of a hierarchical resource id, or empty.
pub fn resource_group_from_id(resource_id: &str) -> &str {
    resource_id
        .split('/')
        .nth(RESOURCE_GROUP_SEGMENT)
        .unwrap_or_default()
}
