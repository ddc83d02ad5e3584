//! Cloud / spreadsheet reconciliation.
//!
//! Joins the normalized cloud set with the spreadsheet set on the
//! lowercased host name and classifies every output record by provenance:
//! 1. Each cloud record is merged with its first spreadsheet match, or
//!    emitted alone as `cloud_only`
//! 2. Each spreadsheet record without any cloud match is emitted as
//!    `spreadsheet_only` with the not-found power status
//!
//! Duplicate host names are not collapsed: every cloud record and every
//! unmatched spreadsheet row yields its own output record.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::record::{PowerStatus, Provenance, ServerRecord};
use crate::routing::power::RAW_STATE_NOT_FOUND;

use super::context::RunContext;

/// Reconciled set plus per-provenance counts.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconcileOutcome {
    pub records: Vec<ServerRecord>,
    pub matched: usize,
    pub cloud_only: usize,
    pub spreadsheet_only: usize,
}

/// Build the authoritative record set for one pass.
pub fn reconcile(
    cloud: &[ServerRecord],
    sheet: &[ServerRecord],
    run: &RunContext,
) -> ReconcileOutcome {
    let ctx = run.log_context();
    let now = run.started_at;

    // First spreadsheet row per key is the match partner.
    let mut sheet_index: HashMap<String, &ServerRecord> = HashMap::with_capacity(sheet.len());
    for row in sheet.iter().filter(|r| !r.computer_name.is_empty()) {
        sheet_index.entry(row.join_key()).or_insert(row);
    }

    let mut cloud_keys: HashSet<String> = HashSet::with_capacity(cloud.len());
    let mut outcome = ReconcileOutcome::default();

    for cloud_record in cloud {
        if cloud_record.computer_name.is_empty() {
            log::warn!("{} RECONCILE_SKIPPED reason=empty_cloud_name", ctx);
            continue;
        }
        let key = cloud_record.join_key();

        let merged = match sheet_index.get(&key) {
            Some(sheet_record) => {
                outcome.matched += 1;
                merge_matched(cloud_record, sheet_record, now)
            }
            None => {
                outcome.cloud_only += 1;
                stamp(cloud_record.clone(), Provenance::CloudOnly, now)
            }
        };

        log::debug!(
            "{} RECONCILED name={} provenance={}",
            ctx,
            merged.computer_name,
            merged.provenance.map(|p| p.as_str()).unwrap_or_default()
        );

        cloud_keys.insert(key);
        outcome.records.push(merged);
    }

    for sheet_record in sheet {
        if sheet_record.computer_name.is_empty() || cloud_keys.contains(&sheet_record.join_key()) {
            continue;
        }
        let mut orphan = sheet_record.clone();
        orphan.power_status = PowerStatus::NotFoundInCloud;
        orphan.power_status_text = None;
        orphan.raw_power_state = RAW_STATE_NOT_FOUND.to_string();
        outcome.spreadsheet_only += 1;
        outcome
            .records
            .push(stamp(orphan, Provenance::SpreadsheetOnly, now));
    }

    log::info!(
        "{} RECONCILE_COMPLETE total={} matched={} cloud_only={} spreadsheet_only={}",
        ctx,
        outcome.records.len(),
        outcome.matched,
        outcome.cloud_only,
        outcome.spreadsheet_only
    );

    outcome
}

fn stamp(mut record: ServerRecord, provenance: Provenance, now: DateTime<Utc>) -> ServerRecord {
    record.provenance = Some(provenance);
    record.last_reconciled_at = Some(now);
    record
}

fn prefer_cloud(cloud: &str, sheet: &str) -> String {
    let chosen = if cloud.is_empty() { sheet } else { cloud };
    chosen.to_string()
}

/// Spreadsheet record overlaid with the cloud-authoritative fields.
fn merge_matched(cloud: &ServerRecord, sheet: &ServerRecord, now: DateTime<Utc>) -> ServerRecord {
    let environment = if cloud.has_known_environment() || sheet.environment.is_empty() {
        cloud.environment.clone()
    } else {
        sheet.environment.clone()
    };

    let merged = ServerRecord {
        computer_name: cloud.computer_name.clone(),
        power_status: cloud.power_status,
        power_status_text: None,
        environment,
        app_name: prefer_cloud(&cloud.app_name, &sheet.app_name),
        owner: prefer_cloud(&cloud.owner, &sheet.owner),
        schedule: prefer_cloud(&cloud.schedule, &sheet.schedule),
        resource_group: cloud.resource_group.clone(),
        subscription_id: cloud.subscription_id.clone(),
        location: cloud.location.clone(),
        size: cloud.size.clone(),
        raw_power_state: cloud.raw_power_state.clone(),
        os_type: cloud.os_type.clone(),
        provisioning_state: cloud.provisioning_state.clone(),
        instance_id: cloud.instance_id.clone(),
        created_time: cloud.created_time,
        zones: cloud.zones.clone(),
        all_tags: cloud.all_tags.clone(),
        ..sheet.clone()
    };

    stamp(merged, Provenance::Matched, now)
}

/// SHA-256 over the field content of a record set, timestamps excluded.
///
/// Two passes over unchanged inputs produce the same digest.
pub fn inventory_digest(records: &[ServerRecord]) -> String {
    let mut hasher = Sha256::new();
    for record in records {
        let tags = record
            .all_tags
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        let created = record
            .created_time
            .map(|t| t.to_rfc3339())
            .unwrap_or_default();
        let zones = record.zones_joined();
        let fields = [
            record.computer_name.as_str(),
            record.status_label(),
            record.environment.as_str(),
            record.app_name.as_str(),
            record.owner.as_str(),
            record.schedule.as_str(),
            record.resource_group.as_str(),
            record.subscription_id.as_str(),
            record.location.as_str(),
            record.size.as_str(),
            record.raw_power_state.as_str(),
            record.os_type.as_str(),
            record.provisioning_state.as_str(),
            record.instance_id.as_str(),
            created.as_str(),
            zones.as_str(),
            tags.as_str(),
            record.provenance.map(|p| p.as_str()).unwrap_or_default(),
        ];
        for field in fields {
            hasher.update(field.as_bytes());
            hasher.update([0x1f_u8]);
        }
        hasher.update([0x1e_u8]);
    }
    hex::encode(hasher.finalize())
}
