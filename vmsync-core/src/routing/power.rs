//! Power state extraction from the runtime status view.

use crate::record::PowerStatus;
use crate::source::client::InstanceView;

pub const POWER_STATE_PREFIX: &str = "PowerState/";

/// Raw power token recorded when no status view is available.
pub const RAW_STATE_UNKNOWN: &str = "unknown";

/// Raw power token for spreadsheet rows with no cloud counterpart.
pub const RAW_STATE_NOT_FOUND: &str = "not_found";

/// The power token from the first `PowerState/` status entry, as received.
pub fn power_state_from_view(view: Option<&InstanceView>) -> Option<&str> {
    view?
        .statuses
        .as_ref()?
        .iter()
        .filter_map(|status| status.code.as_deref())
        .find_map(|code| code.strip_prefix(POWER_STATE_PREFIX))
}

/// Human-readable text of the power entry (`VM running`), if reported.
pub fn power_display_status(view: Option<&InstanceView>) -> Option<&str> {
    view?
        .statuses
        .as_ref()?
        .iter()
        .find(|status| {
            status
                .code
                .as_deref()
                .is_some_and(|code| code.starts_with(POWER_STATE_PREFIX))
        })?
        .display_status
        .as_deref()
}

/// Lowercased raw token plus the mapped status.
pub fn resolve_power(view: Option<&InstanceView>) -> (String, PowerStatus) {
    match power_state_from_view(view) {
        Some(raw) => {
            let raw = raw.to_lowercase();
            let status = PowerStatus::from_raw_state(&raw);
            (raw, status)
        }
        None => (RAW_STATE_UNKNOWN.to_string(), PowerStatus::Unknown),
    }
}
