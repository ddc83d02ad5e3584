//! Tag alias lookup.
//!
//! Each canonical field accepts several tag spellings. Lists are ordered;
//! the first key present with a non-empty value wins.

use std::collections::HashMap;

pub const ENVIRONMENT_KEYS: &[&str] = &["Environment", "Env"];
pub const APP_NAME_KEYS: &[&str] = &["Application", "app-name", "AppName"];
pub const OWNER_KEYS: &[&str] = &["Owner", "owner", "CreatedBy"];
pub const SCHEDULE_KEYS: &[&str] = &["Schedule", "auto-shutdown-schedule"];

/// First non-empty value among `keys`, in order. Keys match exactly.
pub fn first_present<'a>(tags: &'a HashMap<String, String>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| tags.get(*key))
        .map(|value| value.as_str())
        .find(|value| !value.is_empty())
}

/// Like `first_present`, defaulting to an empty string.
pub fn tag_or_empty(tags: &HashMap<String, String>, keys: &[&str]) -> String {
    first_present(tags, keys).unwrap_or_default().to_string()
}
