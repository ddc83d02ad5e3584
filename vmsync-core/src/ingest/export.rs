//! Spreadsheet export.
//!
//! Renders records in the same semicolon-delimited layout the ingestor
//! reads. The format has no quoting, so delimiters and line breaks inside
//! values are replaced.

use crate::record::ServerRecord;

use super::spreadsheet::{DELIMITER, DELIMITER_STR, HEADER_COLUMNS};

fn clean_cell(value: &str) -> String {
    value
        .replace(DELIMITER, ",")
        .replace(['\r', '\n'], " ")
        .trim()
        .to_string()
}

fn row(record: &ServerRecord) -> String {
    let cells = [
        record.status_label(),
        record.environment.as_str(),
        record.app_name.as_str(),
        record.owner.as_str(),
        record.computer_name.as_str(),
        record.resource_group.as_str(),
        record.subscription_id.as_str(),
        record.location.as_str(),
        record.size.as_str(),
        record.schedule.as_str(),
    ];
    cells
        .iter()
        .map(|cell| clean_cell(cell))
        .collect::<Vec<_>>()
        .join(DELIMITER_STR)
}

/// Header line plus one line per record, newline-terminated.
pub fn export_spreadsheet(records: &[ServerRecord]) -> String {
    let mut out = HEADER_COLUMNS.join(DELIMITER_STR);
    out.push('\n');
    for record in records {
        out.push_str(&row(record));
        out.push('\n');
    }
    out
}
