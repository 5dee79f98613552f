//! Terminal table for the snapshot list.
//!
//! Rows stay in index order, which is the order label lookups walk, so the
//! first row with a given label is the one `load`/`delete`/`export` act on.

use chrono::NaiveDateTime;

use crate::store::SnapshotRecord;
use crate::util::{format_age, format_bytes};

pub fn render(records: &[SnapshotRecord], now: NaiveDateTime) -> String {
    if records.is_empty() {
        return String::from("No snapshots yet.\n");
    }

    let mut output = String::new();
    output.push_str(&format!(
        "{:18} {:19} {:>10} {:>10}  {}\n",
        "ID", "CREATED", "AGE", "SIZE", "LABEL"
    ));
    output.push_str(&"-".repeat(72));
    output.push('\n');

    for record in records {
        let (created, age) = match record.id.created_at() {
            Some(t) => (
                t.format("%Y-%m-%d %H:%M:%S").to_string(),
                (now - t)
                    .to_std()
                    .map(format_age)
                    .unwrap_or_else(|_| "future".to_string()),
            ),
            None => ("unknown".to_string(), "-".to_string()),
        };

        let size = if record.files.is_empty() {
            "no files".to_string()
        } else {
            format_bytes(record.size_bytes)
        };

        output.push_str(&format!(
            "{:18} {:19} {:>10} {:>10}  {}\n",
            truncate(record.id.as_str(), 18),
            created,
            age,
            size,
            record.label
        ));
    }

    output.push_str(&format!("\n{} snapshot(s)\n", records.len()));
    output
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{truncated}...")
    }
}
