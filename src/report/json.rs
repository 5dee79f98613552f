//! JSON output for the snapshot list.
//!
//! One object per snapshot, in index order, for scripting and piping.

use serde::Serialize;

use crate::store::SnapshotRecord;

#[derive(Serialize)]
struct ListedSnapshot<'a> {
    id: &'a str,
    label: &'a str,
    /// ISO 8601 local time, absent for ids that don't encode one
    #[serde(skip_serializing_if = "Option::is_none")]
    created: Option<String>,
    files: &'a [String],
    size_bytes: u64,
}

pub fn render(records: &[SnapshotRecord]) -> String {
    let listed: Vec<ListedSnapshot<'_>> = records
        .iter()
        .map(|r| ListedSnapshot {
            id: r.id.as_str(),
            label: &r.label,
            created: r
                .id
                .created_at()
                .map(|t| t.format("%Y-%m-%dT%H:%M:%S").to_string()),
            files: &r.files,
            size_bytes: r.size_bytes,
        })
        .collect();

    serde_json::to_string_pretty(&listed).unwrap_or_else(|_| String::from("[]"))
}
