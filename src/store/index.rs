//! The snapshot index: an ordered `id -> label` mapping persisted as a flat
//! JSON object.
//!
//! Order is significant. Label lookups return the first matching entry, so
//! the on-disk key order is kept through load and save.

use std::fs;
use std::path::Path;

use serde_json::{Map, Value};
use tracing::debug;

use super::id::SnapshotId;
use super::remove_quietly;
use crate::error::{IoContext, StoreError, StoreResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub id: SnapshotId,
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Index {
    entries: Vec<IndexEntry>,
}

impl Index {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the index at `path`. A missing file is an empty index; anything
    /// that is not a flat object of strings is `IndexCorrupt`.
    pub fn load(path: &Path) -> StoreResult<Self> {
        if !path.exists() {
            debug!("no index at {}, starting empty", path.display());
            return Ok(Self::new());
        }

        let bytes = fs::read(path).io_context(|| format!("read index {}", path.display()))?;
        let map: Map<String, Value> =
            serde_json::from_slice(&bytes).map_err(|source| StoreError::IndexCorrupt {
                path: path.to_path_buf(),
                source,
            })?;

        let mut entries = Vec::with_capacity(map.len());
        for (id, value) in map {
            let label = match value {
                Value::String(s) => s,
                other => {
                    let msg = format!("label for {id} must be a string, found {other}");
                    return Err(StoreError::IndexCorrupt {
                        path: path.to_path_buf(),
                        source: serde::de::Error::custom(msg),
                    });
                }
            };
            entries.push(IndexEntry {
                id: SnapshotId::from(id),
                label,
            });
        }

        Ok(Index { entries })
    }

    /// Overwrite the index file with the full mapping, creating the parent
    /// directory first.
    pub fn save(&self, path: &Path) -> StoreResult<()> {
        let mut map = Map::with_capacity(self.entries.len());
        for entry in &self.entries {
            map.insert(entry.id.to_string(), Value::String(entry.label.clone()));
        }

        let json = serde_json::to_string_pretty(&map)
            .map_err(|e| StoreError::io("serialize index", std::io::Error::other(e)))?;

        write_atomic(path, json.as_bytes())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.iter()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|e| e.id.as_str() == id)
    }

    pub fn get(&self, id: &str) -> Option<&IndexEntry> {
        self.entries.iter().find(|e| e.id.as_str() == id)
    }

    /// First entry carrying `label`, in index order.
    pub fn resolve(&self, label: &str) -> Option<&IndexEntry> {
        self.entries.iter().find(|e| e.label == label)
    }

    /// Insert or relabel. A new id goes to the end.
    pub fn insert(&mut self, id: SnapshotId, label: String) {
        match self.entries.iter_mut().find(|e| e.id == id) {
            Some(existing) => existing.label = label,
            None => self.entries.push(IndexEntry { id, label }),
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<IndexEntry> {
        let pos = self.entries.iter().position(|e| e.id.as_str() == id)?;
        Some(self.entries.remove(pos))
    }
}

/// Write to a temp sibling then rename over the target.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .io_context(|| format!("create directory {}", parent.display()))?;
    }
    let tmp = path.with_extension(format!("tmp.{}", std::process::id()));
    let written = fs::write(&tmp, bytes)
        .io_context(|| format!("write temp file {}", tmp.display()))
        .and_then(|()| {
            fs::rename(&tmp, path)
                .io_context(|| format!("rename {} -> {}", tmp.display(), path.display()))
        });
    if written.is_err() {
        remove_quietly(&tmp);
    }
    written
}
