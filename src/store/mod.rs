//! Snapshot store.
//!
//! Keeps labeled, timestamped copies of a fixed set of save files. Layout on disk:
//!
//! ```text
//! <live_dir>/
//!   level.cbld
//!   level.bld
//!   Backup/
//!     backups.json                     # { "<id>": "<label>", ... }
//!     level.cbld.<id>.bak
//!     level.bld.<id>.bak
//! ```
//!
//! Every operation runs to completion against the in-memory index and
//! rewrites `backups.json` before returning. A single process is assumed
//! to own the backup directory at a time.
//!
//! Restoring is destructive: live files are overwritten with no safety copy.
//! Callers that want one should `backup` first.

pub mod archive;
pub mod id;
pub mod index;

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{IoContext, StoreError, StoreResult};
use id::{Clock, SystemClock};
use index::{Index, IndexEntry};

pub use archive::ExportReport;
pub use id::SnapshotId;

pub const DEFAULT_TRACKED_FILES: [&str; 2] = ["level.cbld", "level.bld"];
pub const DEFAULT_BACKUP_DIR: &str = "Backup";
pub const DEFAULT_INDEX_FILE: &str = "backups.json";

/// Where the store reads and writes. Fixed for the lifetime of a store.
#[derive(Debug, Clone)]
pub struct StoreLayout {
    pub live_dir: PathBuf,
    pub backup_dir: PathBuf,
    pub index_path: PathBuf,
    pub tracked_files: Vec<String>,
}

impl StoreLayout {
    /// Default layout rooted at `live_dir`: `Backup/backups.json` tracking the two level files.
    pub fn new(live_dir: impl Into<PathBuf>) -> Self {
        let live_dir = live_dir.into();
        let backup_dir = live_dir.join(DEFAULT_BACKUP_DIR);
        StoreLayout {
            index_path: backup_dir.join(DEFAULT_INDEX_FILE),
            backup_dir,
            live_dir,
            tracked_files: DEFAULT_TRACKED_FILES.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn live_file(&self, tracked: &str) -> PathBuf {
        self.live_dir.join(tracked)
    }

    /// `<backup_dir>/<tracked>.<id>.bak`
    pub fn backup_file(&self, tracked: &str, id: &str) -> PathBuf {
        self.backup_dir.join(format!("{tracked}.{id}.bak"))
    }

    /// Inverse of [`backup_file`](Self::backup_file) for a bare file name.
    pub fn parse_backup_name<'a>(&self, name: &'a str) -> Option<(&str, &'a str)> {
        let stem = name.strip_suffix(".bak")?;
        self.tracked_files.iter().find_map(|tracked| {
            let id = stem.strip_prefix(tracked.as_str())?.strip_prefix('.')?;
            (!id.is_empty() && !id.contains('.')).then_some((tracked.as_str(), id))
        })
    }
}

/// How a caller addresses a snapshot.
#[derive(Debug, Clone, Copy)]
pub enum Selector<'a> {
    /// First snapshot in index order carrying this label.
    Label(&'a str),
    /// Exact id. The only way to reach the second of two equal labels.
    Id(&'a str),
}

impl fmt::Display for Selector<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Label(label) => write!(f, "label '{label}'"),
            Selector::Id(id) => write!(f, "id {id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotRecord {
    pub id: SnapshotId,
    pub label: String,
    /// Tracked file names with a backup copy on disk, in tracked order.
    pub files: Vec<String>,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreReport {
    pub id: SnapshotId,
    pub label: String,
    /// Live files that were (or, for a plan, would be) overwritten.
    pub restored: Vec<String>,
    /// Tracked files absent from the snapshot, left untouched.
    pub untouched: Vec<String>,
}

pub struct SnapshotStore {
    layout: StoreLayout,
    index: Index,
    clock: Box<dyn Clock>,
}

impl SnapshotStore {
    /// Load the index for `layout`. Nothing is created on disk until the first write.
    pub fn open(layout: StoreLayout) -> StoreResult<Self> {
        let index = Index::load(&layout.index_path)?;
        debug!(
            "opened store at {} with {} snapshot(s)",
            layout.backup_dir.display(),
            index.len()
        );
        Ok(SnapshotStore {
            layout,
            index,
            clock: Box::new(SystemClock),
        })
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    /// Discard in-memory state and re-read the index file.
    pub fn reload(&mut self) -> StoreResult<()> {
        self.index = Index::load(&self.layout.index_path)?;
        Ok(())
    }

    pub fn save(&self) -> StoreResult<()> {
        self.index.save(&self.layout.index_path)
    }

    /// Copy every tracked file present in the live directory into a new snapshot.
    ///
    /// Tracked files that don't exist are skipped. If none exist the snapshot is
    /// still recorded, with no files behind it. The label is taken as-is, empty
    /// included.
    pub fn backup(&mut self, label: &str) -> StoreResult<SnapshotRecord> {
        let id = self.fresh_id();
        fs::create_dir_all(&self.layout.backup_dir).io_context(|| {
            format!("create backup directory {}", self.layout.backup_dir.display())
        })?;

        let mut written = Vec::new();
        for tracked in &self.layout.tracked_files {
            let src = self.layout.live_file(tracked);
            if !src.is_file() {
                debug!("{tracked} not found in {}, skipping", self.layout.live_dir.display());
                continue;
            }

            let dst = self.layout.backup_file(tracked, id.as_str());
            if let Err(e) = copy_preserving(&src, &dst) {
                written.push(dst);
                remove_all(&written);
                return Err(StoreError::io(format!("back up {}", src.display()), e));
            }
            debug!("copied {} -> {}", src.display(), dst.display());
            written.push(dst);
        }

        self.commit(id.clone(), label.to_string(), &written)?;
        info!("created snapshot {id} '{label}' with {} file(s)", written.len());
        Ok(self.record(&id, label))
    }

    /// Every snapshot in index order.
    pub fn list(&self) -> Vec<SnapshotRecord> {
        self.index
            .iter()
            .map(|entry| self.record(&entry.id, &entry.label))
            .collect()
    }

    /// First id labeled `label`.
    pub fn resolve(&self, label: &str) -> Option<&SnapshotId> {
        self.index.resolve(label).map(|entry| &entry.id)
    }

    pub fn find(&self, selector: Selector<'_>) -> Option<&IndexEntry> {
        match selector {
            Selector::Label(label) => self.index.resolve(label),
            Selector::Id(id) => self.index.get(id),
        }
    }

    /// Tracked file names that have a backup copy for `id`.
    pub fn files_of(&self, id: &str) -> Vec<String> {
        self.layout
            .tracked_files
            .iter()
            .filter(|tracked| self.layout.backup_file(tracked, id).is_file())
            .cloned()
            .collect()
    }

    /// What [`load`](Self::load) would overwrite, without touching anything.
    pub fn plan_load(&self, selector: Selector<'_>) -> Option<RestoreReport> {
        let entry = self.find(selector)?;
        let (restored, untouched): (Vec<String>, Vec<String>) = self
            .layout
            .tracked_files
            .iter()
            .cloned()
            .partition(|tracked| self.layout.backup_file(tracked, entry.id.as_str()).is_file());

        Some(RestoreReport {
            id: entry.id.clone(),
            label: entry.label.clone(),
            restored,
            untouched,
        })
    }

    /// Copy a snapshot's files over the live files. Returns `None` when the
    /// selector matches nothing.
    pub fn load(&self, selector: Selector<'_>) -> StoreResult<Option<RestoreReport>> {
        let Some(plan) = self.plan_load(selector) else {
            debug!("load: no snapshot for {selector}");
            return Ok(None);
        };

        for tracked in &plan.restored {
            let src = self.layout.backup_file(tracked, plan.id.as_str());
            let dst = self.layout.live_file(tracked);
            copy_preserving(&src, &dst)
                .io_context(|| format!("restore {} from {}", dst.display(), src.display()))?;
            debug!("restored {}", dst.display());
        }

        info!("restored snapshot {} '{}'", plan.id, plan.label);
        Ok(Some(plan))
    }

    /// Remove a snapshot's files and index entry. Returns `None` when the
    /// selector matches nothing.
    pub fn delete(&mut self, selector: Selector<'_>) -> StoreResult<Option<SnapshotRecord>> {
        let Some(entry) = self.find(selector).cloned() else {
            debug!("delete: no snapshot for {selector}");
            return Ok(None);
        };
        let record = self.record(&entry.id, &entry.label);

        for tracked in &record.files {
            let path = self.layout.backup_file(tracked, entry.id.as_str());
            match fs::remove_file(&path) {
                Ok(()) => debug!("removed {}", path.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(StoreError::io(format!("remove {}", path.display()), e)),
            }
        }

        self.index.remove(entry.id.as_str());
        self.save()?;
        info!("deleted snapshot {} '{}'", entry.id, entry.label);
        Ok(Some(record))
    }

    /// Backup files named like `<tracked>.<id>.bak` whose id is not in the index.
    pub fn orphans(&self) -> StoreResult<Vec<PathBuf>> {
        if !self.layout.backup_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut orphans = Vec::new();
        for entry in WalkDir::new(&self.layout.backup_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| {
                StoreError::io(
                    format!("scan {}", self.layout.backup_dir.display()),
                    io::Error::from(e),
                )
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str() else {
                continue;
            };
            if let Some((_, id)) = self.layout.parse_backup_name(name) {
                if !self.index.contains(id) {
                    orphans.push(entry.into_path());
                }
            }
        }
        Ok(orphans)
    }

    /// New id that is neither in the index nor backing any file on disk.
    fn fresh_id(&self) -> SnapshotId {
        id::next_id(self.clock.as_ref(), |candidate| {
            self.index.contains(candidate)
                || self
                    .layout
                    .tracked_files
                    .iter()
                    .any(|tracked| self.layout.backup_file(tracked, candidate).exists())
        })
    }

    /// Record `id` in the index and persist it. On failure the entry and the
    /// files written for it are rolled back.
    fn commit(&mut self, id: SnapshotId, label: String, written: &[PathBuf]) -> StoreResult<()> {
        let key = id.to_string();
        self.index.insert(id, label);
        if let Err(e) = self.save() {
            self.index.remove(&key);
            remove_all(written);
            return Err(e);
        }
        Ok(())
    }

    fn record(&self, id: &SnapshotId, label: &str) -> SnapshotRecord {
        let files = self.files_of(id.as_str());
        let size_bytes = files
            .iter()
            .filter_map(|tracked| fs::metadata(self.layout.backup_file(tracked, id.as_str())).ok())
            .map(|m| m.len())
            .sum();

        SnapshotRecord {
            id: id.clone(),
            label: label.to_string(),
            files,
            size_bytes,
        }
    }
}

/// `fs::copy` carries permissions; the modification time is carried over where the
/// destination can be reopened for writing.
fn copy_preserving(src: &Path, dst: &Path) -> io::Result<u64> {
    let bytes = fs::copy(src, dst)?;
    let modified = fs::metadata(src)?.modified()?;
    let stamped = fs::OpenOptions::new()
        .write(true)
        .open(dst)
        .and_then(|f| f.set_modified(modified));
    if let Err(e) = stamped {
        debug!("could not set mtime on {}: {e}", dst.display());
    }
    Ok(bytes)
}

fn remove_all(paths: &[PathBuf]) {
    for path in paths {
        remove_quietly(path);
    }
}

/// Best-effort cleanup. A file that is already gone is fine.
fn remove_quietly(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!("cleaned up {}", path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("failed to clean up {}: {e}", path.display()),
    }
}
