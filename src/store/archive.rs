//! Portable ZIP export and import.
//!
//! An exported archive holds one entry per backed-up file, named after the
//! plain tracked file (`level.bld`, not `level.bld.<id>.bak`), so it can be
//! imported into any store tracking the same files.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use super::{
    remove_all, remove_quietly, Selector, SnapshotId, SnapshotRecord, SnapshotStore,
};
use crate::error::{IoContext, StoreError, StoreResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub id: SnapshotId,
    pub archive: PathBuf,
    pub files: Vec<String>,
}

impl SnapshotStore {
    /// Write the selected snapshot to a new archive at `dest`.
    ///
    /// Unlike load and delete, an unresolved selector is an error here. The
    /// archive is assembled next to `dest` and renamed into place, so a failed
    /// export leaves nothing behind.
    pub fn export(&self, selector: Selector<'_>, dest: &Path) -> StoreResult<ExportReport> {
        let entry = self
            .find(selector)
            .ok_or_else(|| StoreError::SnapshotNotFound(selector.to_string()))?;
        let id = entry.id.clone();

        let members: Vec<(String, PathBuf)> = self
            .files_of(id.as_str())
            .into_iter()
            .map(|tracked| {
                let src = self.layout.backup_file(&tracked, id.as_str());
                (tracked, src)
            })
            .collect();

        let tmp = dest.with_extension(format!("tmp.{}", std::process::id()));
        let written = write_archive(&tmp, &members).and_then(|()| {
            fs::rename(&tmp, dest)
                .io_context(|| format!("rename {} -> {}", tmp.display(), dest.display()))
        });
        if let Err(e) = written {
            remove_quietly(&tmp);
            return Err(e);
        }

        let files: Vec<String> = members.into_iter().map(|(name, _)| name).collect();
        info!(
            "exported snapshot {id} '{}' to {} ({} file(s))",
            entry.label,
            dest.display(),
            files.len()
        );
        Ok(ExportReport {
            id,
            archive: dest.to_path_buf(),
            files,
        })
    }

    /// Add the tracked entries of `src` as a new snapshot labeled with the
    /// archive's file stem.
    ///
    /// Entries are staged under a temporary name and only renamed into the
    /// backup naming scheme once all of them extracted. Untracked entries are
    /// never written. The index is touched last.
    pub fn import(&mut self, src: &Path) -> StoreResult<SnapshotRecord> {
        let file = File::open(src).io_context(|| format!("open archive {}", src.display()))?;
        let mut archive =
            ZipArchive::new(file).map_err(|e| StoreError::archive_invalid(src, e.to_string()))?;

        let label = src
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let id = self.fresh_id();

        fs::create_dir_all(&self.layout.backup_dir).io_context(|| {
            format!("create backup directory {}", self.layout.backup_dir.display())
        })?;

        let mut staged: Vec<(PathBuf, PathBuf)> = Vec::new();
        for tracked in &self.layout.tracked_files {
            let Some(index) = archive.index_for_name(tracked) else {
                debug!("{} has no {tracked} entry", src.display());
                continue;
            };

            let part = self
                .layout
                .backup_dir
                .join(format!("{tracked}.{id}.part"));
            let dst = self.layout.backup_file(tracked, id.as_str());
            staged.push((part.clone(), dst));

            if let Err(e) = extract_entry(&mut archive, index, &part) {
                discard(&staged);
                return Err(match e {
                    ExtractError::Zip(e) => StoreError::archive_invalid(
                        src,
                        format!("cannot read entry {tracked}: {e}"),
                    ),
                    ExtractError::Io(e) => {
                        StoreError::io(format!("extract {tracked} to {}", part.display()), e)
                    }
                });
            }
        }

        if staged.is_empty() {
            return Err(StoreError::archive_invalid(
                src,
                format!(
                    "contains none of the tracked files ({})",
                    self.layout.tracked_files.join(", ")
                ),
            ));
        }

        let mut written = Vec::with_capacity(staged.len());
        for (part, dst) in &staged {
            if let Err(e) = fs::rename(part, dst) {
                remove_all(&written);
                discard(&staged);
                return Err(StoreError::io(
                    format!("rename {} -> {}", part.display(), dst.display()),
                    e,
                ));
            }
            written.push(dst.clone());
        }

        self.commit(id.clone(), label.clone(), &written)?;
        info!(
            "imported {} as snapshot {id} '{label}' with {} file(s)",
            src.display(),
            written.len()
        );
        Ok(self.record(&id, &label))
    }
}

enum ExtractError {
    Zip(zip::result::ZipError),
    Io(io::Error),
}

fn extract_entry(
    archive: &mut ZipArchive<File>,
    index: usize,
    dest: &Path,
) -> Result<(), ExtractError> {
    let mut entry = archive.by_index(index).map_err(ExtractError::Zip)?;
    let mut out = File::create(dest).map_err(ExtractError::Io)?;
    io::copy(&mut entry, &mut out).map_err(ExtractError::Io)?;
    Ok(())
}

fn write_archive(path: &Path, members: &[(String, PathBuf)]) -> StoreResult<()> {
    let file = File::create(path).io_context(|| format!("create archive {}", path.display()))?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default();

    for (name, src) in members {
        writer
            .start_file(name.as_str(), options)
            .map_err(|e| StoreError::io(format!("add {name} to archive"), io::Error::other(e)))?;
        let mut input = File::open(src).io_context(|| format!("open {}", src.display()))?;
        io::copy(&mut input, &mut writer).io_context(|| format!("write {name} to archive"))?;
        debug!("archived {} as {name}", src.display());
    }

    writer
        .finish()
        .map_err(|e| StoreError::io("finish archive", io::Error::other(e)))?;
    Ok(())
}

/// Remove staged files that still exist, ignoring ones already renamed away.
fn discard(staged: &[(PathBuf, PathBuf)]) {
    for (part, _) in staged {
        remove_quietly(part);
    }
}
