use clap::builder::NonEmptyStringValueParser;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::store::Selector;

#[derive(Parser)]
#[command(name = "levelsave")]
#[command(about = "Labeled snapshots of Baldi's Basics Plus custom level saves")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Clone, Default)]
pub struct GlobalArgs {
    /// Directory holding the live save files (defaults to the game's CustomLevels folder)
    #[arg(long, global = true)]
    pub live_dir: Option<PathBuf>,

    /// Directory for snapshot copies and the index (defaults to <live-dir>/Backup).
    /// A relative path is taken from the current directory, not from the live dir
    #[arg(long, global = true)]
    pub backup_dir: Option<PathBuf>,

    /// Config file to read instead of the default location
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Show debug logging on stderr
    #[arg(long, short = 'v', global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Snapshot the current save files under a label
    Backup(BackupArgs),

    /// List snapshots in index order
    List(ListArgs),

    /// Restore a snapshot over the live save files
    Load(LoadArgs),

    /// Delete a snapshot and its files
    Delete(TargetArgs),

    /// Write a snapshot to a portable ZIP archive
    Export(ExportArgs),

    /// Add a snapshot from a ZIP archive, labeled with the archive's file name
    Import(ImportArgs),

    /// List backup files not referenced by the index
    Orphans,
}

#[derive(Parser)]
pub struct BackupArgs {
    /// Name to show for this snapshot
    #[arg(value_parser = NonEmptyStringValueParser::new())]
    pub label: String,
}

#[derive(Parser)]
pub struct ListArgs {
    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

/// Picks a snapshot by label (first match) or by exact id.
#[derive(Args)]
pub struct TargetArgs {
    /// Snapshot label; when several share it, the first listed is used
    #[arg(required_unless_present = "id", conflicts_with = "id")]
    pub label: Option<String>,

    /// Snapshot id, for reaching a specific one of several equal labels
    #[arg(long)]
    pub id: Option<String>,
}

impl TargetArgs {
    pub fn selector(&self) -> Selector<'_> {
        match (&self.id, &self.label) {
            (Some(id), _) => Selector::Id(id),
            (None, Some(label)) => Selector::Label(label),
            (None, None) => Selector::Label(""),
        }
    }
}

#[derive(Parser)]
pub struct LoadArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Overwrite the live files. Without this only the files that would change are shown
    #[arg(long, default_value_t = false)]
    pub yes: bool,
}

impl LoadArgs {
    /// returns true if this is a dry run (show what would be overwritten)
    pub fn is_dry_run(&self) -> bool {
        !self.yes
    }
}

#[derive(Parser)]
pub struct ExportArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Archive to create
    #[arg(long, short = 'o')]
    pub output: PathBuf,
}

#[derive(Parser)]
pub struct ImportArgs {
    /// ZIP archive produced by `export`
    pub archive: PathBuf,
}
