//! Configuration.
//!
//! Resolved from, highest priority first: command-line flags, the TOML config
//! file (`~/.config/levelsave/config.toml` or the platform equivalent), and
//! built-in defaults. Every field in the file is optional:
//!
//! ```toml
//! live_dir = "/home/kim/.config/unity3d/Basically Games/Baldi's Basics Plus/CustomLevels"
//! backup_dir = "Backup"            # relative paths are taken from live_dir
//! index_file = "backups.json"
//! tracked_files = ["level.cbld", "level.bld"]
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::cli::GlobalArgs;
use crate::platform::{self, Platform};
use crate::store::{StoreLayout, DEFAULT_BACKUP_DIR, DEFAULT_INDEX_FILE, DEFAULT_TRACKED_FILES};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("could not determine the save directory, pass --live-dir or set live_dir in the config file")]
    NoLiveDir,

    #[error("{field} must be a plain file name, got '{value}'")]
    NotAFileName { field: &'static str, value: String },

    #[error("tracked_files must not be empty")]
    NoTrackedFiles,

    #[error("backup_dir {} is the live directory, backups and the index would overwrite live saves", path.display())]
    BackupDirIsLiveDir { path: PathBuf },
}

/// Contents of config.toml.
#[derive(Debug, Default, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub live_dir: Option<PathBuf>,
    pub backup_dir: Option<PathBuf>,
    pub index_file: Option<String>,
    pub tracked_files: Option<Vec<String>>,
}

impl FileConfig {
    /// A missing file is an empty config; an unreadable or malformed one is an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub live_dir: PathBuf,
    pub backup_dir: PathBuf,
    pub index_file: String,
    pub tracked_files: Vec<String>,
    pub verbose: bool,
    pub platform: Platform,
}

impl Config {
    pub fn from_global_args(args: &GlobalArgs) -> Result<Self, ConfigError> {
        let mut file = match args.config.clone().or_else(default_config_path) {
            Some(path) => FileConfig::load(&path)?,
            None => FileConfig::default(),
        };
        if let Some(live_dir) = &args.live_dir {
            file.live_dir = Some(live_dir.clone());
        }

        let mut config = Self::resolve(file, platform::detect(), platform::home_dir())?;
        // Unlike the file setting, the flag is relative to the working directory.
        if let Some(backup_dir) = &args.backup_dir {
            check_backup_dir(&config.live_dir, backup_dir)?;
            config.backup_dir = backup_dir.clone();
        }
        config.verbose = args.verbose;
        Ok(config)
    }

    /// Merge a config file over the defaults. `home` feeds the platform default
    /// live dir when the file doesn't name one.
    pub fn resolve(
        file: FileConfig,
        platform: Platform,
        home: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let live_dir = match file.live_dir {
            Some(dir) => dir,
            None => home
                .map(|h| platform::default_live_dir(platform, &h))
                .ok_or(ConfigError::NoLiveDir)?,
        };

        let backup_dir = live_dir.join(
            file.backup_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_BACKUP_DIR)),
        );
        check_backup_dir(&live_dir, &backup_dir)?;

        let index_file = file.index_file.unwrap_or_else(|| DEFAULT_INDEX_FILE.to_string());
        check_file_name("index_file", &index_file)?;

        let tracked_files = file
            .tracked_files
            .unwrap_or_else(|| DEFAULT_TRACKED_FILES.iter().map(|s| s.to_string()).collect());
        if tracked_files.is_empty() {
            return Err(ConfigError::NoTrackedFiles);
        }
        for name in &tracked_files {
            check_file_name("tracked_files", name)?;
        }

        Ok(Config {
            live_dir,
            backup_dir,
            index_file,
            tracked_files,
            verbose: false,
            platform,
        })
    }

    pub fn layout(&self) -> StoreLayout {
        StoreLayout {
            live_dir: self.live_dir.clone(),
            index_path: self.backup_dir.join(&self.index_file),
            backup_dir: self.backup_dir.clone(),
            tracked_files: self.tracked_files.clone(),
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "levelsave")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Backup copies and the index must not share the live directory. Compared
/// lexically first, then through the filesystem when both paths exist.
fn check_backup_dir(live_dir: &Path, backup_dir: &Path) -> Result<(), ConfigError> {
    let same = live_dir == backup_dir
        || matches!(
            (live_dir.canonicalize(), backup_dir.canonicalize()),
            (Ok(a), Ok(b)) if a == b
        );
    if same {
        Err(ConfigError::BackupDirIsLiveDir {
            path: backup_dir.to_path_buf(),
        })
    } else {
        Ok(())
    }
}

fn check_file_name(field: &'static str, value: &str) -> Result<(), ConfigError> {
    let plain = !value.is_empty()
        && value != "."
        && value != ".."
        && !value.contains(['/', '\\']);
    if plain {
        Ok(())
    } else {
        Err(ConfigError::NotAFileName {
            field,
            value: value.to_string(),
        })
    }
}
