//! Labeled, timestamped snapshots of a fixed set of save files, with a JSON
//! index and portable ZIP export.
//!
//! The [`store`] module is usable on its own; the rest backs the `levelsave`
//! command-line tool.

pub mod cli;
pub mod config;
pub mod error;
pub mod platform;
pub mod report;
pub mod store;
pub mod util;

pub use error::{StoreError, StoreResult};
pub use store::{Selector, SnapshotId, SnapshotRecord, SnapshotStore, StoreLayout};
