use std::collections::HashSet;
use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use tempfile::TempDir;

use levelsave::store::id::FixedClock;
use levelsave::{Selector, SnapshotStore, StoreError, StoreLayout};

fn clock(hour: u32, min: u32, sec: u32) -> FixedClock {
    FixedClock(
        NaiveDate::from_ymd_opt(2024, 7, 5)
            .unwrap()
            .and_hms_opt(hour, min, sec)
            .unwrap(),
    )
}

fn open(live: &Path, clock: FixedClock) -> SnapshotStore {
    SnapshotStore::open(StoreLayout::new(live))
        .unwrap()
        .with_clock(clock)
}

fn backup_files(live: &Path) -> HashSet<String> {
    let backup = live.join("Backup");
    if !backup.is_dir() {
        return HashSet::new();
    }
    fs::read_dir(backup)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".bak"))
        .collect()
}

#[test]
fn backup_then_load_restores_only_captured_file() {
    let dir = TempDir::new().unwrap();
    let live = dir.path();
    fs::write(live.join("level.bld"), "X").unwrap();

    let mut store = open(live, clock(10, 0, 0));
    let record = store.backup("save1").unwrap();

    assert_eq!(store.list().len(), 1);
    assert_eq!(
        backup_files(live),
        HashSet::from([format!("level.bld.{}.bak", record.id)])
    );

    fs::write(live.join("level.bld"), "Y").unwrap();
    let report = store.load(Selector::Label("save1")).unwrap().unwrap();

    assert_eq!(report.restored, ["level.bld"]);
    assert_eq!(fs::read_to_string(live.join("level.bld")).unwrap(), "X");
    assert!(!live.join("level.cbld").exists());
}

#[test]
fn round_trip_is_byte_identical_for_both_files() {
    let dir = TempDir::new().unwrap();
    let live = dir.path();
    let cbld: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
    fs::write(live.join("level.cbld"), &cbld).unwrap();
    fs::write(live.join("level.bld"), b"\x00\x01binary\xff").unwrap();

    let mut store = open(live, clock(10, 0, 0));
    store.backup("both").unwrap();

    fs::write(live.join("level.cbld"), "clobbered").unwrap();
    fs::remove_file(live.join("level.bld")).unwrap();
    store.load(Selector::Label("both")).unwrap().unwrap();

    assert_eq!(fs::read(live.join("level.cbld")).unwrap(), cbld);
    assert_eq!(fs::read(live.join("level.bld")).unwrap(), b"\x00\x01binary\xff");
}

#[test]
fn index_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let live = dir.path();
    fs::write(live.join("level.bld"), "X").unwrap();

    let mut store = open(live, clock(10, 0, 0));
    store.backup("first").unwrap();
    let mut store = open(live, clock(11, 0, 0));
    store.backup("second").unwrap();

    let reopened = SnapshotStore::open(StoreLayout::new(live)).unwrap();
    let labels: Vec<_> = reopened.list().into_iter().map(|r| r.label).collect();
    assert_eq!(labels, ["first", "second"]);
}

#[test]
fn export_then_import_copies_contents_under_archive_name() {
    let dir = TempDir::new().unwrap();
    let live = dir.path().join("live");
    fs::create_dir_all(&live).unwrap();
    fs::write(live.join("level.cbld"), "compiled").unwrap();
    fs::write(live.join("level.bld"), "editor").unwrap();

    let mut store = open(&live, clock(10, 0, 0));
    let original = store.backup("my castle").unwrap();
    let archive = dir.path().join("castle-v2.zip");
    let export = store.export(Selector::Label("my castle"), &archive).unwrap();
    assert_eq!(export.files.len(), 2);

    // a second machine with its own store
    let other_live = dir.path().join("other");
    fs::create_dir_all(&other_live).unwrap();
    let mut other = open(&other_live, clock(12, 0, 0));
    let imported = other.import(&archive).unwrap();

    assert_eq!(imported.label, "castle-v2");
    assert_ne!(imported.label, original.label);
    assert_eq!(imported.files, original.files);
    for name in &imported.files {
        let a = fs::read(live.join("Backup").join(format!("{name}.{}.bak", original.id))).unwrap();
        let b = fs::read(other_live.join("Backup").join(format!("{name}.{}.bak", imported.id)))
            .unwrap();
        assert_eq!(a, b);
    }

    other.load(Selector::Label("castle-v2")).unwrap().unwrap();
    assert_eq!(fs::read_to_string(other_live.join("level.bld")).unwrap(), "editor");
}

#[test]
fn import_into_same_store_gets_fresh_id() {
    let dir = TempDir::new().unwrap();
    let live = dir.path();
    fs::write(live.join("level.bld"), "X").unwrap();

    let mut store = open(live, clock(10, 0, 0));
    let original = store.backup("orig").unwrap();
    let archive = live.join("copy.zip");
    store.export(Selector::Id(original.id.as_str()), &archive).unwrap();

    let imported = store.import(&archive).unwrap();
    assert_ne!(imported.id, original.id);
    assert_eq!(store.list().len(), 2);
}

#[test]
fn delete_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let live = dir.path();
    fs::write(live.join("level.bld"), "X").unwrap();

    let mut store = open(live, clock(10, 0, 0));
    store.backup("temp").unwrap();

    assert!(store.delete(Selector::Label("temp")).unwrap().is_some());
    assert!(store.delete(Selector::Label("temp")).unwrap().is_none());
    assert!(store.delete(Selector::Label("never-existed")).unwrap().is_none());
    assert!(backup_files(live).is_empty());
    assert!(store.list().is_empty());
}

#[test]
fn empty_snapshot_is_listed_and_loads_as_noop() {
    let dir = TempDir::new().unwrap();
    let live = dir.path();

    let mut store = open(live, clock(10, 0, 0));
    let record = store.backup("nothing").unwrap();
    assert!(record.files.is_empty());
    assert_eq!(store.list().len(), 1);

    fs::write(live.join("level.bld"), "after").unwrap();
    let report = store.load(Selector::Label("nothing")).unwrap().unwrap();
    assert!(report.restored.is_empty());
    assert_eq!(fs::read_to_string(live.join("level.bld")).unwrap(), "after");
}

#[test]
fn duplicate_labels_resolve_to_first() {
    let dir = TempDir::new().unwrap();
    let live = dir.path();
    let bld = live.join("level.bld");

    fs::write(&bld, "one").unwrap();
    let mut store = open(live, clock(10, 0, 0));
    let first = store.backup("dup").unwrap();
    fs::write(&bld, "two").unwrap();
    let second = store.backup("dup").unwrap();

    assert_ne!(first.id, second.id);
    assert_eq!(store.resolve("dup"), Some(&first.id));

    fs::write(&bld, "three").unwrap();
    store.load(Selector::Label("dup")).unwrap().unwrap();
    assert_eq!(fs::read_to_string(&bld).unwrap(), "one");

    // deleting by label removes the first, exposing the second
    store.delete(Selector::Label("dup")).unwrap().unwrap();
    assert_eq!(store.resolve("dup"), Some(&second.id));
}

#[test]
fn load_of_unknown_label_is_noop() {
    let dir = TempDir::new().unwrap();
    let live = dir.path();
    fs::write(live.join("level.bld"), "live").unwrap();

    let store = open(live, clock(10, 0, 0));
    assert!(store.load(Selector::Label("ghost")).unwrap().is_none());
    assert_eq!(fs::read_to_string(live.join("level.bld")).unwrap(), "live");
}

#[test]
fn corrupt_index_is_fatal_on_open() {
    let dir = TempDir::new().unwrap();
    let backup = dir.path().join("Backup");
    fs::create_dir_all(&backup).unwrap();
    fs::write(backup.join("backups.json"), "[1, 2, 3]").unwrap();

    let err = SnapshotStore::open(StoreLayout::new(dir.path())).err().unwrap();
    assert!(matches!(err, StoreError::IndexCorrupt { .. }));
    // never rewritten
    assert_eq!(fs::read_to_string(backup.join("backups.json")).unwrap(), "[1, 2, 3]");
}

#[test]
fn index_and_files_stay_consistent() {
    let dir = TempDir::new().unwrap();
    let live = dir.path();
    fs::write(live.join("level.bld"), "X").unwrap();
    fs::write(live.join("level.cbld"), "C").unwrap();

    let mut store = open(live, clock(10, 0, 0));
    store.backup("a").unwrap();
    fs::remove_file(live.join("level.cbld")).unwrap();
    store.backup("b").unwrap();
    store.backup("c").unwrap();
    store.delete(Selector::Label("b")).unwrap();
    let archive = live.join("shared.zip");
    store.export(Selector::Label("a"), &archive).unwrap();
    store.import(&archive).unwrap();

    let tracked: HashSet<&str> = ["level.cbld", "level.bld"].into();
    let listed: HashSet<String> = store.list().into_iter().map(|r| r.id.to_string()).collect();

    for record in store.list() {
        assert!(record.files.iter().all(|f| tracked.contains(f.as_str())));
    }
    for name in backup_files(live) {
        let (_, id) = store.layout().parse_backup_name(&name).unwrap();
        assert!(listed.contains(id), "{name} not reachable from list()");
    }
    assert!(store.orphans().unwrap().is_empty());
}

#[test]
fn custom_layout_tracks_configured_files() {
    let dir = TempDir::new().unwrap();
    let live = dir.path().join("saves");
    fs::create_dir_all(&live).unwrap();
    fs::write(live.join("slot1.sav"), "s1").unwrap();
    fs::write(live.join("level.bld"), "ignored").unwrap();

    let layout = StoreLayout {
        live_dir: live.clone(),
        backup_dir: dir.path().join("vault"),
        index_path: dir.path().join("vault").join("index.json"),
        tracked_files: vec!["slot1.sav".into()],
    };
    let mut store = SnapshotStore::open(layout).unwrap().with_clock(clock(9, 9, 9));
    let record = store.backup("slot").unwrap();

    assert_eq!(record.files, ["slot1.sav"]);
    assert!(dir.path().join("vault/slot1.sav.20240705090909.bak").is_file());
    assert!(dir.path().join("vault/index.json").is_file());
    assert!(!live.join("Backup").exists());
}
