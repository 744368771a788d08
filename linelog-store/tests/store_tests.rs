//! LogStore integration tests: emit, restart, rotation and concurrency.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use linelog_index::{lookup::read_offsets, rebuild::rebuild, SENTINEL};
use linelog_store::{
    paths::COMPRESSED_EXTENSION, ConsoleTarget, Fields, FixedDir, Level, LogStore, RotationPolicy,
    StoreConfig,
};
use tempfile::TempDir;

fn config() -> StoreConfig {
    StoreConfig {
        app_name: "agent".into(),
        console: ConsoleTarget::Off,
        ..StoreConfig::default()
    }
}

fn open(dir: &TempDir, config: StoreConfig) -> LogStore {
    LogStore::open_with(config, &FixedDir(dir.path().to_path_buf())).expect("open store")
}

fn new_year() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// Offsets a from-scratch rebuild of the store's active file would produce.
fn rebuilt_offsets(store: &LogStore, dir: &TempDir) -> Vec<i64> {
    let scratch = dir.path().join("scratch.idx");
    rebuild(&store.log_path(), &scratch).expect("rebuild");
    let offsets = read_offsets(&scratch).expect("read scratch");
    fs::remove_file(scratch).expect("cleanup");
    offsets
}

// ---------------------------------------------------------------------------
// 1. Emit and index accounting
// ---------------------------------------------------------------------------

#[test]
fn hello_at_new_year_is_one_indexed_line() {
    let dir = TempDir::new().expect("tempdir");
    let store = open(&dir, config());

    store.emit_at(new_year(), Level::Info, "hello", &Fields::new());

    let content = fs::read_to_string(store.log_path()).unwrap();
    assert!(content.starts_with("2024-01-01 00:00:00 [INFO] "), "got: {content}");
    assert!(content.ends_with(" hello\n"));
    assert_eq!(content.matches('\n').count(), 1);

    let len = content.len() as i64;
    assert_eq!(read_offsets(&store.index_path()).unwrap(), vec![SENTINEL, len]);
    assert_eq!(store.cursor(), len as u64);
}

#[test]
fn n_emits_give_n_plus_one_cumulative_entries() {
    let dir = TempDir::new().expect("tempdir");
    let store = open(&dir, config());

    let mut fields = Fields::new();
    for i in 0..40 {
        fields.insert("seq".into(), i.to_string());
        store.emit(Level::Warning, &format!("event number {i}"), &fields);
    }

    let content = fs::read(store.log_path()).unwrap();
    let mut expected = vec![SENTINEL];
    let mut total = 0i64;
    for line in content.split_inclusive(|&b| b == b'\n') {
        total += line.len() as i64;
        expected.push(total);
    }
    assert_eq!(expected.len(), 41);
    assert_eq!(read_offsets(&store.index_path()).unwrap(), expected);
}

#[test]
fn multiline_message_is_still_one_line() {
    let dir = TempDir::new().expect("tempdir");
    let store = open(&dir, config());
    store.error("stack:\n  at a\n  at b");

    assert_eq!(store.line_count().unwrap(), 1);
    assert_eq!(
        read_offsets(&store.index_path()).unwrap(),
        rebuilt_offsets(&store, &dir)
    );
}

// ---------------------------------------------------------------------------
// 2. Restart and recovery
// ---------------------------------------------------------------------------

#[test]
fn restart_resumes_from_last_entry() {
    let dir = TempDir::new().expect("tempdir");
    {
        let store = open(&dir, config());
        store.info("before restart 1");
        store.info("before restart 2");
    }

    let store = open(&dir, config());
    assert_eq!(store.cursor(), fs::metadata(store.log_path()).unwrap().len());
    store.info("after restart");

    assert_eq!(store.line_count().unwrap(), 3);
    assert_eq!(
        read_offsets(&store.index_path()).unwrap(),
        rebuilt_offsets(&store, &dir)
    );
}

#[test]
fn restart_with_existing_log_and_no_index_rebuilds() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(
        dir.path().join("agent.log"),
        "2024-01-01 00:00:00 [INFO] old one\n2024-01-01 00:00:01 [INFO] old two\n",
    )
    .unwrap();

    let store = open(&dir, config());
    assert_eq!(store.line_count().unwrap(), 2);
    store.info("new");
    assert_eq!(store.line_count().unwrap(), 3);
    assert!(String::from_utf8(store.read_line(2).unwrap())
        .unwrap()
        .ends_with("old two\n"));
}

#[test]
fn corrupted_index_is_rebuilt_at_startup() {
    let dir = TempDir::new().expect("tempdir");
    {
        let store = open(&dir, config());
        store.info("a");
        store.info("b");
    }
    fs::write(dir.path().join("agent.log.idx"), [0xffu8; 5]).unwrap();

    let store = open(&dir, config());
    assert_eq!(store.line_count().unwrap(), 2);
    assert_eq!(
        read_offsets(&store.index_path()).unwrap(),
        rebuilt_offsets(&store, &dir)
    );
}

#[test]
fn external_truncation_is_detected_on_next_emit() {
    let dir = TempDir::new().expect("tempdir");
    let store = open(&dir, config());
    for i in 0..5 {
        store.info(&format!("line {i}"));
    }

    OpenOptions::new()
        .write(true)
        .truncate(true)
        .open(store.log_path())
        .unwrap();
    store.info("after truncation");

    assert_eq!(store.line_count().unwrap(), 1);
    assert_eq!(
        read_offsets(&store.index_path()).unwrap(),
        rebuilt_offsets(&store, &dir)
    );
}

#[test]
fn fragment_left_by_a_crash_double_counts_until_rebuild() {
    let dir = TempDir::new().expect("tempdir");
    let log = dir.path().join("agent.log");
    fs::write(&log, "2024-01-01 00:00:00 [INFO] complete\n2024-01-01 00:00:01 [INFO] cut").unwrap();

    let store = open(&dir, config());
    assert_eq!(store.line_count().unwrap(), 2, "fragment counted at rebuild");

    store.info("next");
    assert_eq!(store.line_count().unwrap(), 3, "fragment's line indexed twice");
    let newlines = fs::read(&log).unwrap().iter().filter(|&&b| b == b'\n').count();
    assert_eq!(newlines, 2);

    store.rebuild_index().unwrap();
    assert_eq!(store.line_count().unwrap(), 2);
}

// ---------------------------------------------------------------------------
// 3. Rotation
// ---------------------------------------------------------------------------

#[test]
fn size_rotation_rebuilds_index_for_new_active_file() {
    let dir = TempDir::new().expect("tempdir");
    let store = open(
        &dir,
        StoreConfig {
            rotation: RotationPolicy {
                max_size_mb: 1,
                max_backups: 2,
                max_age_days: 0,
                compress: true,
            },
            ..config()
        },
    );

    let payload = "p".repeat(2000);
    for i in 0..700 {
        store.info(&format!("{i} {payload}"));
    }

    let active_len = fs::metadata(store.log_path()).unwrap().len();
    assert!(active_len < 1024 * 1024, "active file was rotated");

    let offsets = read_offsets(&store.index_path()).unwrap();
    assert_eq!(offsets[0], SENTINEL);
    assert_eq!(*offsets.last().unwrap(), active_len as i64);
    assert_eq!(offsets, rebuilt_offsets(&store, &dir));

    let compressed: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().is_some_and(|ext| ext == COMPRESSED_EXTENSION))
        .collect();
    assert_eq!(compressed.len(), 1, "one full backup of ~1 MiB");

    let catalog = store.catalog().unwrap();
    assert_eq!(catalog.len(), 1, "compressed backups are not listed");
    assert_eq!(catalog[0].name, "agent.log");
}

// ---------------------------------------------------------------------------
// 4. Concurrency
// ---------------------------------------------------------------------------

#[test]
fn concurrent_emits_keep_index_consistent() {
    let dir = TempDir::new().expect("tempdir");
    let store = Arc::new(open(&dir, config()));

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for i in 0..50 {
                    store.info(&format!("thread {t} message {i}"));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("emitter thread");
    }

    assert_eq!(store.line_count().unwrap(), 400);
    assert_eq!(
        read_offsets(&store.index_path()).unwrap(),
        rebuilt_offsets(&store, &dir)
    );
    for n in [1, 200, 400] {
        let line = store.read_line(n).unwrap();
        assert_eq!(line.iter().filter(|&&b| b == b'\n').count(), 1);
    }
}

#[test]
fn appending_outside_the_store_is_picked_up() {
    let dir = TempDir::new().expect("tempdir");
    let store = open(&dir, config());
    store.info("mine");

    let mut f = OpenOptions::new().append(true).open(store.log_path()).unwrap();
    f.write_all(b"2024-01-01 00:00:00 [INFO] foreign\n").unwrap();
    drop(f);

    store.info("mine again");
    assert_eq!(store.line_count().unwrap(), 3);
}
