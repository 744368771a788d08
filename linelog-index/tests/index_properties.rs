//! Index/log consistency properties across rebuild and incremental update.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use linelog_index::{
    codec::entry_count,
    lookup::{read_line, read_offsets},
    rebuild::rebuild,
    OffsetIndexer, SENTINEL,
};
use tempfile::TempDir;

fn paths(dir: &TempDir) -> (PathBuf, PathBuf) {
    (dir.path().join("app.log"), dir.path().join("app.log.idx"))
}

fn append(path: &Path, bytes: &[u8]) {
    let mut f = OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .expect("open log");
    f.write_all(bytes).expect("append");
}

fn sample_lines() -> Vec<String> {
    (0..25)
        .map(|i| format!("2024-01-01 00:00:{:02} [INFO] line {i}{}\n", i % 60, "x".repeat(i * 3)))
        .collect()
}

// ---------------------------------------------------------------------------
// 1. Entry accounting
// ---------------------------------------------------------------------------

#[test]
fn n_appended_lines_give_n_plus_one_entries() {
    let dir = TempDir::new().expect("tempdir");
    let (log, idx) = paths(&dir);
    let mut indexer = OffsetIndexer::new(&log, &idx);
    indexer.resume().expect("resume");

    let lines = sample_lines();
    let mut expected = vec![SENTINEL];
    let mut total = 0i64;
    for line in &lines {
        append(&log, line.as_bytes());
        indexer.update().expect("update");
        total += line.len() as i64;
        expected.push(total);
    }

    assert_eq!(entry_count(&idx).unwrap(), lines.len() as u64 + 1);
    assert_eq!(read_offsets(&idx).unwrap(), expected);
    assert_eq!(indexer.cursor(), total as u64);
}

#[test]
fn every_indexed_line_reads_back() {
    let dir = TempDir::new().expect("tempdir");
    let (log, idx) = paths(&dir);
    let lines = sample_lines();
    fs::write(&log, lines.concat()).unwrap();
    rebuild(&log, &idx).unwrap();

    for (i, line) in lines.iter().enumerate() {
        let got = read_line(&log, &idx, i as u64 + 1).unwrap();
        assert_eq!(got, line.as_bytes(), "line {}", i + 1);
    }
}

// ---------------------------------------------------------------------------
// 2. Rebuild vs. incremental
// ---------------------------------------------------------------------------

#[test]
fn rebuild_is_idempotent() {
    let dir = TempDir::new().expect("tempdir");
    let (log, idx) = paths(&dir);
    fs::write(&log, sample_lines().concat()).unwrap();

    rebuild(&log, &idx).unwrap();
    let first = fs::read(&idx).unwrap();
    rebuild(&log, &idx).unwrap();
    let second = fs::read(&idx).unwrap();

    assert_eq!(first, second);
}

#[test]
fn incremental_after_rebuild_matches_full_rebuild() {
    let dir = TempDir::new().expect("tempdir");
    let (log, idx) = paths(&dir);
    let lines = sample_lines();
    let (head, tail) = lines.split_at(7);

    fs::write(&log, head.concat()).unwrap();
    let mut indexer = OffsetIndexer::new(&log, &idx);
    indexer.rebuild().unwrap();
    for line in tail {
        append(&log, line.as_bytes());
        indexer.update().unwrap();
    }
    let incremental = fs::read(&idx).unwrap();

    let scratch = dir.path().join("scratch.idx");
    rebuild(&log, &scratch).unwrap();
    assert_eq!(incremental, fs::read(&scratch).unwrap());
}

#[test]
fn batch_of_lines_in_one_update_matches_line_by_line() {
    let dir = TempDir::new().expect("tempdir");
    let (log, idx) = paths(&dir);
    let mut indexer = OffsetIndexer::new(&log, &idx);
    indexer.resume().unwrap();

    append(&log, sample_lines().concat().as_bytes());
    let outcome = indexer.update().unwrap();
    assert_eq!(outcome.appended, sample_lines().len() as u64);

    let scratch = dir.path().join("scratch.idx");
    rebuild(&log, &scratch).unwrap();
    assert_eq!(fs::read(&idx).unwrap(), fs::read(&scratch).unwrap());
}

// ---------------------------------------------------------------------------
// 3. Trailing fragment asymmetry
// ---------------------------------------------------------------------------

/// A fragment counted by the rebuild keeps its provisional entry; completing
/// it later adds a second entry for the same physical line.
#[test]
fn fragment_counted_at_rebuild_is_indexed_again_when_completed() {
    let dir = TempDir::new().expect("tempdir");
    let (log, idx) = paths(&dir);
    fs::write(&log, b"full line\npartial").unwrap();

    let mut indexer = OffsetIndexer::new(&log, &idx);
    let rebuilt = indexer.rebuild().unwrap();
    assert_eq!(rebuilt.lines, 2);
    assert_eq!(indexer.cursor(), 17);

    append(&log, b" done\n");
    indexer.update().unwrap();

    assert_eq!(read_offsets(&idx).unwrap(), vec![SENTINEL, 10, 17, 23]);
    let newlines = fs::read(&log).unwrap().iter().filter(|&&b| b == b'\n').count();
    assert_eq!(newlines, 2);
    assert_eq!(entry_count(&idx).unwrap() - 1, 3, "one physical line, two entries");

    // A fresh rebuild resolves the drift.
    indexer.rebuild().unwrap();
    assert_eq!(read_offsets(&idx).unwrap(), vec![SENTINEL, 10, 23]);
}

#[test]
fn incremental_never_indexes_an_unterminated_tail() {
    let dir = TempDir::new().expect("tempdir");
    let (log, idx) = paths(&dir);
    let mut indexer = OffsetIndexer::new(&log, &idx);
    indexer.resume().unwrap();

    append(&log, b"a\nhalf");
    indexer.update().unwrap();
    assert_eq!(read_offsets(&idx).unwrap(), vec![SENTINEL, 2]);
    assert_eq!(indexer.cursor(), 2);
}
