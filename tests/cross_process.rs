//! Cross-process scenarios driven through the shipped demo binaries.
//!
//! Each test uses its own throwaway segment so parallel test threads and
//! leftover segments from earlier runs cannot interfere.
use std::process::Command;

use status_table::{LockBackend, OpStatus, StatusTable};

struct SegmentGuard(String);

impl SegmentGuard {
    fn new(tag: &str) -> Self {
        let name = format!("/status-table-xproc-{}-{tag}", std::process::id());
        let _ = StatusTable::cleanup_named(&name);
        SegmentGuard(name)
    }
}

impl Drop for SegmentGuard {
    fn drop(&mut self) {
        let _ = StatusTable::cleanup_named(&self.0);
    }
}

#[test]
fn writer_process_publishes_to_later_attachers() {
    let seg = SegmentGuard::new("publish");

    let writer = Command::new(env!("CARGO_BIN_EXE_status-writer"))
        .args([seg.0.as_str(), "7001", "hello"])
        .output()
        .expect("spawn writer");
    assert!(
        writer.status.success(),
        "writer failed: {}",
        String::from_utf8_lossy(&writer.stderr)
    );

    // This process attaches after the writer exited and still sees the entry.
    let table = StatusTable::open_named(&seg.0, LockBackend::RwLock).expect("attach");
    assert!(!table.is_creator());
    assert_eq!(table.get(7001), b"hello");
    assert_eq!(table.count(), 1);

    // A third, even later process sees it too.
    let reader = Command::new(env!("CARGO_BIN_EXE_status-reader"))
        .args([seg.0.as_str(), "7001"])
        .output()
        .expect("spawn reader");
    assert!(
        reader.status.success(),
        "reader failed: {}",
        String::from_utf8_lossy(&reader.stderr)
    );
    let stdout = String::from_utf8_lossy(&reader.stdout);
    assert!(stdout.contains("key 7001: hello"), "stdout: {stdout}");
}

#[test]
fn racing_creators_agree_on_one_segment() {
    let seg = SegmentGuard::new("race");

    // Two processes start against a segment that does not exist; exactly
    // one wins the create race and the other attaches behind it.
    let first = Command::new(env!("CARGO_BIN_EXE_status-writer"))
        .args([seg.0.as_str(), "9001", "alpha"])
        .spawn()
        .expect("spawn first writer");
    let second = Command::new(env!("CARGO_BIN_EXE_status-writer"))
        .args([seg.0.as_str(), "9002", "beta"])
        .spawn()
        .expect("spawn second writer");

    let first = first.wait_with_output().expect("first writer");
    let second = second.wait_with_output().expect("second writer");
    assert!(first.status.success());
    assert!(second.status.success());

    let table = StatusTable::open_named(&seg.0, LockBackend::RwLock).expect("attach");
    assert_eq!(table.get(9001), b"alpha");
    assert_eq!(table.get(9002), b"beta");
    assert_eq!(table.count(), 2);
}

#[test]
fn parent_write_is_visible_to_child_process() {
    let seg = SegmentGuard::new("parentwrite");

    let table = StatusTable::open_named(&seg.0, LockBackend::RwLock).expect("create");
    assert!(table.is_creator());
    assert_eq!(table.add(4242, b"from-parent"), OpStatus::Ok);

    let reader = Command::new(env!("CARGO_BIN_EXE_status-reader"))
        .args([seg.0.as_str(), "4242"])
        .output()
        .expect("spawn reader");
    assert!(reader.status.success());
    let stdout = String::from_utf8_lossy(&reader.stdout);
    assert!(stdout.contains("key 4242: from-parent"), "stdout: {stdout}");
}

#[test]
fn cleaner_unlinks_so_next_open_starts_fresh() {
    let seg = SegmentGuard::new("clean");

    let writer = Command::new(env!("CARGO_BIN_EXE_status-writer"))
        .args([seg.0.as_str(), "1", "one"])
        .output()
        .expect("spawn writer");
    assert!(writer.status.success());

    let cleaner = Command::new(env!("CARGO_BIN_EXE_status-clean"))
        .arg(&seg.0)
        .output()
        .expect("spawn cleaner");
    assert!(
        cleaner.status.success(),
        "cleaner failed: {}",
        String::from_utf8_lossy(&cleaner.stderr)
    );

    // Cleaning an already-absent segment also succeeds.
    let again = Command::new(env!("CARGO_BIN_EXE_status-clean"))
        .arg(&seg.0)
        .output()
        .expect("spawn cleaner again");
    assert!(again.status.success());

    // The name is free again: the next open creates a brand-new table.
    let table = StatusTable::open_named(&seg.0, LockBackend::RwLock).expect("recreate");
    assert!(table.is_creator());
    assert_eq!(table.count(), 0);
    assert!(!table.contains(1));
}
