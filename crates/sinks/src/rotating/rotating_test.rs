//! Tests for the rotating log pair

use super::*;
use backlog_storage::{MemoryFileSystem, NativeFileSystem, SessionId, SessionOptions};
use tempfile::TempDir;

const MAIN: &str = "logs/main";
const FALLBACK: &str = "logs/fallback";

fn writer(fs: &MemoryFileSystem, limits: RotationLimits) -> RotatingWriter {
    RotatingWriter::new(Arc::new(fs.clone()), MAIN, FALLBACK, limits).unwrap()
}

fn lines(text: Option<String>) -> Vec<String> {
    text.map(|t| t.lines().map(str::to_string).collect())
        .unwrap_or_default()
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_zero_limits_rejected() {
    let fs: Arc<dyn FileSystem> = Arc::new(MemoryFileSystem::new());

    let err = RotatingWriter::new(Arc::clone(&fs), MAIN, FALLBACK, RotationLimits::lines(0));
    assert!(matches!(
        err,
        Err(WriterError::InvalidLimit { limit: "max_lines" })
    ));

    let err = RotatingWriter::new(fs, MAIN, FALLBACK, RotationLimits::lines(1).with_max_size(0));
    assert!(matches!(
        err,
        Err(WriterError::InvalidLimit { limit: "max_size" })
    ));
}

#[test]
fn test_main_created_lazily() {
    let fs = MemoryFileSystem::new();
    let w = writer(&fs, RotationLimits::lines(2));

    assert!(!fs.exists(Path::new(MAIN)));
    w.write_line("a").unwrap();
    assert_eq!(fs.contents(MAIN).as_deref(), Some("a\n"));
    assert!(!fs.exists(Path::new(FALLBACK)));
}

#[test]
fn test_for_session_names_files() {
    let fs = MemoryFileSystem::new();
    let session = SessionFiles::new(
        Arc::new(fs.clone()),
        "sessions",
        SessionId::new("abc", 100),
        SessionOptions::default(),
    )
    .unwrap();

    let w = RotatingWriter::for_session(&session, "log-0", "log-1", RotationLimits::default())
        .unwrap();
    w.write_line("x").unwrap();

    assert_eq!(w.main_path(), Path::new("sessions/log-0_abc_100"));
    assert_eq!(w.fallback_path(), Path::new("sessions/log-1_abc_100"));
    assert_eq!(fs.contents("sessions/log-0_abc_100").as_deref(), Some("x\n"));
}

// ============================================================================
// Rotation by line count
// ============================================================================

#[test]
fn test_capacity_one_keeps_last_two_lines() {
    let fs = MemoryFileSystem::new();
    let w = writer(&fs, RotationLimits::lines(1));

    for line in ["a", "b", "c"] {
        w.write_line(line).unwrap();
    }

    assert_eq!(fs.contents(MAIN).as_deref(), Some("c\n"));
    assert_eq!(fs.contents(FALLBACK).as_deref(), Some("b\n"));
    assert_eq!(w.metrics().snapshot().rotations, 2);
}

#[test]
fn test_newest_generation_in_main() {
    let fs = MemoryFileSystem::new();
    let w = writer(&fs, RotationLimits::lines(3));

    for i in 1..=7 {
        w.write_line(i.to_string()).unwrap();
    }

    assert_eq!(lines(fs.contents(FALLBACK)), vec!["4", "5", "6"]);
    assert_eq!(lines(fs.contents(MAIN)), vec!["7"]);
}

#[test]
fn test_pair_holds_suffix_of_writes() {
    const CAPACITY: u64 = 3;

    for n in 1..=12u64 {
        let fs = MemoryFileSystem::new();
        let w = writer(&fs, RotationLimits::lines(CAPACITY));
        let written: Vec<String> = (0..n).map(|i| format!("line-{i}")).collect();
        for line in &written {
            w.write_line(line.as_str()).unwrap();
        }

        let main = lines(fs.contents(MAIN));
        let fallback = lines(fs.contents(FALLBACK));
        let expected_main = ((n - 1) % CAPACITY + 1) as usize;
        let expected_fallback = if n > CAPACITY { CAPACITY as usize } else { 0 };
        assert_eq!(main.len(), expected_main, "main size after {n} writes");
        assert_eq!(fallback.len(), expected_fallback, "fallback size after {n} writes");

        let combined: Vec<String> = fallback.into_iter().chain(main).collect();
        assert_eq!(combined, written[written.len() - combined.len()..], "order after {n} writes");
    }
}

#[test]
fn test_unbounded_never_rotates() {
    let fs = MemoryFileSystem::new();
    let w = writer(&fs, RotationLimits::default());

    for i in 0..100 {
        w.write_line(i.to_string()).unwrap();
    }

    assert_eq!(lines(fs.contents(MAIN)).len(), 100);
    assert!(!fs.exists(Path::new(FALLBACK)));
}

#[test]
fn test_single_stream_on_main_after_rotation() {
    let fs = MemoryFileSystem::new();
    let w = writer(&fs, RotationLimits::lines(1));

    w.write_line("a").unwrap();
    w.write_line("b").unwrap();

    assert_eq!(fs.open_streams(MAIN), 1);
}

// ============================================================================
// Rotation by size
// ============================================================================

#[test]
fn test_rotates_before_reaching_max_size() {
    let fs = MemoryFileSystem::new();
    let w = writer(&fs, RotationLimits::default().with_max_size(10));

    for line in ["abcd", "efgh", "ijkl"] {
        w.write_line(line).unwrap();
    }

    assert_eq!(fs.contents(MAIN).as_deref(), Some("ijkl\n"));
    assert_eq!(fs.contents(FALLBACK).as_deref(), Some("efgh\n"));
}

#[test]
fn test_oversized_line_written_to_empty_main() {
    let fs = MemoryFileSystem::new();
    let w = writer(&fs, RotationLimits::default().with_max_size(4));

    w.write_line("toolong").unwrap();
    assert_eq!(fs.contents(MAIN).as_deref(), Some("toolong\n"));
    assert!(!fs.exists(Path::new(FALLBACK)));

    w.write_line("x").unwrap();
    assert_eq!(fs.contents(FALLBACK).as_deref(), Some("toolong\n"));
    assert_eq!(fs.contents(MAIN).as_deref(), Some("x\n"));
}

#[test]
fn test_line_and_size_limits_independent() {
    let fs = MemoryFileSystem::new();
    let w = writer(&fs, RotationLimits::lines(10).with_max_size(8));

    for line in ["aa", "bb", "cc"] {
        w.write_line(line).unwrap();
    }

    // 3 bytes per line: "aa\nbb\n" is 6 bytes, a third would reach 9
    assert_eq!(fs.contents(FALLBACK).as_deref(), Some("aa\nbb\n"));
    assert_eq!(fs.contents(MAIN).as_deref(), Some("cc\n"));
}

// ============================================================================
// Failure handling
// ============================================================================

#[test]
fn test_rename_failure_keeps_main() {
    let fs = MemoryFileSystem::new();
    let w = writer(&fs, RotationLimits::lines(1));

    w.write_line("a").unwrap();
    fs.faults().set_fail_rename(true);
    w.write_line("b").unwrap();

    assert_eq!(fs.contents(MAIN).as_deref(), Some("a\nb\n"));
    assert!(!fs.exists(Path::new(FALLBACK)));
    assert_eq!(w.pending(), 0);
    assert_eq!(w.metrics().snapshot().write_errors, 1);

    fs.faults().set_fail_rename(false);
    w.write_line("c").unwrap();

    assert_eq!(fs.contents(FALLBACK).as_deref(), Some("a\nb\n"));
    assert_eq!(fs.contents(MAIN).as_deref(), Some("c\n"));
}

#[test]
fn test_stream_creation_failure_queues_lines() {
    let fs = MemoryFileSystem::new();
    let w = writer(&fs, RotationLimits::default());

    fs.faults().set_fail_create_stream(true);
    w.write_line("a").unwrap();
    w.write_line("b").unwrap();

    assert_eq!(w.pending(), 2);
    assert!(!fs.exists(Path::new(MAIN)));

    fs.faults().set_fail_create_stream(false);
    w.write_line("c").unwrap();

    assert_eq!(w.pending(), 0);
    assert_eq!(fs.contents(MAIN).as_deref(), Some("a\nb\nc\n"));

    let metrics = w.metrics().snapshot();
    assert_eq!(metrics.batches_written, 1);
    assert_eq!(metrics.lines_written, 3);
}

#[test]
fn test_queued_batch_respects_capacity() {
    let fs = MemoryFileSystem::new();
    let w = writer(&fs, RotationLimits::lines(2));

    fs.faults().set_fail_create_stream(true);
    w.write_line("a").unwrap();
    w.write_line("b").unwrap();
    fs.faults().set_fail_create_stream(false);
    w.write_line("c").unwrap();

    assert_eq!(fs.contents(FALLBACK).as_deref(), Some("a\nb\n"));
    assert_eq!(fs.contents(MAIN).as_deref(), Some("c\n"));
    assert_eq!(w.metrics().snapshot().batches_written, 2);
}

#[test]
fn test_failed_reopen_after_rotation_retries() {
    let fs = MemoryFileSystem::new();
    let w = writer(&fs, RotationLimits::lines(1));

    w.write_line("a").unwrap();
    fs.faults().set_fail_create_stream(true);
    w.write_line("b").unwrap();

    assert_eq!(fs.contents(FALLBACK).as_deref(), Some("a\n"));
    assert!(!fs.exists(Path::new(MAIN)));
    assert_eq!(w.pending(), 1);

    fs.faults().set_fail_create_stream(false);
    w.flush().unwrap();

    assert_eq!(fs.contents(MAIN).as_deref(), Some("b\n"));
    assert_eq!(fs.contents(FALLBACK).as_deref(), Some("a\n"));
}

#[test]
fn test_write_failure_requeues_in_order() {
    let fs = MemoryFileSystem::new();
    let w = writer(&fs, RotationLimits::default());

    w.write_line("a").unwrap();
    fs.faults().set_fail_write(true);
    w.write_line("b").unwrap();
    w.write_line("c").unwrap();

    assert_eq!(w.pending(), 2);
    assert_eq!(fs.contents(MAIN).as_deref(), Some("a\n"));

    fs.faults().set_fail_write(false);
    w.write_line("d").unwrap();

    assert_eq!(w.pending(), 0);
    assert_eq!(fs.contents(MAIN).as_deref(), Some("a\nb\nc\nd\n"));
}

#[test]
fn test_flush_failure_requeues_batch() {
    let fs = MemoryFileSystem::buffered();
    let w = writer(&fs, RotationLimits::lines(2));

    w.write_line("a").unwrap();
    fs.faults().set_fail_flush(true);
    w.write_line("b").unwrap();
    w.write_line("c").unwrap();

    assert_eq!(w.pending(), 2);
    assert_eq!(fs.contents(MAIN).as_deref(), Some("a\n"));
    assert_eq!(w.metrics().snapshot().write_errors, 2);

    fs.faults().set_fail_flush(false);
    w.write_line("d").unwrap();

    assert_eq!(w.pending(), 0);
    assert_eq!(fs.contents(FALLBACK).as_deref(), Some("a\nb\n"));
    assert_eq!(fs.contents(MAIN).as_deref(), Some("c\nd\n"));
}

#[test]
fn test_flush_failure_aborts_rotation() {
    let fs = MemoryFileSystem::buffered();
    let w = writer(&fs, RotationLimits::lines(1));

    w.write_line("a").unwrap();
    fs.faults().set_fail_flush(true);
    w.write_line("b").unwrap();

    assert!(!fs.exists(Path::new(FALLBACK)));
    assert_eq!(fs.contents(MAIN).as_deref(), Some("a\n"));
    assert_eq!(fs.open_streams(MAIN), 1);
    assert_eq!(w.pending(), 1);
    assert_eq!(w.metrics().snapshot().rotations, 0);

    fs.faults().set_fail_flush(false);
    w.flush().unwrap();

    assert_eq!(fs.contents(FALLBACK).as_deref(), Some("a\n"));
    assert_eq!(fs.contents(MAIN).as_deref(), Some("b\n"));
}

// ============================================================================
// Disposal
// ============================================================================

#[test]
fn test_dispose_rejects_writes() {
    let fs = MemoryFileSystem::new();
    let w = writer(&fs, RotationLimits::default());

    w.write_line("a").unwrap();
    w.dispose();

    assert!(w.is_disposed());
    assert!(matches!(w.write_line("b"), Err(WriterError::Disposed)));
    assert!(matches!(w.flush(), Err(WriterError::Disposed)));
    assert_eq!(fs.open_streams(MAIN), 0);
    assert_eq!(fs.contents(MAIN).as_deref(), Some("a\n"));
}

#[test]
fn test_dispose_discards_queue() {
    let fs = MemoryFileSystem::new();
    let w = writer(&fs, RotationLimits::default());

    fs.faults().set_fail_create_stream(true);
    w.write_line("a").unwrap();
    w.dispose();
    w.dispose();

    assert_eq!(w.pending(), 0);
    assert!(!fs.exists(Path::new(MAIN)));
}

// ============================================================================
// Native filesystem
// ============================================================================

#[test]
fn test_rotation_on_native_filesystem() {
    let dir = TempDir::new().unwrap();
    let main = dir.path().join("main");
    let fallback = dir.path().join("fallback");
    let w = RotatingWriter::new(
        Arc::new(NativeFileSystem::default()),
        &main,
        &fallback,
        RotationLimits::lines(2),
    )
    .unwrap();

    for i in 1..=5 {
        w.write_line(i.to_string()).unwrap();
    }

    assert_eq!(std::fs::read_to_string(&fallback).unwrap(), "3\n4\n");
    assert_eq!(std::fs::read_to_string(&main).unwrap(), "5\n");
}
