//! Tests for the filesystem capability

use super::*;
use std::path::PathBuf;
use tempfile::TempDir;

// ============================================================================
// NativeFileSystem
// ============================================================================

#[test]
fn test_native_read_dir_lists_files_only() {
    let dir = TempDir::new().unwrap();
    let fs = NativeFileSystem::default();

    fs.write_file(&dir.path().join("a"), b"1").unwrap();
    fs.write_file(&dir.path().join("b"), b"2").unwrap();
    fs.create_dir_all(&dir.path().join("nested")).unwrap();

    let mut names = fs.read_dir(dir.path()).unwrap();
    names.sort();
    assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn test_native_stream_truncates_and_appends() {
    let dir = TempDir::new().unwrap();
    let fs = NativeFileSystem::default();
    let path = dir.path().join("stream");

    fs.write_file(&path, b"old contents").unwrap();

    {
        let mut stream = fs.create_write_stream(&path).unwrap();
        stream.write_all(b"one\n").unwrap();
        stream.write_all(b"two\n").unwrap();
        stream.flush().unwrap();
    }

    assert_eq!(fs.read_to_string(&path).unwrap(), "one\ntwo\n");
}

#[test]
fn test_native_stream_flushes_on_drop() {
    let dir = TempDir::new().unwrap();
    let fs = NativeFileSystem::new(1024);
    let path = dir.path().join("stream");

    let mut stream = fs.create_write_stream(&path).unwrap();
    stream.write_all(b"buffered").unwrap();
    drop(stream);

    assert_eq!(fs.read_to_string(&path).unwrap(), "buffered");
}

#[cfg(target_os = "linux")]
#[test]
fn test_native_failed_flush_drops_buffer() {
    // Every write to /dev/full fails with ENOSPC
    let full = PathBuf::from("/dev/full");
    if !full.exists() {
        return;
    }
    let fs = NativeFileSystem::new(1024);

    let mut stream = fs.create_write_stream(&full).unwrap();
    stream.write_all(b"lost").unwrap();
    assert!(stream.flush().is_err());

    // Nothing left to write, so the retry succeeds
    stream.flush().unwrap();
}

#[test]
fn test_native_rename_replaces_target() {
    let dir = TempDir::new().unwrap();
    let fs = NativeFileSystem::default();
    let from = dir.path().join("from");
    let to = dir.path().join("to");

    fs.write_file(&from, b"new").unwrap();
    fs.write_file(&to, b"old").unwrap();
    fs.rename(&from, &to).unwrap();

    assert!(!fs.exists(&from));
    assert_eq!(fs.read_to_string(&to).unwrap(), "new");
}

#[test]
fn test_native_read_dir_missing_directory() {
    let dir = TempDir::new().unwrap();
    let fs = NativeFileSystem::default();

    assert!(fs.read_dir(&dir.path().join("missing")).is_err());
}

// ============================================================================
// MemoryFileSystem
// ============================================================================

#[test]
fn test_memory_read_dir_scoped_to_parent() {
    let fs = MemoryFileSystem::new();
    fs.write_file(&PathBuf::from("dir/a"), b"").unwrap();
    fs.write_file(&PathBuf::from("dir/nested/b"), b"").unwrap();
    fs.write_file(&PathBuf::from("other/c"), b"").unwrap();

    assert_eq!(fs.read_dir(&PathBuf::from("dir")).unwrap(), vec!["a"]);
}

#[test]
fn test_memory_read_dir_missing_and_empty() {
    let fs = MemoryFileSystem::new();
    assert!(fs.read_dir(&PathBuf::from("missing")).is_err());

    fs.create_dir_all(&PathBuf::from("empty")).unwrap();
    assert!(fs.read_dir(&PathBuf::from("empty")).unwrap().is_empty());
}

#[test]
fn test_memory_stream_tracks_open_streams() {
    let fs = MemoryFileSystem::new();
    let path = PathBuf::from("dir/log");

    let mut stream = fs.create_write_stream(&path).unwrap();
    assert_eq!(fs.open_streams(&path), 1);

    stream.write_all(b"hello").unwrap();
    assert_eq!(fs.contents(&path).as_deref(), Some("hello"));

    drop(stream);
    assert_eq!(fs.open_streams(&path), 0);
}

#[test]
fn test_memory_write_after_remove_vanishes() {
    let fs = MemoryFileSystem::new();
    let path = PathBuf::from("dir/log");

    let mut stream = fs.create_write_stream(&path).unwrap();
    fs.remove_file(&path).unwrap();
    stream.write_all(b"lost").unwrap();

    assert!(!fs.exists(&path));
}

#[test]
fn test_memory_fault_switches() {
    let fs = MemoryFileSystem::new();
    let a = PathBuf::from("dir/a");
    let b = PathBuf::from("dir/b");
    fs.write_file(&a, b"x").unwrap();

    fs.faults().set_fail_rename(true);
    assert!(fs.rename(&a, &b).is_err());
    assert!(fs.exists(&a));
    fs.faults().set_fail_rename(false);
    fs.rename(&a, &b).unwrap();

    fs.faults().set_fail_create_stream(true);
    assert!(fs.create_write_stream(&a).is_err());
    fs.faults().set_fail_create_stream(false);

    let mut stream = fs.create_write_stream(&a).unwrap();
    fs.faults().set_fail_write(true);
    assert!(stream.write_all(b"nope").is_err());
    fs.faults().set_fail_write(false);
    stream.write_all(b"yes").unwrap();
    assert_eq!(fs.faults().write_count(), 1);
    assert_eq!(fs.contents(&a).as_deref(), Some("yes"));
}

#[test]
fn test_memory_buffered_stream_holds_until_flush() {
    let fs = MemoryFileSystem::buffered();
    let path = PathBuf::from("dir/log");

    let mut stream = fs.create_write_stream(&path).unwrap();
    stream.write_all(b"one\n").unwrap();
    assert_eq!(fs.contents(&path).as_deref(), Some(""));

    stream.flush().unwrap();
    assert_eq!(fs.contents(&path).as_deref(), Some("one\n"));

    stream.write_all(b"two\n").unwrap();
    drop(stream);
    assert_eq!(fs.contents(&path).as_deref(), Some("one\ntwo\n"));
}

#[test]
fn test_memory_failed_flush_drops_buffer() {
    let fs = MemoryFileSystem::buffered();
    let path = PathBuf::from("dir/log");

    let mut stream = fs.create_write_stream(&path).unwrap();
    stream.write_all(b"kept\n").unwrap();
    stream.flush().unwrap();

    stream.write_all(b"lost\n").unwrap();
    fs.faults().set_fail_flush(true);
    assert!(stream.flush().is_err());
    fs.faults().set_fail_flush(false);

    stream.flush().unwrap();
    assert_eq!(fs.contents(&path).as_deref(), Some("kept\n"));
}
