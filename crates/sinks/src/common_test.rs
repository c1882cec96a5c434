//! Tests for writer errors and metrics

use crate::{WriterError, WriterMetrics};

#[test]
fn test_metrics_new() {
    let snapshot = WriterMetrics::new().snapshot();

    assert_eq!(snapshot.lines_written, 0);
    assert_eq!(snapshot.bytes_written, 0);
    assert_eq!(snapshot.batches_written, 0);
    assert_eq!(snapshot.rotations, 0);
    assert_eq!(snapshot.write_errors, 0);
}

#[test]
fn test_metrics_batch_written() {
    let metrics = WriterMetrics::new();

    metrics.batch_written(3, 30);
    metrics.batch_written(1, 12);

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.batches_written, 2);
    assert_eq!(snapshot.lines_written, 4);
    assert_eq!(snapshot.bytes_written, 42);
}

#[test]
fn test_metrics_rotations_and_errors() {
    let metrics = WriterMetrics::new();

    metrics.rotated();
    metrics.write_error();
    metrics.write_error();

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.rotations, 1);
    assert_eq!(snapshot.write_errors, 2);
}

#[test]
fn test_error_messages() {
    assert!(WriterError::Disposed.to_string().contains("disposed"));

    let err = WriterError::invalid_limit("max_lines");
    assert!(err.to_string().contains("max_lines"));
    assert!(err.to_string().contains("greater than 0"));
}
