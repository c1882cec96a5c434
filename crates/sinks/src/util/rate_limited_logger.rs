//! Rate-limited error logging
//!
//! A writer whose disk is full fails on every call. This logs at most once
//! per interval and reports how many failures were swallowed in between.
//!
//! # Example
//!
//! ```ignore
//! use backlog_sinks::util::RateLimitedLogger;
//! use std::time::Duration;
//!
//! let logger = RateLimitedLogger::new(Duration::from_secs(10));
//!
//! for _ in 0..1000 {
//!     logger.error("append failed", &io_error);
//! }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Default interval between two logged errors
pub const DEFAULT_LOG_INTERVAL: Duration = Duration::from_secs(10);

/// Logs at most one error per interval
#[derive(Debug)]
pub struct RateLimitedLogger {
    min_interval: Duration,
    last_log_time: Mutex<Option<Instant>>,

    /// Errors since the last logged one
    error_count: AtomicU64,

    total_errors: AtomicU64,
}

impl RateLimitedLogger {
    /// Create a logger that logs at most once per `min_interval`
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_log_time: Mutex::new(None),
            error_count: AtomicU64::new(0),
            total_errors: AtomicU64::new(0),
        }
    }

    /// Record an error and log it if the interval has elapsed
    ///
    /// Returns true if the error was logged, false if it was suppressed.
    pub fn error(&self, message: &str, error: &dyn std::fmt::Display) -> bool {
        self.error_count.fetch_add(1, Ordering::Relaxed);
        let total = self.total_errors.fetch_add(1, Ordering::Relaxed) + 1;

        if !self.take_slot() {
            return false;
        }

        let suppressed = self.error_count.swap(0, Ordering::Relaxed).saturating_sub(1);
        if suppressed > 0 {
            tracing::error!(
                error = %error,
                suppressed_count = suppressed,
                total_errors = total,
                "{message} (rate-limited)"
            );
        } else {
            tracing::error!(error = %error, total_errors = total, "{message}");
        }
        true
    }

    /// Errors recorded since the last logged one
    pub fn pending_error_count(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }

    /// Errors recorded over the logger's lifetime
    pub fn total_error_count(&self) -> u64 {
        self.total_errors.load(Ordering::Relaxed)
    }

    fn take_slot(&self) -> bool {
        let mut last = self.last_log_time.lock();
        let now = Instant::now();

        match *last {
            Some(at) if now.duration_since(at) < self.min_interval => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }
}

impl Default for RateLimitedLogger {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_INTERVAL)
    }
}
