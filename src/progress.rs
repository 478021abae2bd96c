//! Rate-limited transfer progress reporting.
//!
//! Chat platforms throttle message edits hard, so progress is computed on
//! every chunk but only emitted when the minimum interval has elapsed.
//! Completion always emits so the final state is never stale.

use async_trait::async_trait;
use std::time::{Duration, Instant};

/// One progress snapshot handed to a [`ProgressSink`]
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    /// Name of the file being transferred
    pub file_name: String,
    /// Bytes transferred so far
    pub current: u64,
    /// Total bytes, when the remote end advertised a length
    pub total: Option<u64>,
    /// Completion percentage, when the total is known
    pub percent: Option<f64>,
    /// Average transfer rate since the start, bytes per second
    pub speed_bps: f64,
    /// Estimated seconds remaining, when the total is known
    pub eta_secs: Option<u64>,
}

/// Destination for progress updates (a chat message editor, a log line).
///
/// Implementations must swallow their own delivery failures; a throttled
/// message edit must never fail the transfer it describes.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    /// Deliver one update
    async fn emit(&self, update: &ProgressUpdate);
}

/// Sink that discards every update
pub struct NullSink;

#[async_trait]
impl ProgressSink for NullSink {
    async fn emit(&self, _update: &ProgressUpdate) {}
}

/// Computes progress snapshots and gates them by a minimum interval
pub struct ProgressReporter {
    file_name: String,
    total: Option<u64>,
    min_interval: Duration,
    started_at: Instant,
    last_emit: Option<Instant>,
}

impl ProgressReporter {
    /// Start tracking a transfer of `total` bytes (if known)
    #[must_use]
    pub fn new(file_name: impl Into<String>, total: Option<u64>, min_interval: Duration) -> Self {
        Self {
            file_name: file_name.into(),
            total,
            min_interval,
            started_at: Instant::now(),
            last_emit: None,
        }
    }

    /// Record `current` bytes transferred.
    ///
    /// Returns an update to emit, or `None` when the snapshot is suppressed
    /// by the rate gate. Reaching the known total always emits.
    pub fn update(&mut self, current: u64) -> Option<ProgressUpdate> {
        let now = Instant::now();
        let complete = self.total.is_some_and(|t| current >= t);

        if !complete {
            if let Some(last) = self.last_emit {
                if now.duration_since(last) < self.min_interval {
                    return None;
                }
            }
        }
        self.last_emit = Some(now);

        let elapsed = now.duration_since(self.started_at).as_secs_f64();
        let speed_bps = if elapsed > 0.0 {
            current as f64 / elapsed
        } else {
            0.0
        };

        let percent = self
            .total
            .filter(|t| *t > 0)
            .map(|t| (current as f64 / t as f64 * 100.0).min(100.0));

        let eta_secs = self.total.and_then(|t| {
            if speed_bps > 0.0 && t > current {
                Some(((t - current) as f64 / speed_bps) as u64)
            } else {
                None
            }
        });

        Some(ProgressUpdate {
            file_name: self.file_name.clone(),
            current,
            total: self.total,
            percent,
            speed_bps,
            eta_secs,
        })
    }
}

/// Format a byte count for humans: `512 B`, `1.2 MB`, `3.4 GB`
#[must_use]
pub fn human_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[unit])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// Format a duration in seconds for humans: `45s`, `3m 10s`, `1h 02m`
#[must_use]
pub fn human_time(secs: u64) -> String {
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else {
        format!("{}h {:02}m", secs / 3600, (secs % 3600) / 60)
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_update_emits_then_rate_gate_suppresses() {
        let mut reporter =
            ProgressReporter::new("a.bin", Some(1000), Duration::from_secs(3600));

        let first = reporter.update(100).unwrap();
        assert_eq!(first.current, 100);
        assert_eq!(first.percent, Some(10.0));

        // Inside the interval, suppressed
        assert!(reporter.update(200).is_none());
        assert!(reporter.update(300).is_none());
    }

    #[test]
    fn completion_always_emits() {
        let mut reporter =
            ProgressReporter::new("a.bin", Some(1000), Duration::from_secs(3600));

        reporter.update(100).unwrap();
        assert!(reporter.update(500).is_none());

        let last = reporter.update(1000).unwrap();
        assert_eq!(last.percent, Some(100.0));
        assert_eq!(last.eta_secs, None);
    }

    #[test]
    fn unknown_total_has_no_percent_or_eta() {
        let mut reporter = ProgressReporter::new("a.bin", None, Duration::ZERO);
        let update = reporter.update(4096).unwrap();
        assert_eq!(update.percent, None);
        assert_eq!(update.eta_secs, None);
        assert_eq!(update.total, None);
    }

    #[test]
    fn human_bytes_formats() {
        assert_eq!(human_bytes(512), "512 B");
        assert_eq!(human_bytes(2048), "2.0 KB");
        assert_eq!(human_bytes(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn human_time_formats() {
        assert_eq!(human_time(45), "45s");
        assert_eq!(human_time(190), "3m 10s");
        assert_eq!(human_time(3720), "1h 02m");
    }
}
