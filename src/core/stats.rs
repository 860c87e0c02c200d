//! Pipeline-wide statistics helpers.
//!
//! This module defines the `PipelineStats` structure used to track execution
//! metrics for scan processing runs and the `StatsManager` helper that
//! coordinates thread-safe updates to these metrics.

use std::fmt;
use std::sync::Mutex;
use std::time::Duration;

/// Statistics for the digitization pipeline.
///
/// Tracks how many scans were processed and performance metrics such as
/// average processing time and success ratios.
#[derive(Debug, Clone)]
pub struct PipelineStats {
    /// The total number of scans processed.
    pub total_processed: usize,
    /// The number of scans that produced a result document.
    pub successful_scans: usize,
    /// The number of scans that failed outright.
    pub failed_scans: usize,
    /// The average processing time per scan in milliseconds.
    pub average_processing_time_ms: f64,
}

impl PipelineStats {
    /// Creates a new PipelineStats instance with default values.
    pub fn new() -> Self {
        Self {
            total_processed: 0,
            successful_scans: 0,
            failed_scans: 0,
            average_processing_time_ms: 0.0,
        }
    }

    /// Returns the success rate as a percentage (0.0 to 100.0).
    pub fn success_rate(&self) -> f64 {
        if self.total_processed == 0 {
            0.0
        } else {
            (self.successful_scans as f64 / self.total_processed as f64) * 100.0
        }
    }

    /// Returns the failure rate as a percentage (0.0 to 100.0).
    pub fn failure_rate(&self) -> f64 {
        if self.total_processed == 0 {
            0.0
        } else {
            (self.failed_scans as f64 / self.total_processed as f64) * 100.0
        }
    }
}

impl Default for PipelineStats {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PipelineStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Pipeline Statistics:")?;
        writeln!(f, "  Total processed: {}", self.total_processed)?;
        writeln!(
            f,
            "  Successful: {} ({:.1}%)",
            self.successful_scans,
            self.success_rate()
        )?;
        writeln!(
            f,
            "  Failed: {} ({:.1}%)",
            self.failed_scans,
            self.failure_rate()
        )?;
        writeln!(
            f,
            "  Average processing time: {:.2} ms",
            self.average_processing_time_ms
        )?;
        Ok(())
    }
}

/// Thread-safe manager for updating pipeline statistics during execution.
#[derive(Debug, Default)]
pub struct StatsManager {
    /// Shared statistics state guarded by a mutex.
    stats: Mutex<PipelineStats>,
}

impl StatsManager {
    /// Creates a new `StatsManager` instance with zeroed metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the current statistics snapshot.
    pub fn get_stats(&self) -> PipelineStats {
        self.stats.lock().unwrap().clone()
    }

    /// Records the outcome of a single scan.
    ///
    /// The average processing time is maintained as a running mean over all
    /// recorded scans.
    pub fn record_scan(&self, success: bool, elapsed: Duration) {
        let mut stats = self.stats.lock().unwrap();
        let previous_total = stats.total_processed as f64;
        stats.total_processed += 1;
        if success {
            stats.successful_scans += 1;
        } else {
            stats.failed_scans += 1;
        }
        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
        stats.average_processing_time_ms = (stats.average_processing_time_ms * previous_total
            + elapsed_ms)
            / stats.total_processed as f64;
    }
}
