// Station metrics
//
// Lightweight counters for the scan pipeline and the kiosk rotation

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Station counters
///
/// Uses atomic operations so the input thread, the scan queue task, and the
/// kiosk task can all record without locks. Logged on shutdown.
#[derive(Debug)]
pub struct Metrics {
    /// Buffers classified as scanner output (keystrokes or paste)
    pub scans_detected: AtomicU64,

    /// Enter-terminated buffers rejected as human typing or too short
    pub noise_rejected: AtomicU64,

    /// Scans the server resolved to borrow or return
    pub scans_resolved: AtomicU64,

    /// Scans handed to a human for disambiguation
    pub scans_inconclusive: AtomicU64,

    /// Scans that failed at the network or decode step
    pub scan_failures: AtomicU64,

    /// Total time spent waiting on scan resolution in milliseconds
    pub total_resolve_time_ms: AtomicU64,

    /// Full forward laps of the kiosk rotation
    pub rounds_completed: AtomicU64,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            scans_detected: AtomicU64::new(0),
            noise_rejected: AtomicU64::new(0),
            scans_resolved: AtomicU64::new(0),
            scans_inconclusive: AtomicU64::new(0),
            scan_failures: AtomicU64::new(0),
            total_resolve_time_ms: AtomicU64::new(0),
            rounds_completed: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_scan_detected(&self) {
        self.scans_detected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_noise_rejected(&self) {
        self.noise_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_scan_resolved(&self) {
        self.scans_resolved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_scan_inconclusive(&self) {
        self.scans_inconclusive.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_scan_failure(&self) {
        self.scan_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_resolve_time(&self, duration: Duration) {
        self.total_resolve_time_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn record_round_completed(&self) {
        self.rounds_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Average resolution time per remote scan call in milliseconds
    pub fn avg_resolve_time_ms(&self) -> f64 {
        let total = self.total_resolve_time_ms.load(Ordering::Relaxed);
        let count = self.scans_resolved.load(Ordering::Relaxed)
            + self.scans_inconclusive.load(Ordering::Relaxed)
            + self.scan_failures.load(Ordering::Relaxed);
        if count > 0 {
            total as f64 / count as f64
        } else {
            0.0
        }
    }

    pub fn log_summary(&self) {
        tracing::info!("=== Station Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Scans: {} detected, {} noise buffers rejected",
            self.scans_detected.load(Ordering::Relaxed),
            self.noise_rejected.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Resolution: {} resolved, {} inconclusive, {} failed (avg: {:.1}ms)",
            self.scans_resolved.load(Ordering::Relaxed),
            self.scans_inconclusive.load(Ordering::Relaxed),
            self.scan_failures.load(Ordering::Relaxed),
            self.avg_resolve_time_ms()
        );
        tracing::info!(
            "Kiosk rounds completed: {}",
            self.rounds_completed.load(Ordering::Relaxed)
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
