//! Process-wide counters (exposed by `/health`)

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics handle for recording counters
#[derive(Debug, Default)]
pub struct Metrics {
    manuals_generated: AtomicU64,
    manuals_failed: AtomicU64,
    screenshot_fallbacks: AtomicU64,
    objects_deleted: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn manual_generated(&self) {
        self.manuals_generated.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "manuals_generated", "Metric incremented");
    }

    pub fn manual_failed(&self) {
        self.manuals_failed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "manuals_failed", "Metric incremented");
    }

    pub fn screenshot_fallback(&self) {
        self.screenshot_fallbacks.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "screenshot_fallbacks", "Metric incremented");
    }

    pub fn objects_deleted(&self, count: u64) {
        self.objects_deleted.fetch_add(count, Ordering::Relaxed);
        tracing::debug!(counter = "objects_deleted", count, "Metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            manuals_generated: self.manuals_generated.load(Ordering::Relaxed),
            manuals_failed: self.manuals_failed.load(Ordering::Relaxed),
            screenshot_fallbacks: self.screenshot_fallbacks.load(Ordering::Relaxed),
            objects_deleted: self.objects_deleted.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub manuals_generated: u64,
    pub manuals_failed: u64,
    pub screenshot_fallbacks: u64,
    pub objects_deleted: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = Metrics::new();
        metrics.manual_generated();
        metrics.screenshot_fallback();
        metrics.screenshot_fallback();
        metrics.objects_deleted(3);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.manuals_generated, 1);
        assert_eq!(snapshot.manuals_failed, 0);
        assert_eq!(snapshot.screenshot_fallbacks, 2);
        assert_eq!(snapshot.objects_deleted, 3);
    }
}
