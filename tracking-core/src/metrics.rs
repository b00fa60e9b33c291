//! Observable-failure counters.
//!
//! A small, explicitly-constructed struct of named `AtomicU64` counters,
//! shared by `Arc` reference between the tracker, the coordinator, and the
//! pipeline rather than read from a global registry. `tracking-engine`'s
//! coordinator and pipeline increment the same struct's
//! `coordinator_threat_error` / `pipeline_dropped_detections` /
//! `max_latency_overruns` fields.

use std::sync::atomic::{AtomicU64, Ordering};

/// Named counters for recovered failures and soft-deadline overruns.
#[derive(Debug, Default)]
pub struct Metrics {
    /// `tracker.filter.degenerate`
    pub tracker_filter_degenerate: AtomicU64,
    /// `assoc.infeasible`
    pub assoc_infeasible: AtomicU64,
    /// `coordinator.threat.error`
    pub coordinator_threat_error: AtomicU64,
    /// `pipeline.dropped_detections`
    pub pipeline_dropped_detections: AtomicU64,
    /// Soft per-frame deadline overruns (`max_latency_ms`).
    pub max_latency_overruns: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Metrics::default()
    }

    pub fn incr_tracker_filter_degenerate(&self) {
        self.tracker_filter_degenerate.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_assoc_infeasible(&self) {
        self.assoc_infeasible.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_coordinator_threat_error(&self) {
        self.coordinator_threat_error.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_pipeline_dropped_detections(&self) {
        self.pipeline_dropped_detections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_max_latency_overruns(&self) {
        self.max_latency_overruns.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            tracker_filter_degenerate: self.tracker_filter_degenerate.load(Ordering::Relaxed),
            assoc_infeasible: self.assoc_infeasible.load(Ordering::Relaxed),
            coordinator_threat_error: self.coordinator_threat_error.load(Ordering::Relaxed),
            pipeline_dropped_detections: self.pipeline_dropped_detections.load(Ordering::Relaxed),
            max_latency_overruns: self.max_latency_overruns.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time, serializable copy of [`Metrics`] for reporting/export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct MetricsSnapshot {
    pub tracker_filter_degenerate: u64,
    pub assoc_infeasible: u64,
    pub coordinator_threat_error: u64,
    pub pipeline_dropped_detections: u64,
    pub max_latency_overruns: u64,
}
