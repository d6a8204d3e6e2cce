//! Loader success/failure counters.

use std::sync::atomic::{AtomicU64, Ordering};

use regdesk_loader::{LoadError, LoadErrorKind, LoaderObserver};
use serde::Serialize;

/// Counts applied settlements of one loader.
///
/// Share it with `Arc` to read counters while the loader runs:
///
/// ```rust,ignore
/// let metrics = Arc::new(LoaderMetrics::new("payments"));
/// let loader = GuardedLoader::builder(fetch)
///     .observer(Arc::clone(&metrics))
///     .build();
/// ```
#[derive(Debug, Default)]
pub struct LoaderMetrics {
    label: String,
    successes: AtomicU64,
    deadline_exceeded: AtomicU64,
    transport_failures: AtomicU64,
    operation_failures: AtomicU64,
}

impl LoaderMetrics {
    /// Create zeroed counters for a loader.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    /// Record a successful settlement.
    pub fn record_success(&self) {
        self.successes.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed settlement.
    pub fn record_failure(&self, kind: LoadErrorKind) {
        let counter = match kind {
            LoadErrorKind::DeadlineExceeded => &self.deadline_exceeded,
            LoadErrorKind::Transport => &self.transport_failures,
            LoadErrorKind::Operation => &self.operation_failures,
            LoadErrorKind::Cancelled => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the number of failures of one kind.
    pub fn failures(&self, kind: LoadErrorKind) -> u64 {
        match kind {
            LoadErrorKind::DeadlineExceeded => self.deadline_exceeded.load(Ordering::Relaxed),
            LoadErrorKind::Transport => self.transport_failures.load(Ordering::Relaxed),
            LoadErrorKind::Operation => self.operation_failures.load(Ordering::Relaxed),
            LoadErrorKind::Cancelled => 0,
        }
    }

    /// Take a consistent-enough copy of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let deadline_exceeded = self.failures(LoadErrorKind::DeadlineExceeded);
        let transport_failures = self.failures(LoadErrorKind::Transport);
        let operation_failures = self.failures(LoadErrorKind::Operation);

        MetricsSnapshot {
            label: self.label.clone(),
            successes: self.successes.load(Ordering::Relaxed),
            failures: deadline_exceeded + transport_failures + operation_failures,
            deadline_exceeded,
            transport_failures,
            operation_failures,
        }
    }
}

impl<T> LoaderObserver<T> for LoaderMetrics {
    fn on_success(&self, _data: &T) {
        self.record_success();
    }

    fn on_error(&self, error: &LoadError) {
        self.record_failure(error.kind());
    }
}

/// Point-in-time copy of [`LoaderMetrics`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Loader label.
    pub label: String,
    /// Applied successes.
    pub successes: u64,
    /// Applied failures of any kind.
    pub failures: u64,
    /// Failures where the deadline fired first.
    pub deadline_exceeded: u64,
    /// Network-level failures.
    pub transport_failures: u64,
    /// Failures reported by the backend.
    pub operation_failures: u64,
}

impl MetricsSnapshot {
    /// Format as JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.label.clone())
    }

    /// Share of applied settlements that succeeded, if any settled.
    pub fn success_rate(&self) -> Option<f64> {
        let total = self.successes + self.failures;
        if total == 0 {
            return None;
        }
        Some(self.successes as f64 / total as f64)
    }
}
