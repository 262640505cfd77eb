//! Bounded telemetry log consumed by the UI as a scrolling console.
//!
//! Append-only, capacity-bounded: only the most recent entries survive,
//! oldest dropped first. The handle is cheap to clone so training and
//! trading tasks can push events while the controller reads snapshots.

use chrono::Utc;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TelemetryEntry {
    /// Unix timestamp (seconds) when the event was recorded.
    pub ts: i64,
    pub message: String,
}

#[derive(Clone)]
pub struct TelemetryLog {
    inner: Arc<Mutex<Inner>>,
}

struct Inner {
    entries: VecDeque<TelemetryEntry>,
    capacity: usize,
}

impl TelemetryLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                entries: VecDeque::with_capacity(capacity),
                capacity: capacity.max(1),
            })),
        }
    }

    pub fn push(&self, message: impl Into<String>) {
        let entry = TelemetryEntry {
            ts: Utc::now().timestamp(),
            message: message.into(),
        };
        let mut inner = self.inner.lock().expect("telemetry lock poisoned");
        if inner.entries.len() == inner.capacity {
            inner.entries.pop_front();
        }
        inner.entries.push_back(entry);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.push(format!("ERROR: {}", message.into()));
    }

    /// Snapshot of the current window, oldest first.
    pub fn entries(&self) -> Vec<TelemetryEntry> {
        let inner = self.inner.lock().expect("telemetry lock poisoned");
        inner.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("telemetry lock poisoned").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_first() {
        let log = TelemetryLog::new(3);
        for i in 0..5 {
            log.push(format!("event {}", i));
        }
        let entries = log.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].message, "event 2");
        assert_eq!(entries[2].message, "event 4");
    }

    #[test]
    fn clones_share_the_same_window() {
        let log = TelemetryLog::new(4);
        let other = log.clone();
        other.push("from clone");
        assert_eq!(log.len(), 1);
        assert_eq!(log.entries()[0].message, "from clone");
    }

    #[test]
    fn error_entries_are_prefixed() {
        let log = TelemetryLog::new(2);
        log.error("loss diverged");
        assert_eq!(log.entries()[0].message, "ERROR: loss diverged");
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let log = TelemetryLog::new(0);
        log.push("still kept");
        assert_eq!(log.len(), 1);
    }
}
