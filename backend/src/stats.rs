//! In-memory prediction counters. Reset on restart, never persisted.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde::Serialize;

#[derive(Debug, Default)]
pub struct InferenceStats {
    attempts: AtomicU64,
    failures: AtomicU64,
    by_label: DashMap<String, AtomicU64>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub attempts: u64,
    pub failures: u64,
    pub by_label: BTreeMap<String, u64>,
}

impl InferenceStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self, label: &str) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        self.by_label
            .entry(label.to_string())
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            attempts: self.attempts.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            by_label: self
                .by_label
                .iter()
                .map(|entry| (entry.key().clone(), entry.value().load(Ordering::Relaxed)))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn counts_successes_per_label_and_failures() {
        let stats = InferenceStats::new();
        stats.record_success("Fungal");
        stats.record_success("Fungal");
        stats.record_success("Pest");
        stats.record_failure();

        let snap = stats.snapshot();
        assert_eq!(snap.attempts, 4);
        assert_eq!(snap.failures, 1);
        assert_eq!(snap.by_label.get("Fungal"), Some(&2));
        assert_eq!(snap.by_label.get("Pest"), Some(&1));
    }

    #[test]
    fn concurrent_updates_are_not_lost() {
        let stats = Arc::new(InferenceStats::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let stats = stats.clone();
                thread::spawn(move || {
                    for _ in 0..250 {
                        stats.record_success("Healthy");
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(stats.snapshot().by_label["Healthy"], 1000);
    }
}
