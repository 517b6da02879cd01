use std::collections::VecDeque;

use chrono::{DateTime, Utc};

/// Default capacity of a job's [`History`] ring (§9 Design Notes).
pub const DEFAULT_HISTORY_CAPACITY: usize = 128;

/// A single dispatch of a job, from commit to outcome.
///
/// Created when the dispatcher commits to running the job (§3); mutated in
/// place to record the outcome; never deleted except by ring overflow.
#[derive(Debug, Clone)]
pub struct Execution {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub failed: bool,
    pub skipped: bool,
    pub error: Option<String>,
}

impl Execution {
    pub fn starting_now() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            failed: false,
            skipped: false,
            error: None,
        }
    }

    /// A skipped dispatch never reaches `Running`; recorded immediately
    /// with `failed == false` per §7 propagation policy.
    pub fn skipped_now(reason: &str) -> Self {
        let now = Utc::now();
        Self {
            started_at: now,
            finished_at: Some(now),
            failed: false,
            skipped: true,
            error: Some(reason.to_string()),
        }
    }

    pub fn finish_ok(&mut self) {
        self.finished_at = Some(Utc::now());
        self.failed = false;
    }

    pub fn finish_err(&mut self, error: impl ToString) {
        self.finished_at = Some(Utc::now());
        self.failed = true;
        self.error = Some(error.to_string());
    }

    pub fn duration(&self) -> Option<chrono::Duration> {
        self.finished_at.map(|end| end - self.started_at)
    }
}

/// A fixed-size, oldest-first-eviction ring of [`Execution`] records.
///
/// Preserves dispatch order (§5 Ordering guarantees): pushes are append-only
/// and never reorder existing entries. Producers are never blocked by a
/// full ring (§9) — eviction is O(1) and synchronous with the push.
#[derive(Debug, Clone)]
pub struct History {
    capacity: usize,
    entries: VecDeque<Execution>,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: VecDeque::with_capacity(capacity.max(1)),
        }
    }

    pub fn push(&mut self, execution: Execution) {
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(execution);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Oldest-first iteration, matching push order.
    pub fn iter(&self) -> impl Iterator<Item = &Execution> {
        self.entries.iter()
    }

    pub fn last(&self) -> Option<&Execution> {
        self.entries.back()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_evicts_oldest() {
        let mut h = History::new(2);
        h.push(Execution::starting_now());
        h.push(Execution::starting_now());
        h.push(Execution::starting_now());
        assert_eq!(h.len(), 2);
    }

    #[test]
    fn start_timestamps_non_decreasing() {
        let mut h = History::new(8);
        for _ in 0..5 {
            h.push(Execution::starting_now());
        }
        let timestamps: Vec<_> = h.iter().map(|e| e.started_at).collect();
        assert!(timestamps.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn skipped_is_not_failed() {
        let e = Execution::skipped_now("coalesced");
        assert!(e.skipped);
        assert!(!e.failed);
    }
}
