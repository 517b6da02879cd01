use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// A job's completion status within the current scheduling window (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowStatus {
    Pending,
    Succeeded,
    Failed,
}

/// Per-scheduling-window ledger of completion status per job name.
///
/// A "window" is the smallest cron period that triggers all dependents,
/// taken as the GCD of the fixed periods of participating schedules (§4.5);
/// when no participating schedule has a fixed period (general cron
/// expressions, whose period isn't a single duration), a single window
/// starting at scheduler start is used instead, per the open question
/// resolved in `DESIGN.md`.
#[derive(Debug)]
pub struct WindowLedger {
    window: Duration,
    window_start: DateTime<Utc>,
    statuses: HashMap<String, WindowStatus>,
}

impl WindowLedger {
    pub fn new(window: Duration, now: DateTime<Utc>) -> Self {
        Self {
            window: window.max(Duration::from_millis(1)),
            window_start: now,
            statuses: HashMap::new(),
        }
    }

    /// Computes the GCD-based window across `periods`, falling back to
    /// `fallback` (typically a large duration spanning the scheduler's
    /// lifetime) when no schedule contributes a fixed period.
    pub fn compute_window(periods: &[Duration], fallback: Duration) -> Duration {
        let millis: Vec<u64> = periods
            .iter()
            .filter(|d| !d.is_zero())
            .map(|d| d.as_millis().max(1) as u64)
            .collect();
        match millis.into_iter().reduce(gcd_u64) {
            Some(g) if g > 0 => Duration::from_millis(g),
            _ => fallback,
        }
    }

    /// Rolls the ledger forward if `now` has crossed into a new window,
    /// clearing all recorded statuses for the prior window.
    pub fn roll(&mut self, now: DateTime<Utc>) {
        let elapsed = now - self.window_start;
        let window_millis = self.window.as_millis() as i64;
        if window_millis <= 0 {
            return;
        }
        if elapsed.num_milliseconds() >= window_millis {
            let windows_passed = elapsed.num_milliseconds() / window_millis;
            self.window_start = self.window_start
                + chrono::Duration::milliseconds(windows_passed * window_millis);
            self.statuses.clear();
        }
    }

    pub fn record(&mut self, name: &str, status: WindowStatus) {
        self.statuses.insert(name.to_string(), status);
    }

    pub fn status_of(&self, name: &str) -> WindowStatus {
        self.statuses
            .get(name)
            .copied()
            .unwrap_or(WindowStatus::Pending)
    }

    /// True iff every name in `dependencies` has `Succeeded` in the current
    /// window. An empty dependency list is vacuously satisfied.
    pub fn dependencies_satisfied(&self, dependencies: &[String]) -> bool {
        dependencies
            .iter()
            .all(|d| self.status_of(d) == WindowStatus::Succeeded)
    }
}

fn gcd_u64(a: u64, b: u64) -> u64 {
    if b == 0 {
        a
    } else {
        gcd_u64(b, a % b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_dependencies_always_satisfied() {
        let ledger = WindowLedger::new(Duration::from_secs(1), Utc::now());
        assert!(ledger.dependencies_satisfied(&[]));
    }

    #[test]
    fn dependent_blocked_until_predecessor_succeeds() {
        let mut ledger = WindowLedger::new(Duration::from_secs(1), Utc::now());
        let deps = vec!["a".to_string()];
        assert!(!ledger.dependencies_satisfied(&deps));
        ledger.record("a", WindowStatus::Succeeded);
        assert!(ledger.dependencies_satisfied(&deps));
    }

    #[test]
    fn failed_predecessor_does_not_satisfy() {
        let mut ledger = WindowLedger::new(Duration::from_secs(1), Utc::now());
        ledger.record("a", WindowStatus::Failed);
        assert!(!ledger.dependencies_satisfied(&["a".to_string()]));
    }

    #[test]
    fn gcd_window_of_coprime_periods() {
        let w = WindowLedger::compute_window(
            &[Duration::from_secs(2), Duration::from_secs(3)],
            Duration::from_secs(3600),
        );
        assert_eq!(w, Duration::from_secs(1));
    }

    #[test]
    fn fallback_used_when_no_fixed_period() {
        let w = WindowLedger::compute_window(&[], Duration::from_secs(3600));
        assert_eq!(w, Duration::from_secs(3600));
    }

    #[test]
    fn roll_clears_statuses_after_window_elapses() {
        let start = Utc::now();
        let mut ledger = WindowLedger::new(Duration::from_millis(10), start);
        ledger.record("a", WindowStatus::Succeeded);
        assert_eq!(ledger.status_of("a"), WindowStatus::Succeeded);
        ledger.roll(start + chrono::Duration::milliseconds(50));
        assert_eq!(ledger.status_of("a"), WindowStatus::Pending);
    }
}
