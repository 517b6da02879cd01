use std::collections::HashMap;
use std::time::Duration;

use tokio_util::time::delay_queue::{self, DelayQueue};

/// Backs the scheduler's cron entries (§4.4).
///
/// Holds only job names, never `Job` values, per §9: "the time wheel holds
/// only entries for `active` jobs plus a back-reference to the Name (not
/// the Job itself) to avoid stale references on disable/remove."
pub struct TimeWheel {
    queue: DelayQueue<String>,
    keys: HashMap<String, delay_queue::Key>,
}

impl TimeWheel {
    pub fn new() -> Self {
        Self {
            queue: DelayQueue::new(),
            keys: HashMap::new(),
        }
    }

    /// Installs or replaces the entry for `name`, firing after `delay`.
    /// Replacing (rather than requiring the caller to `remove` first)
    /// keeps `DisableJob`/`EnableJob`/schedule-change call sites simple.
    pub fn install(&mut self, name: &str, delay: Duration) {
        self.remove(name);
        let key = self.queue.insert(name.to_string(), delay);
        self.keys.insert(name.to_string(), key);
    }

    pub fn remove(&mut self, name: &str) {
        if let Some(key) = self.keys.remove(name) {
            self.queue.try_remove(&key);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Awaits the next fire; resolves to the job name whose entry expired.
    /// Cancellation-safe: dropping the returned future loses nothing, since
    /// `DelayQueue::next` doesn't remove the entry until it actually fires.
    pub async fn next_fired(&mut self) -> Option<String> {
        use futures::StreamExt;
        let expired = self.queue.next().await?;
        let name = expired.into_inner();
        self.keys.remove(&name);
        Some(name)
    }
}

impl Default for TimeWheel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn fires_in_install_order_when_delays_differ() {
        let mut wheel = TimeWheel::new();
        wheel.install("slow", Duration::from_millis(50));
        wheel.install("fast", Duration::from_millis(10));
        tokio::time::advance(Duration::from_millis(10)).await;
        assert_eq!(wheel.next_fired().await.as_deref(), Some("fast"));
        tokio::time::advance(Duration::from_millis(40)).await;
        assert_eq!(wheel.next_fired().await.as_deref(), Some("slow"));
    }

    #[tokio::test]
    async fn removed_entry_never_fires() {
        let mut wheel = TimeWheel::new();
        wheel.install("a", Duration::from_millis(5));
        wheel.remove("a");
        assert!(wheel.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn reinstall_replaces_pending_entry() {
        let mut wheel = TimeWheel::new();
        wheel.install("a", Duration::from_millis(100));
        wheel.install("a", Duration::from_millis(10));
        tokio::time::advance(Duration::from_millis(10)).await;
        assert_eq!(wheel.next_fired().await.as_deref(), Some("a"));
    }
}
