use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Notify;

/// The graceful-shutdown barrier `Scheduler::stop` waits on (§4.4, §5).
///
/// Every in-flight execution holds one [`DrainGuard`] for its lifetime;
/// `wait_drained` suspends until the count returns to zero.
#[derive(Default)]
pub struct Drain {
    in_flight: AtomicUsize,
    notify: Notify,
}

impl Drain {
    pub fn enter(self: &std::sync::Arc<Self>) -> DrainGuard {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        DrainGuard {
            drain: self.clone(),
        }
    }

    pub fn count(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub async fn wait_drained(&self) {
        loop {
            // Register for the next `notify_waiters()` *before* checking the
            // count: `notify_waiters()` only wakes futures that already
            // exist, so checking first would let a guard drop between the
            // check and the await and never wake us.
            let notified = self.notify.notified();
            if self.in_flight.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }
}

pub struct DrainGuard {
    drain: std::sync::Arc<Drain>,
}

impl Drop for DrainGuard {
    fn drop(&mut self) {
        self.drain.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.drain.notify.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn wait_drained_resolves_immediately_with_nothing_in_flight() {
        let drain = Arc::new(Drain::default());
        drain.wait_drained().await;
    }

    #[tokio::test]
    async fn wait_drained_blocks_until_guard_drops() {
        let drain = Arc::new(Drain::default());
        let guard = drain.enter();
        assert_eq!(drain.count(), 1);
        let drain2 = drain.clone();
        let waiter = tokio::spawn(async move { drain2.wait_drained().await });
        tokio::task::yield_now().await;
        drop(guard);
        waiter.await.unwrap();
    }
}
