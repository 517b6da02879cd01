use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use ofelia_client::{ContainerAdapter, EventFilter, EventKind};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::observability::ObservabilityHooks;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
const HEARTBEAT_STALE_AFTER: Duration = Duration::from_secs(10);
const AUTHORITATIVE_INSPECT_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy)]
pub struct MonitorOutcome {
    pub exit_code: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("wait cancelled")]
    Cancelled,
    #[error("wait timed out")]
    TimedOut,
}

type Waiters = HashMap<String, Vec<oneshot::Sender<Result<MonitorOutcome, MonitorError>>>>;

/// Translates "wait for container X to terminate" into either an engine
/// event subscription or a polling loop, with fallback (§4.6).
///
/// One engine subscription, N waiters (§9): the broker table is guarded by
/// a short-held lock; resolving a waiter's oneshot sender never happens
/// while the lock is held.
pub struct ContainerMonitor {
    adapter: Arc<dyn ContainerAdapter>,
    hooks: ObservabilityHooks,
    waiters: Mutex<Waiters>,
    using_events: AtomicBool,
    poll_interval: Duration,
}

impl ContainerMonitor {
    pub fn new(adapter: Arc<dyn ContainerAdapter>, hooks: ObservabilityHooks) -> Arc<Self> {
        Arc::new(Self {
            adapter,
            hooks,
            waiters: Mutex::new(HashMap::new()),
            using_events: AtomicBool::new(false),
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Spawns the background subscription/polling task. Returns a handle
    /// the caller can drop to let the task keep running detached, matching
    /// "one engine subscription" for the monitor's whole lifetime.
    pub fn spawn(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move { this.run().await })
    }

    /// Registers a waiter for `container_id`'s termination. Resolved by
    /// the background task; times out (and deletes the wait-record) after
    /// `timeout` elapses (§3 Container Monitor wait-record: "destroyed
    /// when the container terminates, the caller cancels, or the wait
    /// times out").
    pub async fn wait_for_termination(
        &self,
        container_id: &str,
        timeout: Duration,
    ) -> Result<MonitorOutcome, MonitorError> {
        let (tx, rx) = oneshot::channel();
        self.waiters
            .lock()
            .entry(container_id.to_string())
            .or_default()
            .push(tx);

        let started = Instant::now();
        let result = tokio::time::timeout(timeout, rx).await;
        self.hooks.monitor_wait_duration(started.elapsed());

        match result {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(MonitorError::Cancelled),
            Err(_) => {
                self.remove_waiter_slot(container_id);
                Err(MonitorError::TimedOut)
            }
        }
    }

    fn remove_waiter_slot(&self, container_id: &str) {
        let mut waiters = self.waiters.lock();
        if let Some(list) = waiters.get_mut(container_id) {
            list.retain(|tx| !tx.is_closed());
            if list.is_empty() {
                waiters.remove(container_id);
            }
        }
    }

    fn take_waiters(&self, container_id: &str) -> Vec<oneshot::Sender<Result<MonitorOutcome, MonitorError>>> {
        self.waiters.lock().remove(container_id).unwrap_or_default()
    }

    fn has_waiters(&self) -> bool {
        !self.waiters.lock().is_empty()
    }

    fn waiting_ids(&self) -> Vec<String> {
        self.waiters.lock().keys().cloned().collect()
    }

    async fn resolve(&self, container_id: &str, opportunistic_exit_code: Option<i64>) {
        let waiting = self.take_waiters(container_id);
        if waiting.is_empty() {
            return;
        }
        let exit_code = match tokio::time::timeout(
            AUTHORITATIVE_INSPECT_TIMEOUT,
            self.adapter.containers_wait(container_id),
        )
        .await
        {
            Ok(Ok(outcome)) => outcome.status_code,
            _ => opportunistic_exit_code.unwrap_or(-1),
        };
        for tx in waiting {
            let _ = tx.send(Ok(MonitorOutcome { exit_code }));
        }
    }

    async fn run(self: Arc<Self>) {
        loop {
            match self.adapter.events_subscribe(EventFilter::default()).await {
                Ok(mut stream) => {
                    self.using_events.store(true, Ordering::SeqCst);
                    self.hooks.monitor_using_events();
                    let mut last_event = Instant::now();
                    loop {
                        let next = tokio::time::timeout(HEARTBEAT_STALE_AFTER, stream.next()).await;
                        match next {
                            Ok(Some(Ok(event))) => {
                                last_event = Instant::now();
                                self.hooks.monitor_event_observed();
                                if matches!(event.kind, EventKind::Die | EventKind::Stop) {
                                    self.resolve(&event.container_id, event.exit_code).await;
                                }
                            }
                            Ok(Some(Err(e))) => {
                                warn!(error = %e, "container event stream error, falling back to polling");
                                break;
                            }
                            Ok(None) => {
                                debug!("container event stream closed, falling back to polling");
                                break;
                            }
                            Err(_) => {
                                if last_event.elapsed() >= HEARTBEAT_STALE_AFTER {
                                    warn!("container event heartbeat stale, falling back to polling");
                                    break;
                                }
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "could not subscribe to container events, falling back to polling");
                }
            }

            self.using_events.store(false, Ordering::SeqCst);
            self.hooks.monitor_fallback_engaged();
            self.poll_until_events_recover().await;
        }
    }

    /// Polls while there are active waiters; returns once an event
    /// subscription should be retried (after one poll-interval sleep, so
    /// the retry loop doesn't busy-spin when there's nothing to watch).
    async fn poll_until_events_recover(self: &Arc<Self>) {
        loop {
            tokio::time::sleep(self.poll_interval).await;
            if !self.has_waiters() {
                return;
            }
            for id in self.waiting_ids() {
                match self.adapter.containers_inspect(&id).await {
                    Ok(running) if !running => self.resolve(&id, None).await,
                    Ok(_) => {}
                    Err(e) => warn!(container = %id, error = %e, "poll inspect failed"),
                }
            }
            return;
        }
    }

    pub fn is_using_events(&self) -> bool {
        self.using_events.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ofelia_client::MockAdapter;

    #[tokio::test]
    async fn wait_times_out_and_clears_record() {
        let mock = MockAdapter::new();
        let monitor = ContainerMonitor::new(mock, ObservabilityHooks::noop());
        let result = monitor
            .wait_for_termination("missing", Duration::from_millis(20))
            .await;
        assert!(matches!(result, Err(MonitorError::TimedOut)));
        assert!(!monitor.has_waiters());
    }

    #[tokio::test]
    async fn resolve_delivers_exit_code_to_waiter() {
        let mock = MockAdapter::new();
        mock.on_wait(|_id| {
            Ok(ofelia_client::WaitOutcome {
                status_code: 42,
                error: None,
            })
        });
        let monitor = ContainerMonitor::new(mock, ObservabilityHooks::noop());
        let waiter = tokio::spawn({
            let monitor = monitor.clone();
            async move { monitor.wait_for_termination("x", Duration::from_secs(5)).await }
        });
        // Give the spawned task a chance to register its wait-record before
        // the event loop resolves it.
        while !monitor.has_waiters() {
            tokio::task::yield_now().await;
        }
        monitor.resolve("x", Some(42)).await;
        let outcome = waiter.await.unwrap().unwrap();
        assert_eq!(outcome.exit_code, 42);
    }
}
