//! Scheduler Core (§4.4): job registry, cron time wheel, dispatcher, and
//! graceful-shutdown barrier.

pub mod dispatcher;
pub mod drain;
pub mod time_wheel;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use ofelia_client::ContainerAdapter;
use ofelia_core::{Execution, Job, JobKind, Registry, Schedule, WindowLedger, WindowStatus};
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{Error, Result};
use crate::monitor::ContainerMonitor;
use crate::observability::ObservabilityHooks;
use crate::resilience::ResilienceTriplet;
use drain::Drain;
use time_wheel::TimeWheel;

enum WheelCommand {
    Install { name: String, delay: Duration },
    Remove { name: String },
}

/// The concurrent job registry and execution dispatcher (§2, §4.4).
pub struct Scheduler {
    registry: RwLock<Registry>,
    resilience: Mutex<HashMap<String, Arc<ResilienceTriplet>>>,
    window: Mutex<WindowLedger>,
    concurrency: RwLock<Arc<tokio::sync::Semaphore>>,
    adapter: Arc<dyn ContainerAdapter>,
    monitor: Arc<ContainerMonitor>,
    hooks: ObservabilityHooks,
    wheel_tx: mpsc::UnboundedSender<WheelCommand>,
    wheel_rx: Mutex<Option<mpsc::UnboundedReceiver<WheelCommand>>>,
    wheel_task: Mutex<Option<tokio::task::JoinHandle<()>>>,
    monitor_task: Mutex<Option<tokio::task::JoinHandle<()>>>,
    drain: Arc<Drain>,
    started: AtomicBool,
    stopped: AtomicBool,
    max_concurrent: AtomicUsize,
}

impl Scheduler {
    pub fn new(adapter: Arc<dyn ContainerAdapter>, hooks: ObservabilityHooks) -> Arc<Self> {
        let (wheel_tx, wheel_rx) = mpsc::unbounded_channel();
        let monitor = ContainerMonitor::new(adapter.clone(), hooks.clone());
        Arc::new(Self {
            registry: RwLock::new(Registry::new()),
            resilience: Mutex::new(HashMap::new()),
            window: Mutex::new(WindowLedger::new(Duration::from_secs(3600), Utc::now())),
            concurrency: RwLock::new(Arc::new(tokio::sync::Semaphore::new(
                num_cpus_fallback(),
            ))),
            adapter,
            monitor,
            hooks,
            wheel_tx,
            wheel_rx: Mutex::new(Some(wheel_rx)),
            wheel_task: Mutex::new(None),
            monitor_task: Mutex::new(None),
            drain: Arc::new(Drain::default()),
            started: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            max_concurrent: AtomicUsize::new(num_cpus_fallback()),
        })
    }

    /// `AddJob` (§4.4): rejects empty schedules (already rejected by
    /// `Schedule::from_str`), rejects name collisions and dependency
    /// cycles (via `Registry::add`), attaches the resilience triplet with
    /// defaults, and admits the job into the time wheel if its schedule is
    /// wheeled.
    pub fn add_job(&self, job: Job) -> Result<()> {
        let name = job.name().to_string();
        let periods: Vec<Duration> = {
            let registry = self.registry.read();
            registry
                .active_jobs()
                .filter_map(|j| j.schedule().fixed_period())
                .chain(job.schedule().fixed_period())
                .collect()
        };
        {
            let mut window = self.window.lock();
            let new_window =
                WindowLedger::compute_window(&periods, Duration::from_secs(3600));
            *window = WindowLedger::new(new_window, Utc::now());
        }

        let schedule = job.schedule().clone();
        self.registry.write().add(job)?;
        self.resilience
            .lock()
            .insert(name.clone(), Arc::new(ResilienceTriplet::default()));
        self.install_wheel_entry(&name, &schedule);
        self.hooks.job_scheduled();
        Ok(())
    }

    fn install_wheel_entry(&self, name: &str, schedule: &Schedule) {
        if !schedule.is_wheeled() {
            return;
        }
        if let Some(next) = schedule.next_after(Utc::now()) {
            let delay = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
            let _ = self.wheel_tx.send(WheelCommand::Install {
                name: name.to_string(),
                delay,
            });
        }
    }

    pub fn remove_job(&self, name: &str) -> Result<()> {
        self.registry.write().remove(name)?;
        let _ = self.wheel_tx.send(WheelCommand::Remove {
            name: name.to_string(),
        });
        Ok(())
    }

    pub fn disable_job(&self, name: &str) -> Result<()> {
        self.registry.write().disable(name)?;
        let _ = self.wheel_tx.send(WheelCommand::Remove {
            name: name.to_string(),
        });
        Ok(())
    }

    pub fn enable_job(&self, name: &str) -> Result<()> {
        self.registry.write().enable(name)?;
        let schedule = self
            .registry
            .read()
            .get(name)
            .map(|j| j.schedule().clone())
            .ok_or_else(|| Error::JobNotActive(name.to_string()))?;
        self.install_wheel_entry(name, &schedule);
        Ok(())
    }

    /// `SetMaxConcurrentJobs` (§4.4): normalizes `n` to `max(1, n)`; resizes
    /// the global semaphore without affecting in-flight executions.
    pub fn set_max_concurrent_jobs(&self, n: i64) {
        let normalized = n.max(1) as usize;
        self.max_concurrent.store(normalized, Ordering::SeqCst);
        *self.concurrency.write() = Arc::new(tokio::sync::Semaphore::new(normalized));
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.registry.read().is_active(name)
    }

    pub fn removed_count(&self) -> usize {
        self.registry.read().removed_jobs().count()
    }

    /// `GetJob` (§4.4): a point-in-time snapshot of the active job, if any.
    pub fn get_job(&self, name: &str) -> Option<Job> {
        self.registry.read().get(name).cloned()
    }

    /// `GetDisabledJob` (§4.4).
    pub fn get_disabled_job(&self, name: &str) -> Option<Job> {
        self.registry.read().get_disabled(name).cloned()
    }

    /// `GetRemovedJobs` (§4.4): every job ever removed from this scheduler,
    /// history intact, in no particular order.
    pub fn get_removed_jobs(&self) -> Vec<Job> {
        self.registry.read().removed_jobs().cloned().collect()
    }

    /// `RunJob` (§4.4): asynchronously submits the named job to the
    /// dispatcher.
    pub async fn run_job(self: &Arc<Self>, name: &str) -> Result<()> {
        if !self.is_active(name) {
            return Err(Error::JobNotActive(name.to_string()));
        }
        self.dispatch(name).await
    }

    /// `Start` (§4.4): idempotent; starts the time wheel and the container
    /// monitor's background event-subscription/polling task.
    pub fn start(self: &Arc<Self>) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        *self.monitor_task.lock() = Some(self.monitor.spawn());
        let Some(wheel_rx) = self.wheel_rx.lock().take() else {
            return;
        };
        let this = self.clone();
        let handle = tokio::spawn(async move { this.run_wheel(wheel_rx).await });
        *self.wheel_task.lock() = Some(handle);
    }

    async fn run_wheel(self: Arc<Self>, mut wheel_rx: mpsc::UnboundedReceiver<WheelCommand>) {
        let mut wheel = TimeWheel::new();
        loop {
            tokio::select! {
                cmd = wheel_rx.recv() => {
                    match cmd {
                        Some(WheelCommand::Install { name, delay }) => wheel.install(&name, delay),
                        Some(WheelCommand::Remove { name }) => wheel.remove(&name),
                        None => return,
                    }
                }
                fired = wheel.next_fired(), if !wheel.is_empty() => {
                    let Some(name) = fired else { continue };
                    if self.stopped.load(Ordering::SeqCst) {
                        continue;
                    }
                    let schedule = self.registry.read().get(&name).map(|j| j.schedule().clone());
                    if let Some(schedule) = schedule {
                        self.install_wheel_entry(&name, &schedule);
                    }
                    let this = self.clone();
                    tokio::spawn(async move {
                        if let Err(e) = this.dispatch(&name).await {
                            debug!(job = %name, error = %e, "dispatch did not complete successfully");
                        }
                    });
                }
            }
        }
    }

    /// `Stop` (§4.4): idempotent; stops the wheel; waits for all in-flight
    /// executions.
    pub async fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(handle) = self.wheel_task.lock().take() {
            handle.abort();
        }
        if let Some(handle) = self.monitor_task.lock().take() {
            handle.abort();
        }
        self.drain.wait_drained().await;
    }

    /// The per-tick dispatcher path (§4.4 steps 1-5).
    async fn dispatch(self: &Arc<Self>, name: &str) -> Result<()> {
        // Step 1: workflow gate.
        let (dependencies, allow_parallel) = {
            let registry = self.registry.read();
            let Some(job) = registry.get(name) else {
                return Err(Error::JobNotActive(name.to_string()));
            };
            (job.dependencies().to_vec(), job.allow_parallel())
        };

        {
            let mut window = self.window.lock();
            window.roll(Utc::now());
            if !window.dependencies_satisfied(&dependencies) {
                self.record(name, Execution::skipped_now("workflow dependency unmet"));
                return Err(Error::Core(ofelia_core::Error::SkippedExecution(
                    "dependency gate",
                )));
            }
        }

        // Step 2: coalescing.
        if !allow_parallel {
            let registry = self.registry.read();
            if registry.get(name).map(|j| j.runtime().is_running()).unwrap_or(false) {
                self.record(name, Execution::skipped_now("coalesced"));
                return Err(Error::Core(ofelia_core::Error::SkippedExecution(
                    "coalesced",
                )));
            }
        }

        let kind = {
            let registry = self.registry.read();
            registry.get(name).map(|j| j.kind().clone())
        };
        let Some(kind) = kind else {
            return Err(Error::JobNotActive(name.to_string()));
        };

        // Step 2.5: container liveness pre-check. This must happen ahead of
        // resilience composition — a dead target container is a skip, not a
        // failure, and must never reach the circuit breaker's
        // `on_failure()`.
        if let JobKind::ExecInContainer { container, .. } = &kind {
            if !self.adapter.containers_inspect(container).await? {
                self.record(
                    name,
                    Execution::skipped_now("target container is not running"),
                );
                return Err(Error::Core(ofelia_core::Error::SkippedExecution(
                    "target container is not running",
                )));
            }
        }

        // Step 3: global concurrency slot.
        let semaphore = self.concurrency.read().clone();
        let _permit = semaphore
            .acquire_owned()
            .await
            .expect("global concurrency semaphore is never closed");
        let _drain_guard = self.drain.enter();

        let resilience = self
            .resilience
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::JobNotActive(name.to_string()))?;

        {
            let registry = self.registry.read();
            if let Some(job) = registry.get(name) {
                job.runtime().enter();
            }
        }
        self.hooks.job_start();
        let started = std::time::Instant::now();

        let mut execution = Execution::starting_now();
        let outcome = match &kind {
            JobKind::Composite { steps } => self.dispatch_composite(steps).await,
            other => {
                let adapter = self.adapter.clone();
                let monitor = self.monitor.clone();
                let hooks = self.hooks.clone();
                dispatcher::compose(&resilience, &hooks, || {
                    dispatcher::run_job_kind(other, adapter.as_ref(), monitor.as_ref())
                })
                .await
            }
        };

        match &outcome {
            Ok(()) => execution.finish_ok(),
            Err(e) => execution.finish_err(e),
        }

        {
            let registry = self.registry.read();
            if let Some(job) = registry.get(name) {
                job.runtime().exit();
            }
        }
        self.hooks
            .job_complete(started.elapsed(), outcome.is_err(), false);

        self.window.lock().record(
            name,
            if outcome.is_ok() {
                WindowStatus::Succeeded
            } else {
                WindowStatus::Failed
            },
        );

        self.record(name, execution);
        outcome
    }

    async fn dispatch_composite(self: &Arc<Self>, steps: &[String]) -> Result<()> {
        for step in steps {
            self.dispatch(step).await?;
        }
        Ok(())
    }

    fn record(&self, name: &str, execution: Execution) {
        let mut registry = self.registry.write();
        if let Some(job) = registry.get_mut(name) {
            job.record(execution);
        }
    }
}

fn num_cpus_fallback() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ofelia_client::MockAdapter;
    use ofelia_core::JobKind;

    fn job(name: &str, schedule: &str, kind: JobKind) -> Job {
        Job::new(name, schedule.parse().unwrap(), kind)
    }

    #[tokio::test]
    async fn add_run_and_remove_round_trip() {
        let adapter = MockAdapter::new();
        let scheduler = Scheduler::new(adapter.clone(), ObservabilityHooks::noop());
        scheduler
            .add_job(job(
                "demo",
                "@manual",
                JobKind::LocalProcess {
                    command: "true".into(),
                },
            ))
            .unwrap();
        assert!(scheduler.is_active("demo"));
        scheduler.run_job("demo").await.unwrap();
        assert_eq!(adapter.call_count("containers_create"), 0);
        scheduler.remove_job("demo").unwrap();
        assert!(!scheduler.is_active("demo"));
        assert_eq!(scheduler.removed_count(), 1);
    }

    #[tokio::test]
    async fn disabled_job_cannot_be_run() {
        let adapter = MockAdapter::new();
        let scheduler = Scheduler::new(adapter, ObservabilityHooks::noop());
        scheduler
            .add_job(job(
                "demo",
                "@manual",
                JobKind::LocalProcess {
                    command: "true".into(),
                },
            ))
            .unwrap();
        scheduler.disable_job("demo").unwrap();
        assert!(scheduler.run_job("demo").await.is_err());
    }

    #[tokio::test]
    async fn dependent_job_blocked_until_dependency_succeeds() {
        let adapter = MockAdapter::new();
        let scheduler = Scheduler::new(adapter, ObservabilityHooks::noop());
        scheduler
            .add_job(job(
                "upstream",
                "@manual",
                JobKind::LocalProcess {
                    command: "true".into(),
                },
            ))
            .unwrap();
        scheduler
            .add_job(
                job(
                    "downstream",
                    "@manual",
                    JobKind::LocalProcess {
                        command: "true".into(),
                    },
                )
                .with_dependencies(vec!["upstream".into()]),
            )
            .unwrap();
        assert!(scheduler.run_job("downstream").await.is_err());
        scheduler.run_job("upstream").await.unwrap();
        scheduler.run_job("downstream").await.unwrap();
    }

    #[tokio::test]
    async fn dead_container_is_skipped_not_failed() {
        let adapter = MockAdapter::new();
        adapter.on_inspect(|_| Ok(false));
        let scheduler = Scheduler::new(adapter.clone(), ObservabilityHooks::noop());
        scheduler
            .add_job(job(
                "demo",
                "@manual",
                JobKind::ExecInContainer {
                    container: "c1".into(),
                    command: "true".into(),
                },
            ))
            .unwrap();

        assert!(scheduler.run_job("demo").await.is_err());
        assert_eq!(adapter.call_count("exec_run"), 0);

        let history = scheduler.get_job("demo").unwrap().history().last().cloned().unwrap();
        assert!(history.skipped);
        assert!(!history.failed);
    }

    #[tokio::test]
    async fn removed_jobs_are_queryable_after_remove() {
        let adapter = MockAdapter::new();
        let scheduler = Scheduler::new(adapter, ObservabilityHooks::noop());
        scheduler
            .add_job(job(
                "demo",
                "@manual",
                JobKind::LocalProcess {
                    command: "true".into(),
                },
            ))
            .unwrap();
        assert!(scheduler.get_job("demo").is_some());
        scheduler.remove_job("demo").unwrap();
        assert!(scheduler.get_job("demo").is_none());
        assert!(scheduler.get_removed_jobs().iter().any(|j| j.name() == "demo"));
    }
}
