use std::sync::atomic::{AtomicU32, Ordering};

use crate::execution::{Execution, History, DEFAULT_HISTORY_CAPACITY};
use crate::schedule::Schedule;

/// What a job actually does when dispatched.
///
/// A tagged union rather than a trait object hierarchy (§9: "prefer a
/// tagged-union ... avoid deep inheritance"). `ofelia-client` supplies the
/// adapter calls each variant delegates to; this crate only carries the
/// data each variant needs to make that call.
#[derive(Debug, Clone)]
pub enum JobKind {
    /// Exec a command inside an already-running container.
    ExecInContainer {
        container: String,
        command: String,
    },
    /// Run a fresh container from an image and remove it afterwards.
    RunContainer {
        image: String,
        command: Option<String>,
        remove_after: bool,
    },
    /// Create a one-off Swarm service and wait for its tasks to finish.
    ServiceRun {
        image: String,
        command: Option<String>,
    },
    /// Run a command as a local process of the scheduler itself, with no
    /// container involved.
    LocalProcess { command: String },
    /// An ordered sequence of other jobs' names, run in order, stopping at
    /// the first failure.
    Composite { steps: Vec<String> },
}

/// A schedulable unit of work (§3 Data Model).
#[derive(Debug, Clone)]
pub struct Job {
    name: String,
    schedule: Schedule,
    kind: JobKind,
    allow_parallel: bool,
    dependencies: Vec<String>,
    history: History,
    runtime: RuntimeFields,
}

/// Per-job fields initialized exactly once, at `AddJob` time (§3).
///
/// Holds only what `ofelia-core` can own without depending on the
/// resilience primitives defined in `ofelia-runtime`: the running-count and
/// an initialization guard. The Scheduler attaches the resilience triplet
/// {retry policy, circuit breaker, bulkhead} as a parallel, name-keyed
/// structure in `ofelia-runtime` (see `DESIGN.md`) so that this crate stays
/// free of a dependency on the runtime crate.
#[derive(Debug, Default)]
pub struct RuntimeFields {
    running_count: AtomicU32,
    initialized: std::sync::atomic::AtomicBool,
}

impl Clone for RuntimeFields {
    /// Snapshots the current counts into fresh atomics. Used when handing a
    /// read-only [`Job`] copy out of the registry (`GetJob` and friends) —
    /// the clone is a point-in-time view, not a shared handle.
    fn clone(&self) -> Self {
        Self {
            running_count: AtomicU32::new(self.running_count()),
            initialized: std::sync::atomic::AtomicBool::new(self.is_initialized()),
        }
    }
}

impl RuntimeFields {
    pub fn mark_initialized(&self) {
        self.initialized.store(true, Ordering::SeqCst);
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    pub fn running_count(&self) -> u32 {
        self.running_count.load(Ordering::SeqCst)
    }

    pub fn enter(&self) -> u32 {
        self.running_count.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn exit(&self) -> u32 {
        self.running_count.fetch_sub(1, Ordering::SeqCst) - 1
    }

    pub fn is_running(&self) -> bool {
        self.running_count() > 0
    }
}

impl Job {
    pub fn new(name: impl Into<String>, schedule: Schedule, kind: JobKind) -> Self {
        let runtime = RuntimeFields::default();
        runtime.mark_initialized();
        Self {
            name: name.into(),
            schedule,
            kind,
            allow_parallel: true,
            dependencies: Vec::new(),
            history: History::new(DEFAULT_HISTORY_CAPACITY),
            runtime,
        }
    }

    pub fn with_allow_parallel(mut self, allow: bool) -> Self {
        self.allow_parallel = allow;
        self
    }

    pub fn with_dependencies(mut self, deps: Vec<String>) -> Self {
        self.dependencies = deps;
        self
    }

    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history = History::new(capacity);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn set_schedule(&mut self, schedule: Schedule) {
        self.schedule = schedule;
    }

    pub fn kind(&self) -> &JobKind {
        &self.kind
    }

    pub fn allow_parallel(&self) -> bool {
        self.allow_parallel
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub fn runtime(&self) -> &RuntimeFields {
        &self.runtime
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn record(&mut self, execution: Execution) {
        self.history.push(execution);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_job_initializes_runtime_fields_once() {
        let job = Job::new(
            "demo",
            "@every 1s".parse().unwrap(),
            JobKind::LocalProcess {
                command: "echo hi".into(),
            },
        );
        assert!(job.runtime().is_initialized());
        assert_eq!(job.runtime().running_count(), 0);
    }

    #[test]
    fn enter_exit_tracks_running_count() {
        let job = Job::new(
            "demo",
            "@manual".parse().unwrap(),
            JobKind::LocalProcess {
                command: "true".into(),
            },
        );
        assert_eq!(job.runtime().enter(), 1);
        assert!(job.runtime().is_running());
        assert_eq!(job.runtime().exit(), 0);
        assert!(!job.runtime().is_running());
    }
}
