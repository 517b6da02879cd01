//! Ofelia: a cron-style scheduler that dispatches jobs into Docker
//! containers.
//!
//! This facade re-exports the lower crates — [`ofelia_core`] for the job
//! model and schedule grammar, [`ofelia_client`] for the container engine
//! adapter, [`ofelia_runtime`] for the scheduler, resilience shell, and
//! metrics sink — and adds [`OfeliaBuilder`], the only wiring surface this
//! crate contributes. There is no config-file loader here: callers build
//! [`Job`] values directly (or via [`JobBuilder`]) and hand them to the
//! scheduler returned by the builder.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ofelia::{ContainerAdapter, JobBuilder, OfeliaBuilder};
//! use ofelia_client::DockerAdapter;
//!
//! # async fn run() -> ofelia::Result<()> {
//! let adapter: Arc<dyn ContainerAdapter> = Arc::new(DockerAdapter::connect_with_local_defaults()?);
//! let scheduler = OfeliaBuilder::new(adapter).with_default_metrics().build();
//! scheduler.start();
//!
//! scheduler.add_job(
//!     JobBuilder::new("nightly-backup", "@daily")?
//!         .run_container("alpine:3", Some("tar -czf /backup/data.tgz /data"))
//!         .build(),
//! )?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub use error::{Error, Result};

pub use ofelia_client::{ContainerAdapter, DockerAdapter, MockAdapter};
pub use ofelia_core::{Execution, History, Job, JobKind, Schedule};
pub use ofelia_runtime::{MetricsSink, ObservabilityHooks, Scheduler};

use std::sync::Arc;

/// Constructs a [`Job`] without requiring callers to know the exact
/// `JobKind` variant shapes (§3 Data Model). A narrow typed builder
/// rather than a generic config map — the external config-file loader
/// itself is explicitly out of scope.
pub struct JobBuilder {
    name: String,
    schedule: Schedule,
    allow_parallel: bool,
    dependencies: Vec<String>,
}

impl JobBuilder {
    pub fn new(name: impl Into<String>, schedule: &str) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            schedule: schedule.parse::<Schedule>()?,
            allow_parallel: true,
            dependencies: Vec::new(),
        })
    }

    pub fn allow_parallel(mut self, allow: bool) -> Self {
        self.allow_parallel = allow;
        self
    }

    pub fn depends_on(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.dependencies = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn exec_in_container(self, container: &str, command: &str) -> JobSpec {
        JobSpec {
            builder: self,
            kind: JobKind::ExecInContainer {
                container: container.to_string(),
                command: command.to_string(),
            },
        }
    }

    pub fn run_container(self, image: &str, command: Option<&str>) -> JobSpec {
        JobSpec {
            builder: self,
            kind: JobKind::RunContainer {
                image: image.to_string(),
                command: command.map(str::to_string),
                remove_after: true,
            },
        }
    }

    pub fn service_run(self, image: &str, command: Option<&str>) -> JobSpec {
        JobSpec {
            builder: self,
            kind: JobKind::ServiceRun {
                image: image.to_string(),
                command: command.map(str::to_string),
            },
        }
    }

    pub fn local_process(self, command: &str) -> JobSpec {
        JobSpec {
            builder: self,
            kind: JobKind::LocalProcess {
                command: command.to_string(),
            },
        }
    }

    pub fn composite(self, steps: impl IntoIterator<Item = impl Into<String>>) -> JobSpec {
        JobSpec {
            builder: self,
            kind: JobKind::Composite {
                steps: steps.into_iter().map(Into::into).collect(),
            },
        }
    }
}

/// A [`JobBuilder`] with its [`JobKind`] fixed, one step from a finished
/// [`Job`].
pub struct JobSpec {
    builder: JobBuilder,
    kind: JobKind,
}

impl JobSpec {
    pub fn build(self) -> Job {
        Job::new(self.builder.name, self.builder.schedule, self.kind)
            .with_allow_parallel(self.builder.allow_parallel)
            .with_dependencies(self.builder.dependencies)
    }
}

/// Assembles a [`Scheduler`] from a [`ContainerAdapter`] (§2, §4.4
/// defaults). The only construction surface this crate adds on top of
/// `ofelia-runtime`.
pub struct OfeliaBuilder {
    adapter: Arc<dyn ContainerAdapter>,
    metrics: Option<Arc<MetricsSink>>,
}

impl OfeliaBuilder {
    pub fn new(adapter: Arc<dyn ContainerAdapter>) -> Self {
        Self {
            adapter,
            metrics: None,
        }
    }

    /// Registers the §4.3 default metric set on a fresh [`MetricsSink`] and
    /// wires it into the scheduler's observability hooks.
    pub fn with_default_metrics(mut self) -> Self {
        let sink = Arc::new(MetricsSink::new());
        ofelia_runtime::metrics::register_defaults(&sink);
        self.metrics = Some(sink);
        self
    }

    pub fn with_metrics(mut self, sink: Arc<MetricsSink>) -> Self {
        self.metrics = Some(sink);
        self
    }

    pub fn build(self) -> Arc<Scheduler> {
        let hooks = match self.metrics {
            Some(sink) => ObservabilityHooks::new(Some(sink)),
            None => ObservabilityHooks::noop(),
        };
        Scheduler::new(self.adapter, hooks)
    }
}
