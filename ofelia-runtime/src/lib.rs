//! The cron time wheel, dispatcher, resilience shell, and observability
//! sink that turn a registered [`ofelia_core::Job`] into a running
//! container workload, against whichever [`ofelia_client::ContainerAdapter`]
//! is wired in.

pub mod error;
pub use error::{Error, Result};

pub mod resilience;
pub use resilience::ResilienceTriplet;

pub mod metrics;
pub use metrics::MetricsSink;

pub mod observability;
pub use observability::ObservabilityHooks;

pub mod monitor;
pub use monitor::{ContainerMonitor, MonitorError, MonitorOutcome};

pub mod scheduler;
pub use scheduler::Scheduler;
