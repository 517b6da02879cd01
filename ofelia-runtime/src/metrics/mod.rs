//! In-memory metrics registry with Prometheus text export (§4.3).

pub mod defaults;
pub mod registry;

pub use defaults::register_defaults;
pub use registry::MetricsSink;
