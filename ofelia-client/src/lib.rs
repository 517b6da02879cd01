//! Container engine adapter: a uniform async surface over containers,
//! exec, images, events, services, and networks, backed either by a real
//! Docker Engine connection ([`DockerAdapter`]) or an in-memory
//! [`MockAdapter`] for tests. Scheduler code is written against
//! [`ContainerAdapter`] and is indifferent to which is active.

pub mod adapter;
pub use adapter::ContainerAdapter;

pub mod types;
pub use types::*;

pub mod error;
pub use error::{Error, Result};

pub mod docker;
pub use docker::DockerAdapter;

pub mod mock;
pub use mock::MockAdapter;
