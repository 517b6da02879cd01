//! Job model, schedule grammar, and execution history shared by every
//! Ofelia crate. Client-less: no Docker engine connection lives here.

pub mod error;
pub use error::{Error, Result};

pub mod schedule;
pub use schedule::Schedule;

pub mod execution;
pub use execution::{Execution, History, DEFAULT_HISTORY_CAPACITY};

pub mod job;
pub use job::{Job, JobKind, RuntimeFields};

pub mod registry;
pub use registry::{Registry, RegistryError};

pub mod workflow;
pub use workflow::{WindowLedger, WindowStatus};
